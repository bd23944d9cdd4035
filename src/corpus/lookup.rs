//! Unified corpus lookup.
//!
//! Keyword search → query-template search → merge by entry → relevance floor
//! → decay filter → decay/usage-adjusted rank → truncate → access tracking.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;
use std::collections::BTreeMap;

use super::decay::DecayModel;
use super::entries::{fetch_entries, fetch_entry};
use super::frontmatter::split_frontmatter;
use super::keywords::search_keywords;
use super::queries::search_queries;
use super::types::{DecayStatus, Entry};
use super::usage::{record_access_at, usage_scores};
use crate::config::{RetrievalConfig, UsageConfig};

/// Bonus added to relevance when both keyword and template search agree.
const AGREEMENT_BONUS: f64 = 0.1;

const STRONG_THRESHOLD: f64 = 0.8;
const PARTIAL_THRESHOLD: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    Keywords,
    Queries,
    #[default]
    Unified,
}

impl std::str::FromStr for SearchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "keywords" => Ok(Self::Keywords),
            "queries" => Ok(Self::Queries),
            "unified" => Ok(Self::Unified),
            _ => Err(format!("unknown search mode: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrength {
    Strong,
    Partial,
    Weak,
}

impl MatchStrength {
    pub fn from_relevance(relevance: f64) -> Self {
        if relevance >= STRONG_THRESHOLD {
            Self::Strong
        } else if relevance >= PARTIAL_THRESHOLD {
            Self::Partial
        } else {
            Self::Weak
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strong => "strong",
            Self::Partial => "partial",
            Self::Weak => "weak",
        }
    }
}

impl std::fmt::Display for MatchStrength {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Per-call search knobs.
#[derive(Debug, Clone)]
pub struct LookupOptions {
    pub mode: SearchMode,
    pub max_results: usize,
    /// Relevance floor.
    pub min_score: f64,
    pub min_query_similarity: f64,
    /// How much staleness pulls rank down, `[0, 1]`.
    pub decay_weight: f64,
    /// How far usage moves rank either way, `[0, 1]`.
    pub usage_weight: f64,
    pub include_expired: bool,
    /// Append an `access` event for every returned entry.
    pub track_access: bool,
}

impl Default for LookupOptions {
    fn default() -> Self {
        Self::from_config(&RetrievalConfig::default())
    }
}

impl LookupOptions {
    pub fn from_config(config: &RetrievalConfig) -> Self {
        Self {
            mode: SearchMode::Unified,
            max_results: config.max_results,
            min_score: config.min_score,
            min_query_similarity: config.min_query_similarity,
            decay_weight: config.decay_weight,
            usage_weight: config.usage_weight,
            include_expired: false,
            track_access: true,
        }
    }
}

/// One ranked lookup result.
#[derive(Debug, Clone, Serialize)]
pub struct LookupResult {
    pub entry_id: String,
    pub title: String,
    pub path: String,
    /// Textual match quality in `[0, 1]`.
    pub relevance: f64,
    /// Relevance adjusted for freshness and usage; the sort key.
    pub rank: f64,
    pub strength: MatchStrength,
    pub matched_keywords: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_query: Option<String>,
    pub decay_factor: f64,
    pub decay_status: DecayStatus,
    pub usage_score: f64,
    pub sources: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct LookupResponse {
    pub results: Vec<LookupResult>,
    /// Candidates that passed every filter before truncation.
    pub total_matched: usize,
}

/// A hydrated entry: stored metadata plus the markdown body from disk.
#[derive(Debug, Serialize)]
pub struct EntryContent {
    pub entry: Entry,
    pub body: String,
}

/// Merged candidate before ranking.
#[derive(Default)]
struct Candidate {
    keyword_score: Option<f64>,
    matched_keywords: Vec<String>,
    query_score: Option<f64>,
    matched_query: Option<String>,
}

impl Candidate {
    fn relevance(&self) -> f64 {
        let best = self
            .keyword_score
            .unwrap_or(0.0)
            .max(self.query_score.unwrap_or(0.0));
        let bonus = if self.keyword_score.is_some() && self.query_score.is_some() {
            AGREEMENT_BONUS
        } else {
            0.0
        };
        (best + bonus).min(1.0)
    }

    fn sources(&self) -> Vec<&'static str> {
        let mut sources = Vec::new();
        if self.keyword_score.is_some() {
            sources.push("keywords");
        }
        if self.query_score.is_some() {
            sources.push("queries");
        }
        sources
    }
}

/// Combine textual relevance with freshness and usage.
///
/// `decay_weight = 0` ignores freshness; `usage_weight = 0` ignores usage.
/// Neutral usage (0.5) leaves rank unchanged.
pub fn rank_score(relevance: f64, decay_factor: f64, usage_score: f64, decay_weight: f64, usage_weight: f64) -> f64 {
    let freshness = 1.0 - decay_weight.clamp(0.0, 1.0) * (1.0 - decay_factor);
    let usage = 1.0 + usage_weight.clamp(0.0, 1.0) * (2.0 * usage_score - 1.0);
    relevance * freshness * usage
}

/// Search facade over one connection.
pub struct CacheLookup<'a> {
    conn: &'a Connection,
    decay: &'a DecayModel,
    usage: &'a UsageConfig,
}

impl<'a> CacheLookup<'a> {
    pub fn new(conn: &'a Connection, decay: &'a DecayModel, usage: &'a UsageConfig) -> Self {
        Self { conn, decay, usage }
    }

    pub fn search(&self, query: &str, options: &LookupOptions) -> Result<LookupResponse> {
        self.search_at(query, options, Utc::now())
    }

    /// [`search`](Self::search) with an explicit clock for decay assessment and
    /// access events.
    pub fn search_at(
        &self,
        query: &str,
        options: &LookupOptions,
        now: DateTime<Utc>,
    ) -> Result<LookupResponse> {
        if query.trim().is_empty() || options.max_results == 0 {
            return Ok(LookupResponse {
                results: Vec::new(),
                total_matched: 0,
            });
        }

        let candidate_limit = options.max_results.saturating_mul(3);
        let mut candidates: BTreeMap<String, Candidate> = BTreeMap::new();

        // 1. Keyword search
        if matches!(options.mode, SearchMode::Keywords | SearchMode::Unified) {
            for m in search_keywords(self.conn, query, candidate_limit)? {
                let c = candidates.entry(m.entry_id).or_default();
                c.keyword_score = Some(m.score);
                c.matched_keywords = m.matched;
            }
        }

        // 2. Query-template search
        if matches!(options.mode, SearchMode::Queries | SearchMode::Unified) {
            for m in search_queries(self.conn, query, options.min_query_similarity, candidate_limit)? {
                let c = candidates.entry(m.entry_id).or_default();
                c.query_score = Some(m.score);
                c.matched_query = Some(m.template);
            }
        }

        // 3. Relevance floor
        candidates.retain(|_, c| c.relevance() >= options.min_score);

        // 4. Hydrate, score and filter
        let ids: Vec<&str> = candidates.keys().map(String::as_str).collect();
        let entries = fetch_entries(self.conn, &ids)?;
        let usage = usage_scores(self.conn, &ids, self.usage)?;

        let mut results: Vec<LookupResult> = Vec::new();
        for (id, candidate) in &candidates {
            let Some(entry) = entries.get(id) else {
                tracing::debug!(entry = %id, "skipping index row without entry");
                continue;
            };
            let assessment = self.decay.assess(entry, now);
            if assessment.status == DecayStatus::Expired && !options.include_expired {
                continue;
            }
            let usage_score = usage.get(id).copied().unwrap_or(0.5);
            let relevance = candidate.relevance();

            results.push(LookupResult {
                entry_id: id.clone(),
                title: entry.title.clone(),
                path: entry.path.clone(),
                relevance,
                rank: rank_score(
                    relevance,
                    assessment.factor,
                    usage_score,
                    options.decay_weight,
                    options.usage_weight,
                ),
                strength: MatchStrength::from_relevance(relevance),
                matched_keywords: candidate.matched_keywords.clone(),
                matched_query: candidate.matched_query.clone(),
                decay_factor: assessment.factor,
                decay_status: assessment.status,
                usage_score,
                sources: candidate.sources(),
            });
        }

        // 5. Rank and truncate
        results.sort_by(|a, b| {
            b.rank
                .partial_cmp(&a.rank)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.entry_id.cmp(&b.entry_id))
        });
        let total_matched = results.len();
        results.truncate(options.max_results);

        // 6. Access tracking
        if options.track_access {
            let returned: Vec<&str> = results.iter().map(|r| r.entry_id.as_str()).collect();
            record_access_at(self.conn, &returned, now)?;
        }

        tracing::debug!(
            query,
            mode = ?options.mode,
            matched = total_matched,
            returned = results.len(),
            "corpus lookup"
        );

        Ok(LookupResponse {
            results,
            total_matched,
        })
    }

    /// Load an entry's metadata and its markdown body (frontmatter stripped).
    pub fn get_entry(&self, entry_id: &str) -> Result<EntryContent> {
        let Some(entry) = fetch_entry(self.conn, entry_id)? else {
            bail!("entry not found: {entry_id}");
        };
        let content = std::fs::read_to_string(&entry.path)
            .with_context(|| format!("failed to read entry file {}", entry.path))?;
        let body = match split_frontmatter(&content) {
            Ok((_, body)) => body.to_string(),
            Err(_) => content.clone(),
        };
        Ok(EntryContent { entry, body })
    }
}
