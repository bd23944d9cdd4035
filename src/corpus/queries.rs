//! Query templates: the questions an entry is known to answer.
//!
//! Templates come from an entry's `queries:` frontmatter or are learned at
//! runtime via [`add_queries`]. Matching is Jaccard similarity over the
//! token sets produced by [`tokenize`].

use anyhow::{bail, Result};
use rusqlite::{params, Connection};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

use super::keywords::tokenize;
use super::types::format_timestamp;

/// Origin of a stored template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuerySource {
    /// Declared in the entry's frontmatter; replaced on reindex.
    Frontmatter,
    /// Added at runtime; survives reindex.
    Learned,
}

impl QuerySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Frontmatter => "frontmatter",
            Self::Learned => "learned",
        }
    }
}

impl std::str::FromStr for QuerySource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "frontmatter" => Ok(Self::Frontmatter),
            "learned" => Ok(Self::Learned),
            _ => Err(format!("unknown query source: {s}")),
        }
    }
}

/// Best-matching template for one entry.
#[derive(Debug, Clone, Serialize)]
pub struct QueryMatch {
    pub entry_id: String,
    pub score: f64,
    pub template: String,
}

/// A stored template.
#[derive(Debug, Clone, Serialize)]
pub struct QueryTemplate {
    pub query: String,
    pub source: QuerySource,
    pub created_at: String,
}

/// Sorted, deduplicated token set for a query string.
pub fn token_set(text: &str) -> BTreeSet<String> {
    tokenize(text).into_iter().collect()
}

/// Jaccard similarity `|a ∩ b| / |a ∪ b|`. Two empty sets score 0.
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

fn normalize_query(query: &str) -> String {
    query.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Insert one template row. Callers own the transaction.
pub(crate) fn insert_template(
    conn: &Connection,
    entry_id: &str,
    query: &str,
    source: QuerySource,
    now: &str,
) -> Result<()> {
    let tokens: Vec<String> = token_set(query).into_iter().collect();
    conn.execute(
        "INSERT INTO entry_queries (entry_id, query, tokens, source, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            entry_id,
            query.trim(),
            serde_json::to_string(&tokens)?,
            source.as_str(),
            now
        ],
    )?;
    Ok(())
}

/// Find the entries whose templates best match `query`.
///
/// Keeps the best template per entry, drops anything below `min_similarity`,
/// and sorts by score descending then entry id.
pub fn search_queries(
    conn: &Connection,
    query: &str,
    min_similarity: f64,
    limit: usize,
) -> Result<Vec<QueryMatch>> {
    let query_tokens = token_set(query);
    if query_tokens.is_empty() || limit == 0 {
        return Ok(Vec::new());
    }

    let mut stmt =
        conn.prepare("SELECT entry_id, query, tokens FROM entry_queries ORDER BY id")?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut best: HashMap<String, QueryMatch> = HashMap::new();
    for (entry_id, template, tokens_json) in rows {
        let tokens: BTreeSet<String> = match serde_json::from_str::<Vec<String>>(&tokens_json) {
            Ok(tokens) => tokens.into_iter().collect(),
            Err(e) => {
                tracing::warn!(entry = %entry_id, error = %e, "re-tokenizing template with bad token cache");
                token_set(&template)
            }
        };
        let score = jaccard(&query_tokens, &tokens);
        if score < min_similarity || score == 0.0 {
            continue;
        }
        match best.get(&entry_id) {
            Some(existing) if existing.score >= score => {}
            _ => {
                best.insert(
                    entry_id.clone(),
                    QueryMatch {
                        entry_id,
                        score,
                        template,
                    },
                );
            }
        }
    }

    let mut matches: Vec<QueryMatch> = best.into_values().collect();
    matches.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.entry_id.cmp(&b.entry_id))
    });
    matches.truncate(limit);
    Ok(matches)
}

/// Store learned templates for an entry. Returns how many were new.
///
/// A template whose normalised text already exists on the entry is skipped.
pub fn add_queries(conn: &mut Connection, entry_id: &str, queries: &[String]) -> Result<usize> {
    let tx = conn.transaction()?;

    let exists: bool = tx.query_row(
        "SELECT COUNT(*) > 0 FROM entries WHERE id = ?1",
        params![entry_id],
        |row| row.get(0),
    )?;
    if !exists {
        bail!("entry not found: {entry_id}");
    }

    let mut known: BTreeSet<String> = {
        let mut stmt = tx.prepare("SELECT query FROM entry_queries WHERE entry_id = ?1")?;
        let rows = stmt
            .query_map(params![entry_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        rows.iter().map(|q| normalize_query(q)).collect()
    };

    let now = format_timestamp(chrono::Utc::now());
    let mut added = 0;
    for query in queries {
        let normalized = normalize_query(query);
        if normalized.is_empty() || !known.insert(normalized) {
            continue;
        }
        insert_template(&tx, entry_id, query, QuerySource::Learned, &now)?;
        added += 1;
    }

    tx.commit()?;
    tracing::debug!(entry = entry_id, added, "stored learned query templates");
    Ok(added)
}

/// All templates for an entry, oldest first.
pub fn list_queries(conn: &Connection, entry_id: &str) -> Result<Vec<QueryTemplate>> {
    let mut stmt = conn.prepare(
        "SELECT query, source, created_at FROM entry_queries WHERE entry_id = ?1 ORDER BY id",
    )?;
    let templates = stmt
        .query_map(params![entry_id], |row| {
            let source: String = row.get(1)?;
            Ok(QueryTemplate {
                query: row.get(0)?,
                source: source.parse().map_err(|_| rusqlite::Error::InvalidQuery)?,
                created_at: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(templates)
}
