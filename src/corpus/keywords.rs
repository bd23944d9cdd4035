//! Keyword extraction and inverted-index search.
//!
//! [`tokenize`] is shared with query-template matching so both sides of every
//! comparison normalise text identically. [`extract_keywords`] decides what an
//! entry is indexed under; [`search_keywords`] scores entries by the fraction
//! of query keywords they carry.

use anyhow::Result;
use rusqlite::{params_from_iter, Connection};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::frontmatter::ParsedEntry;

/// Bump when tokenization or extraction rules change; a mismatch with the
/// stored version means the index must be rebuilt.
pub const EXTRACTOR_VERSION: u32 = 1;

const MIN_TOKEN_LEN: usize = 3;

const STOPWORDS: &[&str] = &[
    "about", "above", "after", "again", "against", "all", "also", "and", "any", "are", "because",
    "been", "before", "being", "below", "between", "both", "but", "can", "could", "did", "does",
    "doing", "down", "during", "each", "few", "for", "from", "further", "had", "has", "have",
    "having", "her", "here", "hers", "him", "his", "how", "into", "its", "itself", "just", "more",
    "most", "not", "now", "off", "once", "only", "other", "our", "ours", "out", "over", "own",
    "same", "she", "should", "some", "such", "than", "that", "the", "their", "theirs", "them",
    "then", "there", "these", "they", "this", "those", "through", "too", "under", "until", "use",
    "used", "using", "very", "was", "were", "what", "when", "where", "which", "while", "who",
    "whom", "why", "will", "with", "would", "you", "your", "yours",
];

/// Where a keyword came from. Earlier variants take priority on overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeywordSource {
    Tag,
    Frontmatter,
    Title,
    Body,
}

impl KeywordSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tag => "tag",
            Self::Frontmatter => "frontmatter",
            Self::Title => "title",
            Self::Body => "body",
        }
    }
}

/// One entry matched by [`search_keywords`].
#[derive(Debug, Clone, Serialize)]
pub struct KeywordMatch {
    pub entry_id: String,
    /// Fraction of query keywords present on the entry, in `(0, 1]`.
    pub score: f64,
    /// Matched keywords, sorted.
    pub matched: Vec<String>,
}

fn is_stopword(token: &str) -> bool {
    STOPWORDS.binary_search(&token).is_ok()
}

/// Lowercase, split on anything that isn't alphanumeric, `-` or `_`, and drop
/// short tokens, pure numbers and stopwords. Order is preserved; duplicates
/// are kept.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '-' || c == '_'))
        .map(|t| t.trim_matches(|c| c == '-' || c == '_'))
        .filter(|t| t.chars().count() >= MIN_TOKEN_LEN)
        .filter(|t| !t.chars().all(|c| c.is_ascii_digit()))
        .filter(|t| !is_stopword(t))
        .map(str::to_string)
        .collect()
}

/// Normalise a tag: lowercase, whitespace runs become `-`.
fn normalize_tag(tag: &str) -> String {
    tag.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

/// Compute the keyword set for an entry, each with its highest-priority source.
pub fn extract_keywords(
    entry: &ParsedEntry,
    title: &str,
    max_body_keywords: usize,
) -> BTreeMap<String, KeywordSource> {
    let mut keywords: BTreeMap<String, KeywordSource> = BTreeMap::new();
    let mut add = |keyword: String, source: KeywordSource| {
        keywords
            .entry(keyword)
            .and_modify(|existing| *existing = (*existing).min(source))
            .or_insert(source);
    };

    for tag in &entry.tags {
        let normalized = normalize_tag(tag);
        if normalized.chars().count() >= MIN_TOKEN_LEN {
            add(normalized.clone(), KeywordSource::Tag);
        }
        for token in tokenize(&normalized.replace('-', " ")) {
            add(token, KeywordSource::Tag);
        }
    }

    for keyword in &entry.keywords {
        for token in tokenize(keyword) {
            add(token, KeywordSource::Frontmatter);
        }
    }

    for token in tokenize(title) {
        add(token, KeywordSource::Title);
    }

    let mut freq: HashMap<String, usize> = HashMap::new();
    for token in tokenize(&entry.body) {
        *freq.entry(token).or_insert(0) += 1;
    }
    let mut ranked: Vec<(String, usize)> = freq.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    for (token, _) in ranked.into_iter().take(max_body_keywords) {
        add(token, KeywordSource::Body);
    }

    keywords
}

/// Search the inverted index. Scores each entry by `matched / query_keywords`.
pub fn search_keywords(conn: &Connection, query: &str, limit: usize) -> Result<Vec<KeywordMatch>> {
    let terms: BTreeSet<String> = tokenize(query).into_iter().collect();
    if terms.is_empty() || limit == 0 {
        return Ok(Vec::new());
    }

    let placeholders: Vec<String> = (1..=terms.len()).map(|i| format!("?{i}")).collect();
    let sql = format!(
        "SELECT entry_id, keyword FROM entry_keywords WHERE keyword IN ({}) \
         ORDER BY entry_id, keyword",
        placeholders.join(", ")
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(terms.iter()), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut by_entry: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (entry_id, keyword) in rows {
        by_entry.entry(entry_id).or_default().push(keyword);
    }

    let total = terms.len() as f64;
    let mut matches: Vec<KeywordMatch> = by_entry
        .into_iter()
        .map(|(entry_id, matched)| KeywordMatch {
            score: matched.len() as f64 / total,
            entry_id,
            matched,
        })
        .collect();

    matches.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.entry_id.cmp(&b.entry_id))
    });
    matches.truncate(limit);
    Ok(matches)
}

/// Keywords stored for one entry, sorted.
pub fn entry_keywords(conn: &Connection, entry_id: &str) -> Result<Vec<String>> {
    let mut stmt =
        conn.prepare("SELECT keyword FROM entry_keywords WHERE entry_id = ?1 ORDER BY keyword")?;
    let keywords = stmt
        .query_map([entry_id], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(keywords)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stopwords_are_sorted_for_binary_search() {
        let mut sorted = STOPWORDS.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, STOPWORDS);
    }

    #[test]
    fn tokenize_normalises_and_filters() {
        assert_eq!(
            tokenize("How do I configure the Rate-Limiter in 2026?"),
            vec!["configure", "rate-limiter"]
        );
        assert_eq!(tokenize("snake_case --flag-- ab 12345"), vec!["snake_case", "flag"]);
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn extract_prefers_higher_priority_source() {
        let entry = ParsedEntry {
            tags: vec!["Error Handling".into()],
            keywords: vec!["anyhow".into()],
            body: "error error error context context propagation".into(),
            ..Default::default()
        };
        let keywords = extract_keywords(&entry, "Propagating errors with anyhow", 2);

        assert_eq!(keywords["error-handling"], KeywordSource::Tag);
        assert_eq!(keywords["error"], KeywordSource::Tag);
        assert_eq!(keywords["handling"], KeywordSource::Tag);
        assert_eq!(keywords["anyhow"], KeywordSource::Frontmatter);
        assert_eq!(keywords["propagating"], KeywordSource::Title);
        assert_eq!(keywords["context"], KeywordSource::Body);
        // only the top two body tokens (error, context) are taken
        assert!(!keywords.contains_key("propagation"));
    }

    #[test]
    fn body_ties_break_alphabetically() {
        let entry = ParsedEntry {
            body: "zeta alpha mango".into(),
            ..Default::default()
        };
        let keywords = extract_keywords(&entry, "", 2);
        let names: Vec<&str> = keywords.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["alpha", "mango"]);
    }
}
