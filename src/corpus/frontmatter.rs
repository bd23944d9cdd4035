//! Markdown frontmatter parsing for corpus entries.
//!
//! Entries open with an optional YAML block fenced by `---` lines. Only the
//! fields the engine reads are extracted; anything else is ignored. Parsing is
//! lenient about shapes (a comma-separated string is accepted wherever a list
//! is expected) and strict about structure.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_yaml::Value;

use super::types::Maturity;

#[derive(Debug, thiserror::Error)]
pub enum FrontmatterError {
    #[error("frontmatter block is not closed with `---`")]
    Unterminated,
    #[error("invalid frontmatter YAML: {0}")]
    InvalidYaml(#[from] serde_yaml::Error),
    #[error("frontmatter must be a YAML mapping")]
    NotAMapping,
    #[error("{0}")]
    UnknownMaturity(String),
}

/// The fields of a corpus entry as read from disk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedEntry {
    pub title: Option<String>,
    pub tags: Vec<String>,
    pub keywords: Vec<String>,
    pub queries: Vec<String>,
    pub maturity: Maturity,
    pub created: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    pub last_validated: Option<DateTime<Utc>>,
    pub body: String,
}

impl ParsedEntry {
    /// Frontmatter title, else the first `# ` heading, else `fallback`.
    pub fn resolved_title(&self, fallback: &str) -> String {
        if let Some(title) = self.title.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            return title.to_string();
        }
        self.body
            .lines()
            .find_map(|line| line.trim_start().strip_prefix("# "))
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| fallback.to_string())
    }
}

#[derive(Deserialize, Default)]
struct RawFrontmatter {
    #[serde(default)]
    title: Option<Value>,
    #[serde(default)]
    tags: Option<Value>,
    #[serde(default)]
    keywords: Option<Value>,
    #[serde(default)]
    queries: Option<Value>,
    #[serde(default)]
    maturity: Option<String>,
    #[serde(default)]
    created: Option<Value>,
    #[serde(default)]
    updated: Option<Value>,
    #[serde(default)]
    last_validated: Option<Value>,
}

/// Split a markdown document into `(frontmatter, body)`.
///
/// Returns an empty frontmatter when the document has none.
pub fn split_frontmatter(content: &str) -> Result<(&str, &str), FrontmatterError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    let Some(rest) = content
        .strip_prefix("---\n")
        .or_else(|| content.strip_prefix("---\r\n"))
    else {
        return Ok(("", content));
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        let trimmed = line.trim_end();
        if trimmed == "---" || trimmed == "..." {
            let frontmatter = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return Ok((frontmatter, body));
        }
        offset += line.len();
    }

    Err(FrontmatterError::Unterminated)
}

/// Parse a full markdown document into a [`ParsedEntry`].
pub fn parse_entry(content: &str) -> Result<ParsedEntry, FrontmatterError> {
    let (frontmatter, body) = split_frontmatter(content)?;

    let raw = if frontmatter.trim().is_empty() {
        RawFrontmatter::default()
    } else {
        match serde_yaml::from_str::<Value>(frontmatter)? {
            Value::Null => RawFrontmatter::default(),
            value @ Value::Mapping(_) => serde_yaml::from_value(value)?,
            _ => return Err(FrontmatterError::NotAMapping),
        }
    };

    let maturity = match raw.maturity.as_deref() {
        Some(m) => m.parse().map_err(FrontmatterError::UnknownMaturity)?,
        None => Maturity::default(),
    };

    Ok(ParsedEntry {
        title: raw.title.as_ref().and_then(scalar_to_string),
        tags: string_list(raw.tags.as_ref()),
        keywords: string_list(raw.keywords.as_ref()),
        queries: string_list(raw.queries.as_ref()),
        maturity,
        created: date_field("created", raw.created.as_ref()),
        updated: date_field("updated", raw.updated.as_ref()),
        last_validated: date_field("last_validated", raw.last_validated.as_ref()),
        body: body.to_string(),
    })
}

/// Parse `YYYY-MM-DD` (midnight UTC) or an RFC 3339 timestamp.
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn date_field(name: &str, value: Option<&Value>) -> Option<DateTime<Utc>> {
    let raw = value.and_then(scalar_to_string)?;
    let parsed = parse_date(&raw);
    if parsed.is_none() {
        tracing::warn!(field = name, value = %raw, "ignoring unparseable frontmatter date");
    }
    parsed
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    let items: Vec<String> = match value {
        Some(Value::Sequence(seq)) => seq.iter().filter_map(scalar_to_string).collect(),
        Some(Value::String(s)) => s.split(',').map(str::to_string).collect(),
        Some(other) => scalar_to_string(other).into_iter().collect(),
        None => Vec::new(),
    };
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
