//! Core corpus type definitions.
//!
//! Defines [`Maturity`] (the decay tier of an entry), [`DecayCurve`],
//! [`DecayStatus`], [`UsageSignal`] and [`Entry`] (an indexed corpus record).

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// How settled an entry's knowledge is. Controls which decay curve applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Maturity {
    /// Newly captured and unproven. Decays fastest.
    #[default]
    Seedling,
    /// Used and refined a few times.
    Growing,
    /// Stable reference material. Decays slowly.
    Evergreen,
}

impl Maturity {
    pub const ALL: [Maturity; 3] = [Self::Seedling, Self::Growing, Self::Evergreen];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Seedling => "seedling",
            Self::Growing => "growing",
            Self::Evergreen => "evergreen",
        }
    }
}

impl std::fmt::Display for Maturity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for Maturity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "seedling" => Ok(Self::Seedling),
            "growing" => Ok(Self::Growing),
            "evergreen" => Ok(Self::Evergreen),
            other => Err(format!("unknown maturity: {other}")),
        }
    }
}

/// Shape of the freshness curve over time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecayCurve {
    Linear,
    Exponential,
    Logarithmic,
}

/// Bucketed freshness of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecayStatus {
    Fresh,
    Stale,
    Critical,
    Expired,
}

impl DecayStatus {
    pub const ALL: [DecayStatus; 4] = [Self::Fresh, Self::Stale, Self::Critical, Self::Expired];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fresh => "fresh",
            Self::Stale => "stale",
            Self::Critical => "critical",
            Self::Expired => "expired",
        }
    }
}

impl std::fmt::Display for DecayStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// A usage event kind recorded against an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageSignal {
    /// Returned by a lookup.
    Access,
    /// Referenced in an answer or another entry.
    Citation,
    Helpful,
    Unhelpful,
    /// Reported as out of date.
    Outdated,
}

impl UsageSignal {
    pub const ALL: [UsageSignal; 5] = [
        Self::Access,
        Self::Citation,
        Self::Helpful,
        Self::Unhelpful,
        Self::Outdated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Citation => "citation",
            Self::Helpful => "helpful",
            Self::Unhelpful => "unhelpful",
            Self::Outdated => "outdated",
        }
    }
}

impl std::fmt::Display for UsageSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for UsageSignal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "access" => Ok(Self::Access),
            "citation" => Ok(Self::Citation),
            "helpful" => Ok(Self::Helpful),
            "unhelpful" => Ok(Self::Unhelpful),
            "outdated" => Ok(Self::Outdated),
            _ => Err(format!("unknown usage signal: {s}")),
        }
    }
}

/// An indexed corpus entry, matching the `entries` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    /// Path relative to the corpus root, `/`-separated.
    pub id: String,
    /// Absolute path of the markdown file at index time.
    pub path: String,
    pub title: String,
    pub maturity: Maturity,
    pub tags: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    /// `last_validated` from frontmatter.
    pub last_validated: Option<DateTime<Utc>>,
    /// Set by `validate_entry`; survives reindexing.
    pub validated_at: Option<DateTime<Utc>>,
    pub content_hash: String,
    pub indexed_at: DateTime<Utc>,
}

/// Fixed-width UTC timestamp so stored values sort lexically in time order.
pub fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse an RFC 3339 column value written by this crate.
pub(crate) fn parse_timestamp(value: Option<String>) -> Option<DateTime<Utc>> {
    value
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}
