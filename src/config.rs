use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::corpus::types::{DecayCurve, Maturity};

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PalaceConfig {
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
    pub decay: DecayConfig,
    pub usage: UsageConfig,
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
    pub corpus_dir: String,
}

/// Curve and half-life for one maturity tier.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct TierPolicy {
    pub curve: DecayCurve,
    pub half_life_days: f64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DecayConfig {
    pub seedling: TierPolicy,
    pub growing: TierPolicy,
    pub evergreen: TierPolicy,
    pub fresh_threshold: f64,
    pub stale_threshold: f64,
    pub critical_threshold: f64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct UsageConfig {
    pub access_weight: f64,
    pub citation_weight: f64,
    pub helpful_weight: f64,
    pub unhelpful_weight: f64,
    pub outdated_weight: f64,
    pub temperature: f64,
    pub stale_days: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub max_results: usize,
    pub min_score: f64,
    pub min_query_similarity: f64,
    pub decay_weight: f64,
    pub usage_weight: f64,
    pub max_body_keywords: usize,
}

impl Default for PalaceConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            storage: StorageConfig::default(),
            decay: DecayConfig::default(),
            usage: UsageConfig::default(),
            retrieval: RetrievalConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let dir = default_palace_dir();
        Self {
            db_path: dir.join("palace.db").to_string_lossy().into_owned(),
            corpus_dir: dir.join("corpus").to_string_lossy().into_owned(),
        }
    }
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            seedling: TierPolicy {
                curve: DecayCurve::Exponential,
                half_life_days: 30.0,
            },
            growing: TierPolicy {
                curve: DecayCurve::Linear,
                half_life_days: 90.0,
            },
            evergreen: TierPolicy {
                curve: DecayCurve::Logarithmic,
                half_life_days: 365.0,
            },
            fresh_threshold: 0.7,
            stale_threshold: 0.4,
            critical_threshold: 0.2,
        }
    }
}

impl DecayConfig {
    pub fn policy(&self, maturity: Maturity) -> TierPolicy {
        match maturity {
            Maturity::Seedling => self.seedling,
            Maturity::Growing => self.growing,
            Maturity::Evergreen => self.evergreen,
        }
    }
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            access_weight: 0.1,
            citation_weight: 0.5,
            helpful_weight: 1.0,
            unhelpful_weight: -1.0,
            outdated_weight: -1.5,
            temperature: 2.0,
            stale_days: 60,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_results: 5,
            min_score: 0.2,
            min_query_similarity: 0.3,
            decay_weight: 0.3,
            usage_weight: 0.2,
            max_body_keywords: 20,
        }
    }
}

/// Returns `~/.palace/`
pub fn default_palace_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".palace")
}

/// Returns the default config file path: `~/.palace/config.toml`
pub fn default_config_path() -> PathBuf {
    default_palace_dir().join("config.toml")
}

impl PalaceConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            PalaceConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (PALACE_DB, PALACE_CORPUS, PALACE_LOG_LEVEL).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("PALACE_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("PALACE_CORPUS") {
            self.storage.corpus_dir = val;
        }
        if let Ok(val) = std::env::var("PALACE_LOG_LEVEL") {
            self.logging.log_level = val;
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }

    /// Resolve the corpus directory, expanding `~` if needed.
    pub fn resolved_corpus_dir(&self) -> PathBuf {
        expand_tilde(&self.storage.corpus_dir)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
