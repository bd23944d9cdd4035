//! Time-based freshness decay.
//!
//! Each maturity tier maps to a [`DecayCurve`] and a half-life. An entry's
//! age is measured from its most recent validation (or update, or creation),
//! and the curve turns that age into a factor in `[0, 1]`. Every curve is 1.0
//! at age zero and exactly 0.5 at one half-life:
//!
//! | Curve | Formula | Tail |
//! |-------|---------|------|
//! | Linear | `1 - age / 2h` | hits 0 at two half-lives |
//! | Exponential | `0.5^(age / h)` | asymptotic |
//! | Logarithmic | `1 / (1 + log2(1 + age / h))` | slowest |

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::Serialize;

use super::entries::all_entries;
use super::types::{format_timestamp, DecayCurve, DecayStatus, Entry, Maturity};
use crate::config::DecayConfig;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Freshness factor for `age_days` on `curve`. Clamped to `[0, 1]`.
///
/// Negative ages count as zero; a non-positive half-life disables decay.
pub fn decay_factor(curve: DecayCurve, age_days: f64, half_life_days: f64) -> f64 {
    if half_life_days <= 0.0 || !half_life_days.is_finite() {
        return 1.0;
    }
    let age = if age_days.is_nan() { 0.0 } else { age_days.max(0.0) };
    let ratio = age / half_life_days;

    let factor = match curve {
        DecayCurve::Linear => 1.0 - ratio / 2.0,
        DecayCurve::Exponential => 0.5f64.powf(ratio),
        DecayCurve::Logarithmic => 1.0 / (1.0 + (1.0 + ratio).log2()),
    };
    factor.clamp(0.0, 1.0)
}

/// Decay state of one entry at a point in time.
#[derive(Debug, Clone, Serialize)]
pub struct DecayAssessment {
    pub entry_id: String,
    pub maturity: Maturity,
    /// Days since the reference time, `None` if the entry carries no timestamps.
    pub age_days: Option<f64>,
    pub factor: f64,
    pub status: DecayStatus,
}

/// Applies the configured tier policies and status thresholds.
#[derive(Debug, Clone)]
pub struct DecayModel {
    config: DecayConfig,
}

impl Default for DecayModel {
    fn default() -> Self {
        Self::new(DecayConfig::default())
    }
}

impl DecayModel {
    pub fn new(config: DecayConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DecayConfig {
        &self.config
    }

    /// The moment freshness is measured from: the latest of `validated_at`,
    /// `last_validated`, `updated_at` and `created_at`.
    pub fn reference_time(entry: &Entry) -> Option<DateTime<Utc>> {
        [
            entry.validated_at,
            entry.last_validated,
            entry.updated_at,
            entry.created_at,
        ]
        .into_iter()
        .flatten()
        .max()
    }

    pub fn status_for(&self, factor: f64) -> DecayStatus {
        if factor >= self.config.fresh_threshold {
            DecayStatus::Fresh
        } else if factor >= self.config.stale_threshold {
            DecayStatus::Stale
        } else if factor >= self.config.critical_threshold {
            DecayStatus::Critical
        } else {
            DecayStatus::Expired
        }
    }

    pub fn assess(&self, entry: &Entry, now: DateTime<Utc>) -> DecayAssessment {
        let Some(reference) = Self::reference_time(entry) else {
            return DecayAssessment {
                entry_id: entry.id.clone(),
                maturity: entry.maturity,
                age_days: None,
                factor: 1.0,
                status: DecayStatus::Fresh,
            };
        };

        let age_days = ((now - reference).num_seconds().max(0) as f64) / SECONDS_PER_DAY;
        let policy = self.config.policy(entry.maturity);
        let factor = decay_factor(policy.curve, age_days, policy.half_life_days);

        DecayAssessment {
            entry_id: entry.id.clone(),
            maturity: entry.maturity,
            age_days: Some(age_days),
            factor,
            status: self.status_for(factor),
        }
    }

    /// Critical and expired entries need a human to re-check them.
    pub fn needs_revalidation(assessment: &DecayAssessment) -> bool {
        matches!(
            assessment.status,
            DecayStatus::Critical | DecayStatus::Expired
        )
    }

    /// Every entry that isn't fresh, most decayed first.
    pub fn entries_needing_attention(
        &self,
        conn: &Connection,
        now: DateTime<Utc>,
    ) -> Result<Vec<DecayAssessment>> {
        let mut assessments: Vec<DecayAssessment> = all_entries(conn)?
            .iter()
            .map(|entry| self.assess(entry, now))
            .filter(|a| a.status != DecayStatus::Fresh)
            .collect();

        assessments.sort_by(|a, b| {
            a.factor
                .partial_cmp(&b.factor)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.entry_id.cmp(&b.entry_id))
        });
        Ok(assessments)
    }
}

/// Mark an entry as re-checked at `now`. Survives reindexing.
pub fn validate_entry(conn: &Connection, entry_id: &str, now: DateTime<Utc>) -> Result<()> {
    let updated = conn.execute(
        "UPDATE entries SET validated_at = ?1 WHERE id = ?2",
        params![format_timestamp(now), entry_id],
    )?;
    if updated == 0 {
        bail!("entry not found: {entry_id}");
    }
    tracing::info!(entry = entry_id, "entry validated");
    Ok(())
}
