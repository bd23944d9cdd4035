//! Event-sourced usage signals.
//!
//! Every interaction with an entry is appended to `usage_events` and never
//! rewritten. Scores are folded from the log at read time: each signal has a
//! weight, the weights are summed, and the sum is squashed through a sigmoid
//! into `(0, 1)`. An entry with no history sits at exactly 0.5.

use anyhow::{bail, Result};
use chrono::{DateTime, TimeDelta, Utc};
use rusqlite::{params, params_from_iter, Connection};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use super::types::{format_timestamp, UsageSignal};
use crate::config::UsageConfig;

/// Signal weight under `config`.
pub fn weight(signal: UsageSignal, config: &UsageConfig) -> f64 {
    match signal {
        UsageSignal::Access => config.access_weight,
        UsageSignal::Citation => config.citation_weight,
        UsageSignal::Helpful => config.helpful_weight,
        UsageSignal::Unhelpful => config.unhelpful_weight,
        UsageSignal::Outdated => config.outdated_weight,
    }
}

pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Normalise a raw weighted sum into `(0, 1)`.
pub fn normalize(raw: f64, temperature: f64) -> f64 {
    let t = if temperature > 0.0 { temperature } else { 1.0 };
    sigmoid(raw / t)
}

/// Per-signal event counts for one entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SignalCounts {
    pub access: u64,
    pub citation: u64,
    pub helpful: u64,
    pub unhelpful: u64,
    pub outdated: u64,
}

impl SignalCounts {
    fn add(&mut self, signal: UsageSignal, n: u64) {
        match signal {
            UsageSignal::Access => self.access += n,
            UsageSignal::Citation => self.citation += n,
            UsageSignal::Helpful => self.helpful += n,
            UsageSignal::Unhelpful => self.unhelpful += n,
            UsageSignal::Outdated => self.outdated += n,
        }
    }

    pub fn get(&self, signal: UsageSignal) -> u64 {
        match signal {
            UsageSignal::Access => self.access,
            UsageSignal::Citation => self.citation,
            UsageSignal::Helpful => self.helpful,
            UsageSignal::Unhelpful => self.unhelpful,
            UsageSignal::Outdated => self.outdated,
        }
    }

    pub fn total(&self) -> u64 {
        UsageSignal::ALL.iter().map(|s| self.get(*s)).sum()
    }

    fn raw_score(&self, config: &UsageConfig) -> f64 {
        UsageSignal::ALL
            .iter()
            .map(|s| self.get(*s) as f64 * weight(*s, config))
            .sum()
    }
}

/// Folded usage state of one entry.
#[derive(Debug, Clone, Serialize)]
pub struct EntryUsage {
    pub entry_id: String,
    pub counts: SignalCounts,
    pub raw_score: f64,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_event_at: Option<String>,
}

impl EntryUsage {
    fn fold(entry_id: String, counts: SignalCounts, last_event_at: Option<String>, config: &UsageConfig) -> Self {
        let raw_score = counts.raw_score(config);
        Self {
            entry_id,
            score: normalize(raw_score, config.temperature),
            raw_score,
            counts,
            last_event_at,
        }
    }
}

/// An entry with no recent access or citation.
#[derive(Debug, Clone, Serialize)]
pub struct StaleEntry {
    pub entry_id: String,
    /// Most recent access/citation, `None` if never used.
    pub last_used_at: Option<String>,
}

/// One row of the event log, as exported.
#[derive(Debug, Clone, Serialize)]
pub struct UsageEvent {
    pub id: String,
    pub entry_id: String,
    pub signal: UsageSignal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
    pub created_at: String,
}

/// Append a signal for a known entry. Returns the event id.
pub fn record_signal(
    conn: &Connection,
    entry_id: &str,
    signal: UsageSignal,
    context: Option<&serde_json::Value>,
) -> Result<String> {
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM entries WHERE id = ?1",
        params![entry_id],
        |row| row.get(0),
    )?;
    if !exists {
        bail!("entry not found: {entry_id}");
    }
    record_signal_at(conn, entry_id, signal, context, Utc::now())
}

/// Append a signal with an explicit timestamp. Does not check the entry exists.
pub fn record_signal_at(
    conn: &Connection,
    entry_id: &str,
    signal: UsageSignal,
    context: Option<&serde_json::Value>,
    at: DateTime<Utc>,
) -> Result<String> {
    let id = uuid::Uuid::now_v7().to_string();
    let context_str = context.map(serde_json::to_string).transpose()?;
    conn.execute(
        "INSERT INTO usage_events (id, entry_id, signal, context, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, entry_id, signal.as_str(), context_str, format_timestamp(at)],
    )?;
    tracing::debug!(entry = entry_id, signal = %signal, "usage signal recorded");
    Ok(id)
}

/// Batch-append `access` events for entries returned by a lookup.
pub fn record_access(conn: &Connection, ids: &[&str]) -> Result<()> {
    record_access_at(conn, ids, Utc::now())
}

/// [`record_access`] stamped with an explicit time.
pub fn record_access_at(conn: &Connection, ids: &[&str], at: DateTime<Utc>) -> Result<()> {
    if ids.is_empty() {
        return Ok(());
    }
    let now = format_timestamp(at);
    let mut stmt = conn.prepare(
        "INSERT INTO usage_events (id, entry_id, signal, context, created_at) \
         VALUES (?1, ?2, 'access', NULL, ?3)",
    )?;
    for id in ids {
        stmt.execute(params![uuid::Uuid::now_v7().to_string(), id, now])?;
    }
    Ok(())
}

type EventGroup = (String, String, i64, String);

fn event_group(row: &rusqlite::Row<'_>) -> rusqlite::Result<EventGroup> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

/// Fold `(entry_id, signal, count, max(created_at))` rows into per-entry usage.
fn fold_rows(
    rows: Vec<EventGroup>,
    config: &UsageConfig,
) -> BTreeMap<String, EntryUsage> {
    let mut grouped: BTreeMap<String, (SignalCounts, Option<String>)> = BTreeMap::new();
    for (entry_id, signal, count, last) in rows {
        let Ok(signal) = signal.parse::<UsageSignal>() else {
            tracing::warn!(entry = %entry_id, signal = %signal, "skipping unknown signal");
            continue;
        };
        let (counts, latest) = grouped.entry(entry_id).or_default();
        counts.add(signal, count as u64);
        let newer = latest.as_deref().map_or(true, |l| l < last.as_str());
        if newer {
            *latest = Some(last);
        }
    }
    grouped
        .into_iter()
        .map(|(id, (counts, last))| (id.clone(), EntryUsage::fold(id, counts, last, config)))
        .collect()
}

/// Usage for one entry. Entries with no events score 0.5.
pub fn entry_usage(conn: &Connection, entry_id: &str, config: &UsageConfig) -> Result<EntryUsage> {
    let mut stmt = conn.prepare(
        "SELECT entry_id, signal, COUNT(*), MAX(created_at) FROM usage_events \
         WHERE entry_id = ?1 GROUP BY entry_id, signal",
    )?;
    let rows = stmt
        .query_map(params![entry_id], event_group)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(fold_rows(rows, config)
        .remove(entry_id)
        .unwrap_or_else(|| EntryUsage::fold(entry_id.to_string(), SignalCounts::default(), None, config)))
}

/// Normalised usage score for each id. Ids without events map to 0.5.
pub fn usage_scores(
    conn: &Connection,
    ids: &[&str],
    config: &UsageConfig,
) -> Result<HashMap<String, f64>> {
    let mut scores: HashMap<String, f64> = ids
        .iter()
        .map(|id| (id.to_string(), normalize(0.0, config.temperature)))
        .collect();
    if ids.is_empty() {
        return Ok(scores);
    }

    let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{i}")).collect();
    let sql = format!(
        "SELECT entry_id, signal, COUNT(*), MAX(created_at) FROM usage_events \
         WHERE entry_id IN ({}) GROUP BY entry_id, signal",
        placeholders.join(", ")
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(ids.iter()), event_group)?
        .collect::<Result<Vec<_>, _>>()?;

    for (id, usage) in fold_rows(rows, config) {
        scores.insert(id, usage.score);
    }
    Ok(scores)
}

/// Indexed entries with any usage history, best score first.
pub fn top_entries(conn: &Connection, limit: usize, config: &UsageConfig) -> Result<Vec<EntryUsage>> {
    let mut stmt = conn.prepare(
        "SELECT u.entry_id, u.signal, COUNT(*), MAX(u.created_at) FROM usage_events u \
         JOIN entries e ON e.id = u.entry_id GROUP BY u.entry_id, u.signal",
    )?;
    let rows = stmt
        .query_map([], event_group)?
        .collect::<Result<Vec<_>, _>>()?;

    let mut usages: Vec<EntryUsage> = fold_rows(rows, config).into_values().collect();
    usages.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.entry_id.cmp(&b.entry_id))
    });
    usages.truncate(limit);
    Ok(usages)
}

/// `now` minus `days`, saturating at the earliest representable time.
fn cutoff_time(now: DateTime<Utc>, days: u64) -> DateTime<Utc> {
    i64::try_from(days)
        .ok()
        .and_then(TimeDelta::try_days)
        .and_then(|span| now.checked_sub_signed(span))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Indexed entries with no `access` or `citation` event in the last `days`.
pub fn stale_entries(conn: &Connection, days: u64, now: DateTime<Utc>) -> Result<Vec<StaleEntry>> {
    let cutoff = format_timestamp(cutoff_time(now, days));
    let mut stmt = conn.prepare(
        "SELECT e.id, MAX(u.created_at) FROM entries e \
         LEFT JOIN usage_events u ON u.entry_id = e.id AND u.signal IN ('access', 'citation') \
         GROUP BY e.id \
         HAVING MAX(u.created_at) IS NULL OR MAX(u.created_at) < ?1 \
         ORDER BY e.id",
    )?;
    let stale = stmt
        .query_map(params![cutoff], |row| {
            Ok(StaleEntry {
                entry_id: row.get(0)?,
                last_used_at: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(stale)
}

/// Delete events older than `older_than_days`. Returns the number removed.
pub fn prune_events(conn: &Connection, older_than_days: u64, now: DateTime<Utc>) -> Result<usize> {
    let cutoff = format_timestamp(cutoff_time(now, older_than_days));
    let removed = conn.execute(
        "DELETE FROM usage_events WHERE created_at < ?1",
        params![cutoff],
    )?;
    tracing::info!(removed, older_than_days, "pruned usage events");
    Ok(removed)
}

/// The full event log, oldest first.
pub fn all_events(conn: &Connection) -> Result<Vec<UsageEvent>> {
    let mut stmt = conn.prepare(
        "SELECT id, entry_id, signal, context, created_at FROM usage_events \
         ORDER BY created_at, id",
    )?;
    let events = stmt
        .query_map([], |row| {
            let signal: String = row.get(2)?;
            let context: Option<String> = row.get(3)?;
            Ok(UsageEvent {
                id: row.get(0)?,
                entry_id: row.get(1)?,
                signal: signal.parse().map_err(|_| rusqlite::Error::InvalidQuery)?,
                context: context.and_then(|s| serde_json::from_str(&s).ok()),
                created_at: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(events)
}
