use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;
use std::collections::BTreeMap;

use super::decay::DecayModel;
use super::entries::all_entries;
use super::types::{DecayStatus, Maturity, UsageSignal};

/// Corpus-wide counts for the `stats` command.
#[derive(Debug, Serialize)]
pub struct CorpusStats {
    pub total_entries: u64,
    pub total_keywords: u64,
    pub total_queries: u64,
    pub learned_queries: u64,
    pub total_events: u64,
    pub by_maturity: BTreeMap<String, u64>,
    pub by_status: BTreeMap<String, u64>,
    pub by_signal: BTreeMap<String, u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest_indexed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newest_indexed: Option<String>,
}

/// Compute corpus statistics, assessing decay as of `now`.
pub fn corpus_stats(conn: &Connection, now: DateTime<Utc>, model: &DecayModel) -> Result<CorpusStats> {
    let count = |sql: &str| -> Result<u64> {
        let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
        Ok(n as u64)
    };

    let mut by_maturity: BTreeMap<String, u64> =
        Maturity::ALL.iter().map(|m| (m.as_str().to_string(), 0)).collect();
    let mut by_status: BTreeMap<String, u64> =
        DecayStatus::ALL.iter().map(|s| (s.as_str().to_string(), 0)).collect();

    let entries = all_entries(conn)?;
    for entry in &entries {
        *by_maturity.entry(entry.maturity.as_str().to_string()).or_default() += 1;
        let status = model.assess(entry, now).status;
        *by_status.entry(status.as_str().to_string()).or_default() += 1;
    }

    let mut by_signal: BTreeMap<String, u64> =
        UsageSignal::ALL.iter().map(|s| (s.as_str().to_string(), 0)).collect();
    {
        let mut stmt = conn.prepare("SELECT signal, COUNT(*) FROM usage_events GROUP BY signal")?;
        let rows: Vec<(String, i64)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        for (signal, n) in rows {
            by_signal.insert(signal, n as u64);
        }
    }

    let (oldest_indexed, newest_indexed): (Option<String>, Option<String>) = conn.query_row(
        "SELECT MIN(indexed_at), MAX(indexed_at) FROM entries",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    Ok(CorpusStats {
        total_entries: entries.len() as u64,
        total_keywords: count("SELECT COUNT(*) FROM entry_keywords")?,
        total_queries: count("SELECT COUNT(*) FROM entry_queries")?,
        learned_queries: count("SELECT COUNT(*) FROM entry_queries WHERE source = 'learned'")?,
        total_events: count("SELECT COUNT(*) FROM usage_events")?,
        by_maturity,
        by_status,
        by_signal,
        oldest_indexed,
        newest_indexed,
    })
}
