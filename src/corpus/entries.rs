//! Read helpers for indexed entries.

use anyhow::Result;
use rusqlite::{params, Connection, Row};
use std::collections::HashMap;

use super::types::{parse_timestamp, Entry, Maturity};

const ENTRY_COLUMNS: &str = "id, path, title, maturity, tags, created_at, updated_at, \
     last_validated, validated_at, content_hash, indexed_at";

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<Entry> {
    let maturity: String = row.get(3)?;
    let tags: String = row.get(4)?;
    let indexed_at: Option<String> = row.get(10)?;
    Ok(Entry {
        id: row.get(0)?,
        path: row.get(1)?,
        title: row.get(2)?,
        maturity: maturity.parse::<Maturity>().unwrap_or_default(),
        tags: serde_json::from_str(&tags).unwrap_or_default(),
        created_at: parse_timestamp(row.get(5)?),
        updated_at: parse_timestamp(row.get(6)?),
        last_validated: parse_timestamp(row.get(7)?),
        validated_at: parse_timestamp(row.get(8)?),
        content_hash: row.get(9)?,
        indexed_at: parse_timestamp(indexed_at).unwrap_or_default(),
    })
}

/// Fetch one entry, or `None` if it isn't indexed.
pub fn fetch_entry(conn: &Connection, id: &str) -> Result<Option<Entry>> {
    let sql = format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE id = ?1");
    match conn.query_row(&sql, params![id], row_to_entry) {
        Ok(entry) => Ok(Some(entry)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Batch-fetch entries by id.
pub fn fetch_entries(conn: &Connection, ids: &[&str]) -> Result<HashMap<String, Entry>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{i}")).collect();
    let sql = format!(
        "SELECT {ENTRY_COLUMNS} FROM entries WHERE id IN ({})",
        placeholders.join(", ")
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(ids.iter()), row_to_entry)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rows.into_iter().map(|e| (e.id.clone(), e)).collect())
}

/// All indexed entries, ordered by id.
pub fn all_entries(conn: &Connection) -> Result<Vec<Entry>> {
    let sql = format!("SELECT {ENTRY_COLUMNS} FROM entries ORDER BY id");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], row_to_entry)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
