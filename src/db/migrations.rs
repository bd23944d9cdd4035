//! Numbered, forward-only schema migrations.
//!
//! `schema_meta.schema_version` records the last applied step. Each step runs
//! in its own transaction together with the version bump, so an interrupted
//! upgrade resumes from the last completed step.

use rusqlite::{Connection, OptionalExtension};

/// The schema version that the current binary expects.
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

type Step = fn(&Connection) -> rusqlite::Result<()>;

/// `(target version, step)` in ascending order.
const STEPS: &[(u32, Step)] = &[(2, track_extractor_and_index_events)];

fn read_meta(conn: &Connection, key: &str) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM schema_meta WHERE key = ?1",
        [key],
        |row| row.get(0),
    )
    .optional()
}

fn write_meta(conn: &Connection, key: &str, value: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO schema_meta (key, value) VALUES (?1, ?2) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        [key, value],
    )?;
    Ok(())
}

/// Stored schema version. Unparseable values read as 0.
pub fn get_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    Ok(read_meta(conn, "schema_version")?
        .and_then(|v| v.parse().ok())
        .unwrap_or(0))
}

/// Keyword extractor version the index was built with, if recorded.
pub fn get_extractor_version(conn: &Connection) -> rusqlite::Result<Option<u32>> {
    Ok(read_meta(conn, "extractor_version")?.and_then(|v| v.parse().ok()))
}

pub fn set_extractor_version(conn: &Connection, version: u32) -> rusqlite::Result<()> {
    write_meta(conn, "extractor_version", &version.to_string())
}

/// Apply every step above the stored version.
pub fn run_migrations(conn: &Connection) -> rusqlite::Result<()> {
    let current = get_schema_version(conn)?;

    for &(target, step) in STEPS.iter().filter(|(target, _)| *target > current) {
        tracing::info!(from = target - 1, to = target, "applying schema migration");
        let tx = conn.unchecked_transaction()?;
        step(&tx)?;
        write_meta(&tx, "schema_version", &target.to_string())?;
        tx.commit()?;
    }

    Ok(())
}

/// v2: start tracking the keyword extractor version, and add a covering index
/// for the per-entry signal fold.
///
/// Indexes built before tracking existed were produced by extractor 1.
fn track_extractor_and_index_events(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('extractor_version', '1');
         CREATE INDEX IF NOT EXISTS idx_events_entry_signal
             ON usage_events(entry_id, signal, created_at);",
    )
}
