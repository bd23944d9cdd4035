//! SQL DDL for all palace tables.
//!
//! Defines `entries`, `entry_keywords` (the inverted keyword index),
//! `entry_queries` (query templates), `usage_events` (append-only signal log)
//! and `schema_meta`. All DDL uses `IF NOT EXISTS` for idempotent
//! initialization.

use rusqlite::Connection;

const SCHEMA_SQL: &str = r#"
-- One row per markdown file in the corpus
CREATE TABLE IF NOT EXISTS entries (
    id TEXT PRIMARY KEY,
    path TEXT NOT NULL,
    title TEXT NOT NULL,
    maturity TEXT NOT NULL DEFAULT 'seedling' CHECK(maturity IN ('seedling','growing','evergreen')),
    tags TEXT NOT NULL DEFAULT '[]',
    created_at TEXT,
    updated_at TEXT,
    last_validated TEXT,
    validated_at TEXT,
    content_hash TEXT NOT NULL,
    indexed_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_entries_maturity ON entries(maturity);

-- Inverted keyword index
CREATE TABLE IF NOT EXISTS entry_keywords (
    entry_id TEXT NOT NULL REFERENCES entries(id) ON DELETE CASCADE,
    keyword TEXT NOT NULL,
    source TEXT NOT NULL CHECK(source IN ('tag','frontmatter','title','body')),
    PRIMARY KEY (entry_id, keyword)
);

CREATE INDEX IF NOT EXISTS idx_keywords_keyword ON entry_keywords(keyword);

-- Query templates
CREATE TABLE IF NOT EXISTS entry_queries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    entry_id TEXT NOT NULL REFERENCES entries(id) ON DELETE CASCADE,
    query TEXT NOT NULL,
    tokens TEXT NOT NULL,
    source TEXT NOT NULL CHECK(source IN ('frontmatter','learned')),
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_queries_entry ON entry_queries(entry_id);

-- Usage signals (append-only; no FK so history outlives removed entries)
CREATE TABLE IF NOT EXISTS usage_events (
    id TEXT PRIMARY KEY,
    entry_id TEXT NOT NULL,
    signal TEXT NOT NULL CHECK(signal IN ('access','citation','helpful','unhelpful','outdated')),
    context TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_events_entry ON usage_events(entry_id);
CREATE INDEX IF NOT EXISTS idx_events_created ON usage_events(created_at);

-- Schema metadata
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    // Set initial schema version if not already present
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_creates_all_tables() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        for table in ["entries", "entry_keywords", "entry_queries", "usage_events", "schema_meta"] {
            assert!(tables.contains(&table.to_string()), "missing table {table}");
        }
    }

    #[test]
    fn schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap(); // second call should not error
    }

    #[test]
    fn unknown_signal_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        let result = conn.execute(
            "INSERT INTO usage_events (id, entry_id, signal, created_at) \
             VALUES ('e1', 'a.md', 'liked', '2026-01-01T00:00:00Z')",
            [],
        );
        assert!(result.is_err());
    }
}
