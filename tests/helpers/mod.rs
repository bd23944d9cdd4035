#![allow(dead_code)]

use palace::corpus::index::{sync_corpus, SyncOptions, SyncReport};
use palace::db;
use rusqlite::Connection;
use std::path::Path;
use tempfile::TempDir;

/// Open a fresh in-memory database with schema and migrations applied.
pub fn test_db() -> Connection {
    db::open_memory_database().unwrap()
}

/// An empty temporary corpus directory.
pub fn test_corpus() -> TempDir {
    TempDir::new().unwrap()
}

/// Write a markdown entry at `rel` (creating parent directories).
pub fn write_entry(corpus: &Path, rel: &str, content: &str) {
    let path = corpus.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

/// Build a markdown document with frontmatter.
pub fn entry_doc(title: &str, maturity: &str, created: &str, tags: &[&str], queries: &[&str], body: &str) -> String {
    let mut doc = format!("---\ntitle: {title}\nmaturity: {maturity}\ncreated: {created}\n");
    if !tags.is_empty() {
        doc.push_str(&format!("tags: [{}]\n", tags.join(", ")));
    }
    if !queries.is_empty() {
        doc.push_str("queries:\n");
        for q in queries {
            doc.push_str(&format!("  - \"{q}\"\n"));
        }
    }
    doc.push_str("---\n");
    doc.push_str(body);
    doc
}

/// `YYYY-MM-DD` for `days` days before now.
pub fn days_ago(days: i64) -> String {
    (chrono::Utc::now() - chrono::Duration::days(days))
        .format("%Y-%m-%d")
        .to_string()
}

/// Incremental sync with default options.
pub fn index(conn: &mut Connection, corpus: &Path) -> SyncReport {
    sync_corpus(conn, corpus, &SyncOptions::default()).unwrap()
}

pub fn count(conn: &Connection, sql: &str) -> i64 {
    conn.query_row(sql, [], |row| row.get(0)).unwrap()
}
