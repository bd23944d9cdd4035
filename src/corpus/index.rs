//! Write path: walk the corpus, detect changed files, and rebuild their
//! index rows.
//!
//! [`sync_corpus`] is the single entry point. Each changed file is parsed and
//! written inside its own transaction: upsert the `entries` row, replace its
//! keywords, and replace its frontmatter query templates. Learned templates
//! and `validated_at` are left alone. Files that fail to read or parse are
//! logged and skipped.

use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::frontmatter::{parse_entry, ParsedEntry};
use super::keywords::{extract_keywords, EXTRACTOR_VERSION};
use super::queries::{insert_template, QuerySource};
use super::types::format_timestamp;
use crate::db::migrations::{get_extractor_version, set_extractor_version};

/// Knobs for [`sync_corpus`].
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Reindex every file even when its content hash is unchanged.
    pub full: bool,
    pub max_body_keywords: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            full: false,
            max_body_keywords: 20,
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct SyncReport {
    pub files_indexed: usize,
    pub files_unchanged: usize,
    pub files_removed: usize,
    pub errors: usize,
}

/// List every markdown file under `corpus_dir`, skipping hidden files and
/// directories. Sorted for deterministic indexing order.
pub fn discover_entries(corpus_dir: &Path) -> Result<Vec<PathBuf>> {
    if !corpus_dir.is_dir() {
        bail!("corpus directory not found: {}", corpus_dir.display());
    }

    let mut files: Vec<PathBuf> = WalkDir::new(corpus_dir)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "skipping unreadable corpus path");
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            matches!(
                p.extension().and_then(|e| e.to_str()),
                Some("md") | Some("markdown")
            )
        })
        .collect();

    files.sort();
    Ok(files)
}

/// Stable entry id: the path relative to the corpus root, `/`-separated.
pub fn entry_id_for(corpus_dir: &Path, path: &Path) -> Result<String> {
    let rel = path
        .strip_prefix(corpus_dir)
        .with_context(|| format!("{} is outside the corpus", path.display()))?;
    Ok(rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/"))
}

fn sha256_hex(data: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Synchronize the index with the corpus on disk.
pub fn sync_corpus(conn: &mut Connection, corpus_dir: &Path, options: &SyncOptions) -> Result<SyncReport> {
    sync_corpus_with_progress(conn, corpus_dir, options, |_, _| {})
}

/// [`sync_corpus`] with a `(done, total)` callback after each file.
pub fn sync_corpus_with_progress(
    conn: &mut Connection,
    corpus_dir: &Path,
    options: &SyncOptions,
    mut progress: impl FnMut(usize, usize),
) -> Result<SyncReport> {
    let files = discover_entries(corpus_dir)?;
    let total = files.len();

    let stored_version = get_extractor_version(conn)?;
    let full = options.full || stored_version != Some(EXTRACTOR_VERSION);
    if full && !options.full {
        info!(
            stored = ?stored_version,
            current = EXTRACTOR_VERSION,
            "keyword extractor changed, rebuilding full index"
        );
    }

    let mut report = SyncReport::default();
    let mut discovered: HashSet<String> = HashSet::with_capacity(total);

    for (done, path) in files.iter().enumerate() {
        let id = entry_id_for(corpus_dir, path)?;
        discovered.insert(id.clone());

        match sync_file(conn, path, &id, full, options.max_body_keywords) {
            Ok(true) => report.files_indexed += 1,
            Ok(false) => report.files_unchanged += 1,
            Err(e) => {
                warn!(entry = %id, error = %e, "failed to index corpus entry");
                report.errors += 1;
            }
        }
        progress(done + 1, total);
    }

    // Remove entries whose files are gone
    let existing: Vec<String> = {
        let mut stmt = conn.prepare("SELECT id FROM entries")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        ids
    };
    for id in existing {
        if !discovered.contains(&id) {
            debug!(entry = %id, "removing entry no longer on disk");
            conn.execute("DELETE FROM entries WHERE id = ?1", params![id])?;
            report.files_removed += 1;
        }
    }

    // A rebuild only counts once every file made it in
    if full && report.errors == 0 {
        set_extractor_version(conn, EXTRACTOR_VERSION)?;
    } else if full {
        warn!(
            errors = report.errors,
            stored = ?stored_version,
            "rebuild incomplete, extractor version left unchanged"
        );
    }

    info!(
        indexed = report.files_indexed,
        unchanged = report.files_unchanged,
        removed = report.files_removed,
        errors = report.errors,
        "corpus sync complete"
    );
    Ok(report)
}

/// Index a single file. Returns `true` if index rows were written.
fn sync_file(
    conn: &mut Connection,
    path: &Path,
    id: &str,
    full: bool,
    max_body_keywords: usize,
) -> Result<bool> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let hash = sha256_hex(&content);

    if !full {
        let existing: Option<String> = match conn.query_row(
            "SELECT content_hash FROM entries WHERE id = ?1",
            params![id],
            |row| row.get(0),
        ) {
            Ok(h) => Some(h),
            Err(rusqlite::Error::QueryReturnedNoRows) => None,
            Err(e) => return Err(e.into()),
        };
        if existing.as_deref() == Some(hash.as_str()) {
            return Ok(false);
        }
    }

    let parsed = parse_entry(&content)?;
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| id.to_string());
    write_entry(conn, id, path, &parsed, &stem, &hash, max_body_keywords)?;
    Ok(true)
}

fn write_entry(
    conn: &mut Connection,
    id: &str,
    path: &Path,
    parsed: &ParsedEntry,
    stem: &str,
    hash: &str,
    max_body_keywords: usize,
) -> Result<()> {
    let now = format_timestamp(chrono::Utc::now());
    let title = parsed.resolved_title(stem);
    let keywords = extract_keywords(parsed, &title, max_body_keywords);

    let tx = conn.transaction()?;

    tx.execute(
        "INSERT INTO entries (id, path, title, maturity, tags, created_at, updated_at, \
         last_validated, content_hash, indexed_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10) \
         ON CONFLICT(id) DO UPDATE SET path = excluded.path, title = excluded.title, \
         maturity = excluded.maturity, tags = excluded.tags, created_at = excluded.created_at, \
         updated_at = excluded.updated_at, last_validated = excluded.last_validated, \
         content_hash = excluded.content_hash, indexed_at = excluded.indexed_at",
        params![
            id,
            path.to_string_lossy(),
            title,
            parsed.maturity.as_str(),
            serde_json::to_string(&parsed.tags)?,
            parsed.created.map(format_timestamp),
            parsed.updated.map(format_timestamp),
            parsed.last_validated.map(format_timestamp),
            hash,
            now,
        ],
    )?;

    tx.execute("DELETE FROM entry_keywords WHERE entry_id = ?1", params![id])?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO entry_keywords (entry_id, keyword, source) VALUES (?1, ?2, ?3)",
        )?;
        for (keyword, source) in &keywords {
            stmt.execute(params![id, keyword, source.as_str()])?;
        }
    }

    tx.execute(
        "DELETE FROM entry_queries WHERE entry_id = ?1 AND source = 'frontmatter'",
        params![id],
    )?;
    for query in &parsed.queries {
        insert_template(&tx, id, query, QuerySource::Frontmatter, &now)?;
    }

    tx.commit()?;

    debug!(entry = id, keywords = keywords.len(), queries = parsed.queries.len(), "indexed entry");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn entry_id_is_relative_and_slash_separated() {
        let root = Path::new("/corpus");
        let path = root.join("patterns").join("retry.md");
        assert_eq!(entry_id_for(root, &path).unwrap(), "patterns/retry.md");
    }

    #[test]
    fn discover_skips_hidden_and_non_markdown() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join(".git")).unwrap();
        fs::create_dir_all(tmp.path().join("nested")).unwrap();
        fs::write(tmp.path().join("a.md"), "a").unwrap();
        fs::write(tmp.path().join("nested/b.markdown"), "b").unwrap();
        fs::write(tmp.path().join("notes.txt"), "c").unwrap();
        fs::write(tmp.path().join(".hidden.md"), "d").unwrap();
        fs::write(tmp.path().join(".git/HEAD.md"), "e").unwrap();

        let files = discover_entries(tmp.path()).unwrap();
        let ids: Vec<String> = files
            .iter()
            .map(|p| entry_id_for(tmp.path(), p).unwrap())
            .collect();
        assert_eq!(ids, vec!["a.md", "nested/b.markdown"]);
    }

    #[test]
    fn discover_missing_dir_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let err = discover_entries(&tmp.path().join("missing")).unwrap_err();
        assert!(err.to_string().contains("corpus directory not found"));
    }

    #[test]
    fn sha256_is_hex() {
        let h = sha256_hex("abc");
        assert_eq!(h.len(), 64);
        assert!(h.starts_with("ba7816bf"));
    }
}
