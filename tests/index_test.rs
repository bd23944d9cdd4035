mod helpers;

use helpers::{count, days_ago, entry_doc, index, test_corpus, test_db, write_entry};
use palace::corpus::decay::validate_entry;
use palace::corpus::entries::fetch_entry;
use palace::corpus::index::{sync_corpus, SyncOptions};
use palace::corpus::keywords::{entry_keywords, EXTRACTOR_VERSION};
use palace::corpus::queries::{add_queries, list_queries, QuerySource};
use palace::corpus::types::Maturity;
use palace::db::migrations::{get_extractor_version, set_extractor_version};

fn retry_doc() -> String {
    entry_doc(
        "Retry with backoff",
        "growing",
        &days_ago(3),
        &["networking", "error handling"],
        &["how do I retry failed requests"],
        "Use exponential backoff with jitter when retrying idempotent requests.\n",
    )
}

#[test]
fn first_sync_indexes_every_markdown_file() {
    let mut conn = test_db();
    let corpus = test_corpus();
    write_entry(corpus.path(), "patterns/retry.md", &retry_doc());
    write_entry(corpus.path(), "notes/plain.md", "# Plain note\n\nNo frontmatter here.\n");
    write_entry(corpus.path(), "notes/ignored.txt", "not markdown");

    let report = index(&mut conn, corpus.path());
    assert_eq!(report.files_indexed, 2);
    assert_eq!(report.files_unchanged, 0);
    assert_eq!(report.errors, 0);

    let entry = fetch_entry(&conn, "patterns/retry.md").unwrap().unwrap();
    assert_eq!(entry.title, "Retry with backoff");
    assert_eq!(entry.maturity, Maturity::Growing);
    assert_eq!(entry.tags, vec!["networking", "error handling"]);
    assert!(entry.created_at.is_some());

    let plain = fetch_entry(&conn, "notes/plain.md").unwrap().unwrap();
    assert_eq!(plain.title, "Plain note", "title falls back to first heading");
    assert_eq!(plain.maturity, Maturity::Seedling);
}

#[test]
fn keywords_come_from_tags_title_and_body() {
    let mut conn = test_db();
    let corpus = test_corpus();
    write_entry(corpus.path(), "retry.md", &retry_doc());
    index(&mut conn, corpus.path());

    let keywords = entry_keywords(&conn, "retry.md").unwrap();
    for expected in ["networking", "error-handling", "error", "handling", "retry", "backoff", "jitter"] {
        assert!(keywords.contains(&expected.to_string()), "missing keyword {expected}: {keywords:?}");
    }
    assert!(!keywords.contains(&"with".to_string()), "stopwords are not indexed");

    let tag_source: String = conn
        .query_row(
            "SELECT source FROM entry_keywords WHERE entry_id = 'retry.md' AND keyword = 'networking'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(tag_source, "tag");
}

#[test]
fn unchanged_files_are_skipped() {
    let mut conn = test_db();
    let corpus = test_corpus();
    write_entry(corpus.path(), "retry.md", &retry_doc());

    index(&mut conn, corpus.path());
    let report = index(&mut conn, corpus.path());
    assert_eq!(report.files_indexed, 0);
    assert_eq!(report.files_unchanged, 1);
}

#[test]
fn full_sync_reindexes_unchanged_files() {
    let mut conn = test_db();
    let corpus = test_corpus();
    write_entry(corpus.path(), "retry.md", &retry_doc());
    index(&mut conn, corpus.path());

    let options = SyncOptions {
        full: true,
        ..Default::default()
    };
    let report = sync_corpus(&mut conn, corpus.path(), &options).unwrap();
    assert_eq!(report.files_indexed, 1);
    assert_eq!(report.files_unchanged, 0);
}

#[test]
fn changed_file_replaces_keywords_and_frontmatter_queries() {
    let mut conn = test_db();
    let corpus = test_corpus();
    write_entry(corpus.path(), "retry.md", &retry_doc());
    index(&mut conn, corpus.path());

    let updated = entry_doc(
        "Circuit breakers",
        "growing",
        &days_ago(1),
        &[],
        &["when should a circuit breaker open"],
        "Trip the breaker after consecutive failures.\n",
    );
    write_entry(corpus.path(), "retry.md", &updated);
    let report = index(&mut conn, corpus.path());
    assert_eq!(report.files_indexed, 1);

    let keywords = entry_keywords(&conn, "retry.md").unwrap();
    assert!(keywords.contains(&"circuit".to_string()));
    assert!(!keywords.contains(&"jitter".to_string()), "old body keywords are replaced");

    let templates = list_queries(&conn, "retry.md").unwrap();
    assert_eq!(templates.len(), 1);
    assert_eq!(templates[0].query, "when should a circuit breaker open");
}

#[test]
fn learned_queries_and_validation_survive_reindex() {
    let mut conn = test_db();
    let corpus = test_corpus();
    write_entry(corpus.path(), "retry.md", &retry_doc());
    index(&mut conn, corpus.path());

    add_queries(&mut conn, "retry.md", &["what is jitter".to_string()]).unwrap();
    validate_entry(&conn, "retry.md", chrono::Utc::now()).unwrap();

    write_entry(corpus.path(), "retry.md", &format!("{}\nMore detail.\n", retry_doc()));
    let report = index(&mut conn, corpus.path());
    assert_eq!(report.files_indexed, 1);

    let templates = list_queries(&conn, "retry.md").unwrap();
    assert_eq!(templates.len(), 2);
    assert!(templates
        .iter()
        .any(|t| t.query == "what is jitter" && t.source == QuerySource::Learned));

    let entry = fetch_entry(&conn, "retry.md").unwrap().unwrap();
    assert!(entry.validated_at.is_some(), "validated_at must survive reindexing");
}

#[test]
fn removed_files_are_deleted_with_their_index_rows() {
    let mut conn = test_db();
    let corpus = test_corpus();
    write_entry(corpus.path(), "retry.md", &retry_doc());
    write_entry(corpus.path(), "keep.md", "# Keep\n\nStill here.\n");
    index(&mut conn, corpus.path());

    std::fs::remove_file(corpus.path().join("retry.md")).unwrap();
    let report = index(&mut conn, corpus.path());
    assert_eq!(report.files_removed, 1);

    assert!(fetch_entry(&conn, "retry.md").unwrap().is_none());
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM entry_keywords WHERE entry_id = 'retry.md'"), 0);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM entry_queries WHERE entry_id = 'retry.md'"), 0);
    assert!(fetch_entry(&conn, "keep.md").unwrap().is_some());
}

#[test]
fn malformed_entries_are_counted_and_skipped() {
    let mut conn = test_db();
    let corpus = test_corpus();
    write_entry(corpus.path(), "good.md", &retry_doc());
    write_entry(corpus.path(), "bad-yaml.md", "---\ntitle: [unclosed\n---\nbody\n");
    write_entry(corpus.path(), "bad-maturity.md", "---\nmaturity: ancient\n---\nbody\n");
    write_entry(corpus.path(), "unterminated.md", "---\ntitle: nope\nbody\n");

    let report = index(&mut conn, corpus.path());
    assert_eq!(report.files_indexed, 1);
    assert_eq!(report.errors, 3);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM entries"), 1);
}

#[test]
fn missing_corpus_dir_is_an_error() {
    let mut conn = test_db();
    let corpus = test_corpus();
    let err = sync_corpus(&mut conn, &corpus.path().join("nope"), &SyncOptions::default()).unwrap_err();
    assert!(err.to_string().contains("corpus directory not found"));
}

#[test]
fn stale_extractor_version_forces_full_rebuild() {
    let mut conn = test_db();
    let corpus = test_corpus();
    write_entry(corpus.path(), "retry.md", &retry_doc());
    index(&mut conn, corpus.path());

    set_extractor_version(&conn, EXTRACTOR_VERSION + 1).unwrap();
    let report = index(&mut conn, corpus.path());
    assert_eq!(report.files_indexed, 1, "hash match must not skip a stale index");
    assert_eq!(get_extractor_version(&conn).unwrap(), Some(EXTRACTOR_VERSION));
}

#[test]
fn rebuild_with_errors_leaves_extractor_version_stale() {
    let mut conn = test_db();
    let corpus = test_corpus();
    write_entry(corpus.path(), "retry.md", &retry_doc());
    write_entry(corpus.path(), "broken.md", "---\ntitle: [unclosed\n---\nbody\n");
    index(&mut conn, corpus.path());

    set_extractor_version(&conn, EXTRACTOR_VERSION + 1).unwrap();
    let report = index(&mut conn, corpus.path());
    assert_eq!(report.files_indexed, 1);
    assert_eq!(report.errors, 1);
    assert_eq!(get_extractor_version(&conn).unwrap(), Some(EXTRACTOR_VERSION + 1));

    // Fixing the file completes the rebuild
    write_entry(corpus.path(), "broken.md", "# Fixed\n");
    let report = index(&mut conn, corpus.path());
    assert_eq!(report.errors, 0);
    assert_eq!(report.files_indexed, 2, "still a full rebuild until it succeeds");
    assert_eq!(get_extractor_version(&conn).unwrap(), Some(EXTRACTOR_VERSION));
}
