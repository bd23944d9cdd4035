mod helpers;

use chrono::{Duration, Utc};
use helpers::{count, index, test_corpus, test_db, write_entry};
use palace::config::UsageConfig;
use palace::corpus::types::UsageSignal;
use palace::corpus::usage::{
    all_events, entry_usage, prune_events, record_access, record_signal, record_signal_at,
    stale_entries, top_entries, usage_scores,
};
use rusqlite::Connection;
use serde_json::json;
use tempfile::TempDir;

fn two_entries() -> (Connection, TempDir) {
    let mut conn = test_db();
    let corpus = test_corpus();
    write_entry(corpus.path(), "a.md", "# Alpha\n");
    write_entry(corpus.path(), "b.md", "# Beta\n");
    index(&mut conn, corpus.path());
    (conn, corpus)
}

#[test]
fn entry_without_events_is_neutral() {
    let (conn, _corpus) = two_entries();
    let usage = entry_usage(&conn, "a.md", &UsageConfig::default()).unwrap();
    assert_eq!(usage.raw_score, 0.0);
    assert_eq!(usage.score, 0.5);
    assert_eq!(usage.counts.total(), 0);
    assert!(usage.last_event_at.is_none());
}

#[test]
fn signals_fold_into_weighted_score() {
    let (conn, _corpus) = two_entries();
    let config = UsageConfig::default();

    record_signal(&conn, "a.md", UsageSignal::Helpful, None).unwrap();
    record_signal(&conn, "a.md", UsageSignal::Citation, None).unwrap();
    record_access(&conn, &["a.md", "a.md"]).unwrap();
    record_signal(&conn, "b.md", UsageSignal::Outdated, None).unwrap();

    let a = entry_usage(&conn, "a.md", &config).unwrap();
    assert_eq!(a.counts.helpful, 1);
    assert_eq!(a.counts.citation, 1);
    assert_eq!(a.counts.access, 2);
    assert!((a.raw_score - 1.7).abs() < 1e-9);
    assert!(a.score > 0.5);
    assert!(a.last_event_at.is_some());

    let b = entry_usage(&conn, "b.md", &config).unwrap();
    assert!((b.raw_score + 1.5).abs() < 1e-9);
    assert!(b.score < 0.5);
}

#[test]
fn weights_apply_retroactively() {
    let (conn, _corpus) = two_entries();
    record_signal(&conn, "a.md", UsageSignal::Unhelpful, None).unwrap();

    let default_score = entry_usage(&conn, "a.md", &UsageConfig::default()).unwrap().score;
    let lenient = UsageConfig {
        unhelpful_weight: 0.0,
        ..Default::default()
    };
    let lenient_score = entry_usage(&conn, "a.md", &lenient).unwrap().score;
    assert!(default_score < 0.5);
    assert_eq!(lenient_score, 0.5);
}

#[test]
fn batch_scores_default_unknown_ids_to_neutral() {
    let (conn, _corpus) = two_entries();
    record_signal(&conn, "a.md", UsageSignal::Helpful, None).unwrap();

    let scores = usage_scores(&conn, &["a.md", "b.md"], &UsageConfig::default()).unwrap();
    assert!(scores["a.md"] > 0.5);
    assert_eq!(scores["b.md"], 0.5);
}

#[test]
fn recording_for_unknown_entry_fails() {
    let (conn, _corpus) = two_entries();
    let err = record_signal(&conn, "ghost.md", UsageSignal::Helpful, None).unwrap_err();
    assert!(err.to_string().contains("entry not found"));
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM usage_events"), 0);
}

#[test]
fn context_is_stored_with_the_event() {
    let (conn, _corpus) = two_entries();
    let id = record_signal(&conn, "a.md", UsageSignal::Citation, Some(&json!({ "note": "used in PR" }))).unwrap();

    let events = all_events(&conn).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].id, id);
    assert_eq!(events[0].signal, UsageSignal::Citation);
    assert_eq!(events[0].context, Some(json!({ "note": "used in PR" })));
}

#[test]
fn top_entries_rank_by_score_and_skip_removed_entries() {
    let (conn, _corpus) = two_entries();
    record_signal(&conn, "a.md", UsageSignal::Citation, None).unwrap();
    record_signal(&conn, "b.md", UsageSignal::Helpful, None).unwrap();
    record_signal_at(&conn, "deleted.md", UsageSignal::Helpful, None, Utc::now()).unwrap();

    let top = top_entries(&conn, 10, &UsageConfig::default()).unwrap();
    let ids: Vec<&str> = top.iter().map(|u| u.entry_id.as_str()).collect();
    assert_eq!(ids, vec!["b.md", "a.md"]);

    let limited = top_entries(&conn, 1, &UsageConfig::default()).unwrap();
    assert_eq!(limited.len(), 1);
}

#[test]
fn stale_entries_include_never_used_and_long_unused() {
    let (conn, _corpus) = two_entries();
    let now = Utc::now();
    record_signal_at(&conn, "a.md", UsageSignal::Access, None, now - Duration::days(90)).unwrap();
    record_signal_at(&conn, "b.md", UsageSignal::Citation, None, now - Duration::days(5)).unwrap();

    let stale = stale_entries(&conn, 60, now).unwrap();
    assert_eq!(stale.len(), 1);
    assert_eq!(stale[0].entry_id, "a.md");
    assert!(stale[0].last_used_at.is_some());

    // Helpful feedback is not usage
    let conn2 = test_db();
    conn2
        .execute(
            "INSERT INTO entries (id, path, title, content_hash, indexed_at) \
             VALUES ('c.md', '/c.md', 'C', 'x', '2026-01-01T00:00:00.000000Z')",
            [],
        )
        .unwrap();
    record_signal_at(&conn2, "c.md", UsageSignal::Helpful, None, now).unwrap();
    let never = stale_entries(&conn2, 60, now).unwrap();
    assert_eq!(never.len(), 1);
    assert!(never[0].last_used_at.is_none());
}

#[test]
fn prune_removes_only_old_events() {
    let (conn, _corpus) = two_entries();
    let now = Utc::now();
    record_signal_at(&conn, "a.md", UsageSignal::Access, None, now - Duration::days(400)).unwrap();
    record_signal_at(&conn, "a.md", UsageSignal::Access, None, now - Duration::days(10)).unwrap();

    let removed = prune_events(&conn, 365, now).unwrap();
    assert_eq!(removed, 1);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM usage_events"), 1);
}

#[test]
fn huge_day_counts_keep_everything() {
    let (conn, _corpus) = two_entries();
    let now = Utc::now();
    record_signal_at(&conn, "a.md", UsageSignal::Access, None, now - Duration::days(400)).unwrap();
    record_signal_at(&conn, "b.md", UsageSignal::Access, None, now).unwrap();

    assert_eq!(prune_events(&conn, 100_000_000, now).unwrap(), 0);
    assert_eq!(prune_events(&conn, u64::MAX, now).unwrap(), 0);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM usage_events"), 2);

    // Any use at all counts as recent when the window is unbounded
    assert!(stale_entries(&conn, u64::MAX, now).unwrap().is_empty());
    assert!(stale_entries(&conn, 100_000_000, now).unwrap().is_empty());
}

#[test]
fn events_survive_entry_removal() {
    let (mut conn, corpus) = two_entries();
    record_signal(&conn, "a.md", UsageSignal::Helpful, None).unwrap();

    std::fs::remove_file(corpus.path().join("a.md")).unwrap();
    index(&mut conn, corpus.path());

    assert_eq!(count(&conn, "SELECT COUNT(*) FROM usage_events WHERE entry_id = 'a.md'"), 1);
    assert!(top_entries(&conn, 10, &UsageConfig::default()).unwrap().is_empty());
}
