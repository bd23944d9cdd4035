mod helpers;

use chrono::{Duration, Utc};
use helpers::{days_ago, entry_doc, index, test_corpus, test_db, write_entry};
use palace::config::{DecayConfig, TierPolicy};
use palace::corpus::decay::{validate_entry, DecayModel};
use palace::corpus::entries::fetch_entry;
use palace::corpus::types::{DecayCurve, DecayStatus};

#[test]
fn attention_lists_non_fresh_entries_most_decayed_first() {
    let mut conn = test_db();
    let corpus = test_corpus();
    write_entry(corpus.path(), "fresh.md", &entry_doc("Fresh", "seedling", &days_ago(1), &[], &[], ""));
    write_entry(corpus.path(), "stale.md", &entry_doc("Stale", "seedling", &days_ago(20), &[], &[], ""));
    write_entry(corpus.path(), "expired.md", &entry_doc("Expired", "seedling", &days_ago(150), &[], &[], ""));
    write_entry(corpus.path(), "undated.md", "# Undated\n\nNo timestamps at all.\n");
    index(&mut conn, corpus.path());

    let model = DecayModel::default();
    let attention = model.entries_needing_attention(&conn, Utc::now()).unwrap();
    let ids: Vec<&str> = attention.iter().map(|a| a.entry_id.as_str()).collect();
    assert_eq!(ids, vec!["expired.md", "stale.md"]);
    assert_eq!(attention[0].status, DecayStatus::Expired);
    assert!(DecayModel::needs_revalidation(&attention[0]));
    assert!(!DecayModel::needs_revalidation(&attention[1]));
}

#[test]
fn validation_makes_an_entry_fresh_again() {
    let mut conn = test_db();
    let corpus = test_corpus();
    write_entry(corpus.path(), "old.md", &entry_doc("Old", "seedling", &days_ago(150), &[], &[], ""));
    index(&mut conn, corpus.path());

    let model = DecayModel::default();
    let now = Utc::now();
    let before = model.assess(&fetch_entry(&conn, "old.md").unwrap().unwrap(), now);
    assert_eq!(before.status, DecayStatus::Expired);

    validate_entry(&conn, "old.md", now).unwrap();
    let after = model.assess(&fetch_entry(&conn, "old.md").unwrap().unwrap(), now);
    assert_eq!(after.status, DecayStatus::Fresh);
    assert_eq!(after.factor, 1.0);

    assert!(model.entries_needing_attention(&conn, now).unwrap().is_empty());
}

#[test]
fn validating_unknown_entry_fails() {
    let conn = test_db();
    let err = validate_entry(&conn, "nope.md", Utc::now()).unwrap_err();
    assert!(err.to_string().contains("entry not found"));
}

#[test]
fn frontmatter_last_validated_resets_the_clock() {
    let mut conn = test_db();
    let corpus = test_corpus();
    let doc = format!(
        "---\ntitle: Checked\nmaturity: seedling\ncreated: {}\nlast_validated: {}\n---\nbody\n",
        days_ago(300),
        days_ago(2)
    );
    write_entry(corpus.path(), "checked.md", &doc);
    index(&mut conn, corpus.path());

    let entry = fetch_entry(&conn, "checked.md").unwrap().unwrap();
    let assessment = DecayModel::default().assess(&entry, Utc::now());
    assert_eq!(assessment.status, DecayStatus::Fresh);
    assert!(assessment.age_days.unwrap() < 3.0);
}

#[test]
fn tier_policies_are_configurable() {
    let mut conn = test_db();
    let corpus = test_corpus();
    write_entry(corpus.path(), "e.md", &entry_doc("E", "evergreen", &days_ago(100), &[], &[], ""));
    index(&mut conn, corpus.path());
    let entry = fetch_entry(&conn, "e.md").unwrap().unwrap();

    let now = Utc::now();
    assert_eq!(DecayModel::default().assess(&entry, now).status, DecayStatus::Fresh);

    let config = DecayConfig {
        evergreen: TierPolicy {
            curve: DecayCurve::Linear,
            half_life_days: 30.0,
        },
        ..Default::default()
    };
    let strict = DecayModel::new(config);
    let assessment = strict.assess(&entry, now);
    assert_eq!(assessment.factor, 0.0);
    assert_eq!(assessment.status, DecayStatus::Expired);

    // Still fresh well inside the half-life
    let young = strict.assess(&entry, entry.created_at.unwrap() + Duration::days(5));
    assert_eq!(young.status, DecayStatus::Fresh);
}
