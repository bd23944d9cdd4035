//! CLI maintenance commands: `attention`, `top`, `stale`, and `prune`.

use anyhow::Result;
use chrono::Utc;

use palace::config::PalaceConfig;
use palace::corpus::decay::DecayModel;
use palace::corpus::usage;

/// List entries that have decayed past fresh, most decayed first.
pub fn attention(config: &PalaceConfig) -> Result<()> {
    let conn = palace::db::open_database(config.resolved_db_path())?;
    let model = DecayModel::new(config.decay.clone());

    let assessments = model.entries_needing_attention(&conn, Utc::now())?;
    if assessments.is_empty() {
        println!("All entries are fresh.");
        return Ok(());
    }

    println!(
        "{:<40} {:<10} {:<9} {:<8} {}",
        "ID", "Maturity", "Status", "Factor", "Age (days)"
    );
    println!("{}", "-".repeat(80));
    for a in &assessments {
        let age = a
            .age_days
            .map(|d| format!("{d:.0}"))
            .unwrap_or_else(|| "-".into());
        let marker = if DecayModel::needs_revalidation(a) { " *" } else { "" };
        println!(
            "{:<40} {:<10} {:<9} {:<8.3} {}{}",
            a.entry_id, a.maturity, a.status, a.factor, age, marker
        );
    }
    println!();
    println!("* needs revalidation: review the entry, then run `palace validate <id>`");
    Ok(())
}

/// Entries ranked by usage score.
pub fn top(config: &PalaceConfig, limit: usize) -> Result<()> {
    let conn = palace::db::open_database(config.resolved_db_path())?;
    let entries = usage::top_entries(&conn, limit, &config.usage)?;

    if entries.is_empty() {
        println!("No usage recorded yet.");
        return Ok(());
    }

    println!(
        "{:<40} {:<7} {:<7} {:<7} {}",
        "ID", "Score", "Access", "Cited", "Helpful/Unhelpful/Outdated"
    );
    println!("{}", "-".repeat(90));
    for u in &entries {
        println!(
            "{:<40} {:<7.3} {:<7} {:<7} {}/{}/{}",
            u.entry_id,
            u.score,
            u.counts.access,
            u.counts.citation,
            u.counts.helpful,
            u.counts.unhelpful,
            u.counts.outdated,
        );
    }
    Ok(())
}

/// Entries with no access or citation in the last `days` (default `usage.stale_days`).
pub fn stale(config: &PalaceConfig, days: Option<u64>) -> Result<()> {
    let conn = palace::db::open_database(config.resolved_db_path())?;
    let days = days.unwrap_or(config.usage.stale_days);

    let stale = usage::stale_entries(&conn, days, Utc::now())?;
    if stale.is_empty() {
        println!("Every entry was used in the last {days} days.");
        return Ok(());
    }

    println!("{} entr(ies) unused in the last {days} days:\n", stale.len());
    for s in &stale {
        match s.last_used_at {
            Some(ref at) => println!("  {:<40} last used {at}", s.entry_id),
            None => println!("  {:<40} never used", s.entry_id),
        }
    }
    Ok(())
}

/// Delete usage events older than `days`.
pub fn prune(config: &PalaceConfig, days: u64) -> Result<()> {
    let conn = palace::db::open_database(config.resolved_db_path())?;
    let removed = usage::prune_events(&conn, days, Utc::now())?;
    println!("Pruned {removed} usage event(s) older than {days} days.");
    Ok(())
}
