//! CLI commands that feed information back into the corpus:
//! `validate`, `signal`, and `learn`.

use anyhow::Result;
use chrono::Utc;
use serde_json::json;

use palace::config::PalaceConfig;
use palace::corpus::decay::validate_entry;
use palace::corpus::queries::add_queries;
use palace::corpus::types::UsageSignal;
use palace::corpus::usage::record_signal;

pub fn validate(config: &PalaceConfig, id: &str) -> Result<()> {
    let conn = palace::db::open_database(config.resolved_db_path())?;
    validate_entry(&conn, id, Utc::now())?;
    println!("Marked {id} as validated.");
    Ok(())
}

pub fn signal(config: &PalaceConfig, id: &str, signal: UsageSignal, note: Option<&str>) -> Result<()> {
    let conn = palace::db::open_database(config.resolved_db_path())?;
    let context = note.map(|n| json!({ "note": n }));
    let event_id = record_signal(&conn, id, signal, context.as_ref())?;
    println!("Recorded {signal} for {id} ({event_id}).");
    Ok(())
}

pub fn learn(config: &PalaceConfig, id: &str, queries: &[String]) -> Result<()> {
    let mut conn = palace::db::open_database(config.resolved_db_path())?;
    let added = add_queries(&mut conn, id, queries)?;
    let skipped = queries.len() - added;
    if skipped > 0 {
        println!("Added {added} question(s) to {id}; {skipped} already known.");
    } else {
        println!("Added {added} question(s) to {id}.");
    }
    Ok(())
}
