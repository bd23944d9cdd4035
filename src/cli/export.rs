use anyhow::Result;
use serde::Serialize;

use palace::config::PalaceConfig;
use palace::corpus::entries::all_entries;
use palace::corpus::queries::{list_queries, QueryTemplate};
use palace::corpus::types::Entry;
use palace::corpus::usage::{all_events, UsageEvent};

#[derive(Debug, Serialize)]
struct ExportedEntry {
    #[serde(flatten)]
    entry: Entry,
    queries: Vec<QueryTemplate>,
}

/// Export format: every indexed entry with its templates, plus the event log.
#[derive(Debug, Serialize)]
struct ExportData {
    entries: Vec<ExportedEntry>,
    events: Vec<UsageEvent>,
}

/// Export the index and usage history as JSON to stdout.
pub fn export(config: &PalaceConfig) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = palace::db::open_database(&db_path)?;

    let entries = all_entries(&conn)?
        .into_iter()
        .map(|entry| -> Result<ExportedEntry> {
            let queries = list_queries(&conn, &entry.id)?;
            Ok(ExportedEntry { entry, queries })
        })
        .collect::<Result<Vec<_>>>()?;
    let events = all_events(&conn)?;

    let data = ExportData { entries, events };

    let json = serde_json::to_string_pretty(&data)?;
    println!("{json}");

    eprintln!(
        "Exported {} entries and {} usage events.",
        data.entries.len(),
        data.events.len()
    );

    Ok(())
}
