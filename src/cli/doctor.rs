//! CLI `doctor` command: run database diagnostics and print a health report.

use anyhow::{Context, Result};

use palace::config::PalaceConfig;
use palace::corpus::keywords::EXTRACTOR_VERSION;
use palace::db;

/// Run database diagnostics and print a health report.
pub fn doctor(config: &PalaceConfig) -> Result<()> {
    let db_path = config.resolved_db_path();
    let corpus_dir = config.resolved_corpus_dir();

    if !db_path.exists() {
        println!("Database: not found at {}", db_path.display());
        println!("Run `palace index` to initialize.");
        return Ok(());
    }

    let file_size = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

    let conn = db::open_database(&db_path).context("failed to open database (may be corrupt)")?;

    let report = db::check_database_health(&conn).context("failed to run health check")?;

    println!("Palace Health Report");
    println!("====================");
    println!();
    println!("Database:          {}", db_path.display());
    println!("File size:         {}", format_bytes(file_size));
    println!("Schema version:    {}", report.schema_version);
    println!(
        "Corpus:            {}{}",
        corpus_dir.display(),
        if corpus_dir.is_dir() { "" } else { " (missing)" }
    );
    println!();
    println!("Keyword extractor:");
    match report.extractor_version {
        Some(v) => println!("  Stored:          v{v}"),
        None => println!("  Stored:          (not set)"),
    }
    println!("  Current:         v{EXTRACTOR_VERSION}");
    if report.extractor_current() {
        println!("  Status:          OK (match)");
    } else {
        println!("  WARNING: keyword index is stale! Run `palace index --full` to rebuild.");
    }
    println!();
    println!("Row counts:");
    println!("  Entries:         {}", report.entry_count);
    println!("  Keywords:        {}", report.keyword_count);
    println!("  Query templates: {}", report.query_count);
    println!("  Usage events:    {}", report.event_count);
    println!();
    if report.integrity_ok {
        println!("Integrity check:   PASSED");
    } else {
        println!("Integrity check:   FAILED ({})", report.integrity_details);
        println!();
        println!("Recovery steps:");
        println!("  1. Save usage history: palace export > backup.json");
        println!("  2. Delete {} and run `palace index --full`", db_path.display());
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
