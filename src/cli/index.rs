//! CLI `index` command: sync the corpus directory into the database.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use palace::config::PalaceConfig;
use palace::corpus::index::{sync_corpus_with_progress, SyncOptions};
use palace::db;

/// Index new and changed corpus files, removing entries whose files are gone.
pub fn index(config: &PalaceConfig, full: bool) -> Result<()> {
    let db_path = config.resolved_db_path();
    let corpus_dir = config.resolved_corpus_dir();
    let mut conn = db::open_database(&db_path).context("failed to open database")?;

    let options = SyncOptions {
        full,
        max_body_keywords: config.retrieval.max_body_keywords,
    };

    println!(
        "{} {}...",
        if full { "Rebuilding index for" } else { "Indexing" },
        corpus_dir.display()
    );

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  {bar:40.cyan/blue} {pos}/{len} ({eta})")?
            .progress_chars("##-"),
    );

    let report = sync_corpus_with_progress(&mut conn, &corpus_dir, &options, |done, total| {
        pb.set_length(total as u64);
        pb.set_position(done as u64);
    })?;

    pb.finish_and_clear();

    println!("  Indexed:    {}", report.files_indexed);
    println!("  Unchanged:  {}", report.files_unchanged);
    println!("  Removed:    {}", report.files_removed);
    if report.errors > 0 {
        println!("  Errors:     {} (see log for details)", report.errors);
    }
    Ok(())
}
