//! CLI `reset` command: delete all indexed data and usage history.

use anyhow::{bail, Result};
use std::io::Write;

use palace::config::PalaceConfig;

/// Clear every table. Prompts for confirmation unless `yes` is set.
pub fn reset(config: &PalaceConfig, yes: bool) -> Result<()> {
    let db_path = config.resolved_db_path();

    if !yes {
        println!("WARNING: This will permanently delete the index, learned questions, and usage history.");
        println!("Corpus files on disk are not touched.");
        println!("Database: {}", db_path.display());
        print!("\nType YES to confirm: ");
        std::io::stdout().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if input.trim() != "YES" {
            bail!("reset cancelled");
        }
    }

    let conn = palace::db::open_database(&db_path)?;

    // Extractor version goes too so the next index is a full rebuild
    conn.execute_batch(
        "DELETE FROM usage_events;
         DELETE FROM entry_queries;
         DELETE FROM entry_keywords;
         DELETE FROM entries;
         DELETE FROM schema_meta WHERE key = 'extractor_version';",
    )?;

    println!("Index and usage history deleted. Run `palace index` to rebuild.");
    Ok(())
}
