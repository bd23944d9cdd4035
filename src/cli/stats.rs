use anyhow::Result;
use chrono::Utc;

use palace::config::PalaceConfig;
use palace::corpus::decay::DecayModel;
use palace::corpus::stats::corpus_stats;

/// Display corpus statistics in the terminal.
pub fn stats(config: &PalaceConfig) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = palace::db::open_database(&db_path)?;

    let model = DecayModel::new(config.decay.clone());
    let stats = corpus_stats(&conn, Utc::now(), &model)?;

    let db_size_bytes = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

    println!("Corpus Statistics");
    println!("{}", "=".repeat(40));
    println!("  Entries:             {}", stats.total_entries);
    println!("  Keywords:            {}", stats.total_keywords);
    println!(
        "  Query templates:     {} ({} learned)",
        stats.total_queries, stats.learned_queries
    );
    println!("  Usage events:        {}", stats.total_events);
    println!();

    println!("By Maturity:");
    for (maturity, count) in &stats.by_maturity {
        println!("  {:<12} {}", maturity, count);
    }
    println!();

    println!("By Freshness:");
    for (status, count) in &stats.by_status {
        println!("  {:<12} {}", status, count);
    }
    println!();

    println!("By Signal:");
    for (signal, count) in &stats.by_signal {
        println!("  {:<12} {}", signal, count);
    }
    println!();

    println!("Database size:         {} bytes", db_size_bytes);
    if let Some(ref oldest) = stats.oldest_indexed {
        println!("Oldest index write:    {oldest}");
    }
    if let Some(ref newest) = stats.newest_indexed {
        println!("Newest index write:    {newest}");
    }

    Ok(())
}
