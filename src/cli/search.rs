use anyhow::Result;
use chrono::Utc;

use palace::config::PalaceConfig;
use palace::corpus::decay::DecayModel;
use palace::corpus::keywords::entry_keywords;
use palace::corpus::lookup::{CacheLookup, LookupOptions, SearchMode};
use palace::corpus::queries::list_queries;
use palace::corpus::usage::entry_usage;

/// Run a corpus search from the terminal.
pub fn search(
    config: &PalaceConfig,
    query: &str,
    mode: SearchMode,
    limit: Option<usize>,
    include_expired: bool,
) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = palace::db::open_database(&db_path)?;

    let model = DecayModel::new(config.decay.clone());
    let lookup = CacheLookup::new(&conn, &model, &config.usage);

    let mut options = LookupOptions::from_config(&config.retrieval);
    options.mode = mode;
    options.include_expired = include_expired;
    if let Some(limit) = limit {
        options.max_results = limit;
    }

    let response = lookup.search(query, &options)?;

    if response.results.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    println!(
        "Found {} result(s), showing {}\n",
        response.total_matched,
        response.results.len()
    );

    for (i, result) in response.results.iter().enumerate() {
        println!(
            "  {}. {} [{}] (rank: {:.3}, relevance: {:.2}, {})",
            i + 1,
            result.entry_id,
            result.strength,
            result.rank,
            result.relevance,
            result.decay_status,
        );
        println!("     {}", result.title);
        if !result.matched_keywords.is_empty() {
            println!("     keywords: {}", result.matched_keywords.join(", "));
        }
        if let Some(ref q) = result.matched_query {
            println!("     answers:  {q}");
        }
        println!();
    }

    Ok(())
}

/// Display full details and the body of a single entry.
pub fn show(config: &PalaceConfig, id: &str) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = palace::db::open_database(&db_path)?;

    let model = DecayModel::new(config.decay.clone());
    let lookup = CacheLookup::new(&conn, &model, &config.usage);
    let content = lookup.get_entry(id)?;
    let e = &content.entry;

    let assessment = model.assess(e, Utc::now());
    let usage = entry_usage(&conn, id, &config.usage)?;

    println!("Entry: {}", e.id);
    println!("{}", "=".repeat(50));
    println!("  Title:          {}", e.title);
    println!("  Path:           {}", e.path);
    println!("  Maturity:       {}", e.maturity);
    if !e.tags.is_empty() {
        println!("  Tags:           {}", e.tags.join(", "));
    }
    if let Some(ref at) = e.created_at {
        println!("  Created:        {at}");
    }
    if let Some(ref at) = e.updated_at {
        println!("  Updated:        {at}");
    }
    if let Some(at) = DecayModel::reference_time(e) {
        println!("  Last checked:   {at}");
    }
    println!(
        "  Freshness:      {:.2} ({})",
        assessment.factor, assessment.status
    );
    println!(
        "  Usage score:    {:.2} ({} events)",
        usage.score,
        usage.counts.total()
    );

    let keywords = entry_keywords(&conn, id)?;
    if !keywords.is_empty() {
        println!();
        println!("Keywords: {}", keywords.join(", "));
    }

    let templates = list_queries(&conn, id)?;
    if !templates.is_empty() {
        println!();
        println!("Answers:");
        for t in &templates {
            println!("  - {} ({})", t.query, t.source.as_str());
        }
    }

    println!();
    println!("{}", content.body.trim());
    Ok(())
}
