mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use palace::config::PalaceConfig;
use palace::corpus::lookup::SearchMode;
use palace::corpus::types::UsageSignal;

#[derive(Parser)]
#[command(name = "palace", version, about = "Decay-aware retrieval over a markdown knowledge corpus")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Index the corpus directory (incremental unless --full)
    Index {
        /// Reindex every file, ignoring content hashes
        #[arg(long)]
        full: bool,
    },
    /// Search the corpus
    Search {
        query: String,
        /// keywords, queries, or unified
        #[arg(long, default_value = "unified")]
        mode: SearchMode,
        /// Maximum results (defaults to retrieval.max_results)
        #[arg(long)]
        limit: Option<usize>,
        /// Include entries whose freshness has expired
        #[arg(long)]
        include_expired: bool,
    },
    /// Show an entry's metadata, freshness, usage and body
    Show { id: String },
    /// Mark an entry as re-checked now
    Validate { id: String },
    /// Record a usage signal (access, citation, helpful, unhelpful, outdated)
    Signal {
        id: String,
        signal: UsageSignal,
        /// Free-text note stored with the event
        #[arg(long)]
        note: Option<String>,
    },
    /// Teach an entry new questions it answers
    Learn {
        id: String,
        #[arg(required = true)]
        queries: Vec<String>,
    },
    /// List entries that are no longer fresh
    Attention,
    /// Most useful entries by usage score
    Top {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Entries not accessed or cited recently
    Stale {
        /// Defaults to usage.stale_days
        #[arg(long)]
        days: Option<u64>,
    },
    /// Corpus statistics
    Stats,
    /// Delete usage events older than the given age
    Prune {
        #[arg(long)]
        days: u64,
    },
    /// Export entries, query templates and usage events as JSON
    Export,
    /// Run database diagnostics
    Doctor,
    /// Delete all indexed data and usage history
    Reset {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config (for log level)
    let config = PalaceConfig::load()?;

    // Log to stderr so stdout stays clean for `export` JSON.
    let filter = EnvFilter::try_new(&config.logging.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Index { full } => cli::index::index(&config, full)?,
        Command::Search {
            query,
            mode,
            limit,
            include_expired,
        } => cli::search::search(&config, &query, mode, limit, include_expired)?,
        Command::Show { id } => cli::search::show(&config, &id)?,
        Command::Validate { id } => cli::feedback::validate(&config, &id)?,
        Command::Signal { id, signal, note } => {
            cli::feedback::signal(&config, &id, signal, note.as_deref())?
        }
        Command::Learn { id, queries } => cli::feedback::learn(&config, &id, &queries)?,
        Command::Attention => cli::maintenance::attention(&config)?,
        Command::Top { limit } => cli::maintenance::top(&config, limit)?,
        Command::Stale { days } => cli::maintenance::stale(&config, days)?,
        Command::Stats => cli::stats::stats(&config)?,
        Command::Prune { days } => cli::maintenance::prune(&config, days)?,
        Command::Export => cli::export::export(&config)?,
        Command::Doctor => cli::doctor::doctor(&config)?,
        Command::Reset { yes } => cli::reset::reset(&config, yes)?,
    }

    Ok(())
}
