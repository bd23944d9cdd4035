//! Memory-palace corpus engine: decay-aware, usage-ranked retrieval over a
//! markdown knowledge base.
//!
//! Each corpus entry is a markdown file with optional YAML frontmatter. Entries
//! are indexed into SQLite by keyword and by the natural-language questions
//! they answer, then ranked by textual relevance adjusted for how fresh they
//! are and how useful they have proven:
//!
//! | Maturity | Curve | Half-life |
//! |----------|-------|-----------|
//! | **Seedling** | Exponential | 30 days |
//! | **Growing** | Linear | 90 days |
//! | **Evergreen** | Logarithmic | 365 days |
//!
//! # Architecture
//!
//! - **Storage**: SQLite (WAL) holding entry metadata, an inverted keyword
//!   index, query templates and an append-only usage event log
//! - **Indexing**: content-hash incremental sync of the corpus directory
//! - **Search**: keyword overlap and Jaccard template matching merged per
//!   entry, then re-ranked by decay and usage
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from TOML files and environment variables
//! - [`db`]: SQLite database initialization, schema, migrations, and health checks
//! - [`corpus`]: Indexing, decay, usage tracking, and unified lookup

pub mod config;
pub mod corpus;
pub mod db;
