//! The corpus engine: indexing, decay, usage and lookup over markdown entries.

pub mod decay;
pub mod entries;
pub mod frontmatter;
pub mod index;
pub mod keywords;
pub mod lookup;
pub mod queries;
pub mod stats;
pub mod types;
pub mod usage;
