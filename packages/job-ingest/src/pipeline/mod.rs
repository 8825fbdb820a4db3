//! Ingestion pipeline - the core of the library.
//!
//! The pipeline orchestrates:
//! - Fetch coordination across sources
//! - Age filtering
//! - Batched AI enrichment with rule-based fallback
//! - In-run deduplication
//! - Incremental persistence

pub mod age_filter;
pub mod coordinator;
pub mod dedup;
pub mod enrich;
pub mod persist;
pub mod prompts;
pub mod run;

pub use age_filter::AgeFilter;
pub use coordinator::{fetch_all, FetchOutcome};
pub use dedup::{dedup_hash, Claim, DedupIndex};
pub use enrich::{merge_ai, AiBreaker, EnrichOutcome, Enricher};
pub use persist::persist_with_retry;
pub use prompts::{extract_prompt_hash, format_extract_batch, EXTRACT_JOBS_PROMPT};
pub use run::Ingestor;
