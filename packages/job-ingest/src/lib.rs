//! Job Listing Ingestion Library
//!
//! Pulls job postings from independent sources, turns each raw listing into
//! one uniform record, drops duplicates, and persists batch by batch so a
//! failure late in a run never loses the work done before it.
//!
//! # Pipeline
//!
//! ```text
//! sources ─▶ fetch_all ─▶ AgeFilter ─▶ known-id skip ─▶ batches ─▶ Enricher
//!                                                                     │
//!             store ◀─ persist_with_retry ◀─ DedupIndex ◀─ score ◀───┘
//! ```
//!
//! - Sources run concurrently; one failing never affects the others.
//! - Enrichment is batched, with a hard cap on batches in flight.
//! - AI extraction falls back to deterministic rules per batch or per item.
//! - A record whose id or title+company hash is already known is rejected.
//!
//! # Usage
//!
//! ```rust,ignore
//! use job_ingest::{Ingestor, IngestConfig, MemoryStore};
//! use job_ingest::sources::RemoteOk;
//!
//! let store = Arc::new(MemoryStore::new());
//! let ingestor = Ingestor::new(store)
//!     .with_config(IngestConfig::default().with_concurrency(4))
//!     .with_source(Arc::new(RemoteOk::new()));
//!
//! let stats = ingestor.run().await?;
//! println!("{}", stats);
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Core trait abstractions (SourceAdapter, AI, JobStore)
//! - [`types`] - Listings, enriched records, config, stats and queries
//! - [`rules`] - Rule-based extraction and quality scoring
//! - [`pipeline`] - Fetch, filter, enrich, dedup and persist stages
//! - [`stores`] - Storage implementations (MemoryStore, SqliteStore)
//! - [`sources`] - Fetch adapters
//! - [`service`] - Query-layer facade
//! - [`testing`] - Mock implementations for testing

pub mod error;
pub mod pipeline;
pub mod rules;
pub mod service;
pub mod sources;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

#[cfg(feature = "openai")]
pub mod ai;

// Re-export core types at crate root
pub use error::{ConfigError, IngestError, Result, SourceError, SourceResult};
pub use pipeline::{dedup_hash, DedupIndex, EnrichOutcome, Enricher, Ingestor};
pub use rules::{completeness, score, Completeness};
pub use service::JobService;
pub use stores::MemoryStore;
pub use traits::{
    ai::{AiItem, ExtractedFields, AI},
    source::SourceAdapter,
    store::{JobIndex, JobSink, JobStore},
};
pub use types::{
    config::{IngestConfig, UnknownAgePolicy},
    job::{
        ApplyOption, EmploymentType, EnrichedJob, EnrichmentMethod, RoleCategory, SalaryPeriod,
        Seniority, Urgency, WorkArrangement,
    },
    listing::{RawListing, RawRecord},
    query::{
        FacetCount, FilterFacets, JobFilter, JobPage, JobQuery, ScoredJob, SearchDocument,
        UpsertSummary,
    },
    stats::{IngestionRunStats, SourceStats},
};

#[cfg(feature = "sqlite")]
pub use stores::SqliteStore;

#[cfg(feature = "openai")]
pub use ai::OpenAI;
