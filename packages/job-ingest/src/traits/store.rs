//! Storage traits for enriched jobs.
//!
//! The storage layer is split into focused traits:
//! - `JobSink`: Write side used by the pipeline
//! - `JobIndex`: Read side used by the query layer
//! - `JobStore`: Composite trait combining both

use async_trait::async_trait;
use std::collections::HashSet;

use crate::error::Result;
use crate::types::{
    job::EnrichedJob,
    query::{FilterFacets, JobFilter, JobPage, JobQuery, ScoredJob, UpsertSummary},
};

/// Write side of the record store.
#[async_trait]
pub trait JobSink: Send + Sync {
    /// Insert a batch of accepted records.
    ///
    /// Atomic per record: a record whose id or dedup hash is already
    /// stored is rejected and counted as a duplicate, never overwritten.
    /// Each stored record gets its search document derived and indexed.
    async fn upsert(&self, batch: &[EnrichedJob]) -> Result<UpsertSummary>;

    /// The subset of `ids` already stored.
    async fn existing_ids(&self, ids: &[String]) -> Result<HashSet<String>>;
}

/// Read side of the record store.
#[async_trait]
pub trait JobIndex: Send + Sync {
    /// Get a record by id.
    async fn get_job(&self, id: &str) -> Result<Option<EnrichedJob>>;

    /// Filtered, paginated listing. Ranked by relevance when the query
    /// carries search text, newest first otherwise.
    async fn list_jobs(&self, query: &JobQuery) -> Result<JobPage>;

    /// Ranked free-text search.
    ///
    /// Queries shorter than two characters are rejected with
    /// `IngestError::InvalidQuery`.
    async fn search(
        &self,
        query: &str,
        filter: &JobFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ScoredJob>>;

    /// Value/count pairs for every filterable dimension.
    async fn filter_facets(&self) -> Result<FilterFacets>;

    /// Total records stored.
    async fn count(&self) -> Result<usize>;
}

/// Composite storage trait combining both sides.
///
/// This is the main trait used by the pipeline and the service.
pub trait JobStore: JobSink + JobIndex {}

// Blanket implementation: anything implementing both traits is a JobStore
impl<T: JobSink + JobIndex> JobStore for T {}
