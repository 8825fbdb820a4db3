//! Query-layer facade over a store and its ingestor.
//!
//! This is the surface an HTTP layer or CLI talks to. It owns no state of
//! its own beyond serialising ingestion runs.

use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::{IngestError, Result};
use crate::pipeline::Ingestor;
use crate::traits::store::JobStore;
use crate::types::{
    job::EnrichedJob,
    query::{FilterFacets, JobFilter, JobPage, JobQuery, ScoredJob},
    stats::IngestionRunStats,
};

/// Read and trigger operations over one job store.
///
/// # Example
///
/// ```rust,ignore
/// let service = JobService::new(ingestor);
///
/// let page = service.list_jobs(&JobQuery::new(20, 0).with_search("rust")).await?;
/// let job = service.get_job("remoteok:12345").await?;
/// ```
#[derive(Clone)]
pub struct JobService {
    ingestor: Ingestor,
    /// Held for the length of a run so triggers never overlap
    run_lock: Arc<Mutex<()>>,
}

impl JobService {
    pub fn new(ingestor: Ingestor) -> Self {
        Self {
            ingestor,
            run_lock: Arc::new(Mutex::new(())),
        }
    }

    fn store(&self) -> &Arc<dyn JobStore> {
        self.ingestor.store()
    }

    /// Filtered, paginated listing.
    pub async fn list_jobs(&self, query: &JobQuery) -> Result<JobPage> {
        self.store().list_jobs(query).await
    }

    /// Fetch one record, or `IngestError::NotFound`.
    pub async fn get_job(&self, id: &str) -> Result<EnrichedJob> {
        self.store()
            .get_job(id)
            .await?
            .ok_or_else(|| IngestError::NotFound { id: id.to_string() })
    }

    /// Ranked free-text search.
    pub async fn search(
        &self,
        query: &str,
        filter: &JobFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ScoredJob>> {
        self.store().search(query, filter, limit, offset).await
    }

    pub async fn filter_facets(&self) -> Result<FilterFacets> {
        self.store().filter_facets().await
    }

    /// Run one ingestion now. Waits for any run already in progress.
    pub async fn trigger_ingestion(&self) -> Result<IngestionRunStats> {
        self.trigger_ingestion_until_cancelled(CancellationToken::new())
            .await
    }

    /// Run one ingestion, stopping dispatch when `cancel` fires.
    pub async fn trigger_ingestion_until_cancelled(
        &self,
        cancel: CancellationToken,
    ) -> Result<IngestionRunStats> {
        let _running = self.run_lock.lock().await;
        info!("Ingestion triggered");
        self.ingestor.run_until_cancelled(cancel).await
    }
}
