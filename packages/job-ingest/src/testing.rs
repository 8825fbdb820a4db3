//! Testing utilities including mock implementations.
//!
//! These are useful for testing applications that use the ingestion library
//! without making real AI or network calls.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::error::{IngestError, Result, SourceError, SourceResult};
use crate::pipeline::enrich::finalize;
use crate::rules::payload::{self, COMPANY, DESCRIPTION, TITLE};
use crate::stores::MemoryStore;
use crate::traits::{
    ai::{AiItem, ExtractedFields, AI},
    source::SourceAdapter,
    store::{JobIndex, JobSink},
};
use crate::types::{
    job::{EnrichedJob, EnrichmentMethod},
    listing::{RawListing, RawRecord},
    query::{FilterFacets, JobFilter, JobPage, JobQuery, ScoredJob, UpsertSummary},
};

pub use crate::sources::StaticSource;

/// A mock AI implementation for testing.
///
/// Echoes title, company and description from each listing's payload.
/// Failure modes are opt-in via the builder methods.
#[derive(Default)]
pub struct MockAI {
    /// Record ids whose item comes back malformed
    malformed: HashSet<String>,

    /// Fail every call outright
    failing: bool,

    /// Return one item fewer than requested
    dropping_last: bool,

    /// Sleep this long inside every call
    delay: Option<Duration>,

    in_flight: Arc<AtomicUsize>,
    max_in_flight: AtomicUsize,

    /// Call tracking for assertions
    calls: RwLock<Vec<MockAICall>>,
}

/// Record of a call made to the mock AI.
#[derive(Debug, Clone)]
pub struct MockAICall {
    pub ids: Vec<String>,
}

impl MockAI {
    /// Create a new mock AI with default behavior.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a malformed item for each of these record ids.
    pub fn with_malformed<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.malformed.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Fail every call with an AI error.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// Drop the last item of every response.
    pub fn dropping_last(mut self) -> Self {
        self.dropping_last = true;
        self
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Get all calls made to this mock.
    pub fn calls(&self) -> Vec<MockAICall> {
        self.calls.read().map(|c| c.clone()).unwrap_or_default()
    }

    /// Number of `extract_jobs` calls.
    pub fn call_count(&self) -> usize {
        self.calls.read().map(|c| c.len()).unwrap_or(0)
    }

    /// Highest number of calls that were running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn item_for(&self, listing: &RawListing) -> AiItem {
        if self.malformed.contains(&listing.record_id()) {
            return Err("expected object, found string".to_string());
        }
        Ok(ExtractedFields {
            title: payload::str_field(&listing.payload, TITLE),
            company: payload::str_field(&listing.payload, COMPANY),
            description: payload::str_field(&listing.payload, DESCRIPTION),
            ..Default::default()
        })
    }
}

/// Decrements the in-flight counter even when the call is cancelled.
struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl AI for MockAI {
    async fn extract_jobs(&self, listings: &[RawListing]) -> Result<Vec<AiItem>> {
        if let Ok(mut calls) = self.calls.write() {
            calls.push(MockAICall {
                ids: listings.iter().map(RawListing::record_id).collect(),
            });
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(self.in_flight.clone());
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing {
            return Err(IngestError::ai("mock AI failure"));
        }

        let mut items: Vec<AiItem> = listings.iter().map(|l| self.item_for(l)).collect();
        if self.dropping_last {
            items.pop();
        }
        Ok(items)
    }
}

/// A store that fails its first `n` upserts, then behaves like
/// [`MemoryStore`].
pub struct FlakyStore {
    inner: MemoryStore,
    failures_left: AtomicU32,
    attempts: AtomicUsize,
}

impl FlakyStore {
    /// Fail the first `fail_times` upserts.
    pub fn new(fail_times: u32) -> Self {
        Self {
            inner: MemoryStore::new(),
            failures_left: AtomicU32::new(fail_times),
            attempts: AtomicUsize::new(0),
        }
    }

    /// Fail every upsert.
    pub fn always_failing() -> Self {
        Self::new(u32::MAX)
    }

    /// Total upsert attempts, failed or not.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// The backing store.
    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }
}

#[async_trait]
impl JobSink for FlakyStore {
    async fn upsert(&self, batch: &[EnrichedJob]) -> Result<UpsertSummary> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let failed = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(IngestError::storage("connection reset by peer"));
        }
        self.inner.upsert(batch).await
    }

    async fn existing_ids(&self, ids: &[String]) -> Result<HashSet<String>> {
        self.inner.existing_ids(ids).await
    }
}

#[async_trait]
impl JobIndex for FlakyStore {
    async fn get_job(&self, id: &str) -> Result<Option<EnrichedJob>> {
        self.inner.get_job(id).await
    }

    async fn list_jobs(&self, query: &JobQuery) -> Result<JobPage> {
        self.inner.list_jobs(query).await
    }

    async fn search(
        &self,
        query: &str,
        filter: &JobFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ScoredJob>> {
        self.inner.search(query, filter, limit, offset).await
    }

    async fn filter_facets(&self) -> Result<FilterFacets> {
        self.inner.filter_facets().await
    }

    async fn count(&self) -> Result<usize> {
        self.inner.count().await
    }
}

/// A [`MemoryStore`] that records the size of every upsert batch.
#[derive(Default)]
pub struct RecordingStore {
    inner: MemoryStore,
    upsert_calls: RwLock<Vec<usize>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Batch sizes of every `upsert` call, in call order.
    pub fn upsert_calls(&self) -> Vec<usize> {
        self.upsert_calls
            .read()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    /// The backing store.
    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }
}

#[async_trait]
impl JobSink for RecordingStore {
    async fn upsert(&self, batch: &[EnrichedJob]) -> Result<UpsertSummary> {
        if let Ok(mut calls) = self.upsert_calls.write() {
            calls.push(batch.len());
        }
        self.inner.upsert(batch).await
    }

    async fn existing_ids(&self, ids: &[String]) -> Result<HashSet<String>> {
        self.inner.existing_ids(ids).await
    }
}

#[async_trait]
impl JobIndex for RecordingStore {
    async fn get_job(&self, id: &str) -> Result<Option<EnrichedJob>> {
        self.inner.get_job(id).await
    }

    async fn list_jobs(&self, query: &JobQuery) -> Result<JobPage> {
        self.inner.list_jobs(query).await
    }

    async fn search(
        &self,
        query: &str,
        filter: &JobFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ScoredJob>> {
        self.inner.search(query, filter, limit, offset).await
    }

    async fn filter_facets(&self) -> Result<FilterFacets> {
        self.inner.filter_facets().await
    }

    async fn count(&self) -> Result<usize> {
        self.inner.count().await
    }
}

/// A source whose every fetch fails with a transport error.
pub struct FailingSource {
    name: String,
    calls: AtomicUsize,
}

impl FailingSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of fetch attempts.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceAdapter for FailingSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> SourceResult<Vec<RawRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(SourceError::Transport("connection refused".into()))
    }
}

/// A source that sleeps before returning nothing.
pub struct SlowSource {
    name: String,
    delay: Duration,
}

impl SlowSource {
    pub fn new(name: impl Into<String>, delay: Duration) -> Self {
        Self {
            name: name.into(),
            delay,
        }
    }
}

#[async_trait]
impl SourceAdapter for SlowSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> SourceResult<Vec<RawRecord>> {
        tokio::time::sleep(self.delay).await;
        Ok(Vec::new())
    }
}

/// A raw record posted now with the given title and company.
pub fn listing_record(source_id: &str, title: &str, company: &str) -> RawRecord {
    RawRecord::new(
        source_id,
        json!({
            "title": title,
            "company": company,
            "description": format!("{} role at {}.", title, company),
            "posted_at": Utc::now().to_rfc3339(),
            "apply_url": format!("https://jobs.example.com/{}", source_id),
        }),
    )
}

/// A listing fetched and posted now.
pub fn listing(source: &str, source_id: &str, title: &str, company: &str) -> RawListing {
    let record = listing_record(source_id, title, company);
    RawListing::from_record(source, Utc::now(), record)
}

/// A finalized record with hash and score set.
pub fn enriched(source: &str, source_id: &str, title: &str, company: &str) -> EnrichedJob {
    let raw = listing(source, source_id, title, company);
    let mut job = EnrichedJob::new(
        &raw,
        title,
        company,
        format!("{} role at {}.", title, company),
        EnrichmentMethod::Fallback,
    );
    job.apply_url = Some(format!("https://jobs.example.com/{}", source_id));
    finalize(job)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_ai_echoes_payload() {
        let ai = MockAI::new();
        let items = ai
            .extract_jobs(&[listing("s", "1", "Backend Engineer", "Acme")])
            .await
            .unwrap();

        let fields = items[0].as_ref().unwrap();
        assert_eq!(fields.title.as_deref(), Some("Backend Engineer"));
        assert_eq!(fields.company.as_deref(), Some("Acme"));
        assert_eq!(ai.call_count(), 1);
        assert_eq!(ai.calls()[0].ids, vec!["s:1".to_string()]);
    }

    #[tokio::test]
    async fn test_mock_ai_tracks_concurrency() {
        let ai = Arc::new(MockAI::new().with_delay(Duration::from_millis(30)));
        let batch = vec![listing("s", "1", "SRE", "Acme")];

        let a = ai.clone();
        let b = ai.clone();
        let (ra, rb) = tokio::join!(a.extract_jobs(&batch), b.extract_jobs(&batch));
        ra.unwrap();
        rb.unwrap();

        assert_eq!(ai.max_in_flight(), 2);
        assert_eq!(ai.in_flight.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_flaky_store_recovers() {
        let store = FlakyStore::new(1);
        let batch = vec![enriched("s", "1", "SRE", "Acme")];

        assert!(store.upsert(&batch).await.is_err());
        assert_eq!(store.upsert(&batch).await.unwrap().new, 1);
        assert_eq!(store.attempts(), 2);
    }

    #[tokio::test]
    async fn test_recording_store_tracks_batch_sizes() {
        let store = RecordingStore::new();
        store.upsert(&[]).await.unwrap();
        store
            .upsert(&[enriched("s", "1", "SRE", "Acme")])
            .await
            .unwrap();

        assert_eq!(store.upsert_calls(), vec![0, 1]);
        assert_eq!(store.inner().job_count(), 1);
    }

    #[test]
    fn test_enriched_fixture_is_finalized() {
        let job = enriched("s", "1", "Backend Engineer", "Acme");
        assert_eq!(job.id, "s:1");
        assert_eq!(job.dedup_hash.len(), 16);
        assert!(job.quality_score > 0);
    }
}
