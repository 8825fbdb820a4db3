//! One end-to-end ingestion run: fetch, filter, enrich, dedup, persist.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::error::Result;
use crate::pipeline::{
    age_filter::AgeFilter,
    coordinator::fetch_all,
    dedup::DedupIndex,
    enrich::{EnrichOutcome, Enricher},
    persist::persist_with_retry,
    prompts::extract_prompt_hash,
};
use crate::traits::{
    ai::AI,
    source::SourceAdapter,
    store::{JobSink, JobStore},
};
use crate::types::{
    config::IngestConfig,
    job::{EnrichmentMethod, EnrichedJob},
    listing::RawListing,
    stats::{IngestionRunStats, SourceStats},
};

/// Counters one batch task hands back to the run loop.
#[derive(Debug, Default)]
struct BatchReport {
    per_source: BTreeMap<String, SourceStats>,
    persist_failed: bool,
}

impl BatchReport {
    fn source(&mut self, name: &str) -> &mut SourceStats {
        self.per_source.entry(name.to_string()).or_default()
    }
}

/// Everything a batch task needs, cloned once per batch.
#[derive(Clone)]
struct BatchContext {
    enricher: Enricher,
    store: Arc<dyn JobStore>,
    dedup: Arc<Mutex<DedupIndex>>,
    config: Arc<IngestConfig>,
    now: DateTime<Utc>,
}

/// Runs ingestion over a fixed set of sources into one store.
///
/// # Example
///
/// ```rust,ignore
/// let ingestor = Ingestor::new(store)
///     .with_source(Arc::new(RemoteOk::new()))
///     .with_ai(Arc::new(OpenAI::from_env()?));
///
/// let stats = ingestor.run().await?;
/// println!("{}", stats);
/// ```
#[derive(Clone)]
pub struct Ingestor {
    store: Arc<dyn JobStore>,
    sources: Vec<Arc<dyn SourceAdapter>>,
    ai: Option<Arc<dyn AI>>,
    config: IngestConfig,
}

impl Ingestor {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self {
            store,
            sources: Vec::new(),
            ai: None,
            config: IngestConfig::default(),
        }
    }

    pub fn with_config(mut self, config: IngestConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_source(mut self, source: Arc<dyn SourceAdapter>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn with_sources(mut self, sources: impl IntoIterator<Item = Arc<dyn SourceAdapter>>) -> Self {
        self.sources.extend(sources);
        self
    }

    pub fn with_ai(mut self, ai: Arc<dyn AI>) -> Self {
        self.ai = Some(ai);
        self
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    /// Run to completion.
    pub async fn run(&self) -> Result<IngestionRunStats> {
        self.run_until_cancelled(CancellationToken::new()).await
    }

    /// Run until done or until `cancel` fires.
    ///
    /// After cancellation no new batch is dispatched; batches already in
    /// flight finish and persist. Only invalid configuration is an error;
    /// source, AI and store failures are reported in the returned stats.
    pub async fn run_until_cancelled(&self, cancel: CancellationToken) -> Result<IngestionRunStats> {
        self.config.validate()?;

        let stats = IngestionRunStats::start();
        let span = info_span!("ingestion_run", run_id = %stats.run_id);
        Ok(self.execute(stats, cancel).instrument(span).await)
    }

    async fn execute(&self, mut stats: IngestionRunStats, cancel: CancellationToken) -> IngestionRunStats {
        info!(sources = self.sources.len(), "Starting ingestion run");
        if self.ai.is_some() && self.config.use_ai {
            debug!(prompt_hash = %extract_prompt_hash(), "AI extraction enabled");
        }

        if cancel.is_cancelled() {
            stats.cancelled = true;
            stats.finish();
            return stats;
        }

        // 1. Fetch
        let fetched = fetch_all(&self.sources, &self.config).await;
        stats.absorb(&fetched.per_source);

        // 2. Age filter
        let now = Utc::now();
        let (fresh, stale) = AgeFilter::from_config(&self.config).partition(fetched.listings, now);
        for listing in &stale {
            stats.source_mut(&listing.source).filtered_stale += 1;
        }
        info!(fresh = fresh.len(), stale = stale.len(), "Age filter applied");

        // 3. Skip listings already stored before paying for enrichment
        let pending = if self.config.skip_known_ids {
            self.skip_known(fresh, &mut stats).await
        } else {
            fresh
        };

        // 4. Enrich, dedup and persist batch by batch
        let enricher = Enricher::new(self.ai.clone(), &self.config);
        let context = BatchContext {
            enricher: enricher.clone(),
            store: self.store.clone(),
            dedup: Arc::new(Mutex::new(DedupIndex::new())),
            config: Arc::new(self.config.clone()),
            now,
        };
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));
        let mut tasks: JoinSet<BatchReport> = JoinSet::new();
        let total_batches = pending.len().div_ceil(self.config.batch_size);

        for (index, chunk) in pending.chunks(self.config.batch_size).enumerate() {
            if cancel.is_cancelled() {
                stats.cancelled = true;
                break;
            }

            // Acquire before spawning so dispatch blocks at the cap
            let permit = tokio::select! {
                permit = semaphore.clone().acquire_owned() => permit,
                _ = cancel.cancelled() => {
                    stats.cancelled = true;
                    break;
                }
            };
            let Ok(permit) = permit else {
                break;
            };

            while let Some(joined) = tasks.try_join_next() {
                fold_report(&mut stats, joined);
            }

            debug!(batch = index, of = total_batches, size = chunk.len(), "Dispatching batch");
            let batch = chunk.to_vec();
            let context = context.clone();
            tasks.spawn(async move {
                let _permit = permit;
                process_batch(index, batch, context).await
            });
        }

        if stats.cancelled {
            warn!(
                dispatched = tasks.len(),
                "Run cancelled; waiting for in-flight batches"
            );
        }

        while let Some(joined) = tasks.join_next().await {
            fold_report(&mut stats, joined);
        }

        stats.ai_disabled = enricher.ai_disabled();
        stats.finish();

        let totals = stats.totals();
        info!(
            success = stats.success,
            fetched = totals.fetched,
            new = totals.new,
            duplicates = totals.total_duplicates(),
            failed = totals.failed,
            failed_batches = stats.failed_batches,
            "Ingestion run complete"
        );
        stats
    }

    async fn skip_known(&self, listings: Vec<RawListing>, stats: &mut IngestionRunStats) -> Vec<RawListing> {
        if listings.is_empty() {
            return listings;
        }
        let ids: Vec<String> = listings.iter().map(RawListing::record_id).collect();
        let known = match self.store.existing_ids(&ids).await {
            Ok(known) => known,
            Err(e) => {
                // The store still rejects these at upsert time
                warn!(error = %e, "Known-id check failed, enriching everything");
                return listings;
            }
        };
        if known.is_empty() {
            return listings;
        }

        let (seen, unseen): (Vec<_>, Vec<_>) = listings
            .into_iter()
            .partition(|listing| known.contains(&listing.record_id()));
        for listing in &seen {
            stats.source_mut(&listing.source).known_skipped += 1;
        }
        info!(skipped = seen.len(), "Skipped listings already stored");
        unseen
    }
}

fn fold_report(
    stats: &mut IngestionRunStats,
    joined: std::result::Result<BatchReport, tokio::task::JoinError>,
) {
    match joined {
        Ok(report) => {
            stats.absorb(&report.per_source);
            if report.persist_failed {
                stats.failed_batches += 1;
            }
        }
        Err(e) => {
            error!(error = %e, "Batch task aborted");
            stats.failed_batches += 1;
        }
    }
}

async fn process_batch(index: usize, batch: Vec<RawListing>, ctx: BatchContext) -> BatchReport {
    let mut report = BatchReport::default();

    let mut jobs: Vec<EnrichedJob> = Vec::with_capacity(batch.len());
    for outcome in ctx.enricher.enrich_batch(&batch, ctx.now).await {
        let counters = report.source(outcome.source());
        match outcome {
            EnrichOutcome::Extracted { job, via } => {
                match via {
                    EnrichmentMethod::Ai => counters.enriched_ai += 1,
                    EnrichmentMethod::Fallback => counters.enriched_fallback += 1,
                }
                jobs.push(job);
            }
            EnrichOutcome::Failed { id, reason, .. } => {
                counters.failed += 1;
                warn!(batch = index, %id, %reason, "Listing could not be enriched");
            }
        }
    }

    let admission = ctx.dedup.lock().await.admit(jobs);
    for job in &admission.rejected {
        debug!(batch = index, id = %job.id, hash = %job.dedup_hash, "In-run duplicate");
        report.source(&job.source).duplicates += 1;
    }
    if admission.accepted.is_empty() {
        return report;
    }

    let accepted = admission.accepted;
    match persist_with_retry(
        ctx.store.as_ref(),
        &accepted,
        ctx.config.persist_attempts,
        ctx.config.persist_backoff,
    )
    .await
    {
        Ok(summary) => {
            let rejected: HashSet<&str> = summary.rejected_ids.iter().map(String::as_str).collect();
            for job in &accepted {
                let counters = report.source(&job.source);
                if rejected.contains(job.id.as_str()) {
                    counters.duplicates += 1;
                } else {
                    counters.new += 1;
                }
            }
            debug!(
                batch = index,
                new = summary.new,
                duplicate = summary.duplicate,
                "Batch persisted"
            );
        }
        Err(e) => {
            error!(batch = index, size = accepted.len(), error = %e, "Batch lost after retries");
            let mut dedup = ctx.dedup.lock().await;
            for job in &accepted {
                dedup.release(&job.id, &job.dedup_hash);
                report.source(&job.source).failed += 1;
            }
            report.persist_failed = true;
        }
    }

    report
}
