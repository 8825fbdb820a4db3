//! In-memory storage implementation for testing and development.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{IngestError, Result};
use crate::traits::store::{JobIndex, JobSink};
use crate::types::{
    job::EnrichedJob,
    query::{
        clamp_limit, query_terms, validate_search, FacetCount, FilterFacets, JobFilter, JobPage,
        JobQuery, ScoredJob, SearchDocument, UpsertSummary,
    },
};

struct StoredJob {
    job: EnrichedJob,
    document: SearchDocument,
}

#[derive(Default)]
struct Tables {
    jobs: HashMap<String, StoredJob>,
    /// dedup_hash -> record id
    hashes: HashMap<String, String>,
}

/// In-memory job store with weighted term search.
///
/// Useful for testing and development. Not suitable for production
/// as data is lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored jobs.
    pub fn job_count(&self) -> usize {
        self.read().map(|t| t.jobs.len()).unwrap_or(0)
    }

    /// Every stored job, in no particular order.
    pub fn all_jobs(&self) -> Vec<EnrichedJob> {
        self.read()
            .map(|t| t.jobs.values().map(|s| s.job.clone()).collect())
            .unwrap_or_default()
    }

    /// Clear all stored data.
    pub fn clear(&self) -> Result<()> {
        *self.write()? = Tables::default();
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| IngestError::storage("memory store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| IngestError::storage("memory store lock poisoned"))
    }

    fn ranked(&self, terms: &[String], filter: &JobFilter) -> Result<Vec<ScoredJob>> {
        let tables = self.read()?;
        let mut hits: Vec<ScoredJob> = tables
            .jobs
            .values()
            .filter(|stored| filter.matches(&stored.job))
            .filter_map(|stored| {
                let score = stored.document.score(terms);
                (score > 0.0).then(|| ScoredJob {
                    job: stored.job.clone(),
                    score,
                })
            })
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.job.id.cmp(&b.job.id))
        });
        Ok(hits)
    }
}

#[async_trait]
impl JobSink for MemoryStore {
    async fn upsert(&self, batch: &[EnrichedJob]) -> Result<UpsertSummary> {
        let mut tables = self.write()?;
        let mut summary = UpsertSummary::default();
        for job in batch {
            if tables.jobs.contains_key(&job.id) || tables.hashes.contains_key(&job.dedup_hash) {
                summary.duplicate += 1;
                summary.rejected_ids.push(job.id.clone());
                continue;
            }
            tables.hashes.insert(job.dedup_hash.clone(), job.id.clone());
            tables.jobs.insert(
                job.id.clone(),
                StoredJob {
                    job: job.clone(),
                    document: SearchDocument::from_job(job),
                },
            );
            summary.new += 1;
        }
        Ok(summary)
    }

    async fn existing_ids(&self, ids: &[String]) -> Result<HashSet<String>> {
        let tables = self.read()?;
        Ok(ids
            .iter()
            .filter(|id| tables.jobs.contains_key(*id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl JobIndex for MemoryStore {
    async fn get_job(&self, id: &str) -> Result<Option<EnrichedJob>> {
        Ok(self.read()?.jobs.get(id).map(|s| s.job.clone()))
    }

    async fn list_jobs(&self, query: &JobQuery) -> Result<JobPage> {
        let limit = query.effective_limit();

        if let Some(search) = &query.search {
            let terms = query_terms(validate_search(search)?);
            let hits = self.ranked(&terms, &query.filter)?;
            return Ok(JobPage {
                total: hits.len(),
                jobs: hits
                    .into_iter()
                    .skip(query.offset)
                    .take(limit)
                    .map(|hit| hit.job)
                    .collect(),
            });
        }

        let tables = self.read()?;
        let mut jobs: Vec<&EnrichedJob> = tables
            .jobs
            .values()
            .map(|s| &s.job)
            .filter(|job| query.filter.matches(job))
            .collect();
        // Newest first; undated listings sort last
        jobs.sort_by(|a, b| {
            b.posted_at
                .cmp(&a.posted_at)
                .then_with(|| b.fetched_at.cmp(&a.fetched_at))
                .then_with(|| a.id.cmp(&b.id))
        });

        Ok(JobPage {
            total: jobs.len(),
            jobs: jobs
                .into_iter()
                .skip(query.offset)
                .take(limit)
                .cloned()
                .collect(),
        })
    }

    async fn search(
        &self,
        query: &str,
        filter: &JobFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ScoredJob>> {
        let terms = query_terms(validate_search(query)?);
        Ok(self
            .ranked(&terms, filter)?
            .into_iter()
            .skip(offset)
            .take(clamp_limit(limit))
            .collect())
    }

    async fn filter_facets(&self) -> Result<FilterFacets> {
        let tables = self.read()?;
        let jobs = || tables.jobs.values().map(|s| &s.job);

        Ok(FilterFacets {
            sources: facet(jobs().map(|j| j.source.clone())),
            employment_types: facet(jobs().map(|j| j.employment_type.as_str().to_string())),
            seniority: facet(jobs().filter_map(|j| j.seniority.map(|s| s.as_str().to_string()))),
            categories: facet(jobs().map(|j| j.category.as_str().to_string())),
            work_arrangements: facet(
                jobs().filter_map(|j| j.work_arrangement.map(|w| w.as_str().to_string())),
            ),
            remote: jobs().filter(|j| j.remote).count(),
        })
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.read()?.jobs.len())
    }
}

/// Count values, most frequent first, ties by value.
fn facet(values: impl Iterator<Item = String>) -> Vec<FacetCount> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for value in values {
        *counts.entry(value).or_default() += 1;
    }
    let mut facets: Vec<FacetCount> = counts
        .into_iter()
        .map(|(value, count)| FacetCount { value, count })
        .collect();
    facets.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
    facets
}
