//! SQLite storage implementation.
//!
//! A file-based storage backend using SQLite. Good for:
//! - Local development
//! - Single-server deployments
//! - Testing with persistent data
//!
//! Records live in one `jobs` table keyed by record id, with a unique
//! `(source, source_id)` constraint and an index on `dedup_hash`. Ranked
//! search runs against the `jobs_fts` FTS5 table, weighted per column.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexSet;
use sqlx::sqlite::{Sqlite, SqlitePool, SqlitePoolOptions};
use sqlx::{FromRow, QueryBuilder};
use std::collections::HashSet;

use crate::error::{IngestError, Result};
use crate::traits::store::{JobIndex, JobSink};
use crate::types::{
    job::{
        ApplyOption, EmploymentType, EnrichedJob, EnrichmentMethod, RoleCategory, SalaryPeriod,
        Seniority, Urgency, WorkArrangement,
    },
    query::{
        clamp_limit, query_terms, validate_search, FacetCount, FilterFacets, JobFilter, JobPage,
        JobQuery, ScoredJob, SearchDocument, UpsertSummary,
    },
};

/// SQLite's default bound-parameter limit is well above this.
const ID_CHUNK: usize = 500;

const JOB_COLUMNS: &str = "j.id, j.source, j.source_id, j.title, j.company, j.description, \
    j.short_description, j.country, j.city, j.remote, j.work_arrangement, j.employment_type, \
    j.seniority, j.department, j.category, j.salary_min, j.salary_max, j.salary_currency, \
    j.salary_period, j.skills, j.required_years, j.education, j.responsibilities, j.benefits, \
    j.posted_at, j.application_deadline, j.fetched_at, j.apply_url, j.apply_options, j.urgency, \
    j.visa_sponsorship, j.enrichment, j.dedup_hash, j.quality_score";

/// SQLite-based job store.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new SQLite store with the given connection URL.
    ///
    /// # Example URLs
    /// - `sqlite::memory:` - In-memory database (use [`SqliteStore::in_memory`])
    /// - `sqlite://jobs.db` - File-based database
    /// - `sqlite://jobs.db?mode=rwc` - Create if not exists
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(IngestError::storage)?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Create an in-memory SQLite store (for testing).
    ///
    /// Every connection to `:memory:` is a separate database, so the pool
    /// holds exactly one connection and never recycles it.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(IngestError::storage)?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Run database migrations.
    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                id TEXT PRIMARY KEY,
                source TEXT NOT NULL,
                source_id TEXT NOT NULL,
                title TEXT NOT NULL,
                company TEXT NOT NULL,
                description TEXT NOT NULL,
                short_description TEXT,
                country TEXT,
                city TEXT,
                remote INTEGER NOT NULL DEFAULT 0,
                work_arrangement TEXT,
                employment_type TEXT NOT NULL,
                seniority TEXT,
                department TEXT,
                category TEXT NOT NULL,
                salary_min REAL,
                salary_max REAL,
                salary_currency TEXT,
                salary_period TEXT,
                skills TEXT NOT NULL DEFAULT '[]',
                required_years INTEGER,
                education TEXT,
                responsibilities TEXT NOT NULL DEFAULT '[]',
                benefits TEXT NOT NULL DEFAULT '[]',
                posted_at TEXT,
                application_deadline TEXT,
                fetched_at TEXT NOT NULL,
                apply_url TEXT,
                apply_options TEXT NOT NULL DEFAULT '[]',
                urgency TEXT NOT NULL,
                visa_sponsorship INTEGER,
                enrichment TEXT NOT NULL,
                dedup_hash TEXT NOT NULL,
                quality_score INTEGER NOT NULL,
                search_text TEXT NOT NULL,
                UNIQUE (source, source_id)
            );

            CREATE INDEX IF NOT EXISTS idx_jobs_dedup_hash ON jobs(dedup_hash);
            CREATE INDEX IF NOT EXISTS idx_jobs_posted_at ON jobs(posted_at);
            CREATE INDEX IF NOT EXISTS idx_jobs_source ON jobs(source);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(IngestError::storage)?;

        // Create FTS5 table for ranked search
        sqlx::query(
            r#"
            CREATE VIRTUAL TABLE IF NOT EXISTS jobs_fts USING fts5(
                id UNINDEXED,
                title,
                company,
                skills,
                description
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(IngestError::storage)?;

        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

// Row types for sqlx queries
#[derive(Debug, FromRow)]
struct JobRow {
    id: String,
    source: String,
    source_id: String,
    title: String,
    company: String,
    description: String,
    short_description: Option<String>,
    country: Option<String>,
    city: Option<String>,
    remote: bool,
    work_arrangement: Option<String>,
    employment_type: String,
    seniority: Option<String>,
    department: Option<String>,
    category: String,
    salary_min: Option<f64>,
    salary_max: Option<f64>,
    salary_currency: Option<String>,
    salary_period: Option<String>,
    skills: String,
    required_years: Option<i64>,
    education: Option<String>,
    responsibilities: String,
    benefits: String,
    posted_at: Option<String>,
    application_deadline: Option<String>,
    fetched_at: String,
    apply_url: Option<String>,
    apply_options: String,
    urgency: String,
    visa_sponsorship: Option<bool>,
    enrichment: String,
    dedup_hash: String,
    quality_score: i64,
}

#[derive(Debug, FromRow)]
struct RankedRow {
    #[sqlx(flatten)]
    job: JobRow,
    relevance: f64,
}

impl JobRow {
    fn into_job(self) -> Result<EnrichedJob> {
        let skills: IndexSet<String> = decode_json(&self.skills, "skills")?;
        let responsibilities: Vec<String> = decode_json(&self.responsibilities, "responsibilities")?;
        let benefits: Vec<String> = decode_json(&self.benefits, "benefits")?;
        let apply_options: Vec<ApplyOption> = decode_json(&self.apply_options, "apply_options")?;

        Ok(EnrichedJob {
            id: self.id,
            source: self.source,
            source_id: self.source_id,
            title: self.title,
            company: self.company,
            description: self.description,
            short_description: self.short_description,
            country: self.country,
            city: self.city,
            remote: self.remote,
            work_arrangement: self.work_arrangement.as_deref().and_then(WorkArrangement::parse),
            employment_type: EmploymentType::parse(&self.employment_type).unwrap_or_default(),
            seniority: self.seniority.as_deref().and_then(Seniority::parse),
            department: self.department,
            category: RoleCategory::parse(&self.category).unwrap_or_default(),
            salary_min: self.salary_min,
            salary_max: self.salary_max,
            salary_currency: self.salary_currency,
            salary_period: self.salary_period.as_deref().and_then(SalaryPeriod::parse),
            skills,
            required_years: self.required_years.and_then(|y| u32::try_from(y).ok()),
            education: self.education,
            responsibilities,
            benefits,
            posted_at: self.posted_at.as_deref().map(decode_date).transpose()?,
            application_deadline: self
                .application_deadline
                .as_deref()
                .map(decode_date)
                .transpose()?,
            fetched_at: decode_date(&self.fetched_at)?,
            apply_url: self.apply_url,
            apply_options,
            urgency: Urgency::parse(&self.urgency).unwrap_or_default(),
            visa_sponsorship: self.visa_sponsorship,
            enrichment: EnrichmentMethod::parse(&self.enrichment)
                .unwrap_or(EnrichmentMethod::Fallback),
            dedup_hash: self.dedup_hash,
            quality_score: self.quality_score.clamp(0, 100) as u8,
        })
    }
}

fn decode_json<T: serde::de::DeserializeOwned>(raw: &str, field: &str) -> Result<T> {
    serde_json::from_str(raw)
        .map_err(|e| IngestError::storage(format!("Invalid {} JSON: {}", field, e)))
}

fn decode_date(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| IngestError::storage(format!("Invalid date: {}", e)))
}

/// Fixed-width RFC 3339 so string order matches time order.
fn encode_date(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Turn user text into an FTS5 query: every term quoted, all required.
fn fts_query(terms: &[String]) -> String {
    terms
        .iter()
        .map(|t| format!("\"{}\"", t.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Append `AND ...` clauses for every active filter.
fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &JobFilter) {
    if !filter.sources.is_empty() {
        qb.push(" AND j.source IN (");
        let mut values = qb.separated(", ");
        for source in &filter.sources {
            values.push_bind(source.clone());
        }
        values.push_unseparated(")");
    }
    if let Some(employment_type) = filter.employment_type {
        qb.push(" AND j.employment_type = ")
            .push_bind(employment_type.as_str());
    }
    if filter.remote_only {
        qb.push(" AND j.remote = 1");
    }
    if !filter.seniority.is_empty() {
        qb.push(" AND j.seniority IN (");
        let mut values = qb.separated(", ");
        for seniority in &filter.seniority {
            values.push_bind(seniority.as_str());
        }
        values.push_unseparated(")");
    }
    if !filter.category.is_empty() {
        qb.push(" AND j.category IN (");
        let mut values = qb.separated(", ");
        for category in &filter.category {
            values.push_bind(category.as_str());
        }
        values.push_unseparated(")");
    }
    if let Some(min) = filter.min_quality {
        qb.push(" AND j.quality_score >= ").push_bind(min as i64);
    }
}

impl SqliteStore {
    async fn ranked(
        &self,
        terms: &[String],
        filter: &JobFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ScoredJob>> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {}, bm25(jobs_fts, 0.0, {:.1}, {:.1}, {:.1}, {:.1}) AS relevance \
             FROM jobs_fts JOIN jobs j ON j.id = jobs_fts.id WHERE jobs_fts MATCH ",
            JOB_COLUMNS,
            SearchDocument::TITLE_WEIGHT,
            SearchDocument::COMPANY_WEIGHT,
            SearchDocument::SKILLS_WEIGHT,
            SearchDocument::DESCRIPTION_WEIGHT,
        ));
        qb.push_bind(fts_query(terms));
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY relevance ASC, j.id ASC LIMIT ")
            .push_bind(limit as i64)
            .push(" OFFSET ")
            .push_bind(offset as i64);

        let rows = qb
            .build_query_as::<RankedRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(IngestError::storage)?;

        rows.into_iter()
            .map(|row| {
                Ok(ScoredJob {
                    job: row.job.into_job()?,
                    // bm25 is lower-is-better and negative
                    score: -row.relevance,
                })
            })
            .collect()
    }

    async fn ranked_count(&self, terms: &[String], filter: &JobFilter) -> Result<usize> {
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT COUNT(*) FROM jobs_fts JOIN jobs j ON j.id = jobs_fts.id WHERE jobs_fts MATCH ",
        );
        qb.push_bind(fts_query(terms));
        push_filter(&mut qb, filter);

        let count: i64 = qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(IngestError::storage)?;
        Ok(count as usize)
    }

    async fn facet(&self, column: &str) -> Result<Vec<FacetCount>> {
        let sql = format!(
            "SELECT {col} AS value, COUNT(*) AS count FROM jobs \
             WHERE {col} IS NOT NULL GROUP BY {col} ORDER BY count DESC, value ASC",
            col = column
        );
        let rows = sqlx::query_as::<_, (String, i64)>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(IngestError::storage)?;

        Ok(rows
            .into_iter()
            .map(|(value, count)| FacetCount {
                value,
                count: count as usize,
            })
            .collect())
    }
}

#[async_trait]
impl JobSink for SqliteStore {
    async fn upsert(&self, batch: &[EnrichedJob]) -> Result<UpsertSummary> {
        let mut summary = UpsertSummary::default();
        if batch.is_empty() {
            return Ok(summary);
        }

        // One transaction per batch: a failed upsert commits nothing
        let mut tx = self.pool.begin().await.map_err(IngestError::storage)?;

        for job in batch {
            let document = SearchDocument::from_job(job);
            let skills = serde_json::to_string(&job.skills)?;
            let responsibilities = serde_json::to_string(&job.responsibilities)?;
            let benefits = serde_json::to_string(&job.benefits)?;
            let apply_options = serde_json::to_string(&job.apply_options)?;

            let inserted = sqlx::query(
                r#"
                INSERT INTO jobs (
                    id, source, source_id, title, company, description, short_description,
                    country, city, remote, work_arrangement, employment_type, seniority,
                    department, category, salary_min, salary_max, salary_currency, salary_period,
                    skills, required_years, education, responsibilities, benefits,
                    posted_at, application_deadline, fetched_at, apply_url, apply_options,
                    urgency, visa_sponsorship, enrichment, dedup_hash, quality_score, search_text
                )
                SELECT ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?,
                       ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?
                WHERE NOT EXISTS (SELECT 1 FROM jobs WHERE id = ? OR dedup_hash = ?)
                "#,
            )
            .bind(&job.id)
            .bind(&job.source)
            .bind(&job.source_id)
            .bind(&job.title)
            .bind(&job.company)
            .bind(&job.description)
            .bind(&job.short_description)
            .bind(&job.country)
            .bind(&job.city)
            .bind(job.remote)
            .bind(job.work_arrangement.map(|w| w.as_str()))
            .bind(job.employment_type.as_str())
            .bind(job.seniority.map(|s| s.as_str()))
            .bind(&job.department)
            .bind(job.category.as_str())
            .bind(job.salary_min)
            .bind(job.salary_max)
            .bind(&job.salary_currency)
            .bind(job.salary_period.map(|p| p.as_str()))
            .bind(&skills)
            .bind(job.required_years.map(i64::from))
            .bind(&job.education)
            .bind(&responsibilities)
            .bind(&benefits)
            .bind(job.posted_at.as_ref().map(encode_date))
            .bind(job.application_deadline.as_ref().map(encode_date))
            .bind(encode_date(&job.fetched_at))
            .bind(&job.apply_url)
            .bind(&apply_options)
            .bind(job.urgency.as_str())
            .bind(job.visa_sponsorship)
            .bind(job.enrichment.as_str())
            .bind(&job.dedup_hash)
            .bind(job.quality_score as i64)
            .bind(document.text())
            .bind(&job.id)
            .bind(&job.dedup_hash)
            .execute(&mut *tx)
            .await
            .map_err(IngestError::storage)?;

            if inserted.rows_affected() == 0 {
                summary.duplicate += 1;
                summary.rejected_ids.push(job.id.clone());
                continue;
            }

            sqlx::query(
                "INSERT INTO jobs_fts (id, title, company, skills, description) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&job.id)
            .bind(&document.title)
            .bind(&document.company)
            .bind(&document.skills)
            .bind(&document.description)
            .execute(&mut *tx)
            .await
            .map_err(IngestError::storage)?;

            summary.new += 1;
        }

        tx.commit().await.map_err(IngestError::storage)?;
        Ok(summary)
    }

    async fn existing_ids(&self, ids: &[String]) -> Result<HashSet<String>> {
        let mut known = HashSet::new();
        for chunk in ids.chunks(ID_CHUNK) {
            let mut qb = QueryBuilder::<Sqlite>::new("SELECT id FROM jobs WHERE id IN (");
            let mut values = qb.separated(", ");
            for id in chunk {
                values.push_bind(id.clone());
            }
            values.push_unseparated(")");

            let rows: Vec<String> = qb
                .build_query_scalar()
                .fetch_all(&self.pool)
                .await
                .map_err(IngestError::storage)?;
            known.extend(rows);
        }
        Ok(known)
    }
}

#[async_trait]
impl JobIndex for SqliteStore {
    async fn get_job(&self, id: &str) -> Result<Option<EnrichedJob>> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {} FROM jobs j WHERE j.id = ?",
            JOB_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(IngestError::storage)?;

        match row {
            Some(r) => Ok(Some(r.into_job()?)),
            None => Ok(None),
        }
    }

    async fn list_jobs(&self, query: &JobQuery) -> Result<JobPage> {
        let limit = query.effective_limit();

        if let Some(search) = &query.search {
            let terms = query_terms(validate_search(search)?);
            let total = self.ranked_count(&terms, &query.filter).await?;
            let jobs = self
                .ranked(&terms, &query.filter, limit, query.offset)
                .await?
                .into_iter()
                .map(|hit| hit.job)
                .collect();
            return Ok(JobPage { total, jobs });
        }

        let mut count_qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM jobs j WHERE 1 = 1");
        push_filter(&mut count_qb, &query.filter);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(IngestError::storage)?;

        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {} FROM jobs j WHERE 1 = 1",
            JOB_COLUMNS
        ));
        push_filter(&mut qb, &query.filter);
        // Newest first; undated listings sort last
        qb.push(" ORDER BY j.posted_at IS NULL, j.posted_at DESC, j.fetched_at DESC, j.id ASC LIMIT ")
            .push_bind(limit as i64)
            .push(" OFFSET ")
            .push_bind(query.offset as i64);

        let rows = qb
            .build_query_as::<JobRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(IngestError::storage)?;

        Ok(JobPage {
            total: total as usize,
            jobs: rows
                .into_iter()
                .map(JobRow::into_job)
                .collect::<Result<Vec<_>>>()?,
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
        if terms.is_empty() {
            return Ok(Vec::new());
        }
        self.ranked(&terms, filter, clamp_limit(limit), offset).await
    }

    async fn filter_facets(&self) -> Result<FilterFacets> {
        let remote: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM jobs WHERE remote = 1")
            .fetch_one(&self.pool)
            .await
            .map_err(IngestError::storage)?;

        Ok(FilterFacets {
            sources: self.facet("source").await?,
            employment_types: self.facet("employment_type").await?,
            seniority: self.facet("seniority").await?,
            categories: self.facet("category").await?,
            work_arrangements: self.facet("work_arrangement").await?,
            remote: remote as usize,
        })
    }

    async fn count(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM jobs")
            .fetch_one(&self.pool)
            .await
            .map_err(IngestError::storage)?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::enriched;
    use chrono::TimeZone;

    async fn test_store() -> SqliteStore {
        SqliteStore::in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn test_round_trip_fields() {
        let store = test_store().await;
        let mut job = enriched("remoteok", "42", "Senior Rust Engineer", "Acme");
        job.skills.insert("rust".into());
        job.skills.insert("kafka".into());
        job.seniority = Some(Seniority::Senior);
        job.work_arrangement = Some(WorkArrangement::Remote);
        job.remote = true;
        job.salary_min = Some(150_000.0);
        job.salary_period = Some(SalaryPeriod::Year);
        job.posted_at = Some(Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap());
        job.visa_sponsorship = Some(false);
        job.apply_options.push(ApplyOption {
            publisher: "Acme".into(),
            url: "https://acme.test/apply".into(),
            is_direct: true,
        });

        store.upsert(&[job.clone()]).await.unwrap();
        let stored = store.get_job("remoteok:42").await.unwrap().unwrap();

        assert_eq!(stored.title, job.title);
        assert_eq!(stored.skills, job.skills);
        assert_eq!(stored.seniority, job.seniority);
        assert_eq!(stored.work_arrangement, job.work_arrangement);
        assert_eq!(stored.posted_at, job.posted_at);
        assert_eq!(stored.visa_sponsorship, Some(false));
        assert_eq!(stored.apply_options, job.apply_options);
        assert_eq!(stored.dedup_hash, job.dedup_hash);
    }

    #[tokio::test]
    async fn test_upsert_rejects_duplicates() {
        let store = test_store().await;
        store
            .upsert(&[enriched("a", "1", "Backend Engineer", "Acme")])
            .await
            .unwrap();

        let summary = store
            .upsert(&[
                enriched("a", "1", "Renamed", "Other"),
                enriched("b", "9", "Backend Engineer", "ACME "),
                enriched("b", "10", "Frontend Engineer", "Acme"),
            ])
            .await
            .unwrap();

        assert_eq!(summary.new, 1);
        assert_eq!(summary.duplicate, 2);
        assert_eq!(store.count().await.unwrap(), 2);
        let original = store.get_job("a:1").await.unwrap().unwrap();
        assert_eq!(original.title, "Backend Engineer");
    }

    #[tokio::test]
    async fn test_existing_ids() {
        let store = test_store().await;
        store
            .upsert(&[enriched("a", "1", "Backend Engineer", "Acme")])
            .await
            .unwrap();

        let known = store
            .existing_ids(&["a:1".into(), "a:2".into()])
            .await
            .unwrap();
        assert_eq!(known, HashSet::from(["a:1".to_string()]));
    }

    #[tokio::test]
    async fn test_title_match_ranks_above_description() {
        let store = test_store().await;
        let titled = enriched("a", "1", "Senior Backend Engineer", "Acme");
        let mut described = enriched("a", "2", "Software Engineer", "Initech");
        described.description = "You will work on our backend services".into();
        store.upsert(&[described, titled]).await.unwrap();

        let hits = store.search("backend", &JobFilter::new(), 10, 0).await.unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].job.id, "a:1");
        assert!(hits[0].score > hits[1].score);
    }

    #[tokio::test]
    async fn test_list_with_filters() {
        let store = test_store().await;
        let mut remote = enriched("a", "1", "Backend Engineer", "Acme");
        remote.remote = true;
        let mut contract = enriched("b", "2", "Data Engineer", "Initech");
        contract.employment_type = EmploymentType::Contract;
        store.upsert(&[remote, contract]).await.unwrap();

        let page = store
            .list_jobs(&JobQuery::new(10, 0).with_filter(JobFilter::new().remote()))
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.jobs[0].id, "a:1");

        let page = store
            .list_jobs(
                &JobQuery::new(10, 0)
                    .with_filter(JobFilter::new().with_employment_type(EmploymentType::Contract)),
            )
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.jobs[0].id, "b:2");

        let searched = store
            .list_jobs(&JobQuery::new(10, 0).with_search("engineer"))
            .await
            .unwrap();
        assert_eq!(searched.total, 2);
    }

    #[tokio::test]
    async fn test_facets() {
        let store = test_store().await;
        let mut remote = enriched("a", "1", "Backend Engineer", "Acme");
        remote.remote = true;
        store
            .upsert(&[remote, enriched("a", "2", "Data Engineer", "Acme")])
            .await
            .unwrap();

        let facets = store.filter_facets().await.unwrap();
        assert_eq!(facets.sources, vec![FacetCount { value: "a".into(), count: 2 }]);
        assert_eq!(facets.remote, 1);
        assert!(facets.seniority.is_empty());
    }

    #[tokio::test]
    async fn test_short_query_rejected() {
        let store = test_store().await;
        assert!(matches!(
            store.search(" x ", &JobFilter::new(), 10, 0).await,
            Err(IngestError::InvalidQuery { .. })
        ));
    }
}
