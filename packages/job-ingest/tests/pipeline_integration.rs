//! End-to-end ingestion runs against in-memory fixtures.

use chrono::{Duration as ChronoDuration, Utc};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use job_ingest::rules::UNKNOWN_COMPANY;
use job_ingest::testing::{
    listing_record, FailingSource, FlakyStore, MockAI, RecordingStore, StaticSource,
};
use job_ingest::{
    dedup_hash, EnrichmentMethod, IngestConfig, Ingestor, JobFilter, JobIndex, MemoryStore,
    RawRecord, SourceAdapter,
};

fn source(name: &str, jobs: &[(&str, &str)]) -> Arc<dyn SourceAdapter> {
    let records = jobs
        .iter()
        .enumerate()
        .map(|(i, (title, company))| listing_record(&format!("{}-{}", name, i), title, company))
        .collect();
    Arc::new(StaticSource::new(name, records))
}

fn fast_retry() -> IngestConfig {
    IngestConfig::default().with_persist_retry(3, Duration::from_millis(1))
}

#[tokio::test]
async fn test_second_run_adds_nothing() {
    let store = Arc::new(MemoryStore::new());
    let ingestor = Ingestor::new(store.clone())
        .with_source(source("a", &[("Backend Engineer", "Acme"), ("SRE", "Initech")]))
        .with_ai(Arc::new(MockAI::new()));

    let first = ingestor.run().await.unwrap();
    let second = ingestor.run().await.unwrap();

    assert_eq!(first.totals().new, 2);
    assert_eq!(second.totals().new, 0);
    assert_eq!(second.totals().total_duplicates(), 2);
    assert_eq!(store.count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_same_job_from_two_sources_kept_once() {
    let store = Arc::new(MemoryStore::new());
    let ingestor = Ingestor::new(store.clone())
        .with_source(source("board_a", &[("Backend Engineer", "Acme")]))
        .with_source(source("board_b", &[("Backend Engineer", "Acme")]))
        .with_ai(Arc::new(MockAI::new()));

    let stats = ingestor.run().await.unwrap();

    assert_eq!(
        dedup_hash("Backend Engineer", "Acme"),
        dedup_hash(" backend engineer", "ACME ")
    );
    assert_eq!(stats.totals().new, 1);
    assert_eq!(stats.totals().duplicates, 1);
    assert_eq!(store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_same_job_in_concurrent_batches_kept_once() {
    let store = Arc::new(RecordingStore::new());
    let ingestor = Ingestor::new(store.clone())
        .with_config(IngestConfig::default().with_batch_size(1).with_concurrency(10))
        .with_source(source("board_a", &[("Backend Engineer", "Acme")]))
        .with_source(source("board_b", &[("Backend Engineer", "Acme")]))
        .with_ai(Arc::new(MockAI::new().with_delay(Duration::from_millis(10))));

    let stats = ingestor.run().await.unwrap();

    assert_eq!(stats.totals().new, 1);
    assert_eq!(stats.totals().duplicates, 1);
    assert_eq!(store.upsert_calls(), vec![1]);
    assert_eq!(store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_age_window() {
    let now = Utc::now();
    let posted = |age: ChronoDuration| (now - age).to_rfc3339();
    let records = vec![
        RawRecord::new(
            "inside",
            json!({"title": "Data Engineer", "company": "Acme", "posted_at": posted(ChronoDuration::days(15) - ChronoDuration::minutes(5))}),
        ),
        RawRecord::new(
            "outside",
            json!({"title": "ML Engineer", "company": "Acme", "posted_at": posted(ChronoDuration::days(16))}),
        ),
    ];
    let store = Arc::new(MemoryStore::new());
    let ingestor = Ingestor::new(store.clone())
        .with_source(Arc::new(StaticSource::new("s", records)));

    let stats = ingestor.run().await.unwrap();

    assert_eq!(stats.sources["s"].filtered_stale, 1);
    assert_eq!(stats.sources["s"].new, 1);
    assert!(store.get_job("s:inside").await.unwrap().is_some());
    assert!(store.get_job("s:outside").await.unwrap().is_none());
}

#[tokio::test]
async fn test_failing_ai_still_produces_complete_records() {
    let records = vec![
        listing_record("1", "Senior Python Developer", "Acme"),
        RawRecord::new("2", json!({"description": "We need someone who knows Kubernetes."})),
    ];
    let store = Arc::new(MemoryStore::new());
    let ingestor = Ingestor::new(store.clone())
        .with_source(Arc::new(StaticSource::new("s", records)))
        .with_ai(Arc::new(MockAI::new().failing()));

    let stats = ingestor.run().await.unwrap();

    assert_eq!(stats.totals().enriched_fallback, 2);
    assert_eq!(stats.totals().enriched_ai, 0);
    for job in store.all_jobs() {
        assert!(!job.title.is_empty());
        assert!(!job.company.is_empty());
        assert!(job.quality_score <= 100);
        assert_eq!(job.enrichment, EnrichmentMethod::Fallback);
    }
    let sparse = store.get_job("s:2").await.unwrap().unwrap();
    assert_eq!(sparse.title, "We need someone who knows Kubernetes");
    assert_eq!(sparse.company, UNKNOWN_COMPANY);
    assert!(sparse.skills.contains("kubernetes"));
}

#[tokio::test]
async fn test_concurrency_cap_holds() {
    let ai = Arc::new(MockAI::new().with_delay(Duration::from_millis(20)));
    let sources: Vec<Arc<dyn SourceAdapter>> = (0..10)
        .map(|i| {
            let company = format!("Company {}", i);
            source(&format!("s{}", i), &[("Platform Engineer", company.as_str())])
        })
        .collect();
    let ingestor = Ingestor::new(Arc::new(MemoryStore::new()))
        .with_config(IngestConfig::default().with_batch_size(1).with_concurrency(2))
        .with_sources(sources)
        .with_ai(ai.clone());

    let stats = ingestor.run().await.unwrap();

    assert_eq!(stats.totals().new, 10);
    assert_eq!(ai.call_count(), 10);
    assert!(ai.max_in_flight() <= 2);
    assert!(ai.max_in_flight() >= 1);
}

#[tokio::test]
async fn test_malformed_items_fall_back_within_one_upsert() {
    let records = (0..5)
        .map(|i| listing_record(&i.to_string(), &format!("Engineer {}", i), "Acme"))
        .collect();
    let store = Arc::new(RecordingStore::new());
    let ingestor = Ingestor::new(store.clone())
        .with_source(Arc::new(StaticSource::new("s", records)))
        .with_ai(Arc::new(MockAI::new().with_malformed(["s:1", "s:3"])));

    let stats = ingestor.run().await.unwrap();

    assert_eq!(stats.totals().enriched_ai, 3);
    assert_eq!(stats.totals().enriched_fallback, 2);
    assert_eq!(store.upsert_calls(), vec![5]);
    assert_eq!(store.count().await.unwrap(), 5);
}

#[tokio::test]
async fn test_title_match_ranks_first() {
    let records = vec![
        RawRecord::new(
            "desc",
            json!({"title": "Software Engineer", "company": "Initech", "description": "Mostly backend services work."}),
        ),
        RawRecord::new(
            "title",
            json!({"title": "Backend Engineer", "company": "Acme", "description": "Services and APIs."}),
        ),
    ];
    let store = Arc::new(MemoryStore::new());
    Ingestor::new(store.clone())
        .with_source(Arc::new(StaticSource::new("s", records)))
        .run()
        .await
        .unwrap();

    let hits = store.search("backend", &JobFilter::new(), 10, 0).await.unwrap();

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].job.id, "s:title");
}

#[tokio::test]
async fn test_transient_store_failure_is_retried() {
    let store = Arc::new(FlakyStore::new(2));
    let ingestor = Ingestor::new(store.clone())
        .with_config(fast_retry())
        .with_source(source("s", &[("Backend Engineer", "Acme"), ("SRE", "Acme")]));

    let stats = ingestor.run().await.unwrap();

    assert!(stats.success);
    assert_eq!(stats.totals().new, 2);
    assert_eq!(store.attempts(), 3);
}

#[tokio::test]
async fn test_lost_batch_is_counted_and_run_continues() {
    let store = Arc::new(FlakyStore::always_failing());
    let ingestor = Ingestor::new(store.clone())
        .with_config(fast_retry().with_batch_size(1))
        .with_source(source("s", &[("Backend Engineer", "Acme"), ("SRE", "Acme")]));

    let stats = ingestor.run().await.unwrap();

    assert!(!stats.success);
    assert_eq!(stats.failed_batches, 2);
    assert_eq!(stats.totals().failed, 2);
    assert_eq!(stats.totals().new, 0);
    assert_eq!(store.attempts(), 6);
}

#[tokio::test]
async fn test_cancel_stops_dispatch() {
    let records = (0..5)
        .map(|i| listing_record(&i.to_string(), &format!("Engineer {}", i), "Acme"))
        .collect();
    let store = Arc::new(MemoryStore::new());
    let ingestor = Ingestor::new(store.clone())
        .with_config(IngestConfig::default().with_batch_size(1).with_concurrency(1))
        .with_source(Arc::new(StaticSource::new("s", records)))
        .with_ai(Arc::new(MockAI::new().with_delay(Duration::from_millis(200))));

    let cancel = CancellationToken::new();
    let run = tokio::spawn({
        let ingestor = ingestor.clone();
        let cancel = cancel.clone();
        async move { ingestor.run_until_cancelled(cancel).await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();

    let stats = run.await.unwrap().unwrap();

    assert!(stats.cancelled);
    assert!(!stats.success);
    let new = stats.totals().new;
    assert!(new >= 1, "in-flight batch should finish and persist");
    assert!(new < 5);
    assert_eq!(store.count().await.unwrap(), new as usize);
}

#[tokio::test]
async fn test_failing_source_is_isolated() {
    let store = Arc::new(MemoryStore::new());
    let ingestor = Ingestor::new(store.clone())
        .with_source(Arc::new(FailingSource::new("down")))
        .with_source(source("up", &[("Backend Engineer", "Acme")]));

    let stats = ingestor.run().await.unwrap();

    assert!(stats.success);
    assert_eq!(stats.failed_sources(), vec!["down"]);
    assert_eq!(stats.sources["up"].new, 1);
}
