//! Fetch coordination across independent sources.

use chrono::Utc;
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{SourceError, SourceResult};
use crate::traits::source::SourceAdapter;
use crate::types::{
    config::IngestConfig,
    listing::{RawListing, RawRecord},
    stats::SourceStats,
};

/// Everything the coordinator gathered in one pass.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    /// Listings from every adapter that succeeded, grouped by adapter in
    /// the order the adapters were given
    pub listings: Vec<RawListing>,

    /// `fetched` count or `fetch_error` for every adapter
    pub per_source: BTreeMap<String, SourceStats>,
}

/// Poll every adapter concurrently and merge their listings.
///
/// A failing adapter never affects the others: its error is recorded in
/// its `SourceStats` and it contributes no listings.
pub async fn fetch_all(
    adapters: &[Arc<dyn SourceAdapter>],
    config: &IngestConfig,
) -> FetchOutcome {
    let fetched_at = Utc::now();

    let results = join_all(
        adapters
            .iter()
            .map(|adapter| fetch_with_retry(adapter.as_ref(), config)),
    )
    .await;

    let mut outcome = FetchOutcome::default();
    for (adapter, result) in adapters.iter().zip(results) {
        let name = adapter.name().to_string();
        let stats = outcome.per_source.entry(name.clone()).or_default();
        match result {
            Ok(records) => {
                info!(source = %name, count = records.len(), "Fetched listings");
                stats.fetched += records.len() as u32;
                outcome.listings.extend(
                    records
                        .into_iter()
                        .map(|record| RawListing::from_record(&name, fetched_at, record)),
                );
            }
            Err(e) => {
                warn!(source = %name, error = %e, "Source fetch failed");
                stats.fetch_error = Some(e.to_string());
            }
        }
    }

    outcome
}

async fn fetch_with_retry(
    adapter: &dyn SourceAdapter,
    config: &IngestConfig,
) -> SourceResult<Vec<RawRecord>> {
    let mut attempt = 0;
    loop {
        let result = match tokio::time::timeout(config.fetch_timeout, adapter.fetch()).await {
            Ok(result) => result,
            Err(_) => Err(SourceError::Timeout {
                seconds: config.fetch_timeout.as_secs(),
            }),
        };

        match result {
            Ok(records) => return Ok(records),
            Err(e) if attempt < config.fetch_retries => {
                attempt += 1;
                warn!(
                    source = adapter.name(),
                    attempt,
                    error = %e,
                    "Retrying source fetch"
                );
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingSource, SlowSource, StaticSource};
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test]
    async fn test_failure_is_isolated() {
        let adapters: Vec<Arc<dyn SourceAdapter>> = vec![
            Arc::new(StaticSource::new(
                "good",
                vec![RawRecord::new("1", json!({"title": "A"}))],
            )),
            Arc::new(FailingSource::new("bad")),
        ];

        let outcome = fetch_all(&adapters, &IngestConfig::default()).await;

        assert_eq!(outcome.listings.len(), 1);
        assert_eq!(outcome.listings[0].source, "good");
        assert_eq!(outcome.per_source["good"].fetched, 1);
        assert!(outcome.per_source["bad"].fetch_error.is_some());
    }

    #[tokio::test]
    async fn test_failed_fetch_is_retried_once() {
        let failing = Arc::new(FailingSource::new("bad"));
        let adapters: Vec<Arc<dyn SourceAdapter>> = vec![failing.clone()];

        fetch_all(&adapters, &IngestConfig::default()).await;

        assert_eq!(failing.calls(), 2);
    }

    #[tokio::test]
    async fn test_slow_source_times_out() {
        let adapters: Vec<Arc<dyn SourceAdapter>> =
            vec![Arc::new(SlowSource::new("slow", Duration::from_secs(5)))];
        let config = IngestConfig::default().with_fetch_timeout(Duration::from_millis(20));

        let outcome = fetch_all(&adapters, &config).await;

        let error = outcome.per_source["slow"].fetch_error.as_deref().unwrap();
        assert!(error.contains("timed out"));
        assert!(outcome.listings.is_empty());
    }

    #[tokio::test]
    async fn test_order_preserved_within_source() {
        let records = (0..5)
            .map(|i| RawRecord::new(i.to_string(), json!({})))
            .collect();
        let adapters: Vec<Arc<dyn SourceAdapter>> =
            vec![Arc::new(StaticSource::new("s", records))];

        let outcome = fetch_all(&adapters, &IngestConfig::default()).await;

        let ids: Vec<&str> = outcome.listings.iter().map(|l| l.source_id.as_str()).collect();
        assert_eq!(ids, vec!["0", "1", "2", "3", "4"]);
    }
}
