//! Per-batch persistence with bounded retry.

use std::time::Duration;
use tracing::warn;

use crate::error::Result;
use crate::traits::store::JobSink;
use crate::types::{job::EnrichedJob, query::UpsertSummary};

/// Upsert a batch, retrying with exponential backoff.
///
/// `attempts` counts the first try. Returns the last error once every
/// attempt has failed; the caller decides what a lost batch means.
pub async fn persist_with_retry<S>(
    store: &S,
    batch: &[EnrichedJob],
    attempts: u32,
    backoff: Duration,
) -> Result<UpsertSummary>
where
    S: JobSink + ?Sized,
{
    let attempts = attempts.max(1);
    let mut delay = backoff;
    let mut attempt = 1;

    loop {
        match store.upsert(batch).await {
            Ok(summary) => return Ok(summary),
            Err(e) if attempt < attempts => {
                warn!(
                    attempt,
                    attempts,
                    batch_size = batch.len(),
                    error = %e,
                    "Persist failed, retrying in {}ms",
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
                delay = delay.saturating_mul(2);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{enriched, FlakyStore};
    use crate::traits::store::JobIndex;

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        let store = FlakyStore::new(2);
        let batch = vec![enriched("s", "1", "Backend Engineer", "Acme")];

        let summary = persist_with_retry(&store, &batch, 3, Duration::from_millis(1))
            .await
            .unwrap();

        assert_eq!(summary.new, 1);
        assert_eq!(store.attempts(), 3);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_attempts() {
        let store = FlakyStore::new(10);
        let batch = vec![enriched("s", "1", "Backend Engineer", "Acme")];

        let result = persist_with_retry(&store, &batch, 3, Duration::from_millis(1)).await;

        assert!(result.is_err());
        assert_eq!(store.attempts(), 3);
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
