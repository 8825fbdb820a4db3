//! Configuration for an ingestion run.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigError;

/// Upper bound for `max_age_days`, about a century.
pub const MAX_AGE_DAYS: i64 = 36_500;

/// What to do with listings whose posted date cannot be determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownAgePolicy {
    /// Treat as fresh and enrich it
    #[default]
    Keep,
    /// Treat as stale and drop it
    Drop,
}

/// Configuration for the ingestion pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Listings per AI extraction call.
    ///
    /// Default: 5.
    pub batch_size: usize,

    /// Maximum batches in flight at once. This is a hard bound.
    ///
    /// Default: 10.
    pub concurrency: usize,

    /// Listings older than this many days are dropped before enrichment.
    ///
    /// Default: 15.
    pub max_age_days: i64,

    /// Policy for listings with no parseable posted date.
    #[serde(default)]
    pub unknown_age: UnknownAgePolicy,

    /// Deadline for a single adapter fetch.
    pub fetch_timeout: Duration,

    /// Extra attempts for a failed adapter fetch.
    ///
    /// Default: 1.
    pub fetch_retries: u32,

    /// Deadline for one AI batch call.
    pub ai_timeout: Duration,

    /// Consecutive whole-batch AI failures before the run stops calling
    /// the AI and uses the rule-based extractor only.
    ///
    /// Default: 3.
    pub ai_failure_threshold: u32,

    /// Total attempts for persisting one batch.
    ///
    /// Default: 3.
    pub persist_attempts: u32,

    /// Backoff before the first persistence retry; doubles each retry.
    pub persist_backoff: Duration,

    /// Use the AI extractor when one is configured.
    ///
    /// Default: true.
    pub use_ai: bool,

    /// Skip listings whose record id is already stored before paying for
    /// enrichment.
    ///
    /// Default: true.
    pub skip_known_ids: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            concurrency: 10,
            max_age_days: 15,
            unknown_age: UnknownAgePolicy::Keep,
            fetch_timeout: Duration::from_secs(30),
            fetch_retries: 1,
            ai_timeout: Duration::from_secs(60),
            ai_failure_threshold: 3,
            persist_attempts: 3,
            persist_backoff: Duration::from_millis(250),
            use_ai: true,
            skip_known_ids: true,
        }
    }
}

impl IngestConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set concurrency.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the maximum listing age in days.
    pub fn with_max_age_days(mut self, days: i64) -> Self {
        self.max_age_days = days;
        self
    }

    /// Set the unknown-age policy.
    pub fn with_unknown_age(mut self, policy: UnknownAgePolicy) -> Self {
        self.unknown_age = policy;
        self
    }

    /// Set the fetch timeout.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Set the AI call timeout.
    pub fn with_ai_timeout(mut self, timeout: Duration) -> Self {
        self.ai_timeout = timeout;
        self
    }

    /// Set persistence retry behaviour.
    pub fn with_persist_retry(mut self, attempts: u32, backoff: Duration) -> Self {
        self.persist_attempts = attempts;
        self.persist_backoff = backoff;
        self
    }

    /// Disable AI extraction entirely.
    pub fn without_ai(mut self) -> Self {
        self.use_ai = false;
        self
    }

    /// Check thresholds. Called once before any run starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid {
                field: "batch_size",
                reason: "must be at least 1".into(),
            });
        }
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid {
                field: "concurrency",
                reason: "must be at least 1".into(),
            });
        }
        if !(0..=MAX_AGE_DAYS).contains(&self.max_age_days) {
            return Err(ConfigError::Invalid {
                field: "max_age_days",
                reason: format!(
                    "must be between 0 and {}, got {}",
                    MAX_AGE_DAYS, self.max_age_days
                ),
            });
        }
        if self.persist_attempts == 0 {
            return Err(ConfigError::Invalid {
                field: "persist_attempts",
                reason: "must be at least 1".into(),
            });
        }
        if self.fetch_timeout.is_zero() || self.ai_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                field: "timeout",
                reason: "timeouts must be non-zero".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = IngestConfig::default();
        assert_eq!(config.batch_size, 5);
        assert_eq!(config.concurrency, 10);
        assert_eq!(config.max_age_days, 15);
        assert_eq!(config.unknown_age, UnknownAgePolicy::Keep);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let config = IngestConfig::new().with_concurrency(0);
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "concurrency", .. }));
    }

    #[test]
    fn test_negative_age_rejected() {
        let config = IngestConfig::new().with_max_age_days(-1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_huge_age_rejected() {
        let config = IngestConfig::new().with_max_age_days(200_000_000_000);
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "max_age_days", .. }));

        assert!(IngestConfig::new().with_max_age_days(MAX_AGE_DAYS).validate().is_ok());
    }
}
