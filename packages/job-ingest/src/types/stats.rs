//! Run reporting: per-source and per-run counters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Counters for one source within one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceStats {
    /// Raw listings returned by the adapter
    pub fetched: u32,
    /// Dropped by the age filter
    pub filtered_stale: u32,
    /// Skipped before enrichment because the record id was already stored
    pub known_skipped: u32,
    pub enriched_ai: u32,
    pub enriched_fallback: u32,
    /// Accepted and persisted
    pub new: u32,
    /// Rejected by the deduplicator (in-run or against the store)
    pub duplicates: u32,
    /// Listings that could not be enriched or persisted
    pub failed: u32,
    /// Set when the adapter itself failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch_error: Option<String>,
}

impl SourceStats {
    /// Add another set of counters into this one.
    ///
    /// A fetch error on either side is kept.
    pub fn merge(&mut self, other: &SourceStats) {
        self.fetched += other.fetched;
        self.filtered_stale += other.filtered_stale;
        self.known_skipped += other.known_skipped;
        self.enriched_ai += other.enriched_ai;
        self.enriched_fallback += other.enriched_fallback;
        self.new += other.new;
        self.duplicates += other.duplicates;
        self.failed += other.failed;
        if self.fetch_error.is_none() {
            self.fetch_error.clone_from(&other.fetch_error);
        }
    }

    /// All duplicate rejections, including pre-enrichment id skips.
    pub fn total_duplicates(&self) -> u32 {
        self.duplicates + self.known_skipped
    }
}

/// Stats for one end-to-end run.
///
/// Built by the run loop alone; batch tasks hand their counters back
/// instead of touching this directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionRunStats {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub success: bool,
    pub cancelled: bool,
    /// The AI circuit breaker tripped during this run
    pub ai_disabled: bool,
    /// Batches whose persistence failed after all retries
    pub failed_batches: u32,
    pub sources: BTreeMap<String, SourceStats>,
}

impl IngestionRunStats {
    /// Start a new run.
    pub fn start() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            success: false,
            cancelled: false,
            ai_disabled: false,
            failed_batches: 0,
            sources: BTreeMap::new(),
        }
    }

    /// Counters for a source, created on first use.
    pub fn source_mut(&mut self, source: &str) -> &mut SourceStats {
        self.sources.entry(source.to_string()).or_default()
    }

    /// Fold per-source counters into the run.
    pub fn absorb(&mut self, counters: &BTreeMap<String, SourceStats>) {
        for (source, stats) in counters {
            self.source_mut(source).merge(stats);
        }
    }

    /// Sum of every source's counters.
    pub fn totals(&self) -> SourceStats {
        let mut total = SourceStats::default();
        for stats in self.sources.values() {
            total.merge(stats);
        }
        total.fetch_error = None;
        total
    }

    /// Names of sources whose adapter failed.
    pub fn failed_sources(&self) -> Vec<&str> {
        self.sources
            .iter()
            .filter(|(_, s)| s.fetch_error.is_some())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Seal the run. Success means it was not cancelled, every batch was
    /// persisted, and at least one source delivered (or none were asked).
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
        let any_source_ok =
            self.sources.is_empty() || self.sources.values().any(|s| s.fetch_error.is_none());
        self.success = !self.cancelled && self.failed_batches == 0 && any_source_ok;
    }

    /// Wall-clock duration, once finished.
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.finished_at.map(|end| end - self.started_at)
    }
}

impl std::fmt::Display for IngestionRunStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Ingestion Run {} ===", self.run_id)?;
        writeln!(
            f,
            "Status:   {}{}",
            if self.success { "ok" } else { "degraded" },
            if self.cancelled { " (cancelled)" } else { "" }
        )?;
        if let Some(duration) = self.duration() {
            writeln!(f, "Duration: {}ms", duration.num_milliseconds())?;
        }
        if self.ai_disabled {
            writeln!(f, "AI:       disabled mid-run, fallback only")?;
        }
        writeln!(
            f,
            "\n{:<16} {:>7} {:>6} {:>6} {:>6} {:>8} {:>6} {:>6} {:>6}",
            "source", "fetched", "stale", "ai", "rules", "new", "dupes", "failed", ""
        )?;
        for (name, s) in &self.sources {
            writeln!(
                f,
                "{:<16} {:>7} {:>6} {:>6} {:>6} {:>8} {:>6} {:>6} {}",
                name,
                s.fetched,
                s.filtered_stale,
                s.enriched_ai,
                s.enriched_fallback,
                s.new,
                s.total_duplicates(),
                s.failed,
                s.fetch_error.as_deref().map(|e| format!("error: {}", e)).unwrap_or_default()
            )?;
        }
        let t = self.totals();
        writeln!(
            f,
            "{:<16} {:>7} {:>6} {:>6} {:>6} {:>8} {:>6} {:>6}",
            "TOTAL",
            t.fetched,
            t.filtered_stale,
            t.enriched_ai,
            t.enriched_fallback,
            t.new,
            t.total_duplicates(),
            t.failed
        )?;
        if self.failed_batches > 0 {
            writeln!(f, "\nBatches failed to persist: {}", self.failed_batches)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_totals_sum_sources() {
        let mut stats = IngestionRunStats::start();
        stats.source_mut("a").new = 3;
        stats.source_mut("a").duplicates = 1;
        stats.source_mut("b").new = 2;
        stats.source_mut("b").known_skipped = 4;

        let totals = stats.totals();
        assert_eq!(totals.new, 5);
        assert_eq!(totals.total_duplicates(), 5);
    }

    #[test]
    fn test_finish_marks_success() {
        let mut stats = IngestionRunStats::start();
        stats.source_mut("a").fetched = 1;
        stats.finish();
        assert!(stats.success);
        assert!(stats.finished_at.is_some());
    }

    #[test]
    fn test_all_sources_failing_is_not_success() {
        let mut stats = IngestionRunStats::start();
        stats.source_mut("a").fetch_error = Some("timed out".into());
        stats.finish();
        assert!(!stats.success);
        assert_eq!(stats.failed_sources(), vec!["a"]);
    }

    #[test]
    fn test_failed_batch_is_not_success() {
        let mut stats = IngestionRunStats::start();
        stats.failed_batches = 1;
        stats.finish();
        assert!(!stats.success);
    }
}
