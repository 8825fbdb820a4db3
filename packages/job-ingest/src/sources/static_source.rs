//! A source that always returns the same records.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::SourceResult;
use crate::traits::source::SourceAdapter;
use crate::types::listing::RawRecord;

/// Fetch adapter over a fixed list of records.
///
/// Useful for fixtures, replays of captured feeds, and tests. Every fetch
/// returns the same records in the same order.
pub struct StaticSource {
    name: String,
    records: Vec<RawRecord>,
    fetches: AtomicUsize,
}

impl StaticSource {
    /// Create a source with the given name and records.
    pub fn new(name: impl Into<String>, records: Vec<RawRecord>) -> Self {
        Self {
            name: name.into(),
            records,
            fetches: AtomicUsize::new(0),
        }
    }

    /// Load records from a JSON array of `{source_id, payload}` objects.
    pub fn from_json(name: impl Into<String>, json: &str) -> serde_json::Result<Self> {
        Ok(Self::new(name, serde_json::from_str(json)?))
    }

    /// Number of times `fetch` has been called.
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceAdapter for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> SourceResult<Vec<RawRecord>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.records.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_from_json() {
        let source = StaticSource::from_json(
            "fixture",
            r#"[{"source_id": "1", "payload": {"title": "Backend Engineer"}}]"#,
        )
        .unwrap();

        let records = source.fetch().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].payload["title"], "Backend Engineer");
        assert_eq!(source.fetches(), 1);
    }
}
