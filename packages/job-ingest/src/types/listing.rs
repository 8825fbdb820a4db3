//! Raw, source-native listings before enrichment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One record as produced by a fetch adapter.
///
/// The payload is opaque to the pipeline; only the rule-based extractor
/// and the AI look inside it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecord {
    /// Identifier of the posting within its source
    pub source_id: String,

    /// Source-specific fields
    pub payload: Value,
}

impl RawRecord {
    /// Create a new raw record.
    pub fn new(source_id: impl Into<String>, payload: Value) -> Self {
        Self {
            source_id: source_id.into(),
            payload,
        }
    }
}

/// A raw record tagged with its provenance.
///
/// Created by the fetch coordinator, consumed once by the age filter and
/// the enrichment stage. Never persisted directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawListing {
    /// Name of the adapter that produced this listing
    pub source: String,

    /// Identifier of the posting within its source
    pub source_id: String,

    /// When the coordinator fetched it
    pub fetched_at: DateTime<Utc>,

    /// Source-specific fields
    pub payload: Value,
}

impl RawListing {
    /// Create a new listing fetched now.
    pub fn new(source: impl Into<String>, source_id: impl Into<String>, payload: Value) -> Self {
        Self {
            source: source.into(),
            source_id: source_id.into(),
            fetched_at: Utc::now(),
            payload,
        }
    }

    /// Tag a raw record with its source and fetch time.
    pub fn from_record(source: &str, fetched_at: DateTime<Utc>, record: RawRecord) -> Self {
        Self {
            source: source.to_string(),
            source_id: record.source_id,
            fetched_at,
            payload: record.payload,
        }
    }

    /// Set the fetched timestamp.
    pub fn with_fetched_at(mut self, fetched_at: DateTime<Utc>) -> Self {
        self.fetched_at = fetched_at;
        self
    }

    /// The record id this listing will be stored under.
    pub fn record_id(&self) -> String {
        record_id(&self.source, &self.source_id)
    }
}

/// Derive the store key for a posting: `source:source_id`.
pub fn record_id(source: &str, source_id: &str) -> String {
    format!("{}:{}", source, source_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_id_format() {
        let listing = RawListing::new("remoteok", "12345", json!({}));
        assert_eq!(listing.record_id(), "remoteok:12345");
    }

    #[test]
    fn test_from_record_keeps_payload() {
        let now = Utc::now();
        let record = RawRecord::new("abc", json!({"title": "Backend Engineer"}));
        let listing = RawListing::from_record("adzuna", now, record);

        assert_eq!(listing.source, "adzuna");
        assert_eq!(listing.source_id, "abc");
        assert_eq!(listing.fetched_at, now);
        assert_eq!(listing.payload["title"], "Backend Engineer");
    }
}
