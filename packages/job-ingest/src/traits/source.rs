//! Fetch adapter trait.
//!
//! Each external job board is one adapter. The coordinator only ever holds
//! `Arc<dyn SourceAdapter>`; nothing downstream knows which concrete source
//! produced a listing beyond its name.
//!
//! # Usage
//!
//! ```rust,ignore
//! use job_ingest::traits::source::SourceAdapter;
//!
//! let records = adapter.fetch().await?;
//! println!("{} returned {} records", adapter.name(), records.len());
//! ```

use async_trait::async_trait;

use crate::error::SourceResult;
use crate::types::listing::RawRecord;

/// A producer of raw, source-native job records.
///
/// Implementations own transport, authentication and pagination. The
/// pipeline adds timeouts and a retry around `fetch`, so implementations
/// should not retry internally.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Stable source name, used as the first half of every record id.
    fn name(&self) -> &str;

    /// Fetch the current set of postings.
    async fn fetch(&self) -> SourceResult<Vec<RawRecord>>;
}
