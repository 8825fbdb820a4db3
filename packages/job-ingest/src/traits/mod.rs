//! Core trait abstractions for the ingestion pipeline.

pub mod ai;
pub mod source;
pub mod store;

pub use ai::{AiItem, ExtractedFields, AI};
pub use source::SourceAdapter;
pub use store::{JobIndex, JobSink, JobStore};
