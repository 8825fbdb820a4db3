//! Deterministic, rule-based extraction.
//!
//! This is the fallback path when AI extraction is unavailable or fails,
//! and the baseline the AI output is merged over. Nothing here does I/O.

pub mod fallback;
pub mod payload;
pub mod quality;
pub mod skills;
pub mod urgency;

pub use fallback::rule_based;
pub use quality::{completeness, score, Completeness};
pub use skills::{categorize_role, extract_skills};
pub use urgency::{detect_urgency, extract_deadline};

/// Company used when a listing names none.
pub const UNKNOWN_COMPANY: &str = "Unknown Company";

/// Title used when a listing has a description but no title.
pub const UNTITLED: &str = "Untitled position";
