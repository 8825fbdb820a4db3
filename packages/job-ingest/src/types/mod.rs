//! Domain types for listings, enriched jobs, run stats and queries.

pub mod config;
pub mod job;
pub mod listing;
pub mod query;
pub mod stats;
