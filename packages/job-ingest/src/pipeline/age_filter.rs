//! Staleness filter applied before enrichment.

use chrono::{DateTime, Duration, Utc};

use crate::rules::payload::{self, POSTED_AT};
use crate::types::config::{IngestConfig, UnknownAgePolicy, MAX_AGE_DAYS};
use crate::types::listing::RawListing;

/// Drops listings posted longer ago than the configured window.
#[derive(Debug, Clone, Copy)]
pub struct AgeFilter {
    max_age: Duration,
    unknown: UnknownAgePolicy,
}

impl AgeFilter {
    pub fn new(max_age_days: i64, unknown: UnknownAgePolicy) -> Self {
        Self {
            max_age: Duration::days(max_age_days.clamp(0, MAX_AGE_DAYS)),
            unknown,
        }
    }

    pub fn from_config(config: &IngestConfig) -> Self {
        Self::new(config.max_age_days, config.unknown_age)
    }

    /// Best-known posted date from the payload.
    pub fn posted_at(listing: &RawListing) -> Option<DateTime<Utc>> {
        payload::date_field(&listing.payload, POSTED_AT)
    }

    /// Fresh when `now - posted <= max_age`.
    pub fn is_fresh_at(&self, listing: &RawListing, now: DateTime<Utc>) -> bool {
        match Self::posted_at(listing) {
            Some(posted) => now - posted <= self.max_age,
            None => self.unknown == UnknownAgePolicy::Keep,
        }
    }

    /// Split listings into (fresh, stale).
    pub fn partition(
        &self,
        listings: Vec<RawListing>,
        now: DateTime<Utc>,
    ) -> (Vec<RawListing>, Vec<RawListing>) {
        listings
            .into_iter()
            .partition(|listing| self.is_fresh_at(listing, now))
    }
}
