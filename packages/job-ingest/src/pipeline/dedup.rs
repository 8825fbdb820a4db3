//! Identity hashing and the in-run duplicate index.
//!
//! Two listings are the same job when their trimmed, lowercased title and
//! company match. The durable store rejects hashes it already holds; this
//! index catches collisions between batches of the same run before they
//! reach the store.

use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};

use crate::types::job::EnrichedJob;

/// Hex characters kept from the digest.
const HASH_LEN: usize = 16;

/// Identity hash of a (title, company) pair.
pub fn dedup_hash(title: &str, company: &str) -> String {
    let key = format!(
        "{}_{}",
        title.trim().to_lowercase(),
        company.trim().to_lowercase()
    );
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..HASH_LEN].to_string()
}

/// Result of claiming a record for this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Claim {
    Accepted,
    /// The same record id was already claimed this run
    DuplicateId,
    /// Another record with the same hash was claimed this run
    DuplicateHash { existing: String },
}

impl Claim {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Claim::Accepted)
    }
}

/// Records admitted and rejected for one batch.
#[derive(Debug, Default)]
pub struct Admission {
    pub accepted: Vec<EnrichedJob>,
    pub rejected: Vec<EnrichedJob>,
}

/// Hashes and ids claimed so far in one run.
///
/// Shared by all batch tasks behind a `tokio::sync::Mutex`; a whole batch
/// is admitted under one lock so check-and-claim is atomic.
#[derive(Debug, Default)]
pub struct DedupIndex {
    by_hash: HashMap<String, String>,
    claimed_ids: HashSet<String>,
}

impl DedupIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `(id, hash)` unless either is already taken.
    pub fn claim(&mut self, id: &str, hash: &str) -> Claim {
        if self.claimed_ids.contains(id) {
            return Claim::DuplicateId;
        }
        if let Some(existing) = self.by_hash.get(hash) {
            return Claim::DuplicateHash {
                existing: existing.clone(),
            };
        }
        self.claimed_ids.insert(id.to_string());
        self.by_hash.insert(hash.to_string(), id.to_string());
        Claim::Accepted
    }

    /// Give back a claim whose record never made it to the store.
    pub fn release(&mut self, id: &str, hash: &str) {
        self.claimed_ids.remove(id);
        if self.by_hash.get(hash).map(String::as_str) == Some(id) {
            self.by_hash.remove(hash);
        }
    }

    /// Split a batch into first-seen records and in-run duplicates.
    pub fn admit(&mut self, jobs: Vec<EnrichedJob>) -> Admission {
        let mut admission = Admission::default();
        for job in jobs {
            if self.claim(&job.id, &job.dedup_hash).is_accepted() {
                admission.accepted.push(job);
            } else {
                admission.rejected.push(job);
            }
        }
        admission
    }

    pub fn len(&self) -> usize {
        self.claimed_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claimed_ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_normalises_case_and_whitespace() {
        assert_eq!(
            dedup_hash("Backend Engineer", "Acme"),
            dedup_hash("  backend engineer ", "ACME")
        );
        assert_ne!(
            dedup_hash("Backend Engineer", "Acme"),
            dedup_hash("Frontend Engineer", "Acme")
        );
        assert_eq!(dedup_hash("a", "b").len(), 16);
    }

    #[test]
    fn test_hash_joins_with_underscore() {
        // Both join to "a_b_c"
        assert_eq!(dedup_hash("a_b", "c"), dedup_hash("a", "b_c"));
        assert_ne!(dedup_hash("ab", "c"), dedup_hash("a", "bc"));
    }

    #[test]
    fn test_claim_rejects_second_hash() {
        let mut index = DedupIndex::new();
        let hash = dedup_hash("Backend Engineer", "Acme");

        assert_eq!(index.claim("remoteok:1", &hash), Claim::Accepted);
        assert_eq!(
            index.claim("adzuna:9", &hash),
            Claim::DuplicateHash {
                existing: "remoteok:1".into()
            }
        );
        assert_eq!(index.claim("remoteok:1", "other"), Claim::DuplicateId);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_release_frees_claim() {
        let mut index = DedupIndex::new();
        index.claim("a:1", "h1");
        index.release("a:1", "h1");

        assert!(index.is_empty());
        assert_eq!(index.claim("b:2", "h1"), Claim::Accepted);
    }
}
