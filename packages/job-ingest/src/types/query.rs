//! Query-side types: filters, pages, facets, and the search document.

use serde::{Deserialize, Serialize};

use crate::error::{IngestError, Result};
use crate::types::job::{EmploymentType, EnrichedJob, RoleCategory, Seniority};

/// Largest page a caller may request.
pub const MAX_PAGE_SIZE: usize = 200;

/// Shortest accepted free-text query, in characters.
pub const MIN_QUERY_CHARS: usize = 2;

/// Structured filters shared by listing and search.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobFilter {
    /// Only these sources (empty = all)
    #[serde(default)]
    pub sources: Vec<String>,

    pub employment_type: Option<EmploymentType>,

    #[serde(default)]
    pub remote_only: bool,

    /// Any of these seniority levels (empty = all)
    #[serde(default)]
    pub seniority: Vec<Seniority>,

    /// Any of these categories (empty = all)
    #[serde(default)]
    pub category: Vec<RoleCategory>,

    pub min_quality: Option<u8>,
}

impl JobFilter {
    /// Create a new empty filter (matches all).
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to one source.
    pub fn for_source(source: impl Into<String>) -> Self {
        Self {
            sources: vec![source.into()],
            ..Default::default()
        }
    }

    /// Only remote jobs.
    pub fn remote(mut self) -> Self {
        self.remote_only = true;
        self
    }

    /// Restrict employment type.
    pub fn with_employment_type(mut self, employment_type: EmploymentType) -> Self {
        self.employment_type = Some(employment_type);
        self
    }

    /// Add a seniority level.
    pub fn with_seniority(mut self, seniority: Seniority) -> Self {
        self.seniority.push(seniority);
        self
    }

    /// Add a category.
    pub fn with_category(mut self, category: RoleCategory) -> Self {
        self.category.push(category);
        self
    }

    /// Minimum quality score.
    pub fn with_min_quality(mut self, score: u8) -> Self {
        self.min_quality = Some(score);
        self
    }

    /// Check a record against every filter.
    pub fn matches(&self, job: &EnrichedJob) -> bool {
        if !self.sources.is_empty() && !self.sources.iter().any(|s| s == &job.source) {
            return false;
        }
        if let Some(t) = self.employment_type {
            if job.employment_type != t {
                return false;
            }
        }
        if self.remote_only && !job.remote {
            return false;
        }
        if !self.seniority.is_empty() {
            match job.seniority {
                Some(s) if self.seniority.contains(&s) => {}
                _ => return false,
            }
        }
        if !self.category.is_empty() && !self.category.contains(&job.category) {
            return false;
        }
        if let Some(min) = self.min_quality {
            if job.quality_score < min {
                return false;
            }
        }
        true
    }
}

/// A page request from the query layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobQuery {
    #[serde(default)]
    pub filter: JobFilter,

    /// Optional free-text search; results are ranked when present
    pub search: Option<String>,

    pub limit: usize,
    pub offset: usize,
}

impl JobQuery {
    pub fn new(limit: usize, offset: usize) -> Self {
        Self {
            filter: JobFilter::default(),
            search: None,
            limit,
            offset,
        }
    }

    pub fn with_filter(mut self, filter: JobFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// Limit clamped to `1..=MAX_PAGE_SIZE`.
    pub fn effective_limit(&self) -> usize {
        clamp_limit(self.limit)
    }
}

/// Clamp a requested page size to `1..=MAX_PAGE_SIZE`.
pub fn clamp_limit(limit: usize) -> usize {
    limit.clamp(1, MAX_PAGE_SIZE)
}

/// Reject queries that are too short to search meaningfully.
pub fn validate_search(query: &str) -> Result<&str> {
    let trimmed = query.trim();
    if trimmed.chars().count() < MIN_QUERY_CHARS {
        return Err(IngestError::InvalidQuery {
            reason: format!("query must be at least {} characters", MIN_QUERY_CHARS),
        });
    }
    Ok(trimmed)
}

/// One page of results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPage {
    /// Total matching records, ignoring limit/offset
    pub total: usize,
    pub jobs: Vec<EnrichedJob>,
}

/// A search hit with its relevance score (higher is better).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredJob {
    pub job: EnrichedJob,
    pub score: f64,
}

/// A facet value and how many records carry it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetCount {
    pub value: String,
    pub count: usize,
}

/// Value/count pairs for every filterable dimension.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterFacets {
    pub sources: Vec<FacetCount>,
    pub employment_types: Vec<FacetCount>,
    pub seniority: Vec<FacetCount>,
    pub categories: Vec<FacetCount>,
    pub work_arrangements: Vec<FacetCount>,
    pub remote: usize,
}

/// Outcome of persisting one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertSummary {
    pub new: usize,
    pub duplicate: usize,
    /// Record ids that were rejected as duplicates
    #[serde(default)]
    pub rejected_ids: Vec<String>,
}

/// Weighted text representation of a record for ranked search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchDocument {
    pub title: String,
    pub company: String,
    pub skills: String,
    pub description: String,
}

impl SearchDocument {
    pub const TITLE_WEIGHT: f64 = 8.0;
    pub const COMPANY_WEIGHT: f64 = 4.0;
    pub const SKILLS_WEIGHT: f64 = 4.0;
    pub const DESCRIPTION_WEIGHT: f64 = 1.0;

    /// Derive the document for a record.
    pub fn from_job(job: &EnrichedJob) -> Self {
        Self {
            title: job.title.to_lowercase(),
            company: job.company.to_lowercase(),
            skills: job
                .skills
                .iter()
                .map(|s| s.to_lowercase())
                .collect::<Vec<_>>()
                .join(" "),
            description: job.description.to_lowercase(),
        }
    }

    /// Flattened text stored alongside the record.
    pub fn text(&self) -> String {
        format!(
            "{}\n{}\n{}\n{}",
            self.title, self.company, self.skills, self.description
        )
    }

    /// Weighted term-frequency score against lowercase query terms.
    ///
    /// Every term must appear in at least one field, otherwise the score
    /// is zero.
    pub fn score(&self, terms: &[String]) -> f64 {
        if terms.is_empty() {
            return 0.0;
        }

        let fields = [
            (&self.title, Self::TITLE_WEIGHT),
            (&self.company, Self::COMPANY_WEIGHT),
            (&self.skills, Self::SKILLS_WEIGHT),
            (&self.description, Self::DESCRIPTION_WEIGHT),
        ];

        let mut total = 0.0;
        for term in terms {
            let mut term_score = 0.0;
            for (text, weight) in fields {
                let count = text.matches(term.as_str()).count();
                if count > 0 {
                    term_score += weight * (1.0 + (count as f64).ln());
                }
            }
            if term_score == 0.0 {
                return 0.0;
            }
            total += term_score;
        }
        total
    }
}

/// Split a query into lowercase alphanumeric terms.
pub fn query_terms(query: &str) -> Vec<String> {
    query
        .split(|c: char| !c.is_alphanumeric() && c != '+' && c != '#')
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}
