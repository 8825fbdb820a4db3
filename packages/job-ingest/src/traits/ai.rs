//! AI trait for structured job extraction.
//!
//! One call handles a whole batch of listings so the per-request overhead
//! is paid once per batch, not once per listing.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::listing::RawListing;

/// Structured fields the AI extracts for one listing.
///
/// Every field is optional; anything the AI leaves out is filled from the
/// rule-based baseline. Enum-like fields are plain strings and parsed
/// leniently on merge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ExtractedFields {
    pub title: Option<String>,
    pub company: Option<String>,
    pub description: Option<String>,
    pub short_description: Option<String>,

    pub country: Option<String>,
    pub city: Option<String>,
    pub remote: Option<bool>,
    /// remote | hybrid | onsite
    pub work_arrangement: Option<String>,

    /// FULLTIME | PARTTIME | CONTRACT | INTERN | TEMPORARY
    pub employment_type: Option<String>,
    /// junior | mid | senior | staff | principal
    pub seniority: Option<String>,
    pub department: Option<String>,
    pub category: Option<String>,

    pub salary_min: Option<f64>,
    pub salary_max: Option<f64>,
    pub salary_currency: Option<String>,
    /// hour | day | week | month | year
    pub salary_period: Option<String>,

    pub skills: Vec<String>,
    pub required_years: Option<u32>,
    pub education: Option<String>,
    pub responsibilities: Vec<String>,
    pub benefits: Vec<String>,

    /// ISO 8601 date
    pub application_deadline: Option<String>,
    pub visa_sponsorship: Option<bool>,
    /// urgent | normal | low
    pub urgency: Option<String>,
}

impl ExtractedFields {
    /// Output is usable only when both identity fields are present.
    pub fn is_usable(&self) -> bool {
        non_blank(&self.title) && non_blank(&self.company)
    }
}

fn non_blank(value: &Option<String>) -> bool {
    value.as_deref().map(|v| !v.trim().is_empty()).unwrap_or(false)
}

/// Per-listing AI result: fields, or why this item is malformed.
pub type AiItem = std::result::Result<ExtractedFields, String>;

/// AI trait for job extraction.
///
/// Implementations wrap a specific LLM provider and must use the
/// provider's lowest-variance sampling mode.
#[async_trait]
pub trait AI: Send + Sync {
    /// Extract structured fields for every listing in one request.
    ///
    /// Must return exactly one item per input, in input order. An `Err`
    /// means the whole call failed; an `Err` item means only that
    /// listing's output was malformed.
    async fn extract_jobs(&self, listings: &[RawListing]) -> Result<Vec<AiItem>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usable_requires_title_and_company() {
        let mut fields = ExtractedFields {
            title: Some("Backend Engineer".into()),
            ..Default::default()
        };
        assert!(!fields.is_usable());

        fields.company = Some("   ".into());
        assert!(!fields.is_usable());

        fields.company = Some("Acme".into());
        assert!(fields.is_usable());
    }

    #[test]
    fn test_missing_fields_default() {
        let fields: ExtractedFields =
            serde_json::from_str(r#"{"title": "SRE", "skills": ["go"]}"#).unwrap();
        assert_eq!(fields.title.as_deref(), Some("SRE"));
        assert_eq!(fields.skills, vec!["go".to_string()]);
        assert!(fields.company.is_none());
    }
}
