//! LLM prompts for batched job extraction.

use sha2::{Digest, Sha256};

use crate::types::listing::RawListing;

/// Longest payload excerpt sent per listing, in characters.
const MAX_PAYLOAD_CHARS: usize = 6000;

/// System prompt for structured job extraction.
pub const EXTRACT_JOBS_PROMPT: &str = r#"You extract structured job postings from raw job board records.

You will receive a numbered list of raw records. Return JSON of the form
{"jobs": [ ... ]} with exactly one object per record, in the same order.

For each record extract:
- title, company, description (plain text, no HTML), short_description (<= 200 chars)
- country, city, remote (true/false), work_arrangement: remote | hybrid | onsite
- employment_type: FULLTIME | PARTTIME | CONTRACT | INTERN | TEMPORARY
- seniority: junior | mid | senior | staff | principal
- department, category: frontend | backend | fullstack | mobile | devops | data | ml | security | qa | management | general
- salary_min, salary_max (numbers), salary_currency (ISO 4217), salary_period: hour | day | week | month | year
- skills: technical skills and tools, lowercase
- required_years (integer), education
- responsibilities, benefits: short bullet phrases
- application_deadline (YYYY-MM-DD), visa_sponsorship (true/false)
- urgency: urgent | normal | low

Rules:
- Only use information present in the record. Use null when unknown.
- Never invent salaries, deadlines or locations.
- Never merge or skip records."#;

/// Hash of the extraction prompt, logged with each run so output drift
/// can be traced to prompt changes.
pub fn extract_prompt_hash() -> String {
    let mut hasher = Sha256::new();
    hasher.update(EXTRACT_JOBS_PROMPT.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Format the user message for one batch.
pub fn format_extract_batch(listings: &[RawListing]) -> String {
    listings
        .iter()
        .enumerate()
        .map(|(i, listing)| {
            let payload = listing.payload.to_string();
            let excerpt: String = payload.chars().take(MAX_PAYLOAD_CHARS).collect();
            format!(
                "=== RECORD {} (source: {}, id: {}) ===\n{}",
                i + 1,
                listing.source,
                listing.source_id,
                excerpt
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_batch_is_numbered_in_order() {
        let listings = vec![
            RawListing::new("remoteok", "1", json!({"position": "SRE"})),
            RawListing::new("adzuna", "2", json!({"title": "QA"})),
        ];
        let text = format_extract_batch(&listings);

        let first = text.find("RECORD 1 (source: remoteok").unwrap();
        let second = text.find("RECORD 2 (source: adzuna").unwrap();
        assert!(first < second);
        assert!(text.contains("\"position\":\"SRE\""));
    }

    #[test]
    fn test_long_payload_truncated() {
        let listing = RawListing::new("s", "1", json!({"description": "x".repeat(20_000)}));
        let text = format_extract_batch(&[listing]);
        assert!(text.len() < MAX_PAYLOAD_CHARS + 200);
    }

    #[test]
    fn test_prompt_hash_stable() {
        assert_eq!(extract_prompt_hash(), extract_prompt_hash());
        assert_eq!(extract_prompt_hash().len(), 64);
    }
}
