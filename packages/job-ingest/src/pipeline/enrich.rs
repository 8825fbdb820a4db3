//! Batched enrichment: AI extraction with rule-based fallback.
//!
//! Each batch makes a single AI call. What falls back depends on how the
//! call went:
//! - the call errors, times out, or returns the wrong number of items:
//!   the whole batch falls back
//! - individual items are malformed or lack a title/company: only those
//!   items fall back
//!
//! AI output is merged over the rule-based baseline, so anything the AI
//! leaves out is still filled where the rules can find it.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::pipeline::dedup::dedup_hash;
use crate::rules::{self, payload};
use crate::traits::ai::{AiItem, ExtractedFields, AI};
use crate::types::{
    config::IngestConfig,
    job::{
        EmploymentType, EnrichedJob, EnrichmentMethod, RoleCategory, SalaryPeriod, Seniority,
        Urgency, WorkArrangement,
    },
    listing::RawListing,
};

/// What enrichment produced for one listing.
#[derive(Debug, Clone)]
pub enum EnrichOutcome {
    Extracted {
        job: EnrichedJob,
        via: EnrichmentMethod,
    },
    Failed {
        source: String,
        id: String,
        reason: String,
    },
}

impl EnrichOutcome {
    pub fn source(&self) -> &str {
        match self {
            Self::Extracted { job, .. } => &job.source,
            Self::Failed { source, .. } => source,
        }
    }
}

/// Stops AI calls after too many consecutive whole-batch failures.
///
/// Once open it stays open for the rest of the run.
#[derive(Debug)]
pub struct AiBreaker {
    threshold: u32,
    consecutive_failures: AtomicU32,
    open: AtomicBool,
}

impl AiBreaker {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            consecutive_failures: AtomicU32::new(0),
            open: AtomicBool::new(false),
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    pub fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::Release);
    }

    /// Returns true when this failure opened the breaker.
    pub fn record_failure(&self) -> bool {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::AcqRel) + 1;
        if self.threshold > 0 && failures >= self.threshold {
            return !self.open.swap(true, Ordering::AcqRel);
        }
        false
    }
}

/// Turns batches of raw listings into enrichment outcomes.
///
/// Cheap to clone; batch tasks each hold a clone.
#[derive(Clone)]
pub struct Enricher {
    ai: Option<Arc<dyn AI>>,
    ai_timeout: Duration,
    breaker: Arc<AiBreaker>,
}

impl Enricher {
    pub fn new(ai: Option<Arc<dyn AI>>, config: &IngestConfig) -> Self {
        let ai = if config.use_ai { ai } else { None };
        Self {
            ai,
            ai_timeout: config.ai_timeout,
            breaker: Arc::new(AiBreaker::new(config.ai_failure_threshold)),
        }
    }

    /// Fallback only.
    pub fn rules_only() -> Self {
        Self {
            ai: None,
            ai_timeout: Duration::from_secs(1),
            breaker: Arc::new(AiBreaker::new(0)),
        }
    }

    /// Whether the breaker stopped AI calls during this run.
    pub fn ai_disabled(&self) -> bool {
        self.breaker.is_open()
    }

    /// Enrich one batch. Returns exactly one outcome per listing, in order.
    pub async fn enrich_batch(&self, batch: &[RawListing], now: DateTime<Utc>) -> Vec<EnrichOutcome> {
        let ai = match &self.ai {
            Some(ai) if !self.breaker.is_open() => ai,
            _ => return batch.iter().map(|l| fallback(l, now)).collect(),
        };

        let failure = match tokio::time::timeout(self.ai_timeout, ai.extract_jobs(batch)).await {
            Ok(Ok(items)) if items.len() == batch.len() => {
                self.breaker.record_success();
                return batch
                    .iter()
                    .zip(items)
                    .map(|(listing, item)| from_ai_item(listing, item, now))
                    .collect();
            }
            Ok(Ok(items)) => format!("expected {} items, got {}", batch.len(), items.len()),
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("timed out after {}s", self.ai_timeout.as_secs()),
        };

        warn!(
            batch_size = batch.len(),
            error = %failure,
            "AI extraction failed, using rule-based fallback for batch"
        );
        if self.breaker.record_failure() {
            warn!("AI failed for consecutive batches; disabling AI for the rest of this run");
        }
        batch.iter().map(|l| fallback(l, now)).collect()
    }
}

fn from_ai_item(listing: &RawListing, item: AiItem, now: DateTime<Utc>) -> EnrichOutcome {
    let fields = match item {
        Ok(fields) if fields.is_usable() => fields,
        Ok(_) => {
            debug!(id = %listing.record_id(), "AI output missing title or company");
            return fallback(listing, now);
        }
        Err(reason) => {
            debug!(id = %listing.record_id(), %reason, "Malformed AI item");
            return fallback(listing, now);
        }
    };

    let baseline = match rules::rule_based(listing, now) {
        Ok(job) => job,
        // Usable fields guarantee a title and company
        Err(_) => EnrichedJob::new(listing, "", "", "", EnrichmentMethod::Ai),
    };
    EnrichOutcome::Extracted {
        job: finalize(merge_ai(baseline, fields)),
        via: EnrichmentMethod::Ai,
    }
}

fn fallback(listing: &RawListing, now: DateTime<Utc>) -> EnrichOutcome {
    match rules::rule_based(listing, now) {
        Ok(job) => EnrichOutcome::Extracted {
            job: finalize(job),
            via: EnrichmentMethod::Fallback,
        },
        Err(reason) => EnrichOutcome::Failed {
            source: listing.source.clone(),
            id: listing.record_id(),
            reason,
        },
    }
}

/// Fill the derived fields once every other field is final.
pub fn finalize(mut job: EnrichedJob) -> EnrichedJob {
    job.dedup_hash = dedup_hash(&job.title, &job.company);
    job.quality_score = rules::score(&job);
    job
}

/// Overlay AI fields on a rule-based record. Blank or unparseable AI
/// values leave the baseline untouched.
pub fn merge_ai(mut job: EnrichedJob, ai: ExtractedFields) -> EnrichedJob {
    job.enrichment = EnrichmentMethod::Ai;

    set_text(&mut job.title, ai.title);
    set_text(&mut job.company, ai.company);
    // The model sees a truncated payload; its description never replaces a full one.
    if job.description.trim().is_empty() {
        set_text(&mut job.description, ai.description.map(|d| payload::strip_html(&d)));
    }
    if job.description.is_empty() {
        job.description = job.title.clone();
    }
    set_opt(&mut job.short_description, ai.short_description);
    set_opt(&mut job.country, ai.country);
    set_opt(&mut job.city, ai.city);
    set_opt(&mut job.department, ai.department);
    set_opt(&mut job.education, ai.education);
    set_opt(&mut job.salary_currency, ai.salary_currency.map(|c| c.to_uppercase()));

    if let Some(remote) = ai.remote {
        job.remote = remote;
    }
    if let Some(arrangement) = ai.work_arrangement.as_deref().and_then(WorkArrangement::parse) {
        job.work_arrangement = Some(arrangement);
        if arrangement == WorkArrangement::Remote {
            job.remote = true;
        }
    } else if job.remote && job.work_arrangement.is_none() {
        job.work_arrangement = Some(WorkArrangement::Remote);
    }
    if let Some(t) = ai.employment_type.as_deref().and_then(EmploymentType::parse) {
        job.employment_type = t;
    }
    if let Some(s) = ai.seniority.as_deref().and_then(Seniority::parse) {
        job.seniority = Some(s);
    }
    if let Some(c) = ai.category.as_deref().and_then(RoleCategory::parse) {
        job.category = c;
    }
    if let Some(p) = ai.salary_period.as_deref().and_then(SalaryPeriod::parse) {
        job.salary_period = Some(p);
    }
    if let Some(u) = ai.urgency.as_deref().and_then(Urgency::parse) {
        job.urgency = u;
    }

    if let Some(min) = ai.salary_min.filter(|v| v.is_finite() && *v > 0.0) {
        job.salary_min = Some(min);
    }
    if let Some(max) = ai.salary_max.filter(|v| v.is_finite() && *v > 0.0) {
        job.salary_max = Some(max);
    }
    if ai.required_years.is_some() {
        job.required_years = ai.required_years;
    }
    if ai.visa_sponsorship.is_some() {
        job.visa_sponsorship = ai.visa_sponsorship;
    }
    if let Some(deadline) = ai.application_deadline.as_deref().and_then(payload::parse_date_str) {
        job.application_deadline = Some(deadline);
    }

    if !ai.skills.is_empty() {
        let mut skills: indexmap::IndexSet<String> = ai
            .skills
            .iter()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        skills.extend(job.skills.drain(..));
        job.skills = skills;
    }
    let responsibilities = clean_list(ai.responsibilities);
    if !responsibilities.is_empty() {
        job.responsibilities = responsibilities;
    }
    let benefits = clean_list(ai.benefits);
    if !benefits.is_empty() {
        job.benefits = benefits;
    }

    job
}

fn set_text(target: &mut String, value: Option<String>) {
    if let Some(v) = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        *target = v;
    }
}

fn set_opt(target: &mut Option<String>, value: Option<String>) {
    if let Some(v) = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        *target = Some(v);
    }
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{listing, MockAI};
    use serde_json::json;

    fn config() -> IngestConfig {
        IngestConfig::default()
    }

    fn batch(n: usize) -> Vec<RawListing> {
        (0..n)
            .map(|i| listing("src", &i.to_string(), &format!("Engineer {}", i), "Acme"))
            .collect()
    }

    fn via(outcome: &EnrichOutcome) -> Option<EnrichmentMethod> {
        match outcome {
            EnrichOutcome::Extracted { via, .. } => Some(*via),
            EnrichOutcome::Failed { .. } => None,
        }
    }

    #[tokio::test]
    async fn test_all_items_via_ai() {
        let ai = Arc::new(MockAI::new());
        let enricher = Enricher::new(Some(ai.clone()), &config());

        let outcomes = enricher.enrich_batch(&batch(5), Utc::now()).await;

        assert_eq!(outcomes.len(), 5);
        assert!(outcomes.iter().all(|o| via(o) == Some(EnrichmentMethod::Ai)));
        assert_eq!(ai.call_count(), 1);
    }

    #[tokio::test]
    async fn test_malformed_items_fall_back_individually() {
        let ai = Arc::new(MockAI::new().with_malformed(["src:1", "src:3"]));
        let enricher = Enricher::new(Some(ai), &config());

        let outcomes = enricher.enrich_batch(&batch(5), Utc::now()).await;

        let methods: Vec<_> = outcomes.iter().map(via).collect();
        assert_eq!(
            methods,
            vec![
                Some(EnrichmentMethod::Ai),
                Some(EnrichmentMethod::Fallback),
                Some(EnrichmentMethod::Ai),
                Some(EnrichmentMethod::Fallback),
                Some(EnrichmentMethod::Ai),
            ]
        );
    }

    #[tokio::test]
    async fn test_whole_batch_falls_back_on_error() {
        let enricher = Enricher::new(Some(Arc::new(MockAI::new().failing())), &config());

        let outcomes = enricher.enrich_batch(&batch(3), Utc::now()).await;

        assert!(outcomes
            .iter()
            .all(|o| via(o) == Some(EnrichmentMethod::Fallback)));
    }

    #[tokio::test]
    async fn test_wrong_length_falls_back() {
        let enricher = Enricher::new(Some(Arc::new(MockAI::new().dropping_last())), &config());

        let outcomes = enricher.enrich_batch(&batch(3), Utc::now()).await;

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes
            .iter()
            .all(|o| via(o) == Some(EnrichmentMethod::Fallback)));
    }

    #[tokio::test]
    async fn test_timeout_falls_back() {
        let ai = MockAI::new().with_delay(Duration::from_millis(200));
        let config = config().with_ai_timeout(Duration::from_millis(10));
        let enricher = Enricher::new(Some(Arc::new(ai)), &config);

        let outcomes = enricher.enrich_batch(&batch(2), Utc::now()).await;

        assert!(outcomes
            .iter()
            .all(|o| via(o) == Some(EnrichmentMethod::Fallback)));
    }

    #[tokio::test]
    async fn test_breaker_opens_after_threshold() {
        let ai = Arc::new(MockAI::new().failing());
        let enricher = Enricher::new(Some(ai.clone()), &config());

        for _ in 0..5 {
            enricher.enrich_batch(&batch(1), Utc::now()).await;
        }

        assert!(enricher.ai_disabled());
        assert_eq!(ai.call_count(), 3);
    }

    #[tokio::test]
    async fn test_use_ai_false_never_calls() {
        let ai = Arc::new(MockAI::new());
        let enricher = Enricher::new(Some(ai.clone()), &config().without_ai());

        enricher.enrich_batch(&batch(2), Utc::now()).await;

        assert_eq!(ai.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unextractable_listing_fails() {
        let enricher = Enricher::rules_only();
        let empty = RawListing::new("src", "x", json!({"company": "Acme"}));

        let outcomes = enricher.enrich_batch(&[empty], Utc::now()).await;

        assert!(matches!(&outcomes[0], EnrichOutcome::Failed { id, .. } if id == "src:x"));
    }

    #[test]
    fn test_merge_keeps_baseline_gaps() {
        let raw = RawListing::new(
            "src",
            "1",
            json!({
                "title": "Backend Engineer",
                "company": "Acme",
                "description": "Python and Kubernetes",
                "apply_url": "https://acme.test/apply",
            }),
        );
        let baseline = rules::rule_based(&raw, Utc::now()).unwrap();
        let ai = ExtractedFields {
            title: Some("Senior Backend Engineer".into()),
            company: Some("Acme Inc".into()),
            skills: vec!["Rust".into()],
            seniority: Some("Senior".into()),
            employment_type: Some("not a type".into()),
            ..Default::default()
        };

        let merged = finalize(merge_ai(baseline, ai));

        assert_eq!(merged.title, "Senior Backend Engineer");
        assert_eq!(merged.seniority, Some(Seniority::Senior));
        assert_eq!(merged.employment_type, EmploymentType::FullTime);
        assert_eq!(merged.apply_url.as_deref(), Some("https://acme.test/apply"));
        let skills: Vec<&str> = merged.skills.iter().map(String::as_str).collect();
        assert_eq!(skills, vec!["rust", "kubernetes", "python"]);
        assert_eq!(merged.enrichment, EnrichmentMethod::Ai);
        assert_eq!(merged.dedup_hash, dedup_hash("Senior Backend Engineer", "Acme Inc"));
    }

    #[tokio::test]
    async fn test_long_description_keeps_its_tail() {
        let description = format!("{} Closing note: zephyrine tooling.", "Lorem ipsum dolor. ".repeat(600));
        let raw = RawListing::new(
            "src",
            "1",
            json!({
                "title": "Backend Engineer",
                "company": "Acme",
                "description": description.clone(),
            }),
        );
        let excerpt: String = description.chars().take(5900).collect();
        let ai = ExtractedFields {
            description: Some(excerpt),
            ..Default::default()
        };

        let baseline = rules::rule_based(&raw, Utc::now()).unwrap();
        let merged = merge_ai(baseline, ai);
        assert!(merged.description.chars().count() > 6000);
        assert!(merged.description.contains("zephyrine"));

        let enricher = Enricher::new(Some(Arc::new(MockAI::new())), &config());
        let outcomes = enricher.enrich_batch(&[raw], Utc::now()).await;
        match &outcomes[0] {
            EnrichOutcome::Extracted { job, via } => {
                assert_eq!(*via, EnrichmentMethod::Ai);
                assert!(job.description.contains("zephyrine"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_ai_description_fills_empty_baseline() {
        let raw = RawListing::new("src", "1", json!({"title": "SRE", "company": "Acme"}));
        let mut baseline = rules::rule_based(&raw, Utc::now()).unwrap();
        baseline.description.clear();
        let ai = ExtractedFields {
            description: Some("<p>Run the fleet.</p>".into()),
            ..Default::default()
        };

        let merged = merge_ai(baseline, ai);

        assert_eq!(merged.description, "Run the fleet.");
    }
}
