//! Completeness scoring for enriched jobs.

use serde::{Deserialize, Serialize};

use crate::rules::{UNKNOWN_COMPANY, UNTITLED};
use crate::types::job::EnrichedJob;

const MISSING_PENALTY: i32 = 10;

/// Score a record 0-100 from how complete and informative it is.
///
/// Total and deterministic: depends only on the record's fields.
pub fn score(job: &EnrichedJob) -> u8 {
    let mut points: i32 = 0;

    points += match job.description.trim().chars().count() {
        0 => 0,
        n if n > 2000 => 20,
        n if n > 1000 => 16,
        n if n > 500 => 12,
        n if n > 200 => 8,
        _ => 4,
    };

    points += match (job.salary_min, job.salary_max) {
        (Some(_), Some(_)) => 20,
        (Some(_), None) | (None, Some(_)) => 12,
        (None, None) => 0,
    };

    if job.city.is_some() {
        points += 4;
    }
    if job.country.is_some() {
        points += 4;
    }
    if job.remote || job.work_arrangement.is_some() {
        points += 7;
    }

    points += (job.skills.len() as i32 * 2).min(10);

    // Employment type always resolves, defaulting to full-time
    points += 5;

    if has_title(job) {
        points += 10;
    } else {
        points -= MISSING_PENALTY;
    }
    if has_company(job) {
        points += 10;
    } else {
        points -= MISSING_PENALTY;
    }
    if job.apply_url.is_some() {
        points += 5;
    } else {
        points -= MISSING_PENALTY;
    }
    if job.application_deadline.is_some() {
        points += 5;
    }

    points.clamp(0, 100) as u8
}

/// Which fields a record actually carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Completeness {
    pub has_title: bool,
    pub has_company: bool,
    pub has_description: bool,
    pub has_salary: bool,
    pub has_location: bool,
    pub has_skills: bool,
    pub has_apply_url: bool,
    pub has_deadline: bool,
}

pub fn completeness(job: &EnrichedJob) -> Completeness {
    Completeness {
        has_title: has_title(job),
        has_company: has_company(job),
        has_description: !job.description.trim().is_empty(),
        has_salary: job.has_salary(),
        has_location: job.city.is_some() || job.country.is_some() || job.remote,
        has_skills: !job.skills.is_empty(),
        has_apply_url: job.apply_url.is_some(),
        has_deadline: job.application_deadline.is_some(),
    }
}

fn has_title(job: &EnrichedJob) -> bool {
    let title = job.title.trim();
    !title.is_empty() && title != UNTITLED
}

fn has_company(job: &EnrichedJob) -> bool {
    let company = job.company.trim();
    company.chars().count() > 2 && company != UNKNOWN_COMPANY
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::job::{EnrichmentMethod, WorkArrangement};
    use crate::types::listing::RawListing;
    use chrono::Utc;
    use proptest::prelude::*;
    use serde_json::json;

    fn job(title: &str, company: &str, description: &str) -> EnrichedJob {
        let listing = RawListing::new("test", "1", json!({}));
        EnrichedJob::new(&listing, title, company, description, EnrichmentMethod::Fallback)
    }

    #[test]
    fn test_complete_record_scores_full() {
        let mut full = job("Backend Engineer", "Acme", &"x".repeat(2500));
        full.salary_min = Some(100_000.0);
        full.salary_max = Some(150_000.0);
        full.city = Some("Berlin".into());
        full.country = Some("DE".into());
        full.work_arrangement = Some(WorkArrangement::Hybrid);
        for skill in ["rust", "go", "sql", "aws", "docker"] {
            full.skills.insert(skill.into());
        }
        full.apply_url = Some("https://acme.test/apply".into());
        full.application_deadline = Some(Utc::now());

        assert_eq!(score(&full), 100);
    }

    #[test]
    fn test_bare_record_clamps_to_zero() {
        let bare = job(UNTITLED, UNKNOWN_COMPANY, "");
        // 5 for employment type minus three penalties
        assert_eq!(score(&bare), 0);
    }

    #[test]
    fn test_missing_apply_url_penalised() {
        let mut with_url = job("Backend Engineer", "Acme", "short");
        with_url.apply_url = Some("https://acme.test".into());
        let without_url = job("Backend Engineer", "Acme", "short");

        assert_eq!(score(&with_url) - score(&without_url), 15);
    }

    #[test]
    fn test_skills_capped() {
        let mut many = job("Backend Engineer", "Acme", "short");
        let mut few = many.clone();
        for i in 0..12 {
            many.skills.insert(format!("skill-{}", i));
        }
        few.skills.insert("rust".into());
        few.skills.insert("go".into());
        few.skills.insert("sql".into());
        few.skills.insert("aws".into());
        few.skills.insert("gcp".into());
        assert_eq!(score(&many), score(&few));
    }

    #[test]
    fn test_completeness_flags() {
        let mut record = job("Backend Engineer", "Acme", "desc");
        record.salary_max = Some(90_000.0);
        let c = completeness(&record);
        assert!(c.has_title && c.has_company && c.has_description && c.has_salary);
        assert!(!c.has_apply_url && !c.has_location && !c.has_skills);
    }

    proptest! {
        #[test]
        fn score_is_always_in_range(
            title in ".{0,40}",
            company in ".{0,20}",
            description_len in 0usize..4000,
            salary_min in proptest::option::of(0.0f64..1e6),
            salary_max in proptest::option::of(0.0f64..1e6),
            remote in any::<bool>(),
            skill_count in 0usize..30,
            apply in any::<bool>(),
        ) {
            let mut record = job(&title, &company, &"d".repeat(description_len));
            record.salary_min = salary_min;
            record.salary_max = salary_max;
            record.remote = remote;
            for i in 0..skill_count {
                record.skills.insert(format!("s{}", i));
            }
            if apply {
                record.apply_url = Some("https://example.test".into());
            }
            let s = score(&record);
            prop_assert!(s <= 100);
            prop_assert_eq!(s, score(&record));
        }
    }
}
