//! Rule-based extraction of a full record from a raw listing.

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use crate::rules::payload::{self, contains_word, strip_html};
use crate::rules::{skills, urgency, UNKNOWN_COMPANY, UNTITLED};
use crate::types::job::{
    ApplyOption, EmploymentType, EnrichedJob, EnrichmentMethod, SalaryPeriod, Seniority, Urgency,
    WorkArrangement,
};
use crate::types::listing::RawListing;

const SHORT_DESCRIPTION_CHARS: usize = 200;
const DERIVED_TITLE_CHARS: usize = 80;
const DEFAULT_CURRENCY: &str = "USD";

lazy_static! {
    static ref YEARS_EXPERIENCE: Regex = Regex::new(
        r"(?i)(\d{1,2})\s*\+?\s*(?:(?:-|to)\s*\d{1,2}\s*)?\+?\s*years?\b[^.\n]{0,40}?\bexperience"
    )
    .expect("valid regex");
    static ref SALARY_RANGE: Regex = Regex::new(
        r"(?i)([$€£])\s?(\d{2,3}(?:,\d{3})?k?)\s*(?:-|–|to)\s*[$€£]?\s?(\d{2,3}(?:,\d{3})?k?)"
    )
    .expect("valid regex");
    static ref LOCATION_SPLIT: Regex = Regex::new(r"[,/|()\-–]+").expect("valid regex");
}

const REMOTE_WORDS: &[&str] = &["remote", "anywhere", "worldwide", "work from home", "wfh"];
const HYBRID_WORDS: &[&str] = &["hybrid"];
const ONSITE_WORDS: &[&str] = &["on-site", "onsite", "in-office", "in office", "on site"];

/// Build a complete record from the payload alone.
///
/// Fails only when the payload has neither a title nor a description.
/// `dedup_hash` and `quality_score` are left for the enrichment stage.
pub fn rule_based(listing: &RawListing, now: DateTime<Utc>) -> Result<EnrichedJob, String> {
    let p = &listing.payload;

    let title = payload::str_field(p, payload::TITLE).map(|t| strip_html(&t));
    let description = payload::str_field(p, payload::DESCRIPTION).map(|d| strip_html(&d));

    let (title, description) = match (title, description) {
        (None, None) => {
            return Err(format!(
                "listing {} has neither title nor description",
                listing.record_id()
            ))
        }
        (Some(t), None) => (t.clone(), t),
        (None, Some(d)) => (title_from_description(&d), d),
        (Some(t), Some(d)) => (t, d),
    };
    let company = payload::str_field(p, payload::COMPANY)
        .map(|c| strip_html(&c))
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| UNKNOWN_COMPANY.to_string());

    let mut job = EnrichedJob::new(
        listing,
        title,
        company,
        description,
        EnrichmentMethod::Fallback,
    );
    let text = format!("{} {}", job.title, job.description).to_lowercase();

    job.short_description = Some(shorten(&job.description, SHORT_DESCRIPTION_CHARS));

    apply_location(&mut job, p, &text);

    job.employment_type = payload::str_field(p, payload::EMPLOYMENT_TYPE)
        .and_then(|t| EmploymentType::parse(&t))
        .unwrap_or_else(|| employment_type_from_text(&text));
    job.required_years = required_years(&job.description);
    job.seniority = seniority(&job.title, job.required_years);
    job.education = education(&text);
    job.department = payload::str_field(p, payload::DEPARTMENT);

    apply_salary(&mut job, p);

    job.skills = skills::extract_skills(&job.title, &job.description);
    job.category = skills::categorize_role(&job.title, &job.description, &job.skills);

    job.posted_at = payload::date_field(p, payload::POSTED_AT);
    job.application_deadline = payload::date_field(p, payload::DEADLINE)
        .or_else(|| urgency::extract_deadline(&job.description, now.date_naive()));

    job.urgency = urgency::detect_urgency(&job.title, &job.description);
    if job.urgency == Urgency::Normal && urgency::is_deadline_soon(job.application_deadline, now, 7)
    {
        job.urgency = Urgency::Urgent;
    }
    job.visa_sponsorship = visa_sponsorship(&text);

    job.apply_url = payload::str_field(p, payload::APPLY_URL).filter(|u| is_http(u));
    job.apply_options = apply_options(p);
    if job.apply_url.is_none() {
        job.apply_url = job.apply_options.first().map(|o| o.url.clone());
    }

    Ok(job)
}

/// First sentence of the description, so untitled listings keep distinct
/// dedup hashes.
fn title_from_description(description: &str) -> String {
    let first = description
        .split(['.', '!', '?', '\n'])
        .map(str::trim)
        .find(|s| !s.is_empty());
    match first {
        Some(sentence) => shorten(sentence, DERIVED_TITLE_CHARS),
        None => UNTITLED.to_string(),
    }
}

/// Normalise free text and keep whole words up to `max_chars`.
pub fn shorten(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    let trimmed = match cut.rfind(char::is_whitespace) {
        Some(i) if i > max_chars / 2 => &cut[..i],
        _ => cut.as_str(),
    };
    format!("{}...", trimmed.trim_end())
}

fn apply_location(job: &mut EnrichedJob, p: &Value, text: &str) {
    let location = payload::str_field(p, payload::LOCATION).unwrap_or_default();
    let location_lower = location.to_lowercase();

    job.city = payload::str_field(p, payload::CITY);
    job.country = payload::str_field(p, payload::COUNTRY);

    if job.city.is_none() && job.country.is_none() && !location.is_empty() {
        let parts: Vec<&str> = LOCATION_SPLIT
            .split(&location)
            .map(str::trim)
            .filter(|part| {
                let lower = part.to_lowercase();
                !part.is_empty()
                    && !REMOTE_WORDS
                        .iter()
                        .chain(HYBRID_WORDS)
                        .chain(ONSITE_WORDS)
                        .any(|w| lower == *w)
            })
            .collect();
        match parts.as_slice() {
            [] => {}
            [only] => job.country = Some(only.to_string()),
            [first, .., last] => {
                job.city = Some(first.to_string());
                job.country = Some(last.to_string());
            }
        }
    }

    let mentions = |words: &[&str]| {
        words
            .iter()
            .any(|w| contains_word(&location_lower, w) || contains_word(text, w))
    };

    job.remote = payload::bool_field(p, payload::REMOTE).unwrap_or(false)
        || REMOTE_WORDS.iter().any(|w| contains_word(&location_lower, w))
        || ["fully remote", "remote-first", "remote first", "100% remote", "work from home"]
            .iter()
            .any(|phrase| text.contains(phrase));

    job.work_arrangement = if mentions(HYBRID_WORDS) {
        Some(WorkArrangement::Hybrid)
    } else if job.remote {
        Some(WorkArrangement::Remote)
    } else if mentions(ONSITE_WORDS) {
        Some(WorkArrangement::Onsite)
    } else {
        None
    };
}

fn employment_type_from_text(text: &str) -> EmploymentType {
    if text.contains("part-time") || text.contains("part time") {
        EmploymentType::PartTime
    } else if contains_word(text, "internship") || contains_word(text, "intern") {
        EmploymentType::Intern
    } else if contains_word(text, "contract")
        || contains_word(text, "contractor")
        || contains_word(text, "freelance")
    {
        EmploymentType::Contract
    } else if contains_word(text, "temporary") || contains_word(text, "temp") {
        EmploymentType::Temporary
    } else {
        EmploymentType::FullTime
    }
}

fn required_years(description: &str) -> Option<u32> {
    YEARS_EXPERIENCE
        .captures(description)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

fn seniority(title: &str, required_years: Option<u32>) -> Option<Seniority> {
    let title = title.to_lowercase();
    let has = |w: &str| contains_word(&title, w);

    if has("principal") || has("distinguished") {
        Some(Seniority::Principal)
    } else if has("staff") {
        Some(Seniority::Staff)
    } else if has("senior") || has("sr") || has("lead") {
        Some(Seniority::Senior)
    } else if has("junior") || has("jr") || has("graduate") || has("entry level") || has("intern")
    {
        Some(Seniority::Junior)
    } else if has("mid") || has("mid-level") || has("intermediate") {
        Some(Seniority::Mid)
    } else {
        match required_years? {
            0..=1 => Some(Seniority::Junior),
            2..=4 => Some(Seniority::Mid),
            _ => Some(Seniority::Senior),
        }
    }
}

fn education(text: &str) -> Option<String> {
    if contains_word(text, "phd") || contains_word(text, "ph.d") || text.contains("doctorate") {
        Some("phd".into())
    } else if text.contains("master's") || text.contains("masters degree") || contains_word(text, "msc")
    {
        Some("master's".into())
    } else if text.contains("bachelor") || contains_word(text, "bsc") || text.contains("degree in") {
        Some("bachelor's".into())
    } else {
        None
    }
}

fn apply_salary(job: &mut EnrichedJob, p: &Value) {
    job.salary_min = payload::num_field(p, payload::SALARY_MIN).filter(|v| *v > 0.0);
    job.salary_max = payload::num_field(p, payload::SALARY_MAX).filter(|v| *v > 0.0);
    let mut currency = payload::str_field(p, payload::SALARY_CURRENCY);

    if !job.has_salary() {
        if let Some(caps) = SALARY_RANGE.captures(&job.description) {
            job.salary_min = caps.get(2).and_then(|m| payload::parse_amount(m.as_str()));
            job.salary_max = caps.get(3).and_then(|m| payload::parse_amount(m.as_str()));
            if currency.is_none() {
                currency = caps.get(1).map(|m| match m.as_str() {
                    "€" => "EUR".to_string(),
                    "£" => "GBP".to_string(),
                    _ => DEFAULT_CURRENCY.to_string(),
                });
            }
        }
    }

    if let (Some(min), Some(max)) = (job.salary_min, job.salary_max) {
        if min > max {
            job.salary_min = Some(max);
            job.salary_max = Some(min);
        }
    }

    if job.has_salary() {
        job.salary_currency = currency.or_else(|| Some(DEFAULT_CURRENCY.to_string()));
        job.salary_period = payload::str_field(p, payload::SALARY_PERIOD)
            .and_then(|s| SalaryPeriod::parse(&s))
            .or_else(|| {
                let lower = job.description.to_lowercase();
                if lower.contains("per hour") || lower.contains("/hr") || lower.contains("/hour") {
                    Some(SalaryPeriod::Hour)
                } else {
                    Some(SalaryPeriod::Year)
                }
            });
    }
}

fn visa_sponsorship(text: &str) -> Option<bool> {
    let negative = [
        "no visa sponsorship",
        "unable to sponsor",
        "not able to sponsor",
        "cannot sponsor",
        "can't sponsor",
        "will not sponsor",
        "does not sponsor",
        "do not sponsor",
        "without sponsorship",
    ];
    if negative.iter().any(|phrase| text.contains(phrase)) {
        return Some(false);
    }
    if text.contains("visa sponsorship") || text.contains("sponsor visa") || text.contains("will sponsor")
    {
        return Some(true);
    }
    None
}

fn apply_options(p: &Value) -> Vec<ApplyOption> {
    let Some(Value::Array(options)) = payload::lookup(p, "apply_options") else {
        return Vec::new();
    };
    options
        .iter()
        .filter_map(|option| {
            let url = payload::str_field(option, &["apply_link", "url", "link"])?;
            if !is_http(&url) {
                return None;
            }
            Some(ApplyOption {
                publisher: payload::str_field(option, &["publisher", "name"])
                    .unwrap_or_else(|| "unknown".to_string()),
                url,
                is_direct: payload::bool_field(option, &["is_direct"]).unwrap_or(false),
            })
        })
        .collect()
}

fn is_http(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
