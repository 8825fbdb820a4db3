//! Field lookup over opaque source payloads.
//!
//! Sources disagree on field names (`title` vs `position` vs `job_title`),
//! so every lookup takes a list of aliases and returns the first usable
//! value. Aliases may be dotted paths into nested objects
//! (`company.display_name`).

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

pub const TITLE: &[&str] = &["title", "position", "job_title", "role", "name"];
pub const COMPANY: &[&str] = &[
    "company",
    "company_name",
    "employer_name",
    "company.display_name",
    "company.name",
    "organization",
];
pub const DESCRIPTION: &[&str] = &[
    "description",
    "job_description",
    "content",
    "descriptionPlain",
    "body",
    "summary",
    "text",
];
pub const POSTED_AT: &[&str] = &[
    "posted_at",
    "job_posted_at_datetime_utc",
    "date",
    "created",
    "created_at",
    "published",
    "published_at",
    "updated_at",
    "epoch",
    "time",
];
pub const DEADLINE: &[&str] = &[
    "application_deadline",
    "job_offer_expiration_datetime_utc",
    "deadline",
    "expires_at",
];
pub const APPLY_URL: &[&str] = &[
    "apply_url",
    "job_apply_link",
    "redirect_url",
    "absolute_url",
    "hostedUrl",
    "url",
    "link",
];
pub const EMPLOYMENT_TYPE: &[&str] = &[
    "employment_type",
    "job_employment_type",
    "contract_time",
    "contract_type",
    "commitment",
    "categories.commitment",
    "type",
];
pub const LOCATION: &[&str] = &[
    "location",
    "location_raw",
    "candidate_required_location",
    "location.display_name",
    "location.name",
    "categories.location",
];
pub const CITY: &[&str] = &["city", "job_city", "location.city", "_location_city"];
pub const COUNTRY: &[&str] = &["country", "job_country", "location.country", "_location_country"];
pub const REMOTE: &[&str] = &["remote", "job_is_remote", "is_remote", "_location_remote"];
pub const SALARY_MIN: &[&str] = &["salary_min", "job_min_salary", "salary.min", "min_salary"];
pub const SALARY_MAX: &[&str] = &["salary_max", "job_max_salary", "salary.max", "max_salary"];
pub const SALARY_CURRENCY: &[&str] = &["salary_currency", "job_salary_currency", "salary.currency", "currency"];
pub const SALARY_PERIOD: &[&str] = &["salary_period", "job_salary_period", "salary.period"];
pub const DEPARTMENT: &[&str] = &["department", "team", "categories.team", "departments.0.name"];

lazy_static! {
    static ref HTML_TAG: Regex = Regex::new(r"<[^>]*>").expect("valid regex");
    static ref WHITESPACE: Regex = Regex::new(r"\s+").expect("valid regex");
    static ref AMOUNT: Regex =
        Regex::new(r"(?i)(\d[\d,]*(?:\.\d+)?)\s*(k)?").expect("valid regex");
}

/// Resolve a dotted path. Numeric segments index into arrays.
pub fn lookup<'a>(payload: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = payload;
    for key in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(key)?,
            Value::Array(items) => items.get(key.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    match current {
        Value::Null => None,
        value => Some(value),
    }
}

/// First non-blank string among the aliases. Numbers are stringified.
pub fn str_field(payload: &Value, aliases: &[&str]) -> Option<String> {
    aliases.iter().find_map(|alias| match lookup(payload, alias)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// First numeric value among the aliases, accepting strings like "$120,000".
pub fn num_field(payload: &Value, aliases: &[&str]) -> Option<f64> {
    aliases.iter().find_map(|alias| match lookup(payload, alias)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_amount(s),
        _ => None,
    })
}

/// First boolean among the aliases, accepting "true"/"yes"/"1".
pub fn bool_field(payload: &Value, aliases: &[&str]) -> Option<bool> {
    aliases.iter().find_map(|alias| match lookup(payload, alias)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        Value::Number(n) => n.as_i64().map(|v| v != 0),
        _ => None,
    })
}

/// First parseable date among the aliases.
pub fn date_field(payload: &Value, aliases: &[&str]) -> Option<DateTime<Utc>> {
    aliases
        .iter()
        .find_map(|alias| lookup(payload, alias).and_then(parse_date))
}

/// Parse unix seconds/millis, RFC 3339, RFC 2822 or plain dates.
pub fn parse_date(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n.as_i64().and_then(from_epoch),
        Value::String(s) => parse_date_str(s),
        _ => None,
    }
}

fn from_epoch(raw: i64) -> Option<DateTime<Utc>> {
    // Anything past year 33658 in seconds is really milliseconds
    if raw > 1_000_000_000_000 {
        Utc.timestamp_millis_opt(raw).single()
    } else {
        Utc.timestamp_opt(raw, 0).single()
    }
}

pub fn parse_date_str(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().all(|c| c.is_ascii_digit()) {
        return s.parse::<i64>().ok().and_then(from_epoch);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Parse "120000", "$120,000", "120k" into a number. Only the first
/// amount counts, so "$100k - $150k" is 100000.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let caps = AMOUNT.captures(raw)?;
    let multiplier = if caps.get(2).is_some() { 1000.0 } else { 1.0 };
    caps[1]
        .replace(',', "")
        .parse::<f64>()
        .ok()
        .map(|v| v * multiplier)
}

/// Strip tags, decode the common entities, collapse whitespace.
pub fn strip_html(raw: &str) -> String {
    let without_tags = HTML_TAG.replace_all(raw, " ");
    let decoded = without_tags
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'");
    WHITESPACE.replace_all(decoded.trim(), " ").into_owned()
}

/// Whole-word containment on already-lowercased text.
pub fn contains_word(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(i, _)| {
        let before = haystack[..i].chars().next_back();
        let after = haystack[i + needle.len()..].chars().next();
        !before.is_some_and(|c| c.is_alphanumeric()) && !after.is_some_and(|c| c.is_alphanumeric())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_alias_order_and_nesting() {
        let payload = json!({
            "position": "SRE",
            "company": {"display_name": "Acme"},
        });
        assert_eq!(str_field(&payload, TITLE).as_deref(), Some("SRE"));
        // "company" is an object, so the nested alias wins
        assert_eq!(str_field(&payload, COMPANY).as_deref(), Some("Acme"));
    }

    #[test]
    fn test_blank_strings_skipped() {
        let payload = json!({"title": "  ", "job_title": "Platform Engineer"});
        assert_eq!(str_field(&payload, TITLE).as_deref(), Some("Platform Engineer"));
    }

    #[test]
    fn test_parse_dates() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap();
        assert_eq!(parse_date(&json!("2024-03-15")), Some(expected));
        assert_eq!(parse_date(&json!("2024-03-15T00:00:00Z")), Some(expected));
        assert_eq!(parse_date(&json!(expected.timestamp())), Some(expected));
        assert_eq!(parse_date(&json!(expected.timestamp().to_string())), Some(expected));
        assert_eq!(parse_date(&json!(expected.timestamp_millis())), Some(expected));
        assert_eq!(parse_date(&json!("last tuesday")), None);
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("$120,000"), Some(120000.0));
        assert_eq!(parse_amount("95k"), Some(95000.0));
        assert_eq!(parse_amount("competitive"), None);
        assert_eq!(parse_amount("$100k - $150k"), Some(100000.0));
        assert_eq!(parse_amount("80,000-95,000 USD"), Some(80000.0));
        assert_eq!(parse_amount("1.5K"), Some(1500.0));
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(
            strip_html("<p>Build &amp; run <b>APIs</b></p>\n\n<ul><li>Go</li></ul>"),
            "Build & run APIs Go"
        );
    }

    #[test]
    fn test_contains_word() {
        assert!(contains_word("we are remote first", "remote"));
        assert!(!contains_word("remoteok listing", "remote"));
        assert!(contains_word("ui/ux work", "ui"));
        assert!(!contains_word("build tools", "ui"));
    }
}
