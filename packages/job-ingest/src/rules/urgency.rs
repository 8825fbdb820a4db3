//! Hiring urgency and application deadline detection from free text.

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use lazy_static::lazy_static;
use regex::Regex;

use crate::types::job::Urgency;

/// Month-day with optional ", year".
const MONTH_DAY: &str = r"([a-z]+\s+\d{1,2}(?:st|nd|rd|th)?(?:,?\s+\d{4})?)";

lazy_static! {
    static ref URGENT: Regex = Regex::new(
        r"(?i)\b(?:urgent|urgently|asap|as soon as possible|immediate|immediately|right away|time-sensitive|hiring now|start immediately)\b"
    )
    .expect("valid regex");
    static ref ROLLING: Regex = Regex::new(
        r"(?i)\b(?:rolling basis|rolling deadline|ongoing|open until filled|no deadline)\b"
    )
    .expect("valid regex");
    static ref DEADLINES: Vec<Regex> = [
        format!(r"apply by\s+{}", MONTH_DAY),
        r"deadline[:\s]+(\d{4}-\d{2}-\d{2})".to_string(),
        format!(r"closes?\s+(?:on\s+)?{}", MONTH_DAY),
        format!(r"applications?\s+due\s+(?:by\s+)?{}", MONTH_DAY),
        format!(r"until\s+{}", MONTH_DAY),
    ]
    .iter()
    .map(|p| Regex::new(&format!("(?i){}", p)).expect("valid deadline pattern"))
    .collect();
    static ref ORDINAL: Regex = Regex::new(r"(\d)(?:st|nd|rd|th)\b").expect("valid regex");
}

/// Urgent keywords win over rolling-deadline phrases; otherwise normal.
pub fn detect_urgency(title: &str, description: &str) -> Urgency {
    let text = format!("{} {}", title, description);
    if URGENT.is_match(&text) {
        Urgency::Urgent
    } else if ROLLING.is_match(&text) {
        Urgency::Low
    } else {
        Urgency::Normal
    }
}

/// Find an application deadline in the text.
///
/// Dates without a year are placed in `today`'s year. Rolling or
/// open-until-filled postings have no deadline.
pub fn extract_deadline(text: &str, today: NaiveDate) -> Option<DateTime<Utc>> {
    if ROLLING.is_match(text) {
        return None;
    }
    DEADLINES.iter().find_map(|pattern| {
        let captured = pattern.captures(text)?.get(1)?.as_str();
        parse_deadline(captured, today)
    })
}

/// Whether a deadline falls within `days` of `now`.
pub fn is_deadline_soon(deadline: Option<DateTime<Utc>>, now: DateTime<Utc>, days: i64) -> bool {
    deadline.is_some_and(|d| d - now <= chrono::Duration::days(days))
}

fn parse_deadline(raw: &str, today: NaiveDate) -> Option<DateTime<Utc>> {
    if let Ok(date) = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
        return midnight(date);
    }

    let cleaned = ORDINAL.replace_all(raw, "$1").replace(',', " ");
    let mut parts = cleaned.split_whitespace();
    let month = month_number(parts.next()?)?;
    let day: u32 = parts.next()?.parse().ok()?;
    let year: i32 = match parts.next() {
        Some(y) => y.parse().ok()?,
        None => today.year(),
    };
    midnight(NaiveDate::from_ymd_opt(year, month, day)?)
}

fn midnight(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_opt(0, 0, 0)
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn month_number(word: &str) -> Option<u32> {
    const MONTHS: [&str; 12] = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ];
    let word = word.to_lowercase();
    if word.len() < 3 {
        return None;
    }
    MONTHS
        .iter()
        .position(|m| word.starts_with(m))
        .map(|i| i as u32 + 1)
}
