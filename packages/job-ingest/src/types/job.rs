//! The canonical enriched job record and its vocabulary types.

use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::types::listing::RawListing;

/// Employment type. Unknown values normalise to `FullTime`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EmploymentType {
    #[default]
    FullTime,
    PartTime,
    Contract,
    Intern,
    Temporary,
}

impl EmploymentType {
    pub const ALL: [EmploymentType; 5] = [
        Self::FullTime,
        Self::PartTime,
        Self::Contract,
        Self::Intern,
        Self::Temporary,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FullTime => "FULLTIME",
            Self::PartTime => "PARTTIME",
            Self::Contract => "CONTRACT",
            Self::Intern => "INTERN",
            Self::Temporary => "TEMPORARY",
        }
    }

    /// Lenient parse: accepts "full-time", "Full Time", "contractor", etc.
    pub fn parse(value: &str) -> Option<Self> {
        let key = squash(value);
        match key.as_str() {
            "fulltime" | "permanent" | "ft" => Some(Self::FullTime),
            "parttime" | "pt" => Some(Self::PartTime),
            "contract" | "contractor" | "freelance" => Some(Self::Contract),
            "intern" | "internship" => Some(Self::Intern),
            "temporary" | "temp" => Some(Self::Temporary),
            _ => None,
        }
    }
}

/// Seniority level derived from title and requirements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Seniority {
    Junior,
    Mid,
    Senior,
    Staff,
    Principal,
}

impl Seniority {
    pub const ALL: [Seniority; 5] = [
        Self::Junior,
        Self::Mid,
        Self::Senior,
        Self::Staff,
        Self::Principal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Junior => "junior",
            Self::Mid => "mid",
            Self::Senior => "senior",
            Self::Staff => "staff",
            Self::Principal => "principal",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match squash(value).as_str() {
            "junior" | "entry" | "entrylevel" | "jr" => Some(Self::Junior),
            "mid" | "midlevel" | "intermediate" => Some(Self::Mid),
            "senior" | "sr" | "lead" => Some(Self::Senior),
            "staff" => Some(Self::Staff),
            "principal" | "distinguished" => Some(Self::Principal),
            _ => None,
        }
    }
}

/// Where the work happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkArrangement {
    Remote,
    Hybrid,
    Onsite,
}

impl WorkArrangement {
    pub const ALL: [WorkArrangement; 3] = [Self::Remote, Self::Hybrid, Self::Onsite];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::Hybrid => "hybrid",
            Self::Onsite => "onsite",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match squash(value).as_str() {
            "remote" | "fullyremote" | "wfh" => Some(Self::Remote),
            "hybrid" => Some(Self::Hybrid),
            "onsite" | "office" | "inoffice" | "inperson" => Some(Self::Onsite),
            _ => None,
        }
    }
}

/// Coarse role category used for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleCategory {
    Frontend,
    Backend,
    Fullstack,
    Mobile,
    Devops,
    Data,
    Ml,
    Security,
    Qa,
    Management,
    #[default]
    General,
}

impl RoleCategory {
    pub const ALL: [RoleCategory; 11] = [
        Self::Frontend,
        Self::Backend,
        Self::Fullstack,
        Self::Mobile,
        Self::Devops,
        Self::Data,
        Self::Ml,
        Self::Security,
        Self::Qa,
        Self::Management,
        Self::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Frontend => "frontend",
            Self::Backend => "backend",
            Self::Fullstack => "fullstack",
            Self::Mobile => "mobile",
            Self::Devops => "devops",
            Self::Data => "data",
            Self::Ml => "ml",
            Self::Security => "security",
            Self::Qa => "qa",
            Self::Management => "management",
            Self::General => "general",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match squash(value).as_str() {
            "frontend" => Some(Self::Frontend),
            "backend" => Some(Self::Backend),
            "fullstack" => Some(Self::Fullstack),
            "mobile" => Some(Self::Mobile),
            "devops" | "sre" | "platform" | "infrastructure" => Some(Self::Devops),
            "data" | "dataengineer" | "datascientist" => Some(Self::Data),
            "ml" | "mlengineer" | "ai" => Some(Self::Ml),
            "security" => Some(Self::Security),
            "qa" | "test" | "testing" => Some(Self::Qa),
            "management" | "manager" | "architect" => Some(Self::Management),
            "general" => Some(Self::General),
            _ => None,
        }
    }
}

/// Pay period for the salary range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SalaryPeriod {
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl SalaryPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match squash(value).as_str() {
            "hour" | "hourly" => Some(Self::Hour),
            "day" | "daily" => Some(Self::Day),
            "week" | "weekly" => Some(Self::Week),
            "month" | "monthly" => Some(Self::Month),
            "year" | "yearly" | "annual" | "annually" => Some(Self::Year),
            _ => None,
        }
    }
}

/// How urgently the employer is hiring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Urgent,
    #[default]
    Normal,
    Low,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Urgent => "urgent",
            Self::Normal => "normal",
            Self::Low => "low",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match squash(value).as_str() {
            "urgent" => Some(Self::Urgent),
            "normal" => Some(Self::Normal),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

/// Which path produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrichmentMethod {
    Ai,
    Fallback,
}

impl EnrichmentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ai => "ai",
            Self::Fallback => "fallback",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ai" => Some(Self::Ai),
            "fallback" => Some(Self::Fallback),
            _ => None,
        }
    }
}

/// An alternative place to apply for the same posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyOption {
    pub publisher: String,
    pub url: String,
    #[serde(default)]
    pub is_direct: bool,
}

/// The canonical structured job record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedJob {
    /// `source:source_id`, unique across the store
    pub id: String,
    pub source: String,
    pub source_id: String,

    pub title: String,
    pub company: String,
    pub description: String,
    pub short_description: Option<String>,

    pub country: Option<String>,
    pub city: Option<String>,
    pub remote: bool,
    pub work_arrangement: Option<WorkArrangement>,

    pub employment_type: EmploymentType,
    pub seniority: Option<Seniority>,
    pub department: Option<String>,
    pub category: RoleCategory,

    pub salary_min: Option<f64>,
    pub salary_max: Option<f64>,
    pub salary_currency: Option<String>,
    pub salary_period: Option<SalaryPeriod>,

    #[serde(default)]
    pub skills: IndexSet<String>,
    pub required_years: Option<u32>,
    pub education: Option<String>,
    #[serde(default)]
    pub responsibilities: Vec<String>,
    #[serde(default)]
    pub benefits: Vec<String>,

    pub posted_at: Option<DateTime<Utc>>,
    pub application_deadline: Option<DateTime<Utc>>,
    pub fetched_at: DateTime<Utc>,

    pub apply_url: Option<String>,
    #[serde(default)]
    pub apply_options: Vec<ApplyOption>,

    pub urgency: Urgency,
    pub visa_sponsorship: Option<bool>,
    pub enrichment: EnrichmentMethod,

    /// Normalised title+company identity hash
    pub dedup_hash: String,

    /// Completeness score, 0-100
    pub quality_score: u8,
}

impl EnrichedJob {
    /// Start a record for a listing with the three required text fields.
    ///
    /// Everything else starts empty; `dedup_hash` and `quality_score` are
    /// filled in by the enrichment stage once all fields are known.
    pub fn new(
        listing: &RawListing,
        title: impl Into<String>,
        company: impl Into<String>,
        description: impl Into<String>,
        enrichment: EnrichmentMethod,
    ) -> Self {
        Self {
            id: listing.record_id(),
            source: listing.source.clone(),
            source_id: listing.source_id.clone(),
            title: title.into(),
            company: company.into(),
            description: description.into(),
            short_description: None,
            country: None,
            city: None,
            remote: false,
            work_arrangement: None,
            employment_type: EmploymentType::default(),
            seniority: None,
            department: None,
            category: RoleCategory::default(),
            salary_min: None,
            salary_max: None,
            salary_currency: None,
            salary_period: None,
            skills: IndexSet::new(),
            required_years: None,
            education: None,
            responsibilities: Vec::new(),
            benefits: Vec::new(),
            posted_at: None,
            application_deadline: None,
            fetched_at: listing.fetched_at,
            apply_url: None,
            apply_options: Vec::new(),
            urgency: Urgency::default(),
            visa_sponsorship: None,
            enrichment,
            dedup_hash: String::new(),
            quality_score: 0,
        }
    }

    /// Whether any salary bound is known.
    pub fn has_salary(&self) -> bool {
        self.salary_min.is_some() || self.salary_max.is_some()
    }
}

/// Lowercase and drop everything but letters and digits.
fn squash(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}
