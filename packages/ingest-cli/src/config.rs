use anyhow::{bail, Context, Result};
use dotenvy::dotenv;
use job_ingest::ai::DEFAULT_MODEL;
use job_ingest::{IngestConfig, UnknownAgePolicy};
use secrecy::SecretString;
use std::env;
use std::str::FromStr;

const DEFAULT_DATABASE_URL: &str = "sqlite://jobs.db?mode=rwc";

/// Application configuration loaded from environment variables
#[derive(Debug)]
pub struct Config {
    pub database_url: String,
    pub openai_api_key: Option<SecretString>,
    pub openai_model: String,
    pub enable_ai: bool,
    pub batch_size: usize,
    pub concurrency: usize,
    pub max_age_days: i64,
    pub drop_unknown_age: bool,
    pub interval_minutes: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from any name -> value lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = IngestConfig::default();

        let enable_ai = parse_or(&lookup, "ENABLE_AI_ENRICHMENT", true)?;
        let openai_api_key = lookup("OPENAI_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .map(SecretString::from);
        if enable_ai && openai_api_key.is_none() {
            bail!("OPENAI_API_KEY must be set when ENABLE_AI_ENRICHMENT is true");
        }

        let config = Self {
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            openai_api_key,
            openai_model: lookup("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            enable_ai,
            batch_size: parse_or(&lookup, "INGEST_BATCH_SIZE", defaults.batch_size)?,
            concurrency: parse_or(&lookup, "INGEST_CONCURRENCY", defaults.concurrency)?,
            max_age_days: parse_or(&lookup, "INGEST_MAX_AGE_DAYS", defaults.max_age_days)?,
            drop_unknown_age: parse_or(&lookup, "INGEST_DROP_UNKNOWN_AGE", false)?,
            interval_minutes: parse_or(&lookup, "INGESTION_INTERVAL_MINUTES", 30)?,
        };

        config
            .ingest_config()
            .validate()
            .context("Invalid ingestion settings")?;
        if config.interval_minutes == 0 {
            bail!("INGESTION_INTERVAL_MINUTES must be at least 1");
        }
        Ok(config)
    }

    /// Pipeline settings derived from the environment.
    pub fn ingest_config(&self) -> IngestConfig {
        let mut config = IngestConfig::default()
            .with_batch_size(self.batch_size)
            .with_concurrency(self.concurrency)
            .with_max_age_days(self.max_age_days);
        if self.drop_unknown_age {
            config = config.with_unknown_age(UnknownAgePolicy::Drop);
        }
        if !self.enable_ai {
            config = config.without_ai();
        }
        config
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} must be a valid value: {}", name, e)),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults_without_ai() {
        let config = load(&[("ENABLE_AI_ENRICHMENT", "false")]).unwrap();

        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.batch_size, 5);
        assert_eq!(config.concurrency, 10);
        assert_eq!(config.interval_minutes, 30);
        assert!(!config.ingest_config().use_ai);
    }

    #[test]
    fn test_ai_requires_key() {
        assert!(load(&[]).is_err());

        let config = load(&[("OPENAI_API_KEY", "sk-test")]).unwrap();
        let key = config.openai_api_key.as_ref().unwrap();
        assert_eq!(key.expose_secret(), "sk-test");
    }

    #[test]
    fn test_overrides_and_validation() {
        let config = load(&[
            ("ENABLE_AI_ENRICHMENT", "false"),
            ("INGEST_BATCH_SIZE", "8"),
            ("INGEST_DROP_UNKNOWN_AGE", "true"),
        ])
        .unwrap();
        assert_eq!(config.ingest_config().batch_size, 8);
        assert_eq!(config.ingest_config().unknown_age, UnknownAgePolicy::Drop);

        assert!(load(&[("ENABLE_AI_ENRICHMENT", "false"), ("INGEST_CONCURRENCY", "0")]).is_err());
        assert!(load(&[("ENABLE_AI_ENRICHMENT", "false"), ("INGEST_BATCH_SIZE", "lots")]).is_err());
        assert!(load(&[
            ("ENABLE_AI_ENRICHMENT", "false"),
            ("INGEST_MAX_AGE_DAYS", "200000000000"),
        ])
        .is_err());
    }
}
