//! RemoteOK public JSON feed.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{SourceError, SourceResult};
use crate::traits::source::SourceAdapter;
use crate::types::listing::RawRecord;

const DEFAULT_URL: &str = "https://remoteok.com/api";

/// Fetch adapter for <https://remoteok.com/api>.
///
/// The feed is a JSON array whose first element is a legal notice, not a
/// posting. Every posting on the board is remote, so records are tagged
/// `remote: true` before they leave the adapter.
///
/// # Example
///
/// ```rust,ignore
/// use job_ingest::sources::RemoteOk;
///
/// let ingestor = Ingestor::new(store).with_source(Arc::new(RemoteOk::new()));
/// ```
pub struct RemoteOk {
    client: reqwest::Client,
    url: String,
    user_agent: String,
    request_timeout: Duration,
}

impl Default for RemoteOk {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteOk {
    /// Create an adapter for the public feed.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            url: DEFAULT_URL.to_string(),
            user_agent: "job-ingest/0.1".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Point at a different feed URL (mirrors, test servers).
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set a custom user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set a custom HTTP client.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }
}

#[async_trait]
impl SourceAdapter for RemoteOk {
    fn name(&self) -> &str {
        "remoteok"
    }

    async fn fetch(&self) -> SourceResult<Vec<RawRecord>> {
        debug!(url = %self.url, "RemoteOK fetch starting");
        let response = self
            .client
            .get(&self.url)
            .header("User-Agent", &self.user_agent)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| SourceError::Transport(Box::new(e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Transport(
                format!("HTTP {} from {}", status, self.url).into(),
            ));
        }

        let body: Value = response.json().await.map_err(|e| SourceError::Malformed {
            reason: e.to_string(),
        })?;

        parse_feed(body)
    }
}

/// Turn the feed array into records, skipping the legal notice and any
/// entry without an id.
fn parse_feed(body: Value) -> SourceResult<Vec<RawRecord>> {
    let Value::Array(items) = body else {
        return Err(SourceError::Malformed {
            reason: "expected a JSON array".to_string(),
        });
    };

    let mut records = Vec::with_capacity(items.len());
    for mut item in items {
        let Some(source_id) = posting_id(&item) else {
            // The legal notice has no id
            if item.get("legal").is_none() {
                warn!("RemoteOK entry without id skipped");
            }
            continue;
        };

        if let Value::Object(fields) = &mut item {
            fields.insert("remote".to_string(), Value::Bool(true));
            // Zero means "not disclosed"
            for key in ["salary_min", "salary_max"] {
                if fields.get(key).and_then(Value::as_f64) == Some(0.0) {
                    fields.remove(key);
                }
            }
        }
        records.push(RawRecord::new(source_id, item));
    }
    Ok(records)
}

fn posting_id(item: &Value) -> Option<String> {
    match item.get("id")? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
