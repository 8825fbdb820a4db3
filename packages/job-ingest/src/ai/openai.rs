//! OpenAI implementation of the AI trait.
//!
//! A reference implementation using OpenAI chat completions with a JSON
//! schema response format.
//!
//! # Example
//!
//! ```rust,ignore
//! use job_ingest::ai::OpenAI;
//!
//! let ai = OpenAI::new("sk-...").with_model("gpt-4o");
//! let ingestor = Ingestor::new(store).with_ai(Arc::new(ai));
//! ```

use async_trait::async_trait;
use reqwest::Client;
use schemars::JsonSchema;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, IngestError, Result};
use crate::pipeline::prompts::{format_extract_batch, EXTRACT_JOBS_PROMPT};
use crate::traits::ai::{AiItem, ExtractedFields, AI};
use crate::types::listing::RawListing;

/// Default chat model.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// OpenAI-based AI implementation.
pub struct OpenAI {
    client: Client,
    api_key: SecretString,
    model: String,
    base_url: String,
}

impl Clone for OpenAI {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            api_key: SecretString::from(self.api_key.expose_secret().to_string()),
            model: self.model.clone(),
            base_url: self.base_url.clone(),
        }
    }
}

impl std::fmt::Debug for OpenAI {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAI")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl OpenAI {
    /// Create a new OpenAI client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: SecretString::from(api_key.into()),
            model: DEFAULT_MODEL.to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }

    /// Create from environment variable `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| ConfigError::Missing("OPENAI_API_KEY"))?;
        if api_key.trim().is_empty() {
            return Err(ConfigError::Missing("OPENAI_API_KEY").into());
        }
        Ok(Self::new(api_key))
    }

    /// Set the chat model (default: gpt-4o-mini).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set a custom base URL (for Azure, proxies, etc.).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Get the current model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Structured output with JSON schema (OpenAI's json_schema response_format).
    async fn generate_structured(
        &self,
        system: &str,
        user: &str,
        schema: serde_json::Value,
    ) -> Result<String> {
        let request = StructuredRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            temperature: 0.0,
            response_format: ResponseFormat {
                format_type: "json_schema".to_string(),
                json_schema: JsonSchemaFormat {
                    name: "extracted_jobs".to_string(),
                    // Optional fields are not expressible in strict mode
                    strict: false,
                    schema,
                },
            },
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(IngestError::ai)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(IngestError::ai(format!(
                "OpenAI structured output error ({}): {}",
                status, error_text
            )));
        }

        let chat_response: ChatResponse = response.json().await.map_err(IngestError::ai)?;

        chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| IngestError::ai("No response from OpenAI"))
    }
}

#[async_trait]
impl AI for OpenAI {
    async fn extract_jobs(&self, listings: &[RawListing]) -> Result<Vec<AiItem>> {
        if listings.is_empty() {
            return Ok(Vec::new());
        }

        let schema = serde_json::to_value(schemars::schema_for!(ExtractJobsSchema))?;
        let user = format_extract_batch(listings);
        let content = self
            .generate_structured(EXTRACT_JOBS_PROMPT, &user, schema)
            .await?;

        let items = parse_extract_response(&content)?;
        debug!(
            requested = listings.len(),
            returned = items.len(),
            model = %self.model,
            "OpenAI extraction complete"
        );
        Ok(items)
    }
}

/// Split a `{"jobs": [...]}` response into per-listing items.
///
/// A body that is not JSON fails the whole call; an element that does not
/// match the field shape only fails that element.
fn parse_extract_response(content: &str) -> Result<Vec<AiItem>> {
    let body: RawJobsResponse = serde_json::from_str(content)
        .map_err(|e| IngestError::ai(format!("Unparseable extraction response: {}", e)))?;

    Ok(body
        .jobs
        .into_iter()
        .map(|value| {
            serde_json::from_value::<ExtractedFields>(value).map_err(|e| e.to_string())
        })
        .collect())
}

/// Response shape advertised to the model.
#[derive(JsonSchema)]
#[allow(dead_code)]
struct ExtractJobsSchema {
    jobs: Vec<ExtractedFields>,
}

#[derive(Deserialize)]
struct RawJobsResponse {
    #[serde(default)]
    jobs: Vec<serde_json::Value>,
}

#[derive(Serialize)]
struct StructuredRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
    json_schema: JsonSchemaFormat,
}

#[derive(Serialize)]
struct JsonSchemaFormat {
    name: String,
    strict: bool,
    schema: serde_json::Value,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_builder() {
        let ai = OpenAI::new("sk-test")
            .with_model("gpt-4o")
            .with_base_url("https://custom.api.com");

        assert_eq!(ai.model(), "gpt-4o");
        assert_eq!(ai.base_url, "https://custom.api.com");
    }

    #[test]
    fn test_debug_hides_key() {
        let ai = OpenAI::new("sk-very-secret");
        assert!(!format!("{:?}", ai).contains("sk-very-secret"));
    }

    #[test]
    fn test_parse_isolates_malformed_items() {
        let content = r#"{"jobs": [
            {"title": "Backend Engineer", "company": "Acme", "skills": ["rust"]},
            {"title": 42},
            {"title": "SRE", "company": "Initech"}
        ]}"#;

        let items = parse_extract_response(content).unwrap();

        assert_eq!(items.len(), 3);
        assert_eq!(items[0].as_ref().unwrap().skills, vec!["rust".to_string()]);
        assert!(items[1].is_err());
        assert_eq!(items[2].as_ref().unwrap().company.as_deref(), Some("Initech"));
    }

    #[test]
    fn test_parse_rejects_non_json() {
        assert!(matches!(
            parse_extract_response("Sorry, I can't help with that."),
            Err(IngestError::Ai(_))
        ));
    }

    #[test]
    fn test_schema_lists_jobs() {
        let schema = serde_json::to_value(schemars::schema_for!(ExtractJobsSchema)).unwrap();
        assert!(schema["properties"]["jobs"].is_object());
    }
}
