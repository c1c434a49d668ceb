//! Vision provider implementations of [`ChangeAnalyzer`].
//!
//! - **[`DisabledAnalyzer`]**: fails every call; used when no provider is configured.
//! - **[`GeminiAnalyzer`]**: calls the Gemini `generateContent` API with a JSON response schema.
//! - **[`OllamaAnalyzer`]**: calls a local Ollama instance's `/api/chat` endpoint with a format schema.
//!
//! Both HTTP providers send the same directive and both images (base64,
//! `image/jpeg`), and both validate the reply through
//! [`parse_judgment`](pantry_core::judgment::parse_judgment).
//!
//! # No Retry
//!
//! One analysis is one request. Network errors and non-2xx statuses are
//! reported as [`PantryError::Analyzer`] and the pair is simply lost.
//!
//! # Provider Selection
//!
//! ```rust,no_run
//! # use pantry_tracker::config::AnalyzerConfig;
//! # use pantry_tracker::analyzer::create_analyzer;
//! let config = AnalyzerConfig::default(); // provider = "disabled"
//! let analyzer = create_analyzer(&config).unwrap();
//! assert_eq!(analyzer.name(), "disabled");
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use pantry_core::analyzer::{directive_for, ChangeAnalyzer};
use pantry_core::judgment::{parse_judgment, Judgment};
use pantry_core::PantryError;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::AnalyzerConfig;

const GEMINI_DEFAULT_URL: &str = "https://generativelanguage.googleapis.com";
const OLLAMA_DEFAULT_URL: &str = "http://localhost:11434";

fn today_string() -> String {
    chrono::Local::now().date_naive().format("%Y-%m-%d").to_string()
}

fn build_client(config: &AnalyzerConfig) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?)
}

/// Send a request and return the decoded JSON body, mapping every failure
/// to [`PantryError::Analyzer`].
async fn send_json(provider: &str, request: reqwest::RequestBuilder) -> Result<Value> {
    let response = request
        .send()
        .await
        .map_err(|e| PantryError::Analyzer(format!("{} request failed: {}", provider, e)))?;

    let status = response.status();
    if !status.is_success() {
        let body_text = response.text().await.unwrap_or_default();
        return Err(PantryError::Analyzer(format!(
            "{} API error {}: {}",
            provider, status, body_text
        ))
        .into());
    }

    let json = response.json::<Value>().await.map_err(|e| {
        PantryError::MalformedJudgment(format!("{} response is not JSON: {}", provider, e))
    })?;
    Ok(json)
}

// ============ Disabled ============

/// An analyzer that always fails.
///
/// Used when `analyzer.provider = "disabled"`. Captures are still paired
/// and dispatched; each analysis fails and is logged.
pub struct DisabledAnalyzer;

#[async_trait]
impl ChangeAnalyzer for DisabledAnalyzer {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn analyze(&self, _before: &[u8], _after: &[u8]) -> Result<Judgment> {
        Err(PantryError::Disabled.into())
    }
}

// ============ Gemini ============

/// Analyzer backed by the Gemini API.
///
/// Requires the `GEMINI_API_KEY` environment variable. Calls
/// `POST {url}/v1beta/models/{model}:generateContent` with
/// `responseMimeType = application/json` and [`gemini_schema`].
pub struct GeminiAnalyzer {
    client: reqwest::Client,
    url: String,
    model: String,
    api_key: String,
}

impl GeminiAnalyzer {
    pub fn new(config: &AnalyzerConfig) -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| anyhow!("GEMINI_API_KEY environment variable not set"))?;
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(config: &AnalyzerConfig, api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: build_client(config)?,
            url: config
                .url
                .clone()
                .unwrap_or_else(|| GEMINI_DEFAULT_URL.to_string()),
            model: config.model.clone(),
            api_key: api_key.into(),
        })
    }

    fn request_body(&self, before: &[u8], after: &[u8]) -> Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "text": directive_for(&today_string()) },
                    { "inline_data": { "mime_type": "image/jpeg", "data": STANDARD.encode(before) } },
                    { "inline_data": { "mime_type": "image/jpeg", "data": STANDARD.encode(after) } }
                ]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": gemini_schema()
            }
        })
    }
}

#[async_trait]
impl ChangeAnalyzer for GeminiAnalyzer {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn analyze(&self, before: &[u8], after: &[u8]) -> Result<Judgment> {
        let endpoint = format!(
            "{}/v1beta/models/{}:generateContent",
            self.url.trim_end_matches('/'),
            self.model
        );
        debug!(model = %self.model, before = before.len(), after = after.len(), "calling gemini");

        let request = self
            .client
            .post(endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&self.request_body(before, after));
        let json = send_json("Gemini", request).await?;

        let text = parse_gemini_text(&json)?;
        Ok(parse_judgment(&text)?)
    }
}

/// Extract `candidates[0].content.parts[*].text` from a Gemini reply.
fn parse_gemini_text(json: &Value) -> Result<String> {
    let parts = json
        .pointer("/candidates/0/content/parts")
        .and_then(|p| p.as_array())
        .ok_or_else(|| {
            PantryError::MalformedJudgment("Gemini response: missing candidate content".into())
        })?;

    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect();
    if text.trim().is_empty() {
        bail!(PantryError::MalformedJudgment(
            "Gemini response: candidate has no text".into()
        ));
    }
    Ok(text)
}

/// Judgment schema in Gemini's OpenAPI subset.
pub fn gemini_schema() -> Value {
    let item = json!({
        "type": "OBJECT",
        "properties": {
            "name": { "type": "STRING" },
            "expiry_date": { "type": "STRING", "format": "date", "nullable": true }
        },
        "required": ["name", "expiry_date"]
    });
    json!({
        "type": "OBJECT",
        "properties": {
            "items_added": { "type": "ARRAY", "items": item.clone() },
            "items_removed": { "type": "ARRAY", "items": { "type": "STRING" } },
            "current_full_inventory": { "type": "ARRAY", "items": item }
        },
        "required": ["items_added", "items_removed", "current_full_inventory"]
    })
}

// ============ Ollama ============

/// Analyzer backed by a local Ollama instance with a vision model
/// (e.g. `llava`, `qwen2.5vl`).
///
/// Calls `POST {url}/api/chat` (default `http://localhost:11434`) with
/// `stream = false` and [`json_schema`] as the structured output format.
pub struct OllamaAnalyzer {
    client: reqwest::Client,
    url: String,
    model: String,
}

impl OllamaAnalyzer {
    pub fn new(config: &AnalyzerConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config)?,
            url: config
                .url
                .clone()
                .unwrap_or_else(|| OLLAMA_DEFAULT_URL.to_string()),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl ChangeAnalyzer for OllamaAnalyzer {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn analyze(&self, before: &[u8], after: &[u8]) -> Result<Judgment> {
        let body = json!({
            "model": self.model,
            "stream": false,
            "format": json_schema(),
            "messages": [{
                "role": "user",
                "content": directive_for(&today_string()),
                "images": [STANDARD.encode(before), STANDARD.encode(after)]
            }]
        });
        debug!(model = %self.model, url = %self.url, "calling ollama");

        let request = self
            .client
            .post(format!("{}/api/chat", self.url.trim_end_matches('/')))
            .json(&body);
        let json = send_json("Ollama", request).await?;

        let content = json
            .pointer("/message/content")
            .and_then(|c| c.as_str())
            .ok_or_else(|| {
                PantryError::MalformedJudgment("Ollama response: missing message content".into())
            })?;
        Ok(parse_judgment(content)?)
    }
}

/// Judgment schema as standard JSON Schema.
pub fn json_schema() -> Value {
    let item = json!({
        "type": "object",
        "properties": {
            "name": { "type": "string" },
            "expiry_date": { "type": ["string", "null"], "format": "date" }
        },
        "required": ["name", "expiry_date"],
        "additionalProperties": false
    });
    json!({
        "type": "object",
        "properties": {
            "items_added": { "type": "array", "items": item.clone() },
            "items_removed": { "type": "array", "items": { "type": "string" } },
            "current_full_inventory": { "type": "array", "items": item }
        },
        "required": ["items_added", "items_removed", "current_full_inventory"],
        "additionalProperties": false
    })
}

/// Create the [`ChangeAnalyzer`] selected by configuration.
///
/// | Config Value | Analyzer |
/// |-------------|----------|
/// | `"disabled"` | [`DisabledAnalyzer`] |
/// | `"gemini"` | [`GeminiAnalyzer`] |
/// | `"ollama"` | [`OllamaAnalyzer`] |
pub fn create_analyzer(config: &AnalyzerConfig) -> Result<Arc<dyn ChangeAnalyzer>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledAnalyzer)),
        "gemini" => Ok(Arc::new(GeminiAnalyzer::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaAnalyzer::new(config)?)),
        other => bail!("Unknown analyzer provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn config_for(server: &MockServer, provider: &str) -> AnalyzerConfig {
        AnalyzerConfig {
            provider: provider.to_string(),
            model: "test-model".to_string(),
            url: Some(server.base_url()),
            timeout_secs: 5,
        }
    }

    const REPLY: &str = r#"{"items_added":[{"name":"Milk","expiry_date":"2025-01-01"}],"items_removed":["Eggs"],"current_full_inventory":[{"name":"Milk","expiry_date":"2025-01-01"}]}"#;

    #[tokio::test]
    async fn test_gemini_success() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1beta/models/test-model:generateContent")
                    .header("x-goog-api-key", "secret")
                    .body_contains("inline_data");
                then.status(200).json_body(json!({
                    "candidates": [{ "content": { "parts": [{ "text": REPLY }] } }]
                }));
            })
            .await;

        let analyzer =
            GeminiAnalyzer::with_api_key(&config_for(&server, "gemini"), "secret").unwrap();
        let judgment = analyzer.analyze(b"before", b"after").await.unwrap();

        mock.assert_async().await;
        assert_eq!(judgment.items_added[0].name, "Milk");
        assert_eq!(judgment.items_removed, vec!["Eggs"]);
    }

    #[tokio::test]
    async fn test_gemini_server_error_is_analyzer_error() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(503).body("overloaded");
            })
            .await;

        let analyzer = GeminiAnalyzer::with_api_key(&config_for(&server, "gemini"), "k").unwrap();
        let err = analyzer.analyze(b"a", b"b").await.unwrap_err();

        // Exactly one attempt: no retry.
        mock.assert_hits_async(1).await;
        assert!(matches!(
            err.downcast_ref::<PantryError>(),
            Some(PantryError::Analyzer(_))
        ));
    }

    #[tokio::test]
    async fn test_gemini_prose_reply_is_malformed() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200).json_body(json!({
                    "candidates": [{ "content": { "parts": [{ "text": "I see a shelf." }] } }]
                }));
            })
            .await;

        let analyzer = GeminiAnalyzer::with_api_key(&config_for(&server, "gemini"), "k").unwrap();
        let err = analyzer.analyze(b"a", b"b").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PantryError>(),
            Some(PantryError::MalformedJudgment(_))
        ));
    }

    #[tokio::test]
    async fn test_ollama_success() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/chat").body_contains("\"images\"");
                then.status(200).json_body(json!({
                    "model": "test-model",
                    "message": { "role": "assistant", "content": REPLY },
                    "done": true
                }));
            })
            .await;

        let analyzer = OllamaAnalyzer::new(&config_for(&server, "ollama")).unwrap();
        let judgment = analyzer.analyze(b"before", b"after").await.unwrap();

        mock.assert_async().await;
        assert_eq!(judgment.current_full_inventory.len(), 1);
    }

    #[tokio::test]
    async fn test_disabled_fails() {
        let err = DisabledAnalyzer.analyze(b"a", b"b").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PantryError>(),
            Some(PantryError::Disabled)
        ));
    }

    #[test]
    fn test_parse_gemini_text_joins_parts() {
        let json = json!({
            "candidates": [{ "content": { "parts": [{ "text": "{\"a\":" }, { "text": "1}" }] } }]
        });
        assert_eq!(parse_gemini_text(&json).unwrap(), "{\"a\":1}");
        assert!(parse_gemini_text(&json!({ "candidates": [] })).is_err());
    }
}
