//! Text-generation client using an OpenAI-compatible Responses API
//!
//! The extractor only depends on the `Generator` trait; `ResponsesClient` is
//! the HTTP implementation used in production.

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::LlmConfig;
use crate::error::ExtractionError;

/// Sampling options for one generation call
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            max_tokens: 150,
            top_p: 1.0,
        }
    }
}

impl From<&LlmConfig> for GenerationOptions {
    fn from(config: &LlmConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            top_p: config.top_p,
        }
    }
}

/// Any backend that turns a prompt into raw text
pub trait Generator: Send + Sync {
    fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, ExtractionError>;
}

/// Request body for the Responses API (internal)
#[derive(Serialize)]
struct ResponsesApiRequest<'a> {
    model: &'a str,
    input: &'a str,
    temperature: f32,
    top_p: f32,
    max_output_tokens: u32,
}

/// Response from the Responses API
#[derive(Deserialize, Debug)]
struct ResponsesApiResponse {
    #[serde(default)]
    output: Vec<OutputItem>,
    #[serde(default)]
    output_text: Option<String>,
}

#[derive(Deserialize, Debug)]
struct OutputItem {
    #[serde(default)]
    content: Vec<ContentItem>,
}

#[derive(Deserialize, Debug)]
struct ContentItem {
    #[serde(default)]
    text: Option<String>,
}

/// Blocking HTTP client for `{base_url}/responses`
pub struct ResponsesClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    timeout_ms: u64,
}

impl std::fmt::Debug for ResponsesClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponsesClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("has_api_key", &self.api_key.is_some())
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

impl ResponsesClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, ExtractionError> {
        if !config.is_configured() {
            return Err(ExtractionError::NotConfigured(
                "llm.enabled is false or llm.base_url is empty".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| ExtractionError::Request(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            timeout_ms: config.timeout_ms,
        })
    }
}

impl Generator for ResponsesClient {
    fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, ExtractionError> {
        let body = ResponsesApiRequest {
            model: &self.model,
            input: prompt,
            temperature: options.temperature,
            top_p: options.top_p,
            max_output_tokens: options.max_tokens,
        };

        let url = format!("{}/responses", self.base_url);
        tracing::debug!(url = %url, model = %self.model, "calling generation service");

        let mut request = self.client.post(&url).json(&body);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().map_err(|e| {
            if e.is_timeout() {
                ExtractionError::Timeout(self.timeout_ms)
            } else {
                ExtractionError::Request(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().unwrap_or_default();
            return Err(ExtractionError::Status { status, body });
        }

        let resp: ResponsesApiResponse = response
            .json()
            .map_err(|e| ExtractionError::Request(format!("failed to parse response: {}", e)))?;

        extract_text_from_response(&resp)
    }
}

/// Extract text content from a Responses API response
fn extract_text_from_response(resp: &ResponsesApiResponse) -> Result<String, ExtractionError> {
    let mut chunks = Vec::new();

    for item in &resp.output {
        for content in &item.content {
            if let Some(ref text) = content.text {
                chunks.push(text.as_str());
            }
        }
    }

    if chunks.is_empty() {
        if let Some(ref text) = resp.output_text {
            chunks.push(text.as_str());
        }
    }

    let text = chunks.join("\n").trim().to_string();
    if text.is_empty() {
        return Err(ExtractionError::EmptyResponse);
    }
    Ok(text)
}
