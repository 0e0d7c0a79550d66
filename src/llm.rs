//! LLM client for coaching text
//!
//! Thin client for a messages-style completion API. The base URL is
//! configurable so tests and self-hosted gateways can stand in for the
//! hosted endpoint.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// ---------------------------------------------------------------------------
/// Configuration
/// ---------------------------------------------------------------------------

pub const API_KEY_ENV: &str = "LIFT_COACH_LLM_API_KEY";
pub const BASE_URL_ENV: &str = "LIFT_COACH_LLM_BASE_URL";
pub const MODEL_ENV: &str = "LIFT_COACH_LLM_MODEL";

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const API_VERSION: &str = "2023-06-01";
const MESSAGES_PATH: &str = "v1/messages";

/// ---------------------------------------------------------------------------
/// Error Types
/// ---------------------------------------------------------------------------

#[derive(Error, Debug, Serialize)]
#[serde(tag = "type", content = "message")]
pub enum LlmError {
  #[error("API key not configured")]
  MissingApiKey,

  #[error("Request failed: {0}")]
  Request(String),

  #[error("API error: {0}")]
  Api(String),

  #[error("Parse error: {0}")]
  Parse(String),
}

/// ---------------------------------------------------------------------------
/// API Types
/// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct MessagesRequest {
  model: String,
  max_tokens: u32,
  system: String,
  messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
  role: String,
  content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
  content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
  #[serde(rename = "type")]
  content_type: String,
  text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
  error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
  message: String,
}

/// ---------------------------------------------------------------------------
/// Client
/// ---------------------------------------------------------------------------

pub struct LlmClient {
  client: Client,
  api_key: String,
  endpoint: Url,
  model: String,
}

impl LlmClient {
  pub fn new(api_key: &str, base_url: &str) -> Result<Self, LlmError> {
    let base = Url::parse(base_url).map_err(|e| LlmError::Request(format!("Invalid base URL {}: {}", base_url, e)))?;
    let endpoint = base
      .join(MESSAGES_PATH)
      .map_err(|e| LlmError::Request(e.to_string()))?;

    Ok(Self {
      client: Client::new(),
      api_key: api_key.to_string(),
      endpoint,
      model: DEFAULT_MODEL.to_string(),
    })
  }

  /// Create a client from `LIFT_COACH_LLM_*` environment variables
  pub fn from_env() -> Result<Self, LlmError> {
    let api_key = std::env::var(API_KEY_ENV)
      .ok()
      .filter(|k| !k.trim().is_empty())
      .ok_or(LlmError::MissingApiKey)?;
    let base_url = std::env::var(BASE_URL_ENV).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

    let mut client = Self::new(api_key.trim(), &base_url)?;
    if let Ok(model) = std::env::var(MODEL_ENV) {
      if !model.trim().is_empty() {
        client.model = model.trim().to_string();
      }
    }
    Ok(client)
  }

  pub fn endpoint(&self) -> &Url {
    &self.endpoint
  }

  /// Send a system prompt and user message, returning the first text block
  pub async fn complete(
    &self,
    system_prompt: &str,
    user_message: &str,
    max_tokens: u32,
  ) -> Result<String, LlmError> {
    let request = MessagesRequest {
      model: self.model.clone(),
      max_tokens,
      system: system_prompt.to_string(),
      messages: vec![Message {
        role: "user".to_string(),
        content: user_message.to_string(),
      }],
    };

    let response = self
      .client
      .post(self.endpoint.clone())
      .header("x-api-key", &self.api_key)
      .header("anthropic-version", API_VERSION)
      .header("content-type", "application/json")
      .json(&request)
      .send()
      .await
      .map_err(|e| LlmError::Request(e.to_string()))?;

    let status = response.status();
    let body = response
      .text()
      .await
      .map_err(|e| LlmError::Request(e.to_string()))?;

    if !status.is_success() {
      if let Ok(error_resp) = serde_json::from_str::<ErrorResponse>(&body) {
        return Err(LlmError::Api(error_resp.error.message));
      }
      return Err(LlmError::Api(format!("HTTP {}: {}", status, body)));
    }

    let parsed: MessagesResponse =
      serde_json::from_str(&body).map_err(|e| LlmError::Parse(e.to_string()))?;

    parsed
      .content
      .into_iter()
      .find(|c| c.content_type == "text")
      .and_then(|c| c.text)
      .ok_or_else(|| LlmError::Parse("No text content in response".to_string()))
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
