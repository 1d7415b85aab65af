//! Minimal Gemini client for our use-cases.
//!
//! We only call `models/{model}:generateContent` with a JSON response schema.
//! `Transport` is the raw outbound call; `GenerationClient` wraps any transport
//! with the credential precondition and the two cancellation checkpoints.
//! Calls are instrumented and log model names, latencies, and response sizes (not contents).
//!
//! NOTE: We never log the API key.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

use crate::config::GeminiSettings;
use crate::error::GenerationError;
use crate::util::non_blank;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// One outbound generation call.
#[derive(Debug, Clone, Copy)]
pub struct ModelRequest<'a> {
  pub prompt: &'a str,
  pub schema: &'a Value,
  pub api_key: &'a str,
}

/// The external generative-language service, reduced to "prompt + schema in, text out".
#[async_trait]
pub trait Transport: Send + Sync {
  async fn generate(&self, request: ModelRequest<'_>) -> Result<String, GenerationError>;
}

#[derive(Clone)]
pub struct GeminiTransport {
  pub client: reqwest::Client,
  pub base_url: String,
  pub model: String,
}

impl GeminiTransport {
  pub fn new(settings: &GeminiSettings) -> Result<Self, reqwest::Error> {
    let client = reqwest::Client::builder()
      .timeout(settings.timeout)
      .build()?;
    Ok(Self { client, base_url: settings.base_url.clone(), model: settings.model.clone() })
  }
}

#[async_trait]
impl Transport for GeminiTransport {
  #[instrument(level = "info", skip(self, request), fields(model = %self.model, prompt_len = request.prompt.len()))]
  async fn generate(&self, request: ModelRequest<'_>) -> Result<String, GenerationError> {
    let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
    let body = GenerateContentRequest {
      contents: vec![Content {
        role: "user".into(),
        parts: vec![PartReq { text: request.prompt.into() }],
      }],
      generation_config: GenerationConfig {
        response_mime_type: "application/json".into(),
        response_schema: request.schema.clone(),
      },
    };

    let res = self.client.post(&url)
      .header(USER_AGENT, "passage-quiz-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(API_KEY_HEADER, request.api_key)
      .json(&body).send().await
      .map_err(|e| GenerationError::Service(e.to_string()))?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_gemini_error(&body).unwrap_or(body);
      return Err(GenerationError::Service(format!("Gemini HTTP {}: {}", status, msg)));
    }

    let body: GenerateContentResponse = res.json().await
      .map_err(|e| GenerationError::Service(format!("unreadable response envelope: {}", e)))?;
    if let Some(usage) = &body.usage_metadata {
      info!(prompt_tokens = ?usage.prompt_token_count, completion_tokens = ?usage.candidates_token_count, total_tokens = ?usage.total_token_count, "Gemini usage");
    }
    response_text(body)
  }
}

/// Credential check plus cancellation checkpoints around any `Transport`.
#[derive(Clone)]
pub struct GenerationClient {
  transport: Arc<dyn Transport>,
}

impl GenerationClient {
  pub fn new(transport: Arc<dyn Transport>) -> Self {
    Self { transport }
  }

  /// The single suspension point of the pipeline.
  ///
  /// Order: credentials, pre-call checkpoint, the call raced against the token,
  /// post-call checkpoint. A late cancel always wins over a finished call.
  #[instrument(level = "info", skip_all, fields(prompt_len = prompt.len()))]
  pub async fn send(
    &self,
    prompt: &str,
    schema: &Value,
    api_key: Option<&str>,
    token: &CancellationToken,
  ) -> Result<String, GenerationError> {
    let api_key = non_blank(api_key).ok_or(GenerationError::MissingCredentials)?;
    if token.is_cancelled() {
      info!(target: "generation", "Cancelled before the call");
      return Err(GenerationError::Cancelled);
    }

    let start = Instant::now();
    let request = ModelRequest { prompt, schema, api_key };
    let result = tokio::select! {
      biased;
      _ = token.cancelled() => Err(GenerationError::Cancelled),
      r = self.transport.generate(request) => r,
    };
    let elapsed = start.elapsed();

    if token.is_cancelled() {
      info!(target: "generation", ?elapsed, "Cancelled; discarding the call result");
      return Err(GenerationError::Cancelled);
    }
    match &result {
      Ok(text) => info!(target: "generation", ?elapsed, response_len = text.len(), "Model response received"),
      Err(e) => error!(target: "generation", ?elapsed, error = %e, "Model call failed"),
    }
    result
  }
}

/// Concatenate the text parts of the first candidate.
fn response_text(body: GenerateContentResponse) -> Result<String, GenerationError> {
  let Some(candidate) = body.candidates.into_iter().next() else {
    let reason = body.prompt_feedback
      .and_then(|f| f.block_reason)
      .unwrap_or_else(|| "no candidates".into());
    return Err(GenerationError::Service(format!("Gemini returned no candidates: {}", reason)));
  };
  let text: String = candidate.content
    .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
    .unwrap_or_default();
  if text.trim().is_empty() {
    if let Some(reason) = candidate.finish_reason {
      return Err(GenerationError::Service(format!("Gemini returned no text (finish reason {})", reason)));
    }
  }
  Ok(text)
}

// --- generateContent DTOs ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
  contents: Vec<Content>,
  generation_config: GenerationConfig,
}
#[derive(Serialize)]
struct Content { role: String, parts: Vec<PartReq> }
#[derive(Serialize)]
struct PartReq { text: String }
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
  response_mime_type: String,
  response_schema: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
  #[serde(default)] candidates: Vec<Candidate>,
  #[serde(default)] usage_metadata: Option<UsageMetadata>,
  #[serde(default)] prompt_feedback: Option<PromptFeedback>,
}
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
  #[serde(default)] content: Option<CandidateContent>,
  #[serde(default)] finish_reason: Option<String>,
}
#[derive(Deserialize)]
struct CandidateContent { #[serde(default)] parts: Vec<PartResp> }
#[derive(Deserialize)]
struct PartResp { #[serde(default)] text: Option<String> }
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
  #[serde(default)] prompt_token_count: Option<u32>,
  #[serde(default)] candidates_token_count: Option<u32>,
  #[serde(default)] total_token_count: Option<u32>,
}
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback { #[serde(default)] block_reason: Option<String> }

/// Try to extract a clean error message from a Gemini error body.
fn extract_gemini_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}
