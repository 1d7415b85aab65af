//! Decoding of the raw model payload into typed records.
//!
//! The schema hint is not trusted: every element goes through serde with its
//! required fields, and any failure becomes `MalformedResponse`.

use serde::de::DeserializeOwned;
use tracing::warn;

use crate::domain::{GeneratedQuestion, VocabularyEntry};
use crate::error::GenerationError;
use crate::util::trunc_for_log;

/// Remove a surrounding Markdown code fence (```json ... ``` or ``` ... ```), if any.
/// Bare text is returned trimmed and otherwise untouched.
pub fn strip_code_fence(raw: &str) -> &str {
  let text = raw.trim();
  let Some(rest) = text.strip_prefix("```") else {
    return text;
  };
  // Drop the info string ("json", "JSON", ...) up to the first newline.
  let body = match rest.find('\n') {
    Some(i) => &rest[i + 1..],
    None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
  };
  body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Parse a JSON array of `T`.
pub fn decode_array<T: DeserializeOwned>(raw: &str) -> Result<Vec<T>, GenerationError> {
  let body = strip_code_fence(raw);
  if body.is_empty() {
    warn!(target: "generation", "Model returned an empty payload");
    return Err(GenerationError::MalformedResponse { reason: "empty payload".into() });
  }
  serde_json::from_str::<Vec<T>>(body).map_err(|e| {
    warn!(target: "generation", error = %e, raw = %trunc_for_log(raw, 500), "Model payload does not match the declared shape");
    GenerationError::MalformedResponse { reason: e.to_string() }
  })
}

pub fn decode_questions(raw: &str) -> Result<Vec<GeneratedQuestion>, GenerationError> {
  decode_array(raw)
}

pub fn decode_vocabulary(raw: &str) -> Result<Vec<VocabularyEntry>, GenerationError> {
  decode_array(raw)
}
