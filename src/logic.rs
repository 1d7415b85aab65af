//! Caller-side behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Validating input before the pipeline sees it (non-empty passage, at least one count)
//!   - Resolving which API key a request runs with
//!   - Turning pipeline failures into the localized `Failure` both surfaces report

use tracing::debug;

use crate::domain::{Difficulty, QuestionCounts, QuestionType};
use crate::error::GenerationError;
use crate::pipeline::{QuestionRequest, RegenerateRequest, VocabularyRequest};
use crate::state::AppState;

pub const INVALID_REQUEST: &str = "invalid_request";

/// What the caller reports back: a stable kind plus a user-facing message.
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
  pub kind: &'static str,
  pub message: String,
}

impl Failure {
  pub fn invalid(message: &str) -> Self {
    Self { kind: INVALID_REQUEST, message: message.to_string() }
  }

  pub fn from_generation(state: &AppState, err: &GenerationError, generic: &str) -> Self {
    Self { kind: err.kind(), message: err.user_message(&state.messages, generic).to_string() }
  }
}

fn check_passage(state: &AppState, passage: &str) -> Result<(), Failure> {
  if passage.trim().is_empty() {
    return Err(Failure::invalid(&state.messages.empty_passage));
  }
  Ok(())
}

pub fn question_request(
  state: &AppState,
  passage: String,
  counts: QuestionCounts,
  difficulty: Difficulty,
  api_key: Option<&str>,
) -> Result<QuestionRequest, Failure> {
  check_passage(state, &passage)?;
  if !counts.values().any(|n| *n > 0) {
    return Err(Failure::invalid(&state.messages.no_types_selected));
  }
  let total: u64 = counts.values().map(|n| u64::from(*n)).sum();
  debug!(target: "generation", total, kinds = counts.values().filter(|n| **n > 0).count(), "Question request accepted");
  Ok(QuestionRequest { passage, counts, difficulty, api_key: state.resolve_api_key(api_key) })
}

pub fn regenerate_request(
  state: &AppState,
  passage: String,
  kind: QuestionType,
  difficulty: Difficulty,
  api_key: Option<&str>,
) -> Result<RegenerateRequest, Failure> {
  check_passage(state, &passage)?;
  Ok(RegenerateRequest { passage, kind, difficulty, api_key: state.resolve_api_key(api_key) })
}

pub fn vocabulary_request(
  state: &AppState,
  passage: String,
  words: Option<Vec<String>>,
  api_key: Option<&str>,
) -> Result<VocabularyRequest, Failure> {
  check_passage(state, &passage)?;
  Ok(VocabularyRequest { passage, words, api_key: state.resolve_api_key(api_key) })
}
