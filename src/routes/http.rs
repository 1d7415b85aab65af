//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs parameters and basic result info.
//!
//! Generation handlers run the pipeline as a detached task and hold a drop
//! guard on its token: if the client disconnects, the handler future is
//! dropped and the run is cancelled.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::{IntoResponse, Response}, Json};
use tracing::{info, instrument};

use crate::logic::{question_request, regenerate_request, vocabulary_request, Failure, INVALID_REQUEST};
use crate::pipeline::Ticket;
use crate::protocol::*;
use crate::samples::SAMPLE_PASSAGES;
use crate::state::AppState;

impl IntoResponse for Failure {
  fn into_response(self) -> Response {
    let status = match self.kind {
      INVALID_REQUEST => StatusCode::BAD_REQUEST,
      "missing_credentials" => StatusCode::UNAUTHORIZED,
      "cancelled" => StatusCode::CONFLICT,
      _ => StatusCode::BAD_GATEWAY,
    };
    (status, Json(ErrorOut { kind: self.kind.to_string(), message: self.message })).into_response()
  }
}

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info")]
pub async fn http_get_question_types() -> impl IntoResponse {
  Json(question_types())
}

#[instrument(level = "info")]
pub async fn http_get_samples() -> impl IntoResponse {
  Json(SamplesOut { passages: SAMPLE_PASSAGES.to_vec() })
}

#[instrument(level = "info", skip(state, body), fields(passage_len = body.passage.len(), difficulty = ?body.difficulty))]
pub async fn http_post_questions(
  State(state): State<Arc<AppState>>,
  Json(body): Json<QuestionsIn>,
) -> Result<Json<QuestionsOut>, Failure> {
  let req = question_request(&state, body.passage, body.counts, body.difficulty, body.api_key.as_deref())?;
  let handle = state.pipeline.spawn_questions(req, Ticket::new());
  let _guard = handle.token().drop_guard();
  match handle.join().await {
    Ok(questions) => {
      info!(target: "generation", count = questions.len(), "HTTP questions served");
      Ok(Json(QuestionsOut { questions }))
    }
    Err(e) => Err(Failure::from_generation(&state, &e, &state.messages.question_failed)),
  }
}

#[instrument(level = "info", skip(state, body), fields(passage_len = body.passage.len(), kind = body.kind.id()))]
pub async fn http_post_regenerate(
  State(state): State<Arc<AppState>>,
  Json(body): Json<RegenerateIn>,
) -> Result<Json<RegenerateOut>, Failure> {
  let req = regenerate_request(&state, body.passage, body.kind, body.difficulty, body.api_key.as_deref())?;
  let handle = state.pipeline.spawn_regenerate(req, Ticket::new());
  let _guard = handle.token().drop_guard();
  match handle.join().await {
    Ok(question) => Ok(Json(RegenerateOut { question })),
    Err(e) => Err(Failure::from_generation(&state, &e, &state.messages.regenerate_failed)),
  }
}

#[instrument(level = "info", skip(state, body), fields(passage_len = body.passage.len(), words = ?body.words.as_ref().map(Vec::len)))]
pub async fn http_post_vocabulary(
  State(state): State<Arc<AppState>>,
  Json(body): Json<VocabularyIn>,
) -> Result<Json<VocabularyOut>, Failure> {
  let req = vocabulary_request(&state, body.passage, body.words, body.api_key.as_deref())?;
  let handle = state.pipeline.spawn_vocabulary(req, Ticket::new());
  let _guard = handle.token().drop_guard();
  match handle.join().await {
    Ok(notes) => {
      info!(target: "generation", count = notes.len(), "HTTP vocabulary served");
      Ok(Json(VocabularyOut { notes }))
    }
    Err(e) => Err(Failure::from_generation(&state, &e, &state.messages.vocabulary_failed)),
  }
}

#[cfg(test)]
mod tests {
  use axum::body::{to_bytes, Body};
  use axum::http::Request;
  use serde_json::{json, Value};
  use tower::ServiceExt;

  use crate::config::Messages;
  use crate::error::GenerationError;
  use crate::gemini::testing::SpyTransport;
  use crate::protocol::{ErrorOut, QuestionsOut, RegenerateOut, VocabularyOut};
  use crate::routes::build_router;
  use crate::state::AppState;
  use std::sync::Arc;

  async fn call(state: AppState, method: &str, uri: &str, body: Option<Value>) -> (u16, Vec<u8>) {
    let app = build_router(Arc::new(state));
    let req = Request::builder()
      .method(method)
      .uri(uri)
      .header("content-type", "application/json")
      .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
      .unwrap();
    let res = app.oneshot(req).await.unwrap();
    let status = res.status().as_u16();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
  }

  fn state_with(replies: Vec<Result<String, GenerationError>>, key: Option<&str>) -> (AppState, Arc<SpyTransport>) {
    let spy = SpyTransport::replying(replies);
    (AppState::with_transport(spy.clone(), Messages::default(), key.map(str::to_string)), spy)
  }

  #[tokio::test]
  async fn questions_endpoint_returns_decoded_records() {
    let payload = r#"[{"type":"MainIdea","question":"Q1","answer":"A","explanation":"E"},{"type":"MainIdea","question":"Q2","answer":"A","explanation":"E"}]"#;
    let (state, spy) = state_with(vec![Ok(payload.into())], None);
    let body = json!({ "passage": "The cat sat.", "counts": { "MainIdea": 2 }, "difficulty": "NORMAL", "apiKey": "k" });
    let (status, bytes) = call(state, "POST", "/api/v1/questions", Some(body)).await;
    assert_eq!(status, 200);
    let out: QuestionsOut = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(out.questions.len(), 2);
    assert_eq!(spy.calls(), 1);
  }

  #[tokio::test]
  async fn empty_key_is_unauthorized_and_never_calls_out() {
    let (state, spy) = state_with(vec![Ok("[]".into())], None);
    let body = json!({ "passage": "P", "counts": { "Mood": 1 }, "apiKey": "" });
    let (status, bytes) = call(state, "POST", "/api/v1/questions", Some(body)).await;
    assert_eq!(status, 401);
    let out: ErrorOut = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(out.kind, "missing_credentials");
    assert_eq!(spy.calls(), 0);
  }

  #[tokio::test]
  async fn server_key_is_used_when_request_has_none() {
    let (state, spy) = state_with(vec![Ok(r#"[{"word":"w","definition":"d","exampleSentence":"s"}]"#.into())], Some("server"));
    let (status, bytes) = call(state, "POST", "/api/v1/vocabulary", Some(json!({ "passage": "P" }))).await;
    assert_eq!(status, 200);
    let out: VocabularyOut = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(out.notes[0].word, "w");
    assert_eq!(spy.calls(), 1);
  }

  #[tokio::test]
  async fn no_selected_types_is_a_bad_request() {
    let (state, spy) = state_with(vec![], Some("k"));
    let body = json!({ "passage": "P", "counts": { "Mood": 0 } });
    let (status, bytes) = call(state, "POST", "/api/v1/questions", Some(body)).await;
    assert_eq!(status, 400);
    let out: ErrorOut = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(out.message, Messages::default().no_types_selected);
    assert_eq!(spy.calls(), 0);
  }

  #[tokio::test]
  async fn malformed_model_output_is_a_bad_gateway_with_generic_message() {
    let (state, _) = state_with(vec![Ok("not json".into())], Some("k"));
    let body = json!({ "passage": "P", "type": "Grammar", "difficulty": "HARD" });
    let (status, bytes) = call(state, "POST", "/api/v1/questions/regenerate", Some(body)).await;
    assert_eq!(status, 502);
    let out: ErrorOut = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(out.kind, "malformed_response");
    assert_eq!(out.message, Messages::default().regenerate_failed);
  }

  #[tokio::test]
  async fn regenerate_endpoint_returns_one_question() {
    let payload = r#"[{"type":"WordScramble","question":"Unscramble","answer":"The cat sat.","explanation":"E"}]"#;
    let (state, _) = state_with(vec![Ok(payload.into())], Some("k"));
    let body = json!({ "passage": "The cat sat.", "type": "WordScramble" });
    let (status, bytes) = call(state, "POST", "/api/v1/questions/regenerate", Some(body)).await;
    assert_eq!(status, 200);
    let out: RegenerateOut = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(out.question.answer, "The cat sat.");
  }

  #[tokio::test]
  async fn static_listings_are_served() {
    let (state, _) = state_with(vec![], None);
    let (status, bytes) = call(state.clone(), "GET", "/api/v1/question-types", None).await;
    assert_eq!(status, 200);
    let types: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(types.as_array().map(Vec::len), Some(14));
    assert_eq!(types[0]["multipleChoice"], true);

    let (status, bytes) = call(state, "GET", "/api/v1/samples", None).await;
    assert_eq!(status, 200);
    let samples: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(samples["passages"].as_array().map(Vec::len), Some(3));
  }
}
