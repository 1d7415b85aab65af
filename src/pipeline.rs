//! The three generation entry points: bulk questions, single-question
//! regeneration, and vocabulary notes.
//!
//! Each call runs prompt builder → client → decoder. Nothing here keeps state
//! between calls; slot bookkeeping lives in `session`. Callers that want a
//! detached, cancellable run use the `spawn_*` variants, which hand back a
//! `GenerationHandle` owning both the cancellation token and the task.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::decoder::{decode_questions, decode_vocabulary};
use crate::domain::{Difficulty, GeneratedQuestion, QuestionCounts, QuestionType, VocabularyEntry};
use crate::error::GenerationError;
use crate::gemini::{GenerationClient, Transport};
use crate::prompt::{build_question_prompt, build_vocabulary_prompt};
use crate::schema::{question_schema, vocabulary_schema};

#[derive(Clone, Debug)]
pub struct QuestionRequest {
  pub passage: String,
  pub counts: QuestionCounts,
  pub difficulty: Difficulty,
  pub api_key: Option<String>,
}

#[derive(Clone, Debug)]
pub struct RegenerateRequest {
  pub passage: String,
  pub kind: QuestionType,
  pub difficulty: Difficulty,
  pub api_key: Option<String>,
}

impl RegenerateRequest {
  /// Regeneration is a one-item question request for a single kind.
  pub fn as_question_request(&self) -> QuestionRequest {
    QuestionRequest {
      passage: self.passage.clone(),
      counts: QuestionCounts::from([(self.kind, 1)]),
      difficulty: self.difficulty,
      api_key: self.api_key.clone(),
    }
  }
}

#[derive(Clone, Debug)]
pub struct VocabularyRequest {
  pub passage: String,
  /// `None` (or only blank words) lets the model pick about ten words.
  pub words: Option<Vec<String>>,
  pub api_key: Option<String>,
}

/// Identity + cancellation token of one generation attempt.
#[derive(Clone, Debug)]
pub struct Ticket {
  pub id: Uuid,
  pub token: CancellationToken,
}

impl Ticket {
  pub fn new() -> Self {
    Self { id: Uuid::new_v4(), token: CancellationToken::new() }
  }
}

impl Default for Ticket {
  fn default() -> Self { Self::new() }
}

/// A detached generation: cancel it, or await its result. Dropping the handle
/// does not cancel the run.
pub struct GenerationHandle<T> {
  ticket: Ticket,
  task: JoinHandle<Result<T, GenerationError>>,
}

impl<T> GenerationHandle<T> {
  pub fn id(&self) -> Uuid {
    self.ticket.id
  }

  pub fn token(&self) -> CancellationToken {
    self.ticket.token.clone()
  }

  pub async fn join(self) -> Result<T, GenerationError> {
    match self.task.await {
      Ok(r) => r,
      Err(e) => Err(GenerationError::Service(format!("generation task failed: {}", e))),
    }
  }
}

#[derive(Clone)]
pub struct Pipeline {
  client: GenerationClient,
}

impl Pipeline {
  pub fn new(transport: Arc<dyn Transport>) -> Self {
    Self { client: GenerationClient::new(transport) }
  }

  #[instrument(level = "info", skip(self, req, token), fields(passage_len = req.passage.len(), difficulty = ?req.difficulty))]
  pub async fn generate_questions(
    &self,
    req: &QuestionRequest,
    token: &CancellationToken,
  ) -> Result<Vec<GeneratedQuestion>, GenerationError> {
    let prompt = build_question_prompt(&req.passage, &req.counts, req.difficulty);
    let raw = self.client.send(&prompt, question_schema(), req.api_key.as_deref(), token).await?;
    let questions = decode_questions(&raw)?;

    let requested: u64 = req.counts.values().map(|n| u64::from(*n)).sum();
    if questions.len() as u64 != requested {
      // Exact counts are an instruction to the model, not something we enforce.
      warn!(target: "generation", requested, returned = questions.len(), "Model ignored the exact-quantity instruction");
    }
    info!(target: "generation", returned = questions.len(), "Questions generated");
    Ok(questions)
  }

  #[instrument(level = "info", skip(self, req, token), fields(passage_len = req.passage.len(), kind = req.kind.id()))]
  pub async fn regenerate_one(
    &self,
    req: &RegenerateRequest,
    token: &CancellationToken,
  ) -> Result<GeneratedQuestion, GenerationError> {
    let mut questions = self.generate_questions(&req.as_question_request(), token).await?;
    if questions.is_empty() {
      return Err(GenerationError::MalformedResponse { reason: "empty array for a one-item request".into() });
    }
    Ok(questions.swap_remove(0))
  }

  #[instrument(level = "info", skip(self, req, token), fields(passage_len = req.passage.len(), words = ?req.words.as_ref().map(Vec::len)))]
  pub async fn generate_vocabulary(
    &self,
    req: &VocabularyRequest,
    token: &CancellationToken,
  ) -> Result<Vec<VocabularyEntry>, GenerationError> {
    let prompt = build_vocabulary_prompt(&req.passage, req.words.as_deref());
    let raw = self.client.send(&prompt, vocabulary_schema(), req.api_key.as_deref(), token).await?;
    let notes = decode_vocabulary(&raw)?;
    info!(target: "generation", returned = notes.len(), "Vocabulary notes generated");
    Ok(notes)
  }

  pub fn spawn_questions(&self, req: QuestionRequest, ticket: Ticket) -> GenerationHandle<Vec<GeneratedQuestion>> {
    let this = self.clone();
    let token = ticket.token.clone();
    let task = tokio::spawn(async move { this.generate_questions(&req, &token).await });
    GenerationHandle { ticket, task }
  }

  pub fn spawn_regenerate(&self, req: RegenerateRequest, ticket: Ticket) -> GenerationHandle<GeneratedQuestion> {
    let this = self.clone();
    let token = ticket.token.clone();
    let task = tokio::spawn(async move { this.regenerate_one(&req, &token).await });
    GenerationHandle { ticket, task }
  }

  pub fn spawn_vocabulary(&self, req: VocabularyRequest, ticket: Ticket) -> GenerationHandle<Vec<VocabularyEntry>> {
    let this = self.clone();
    let token = ticket.token.clone();
    let task = tokio::spawn(async move { this.generate_vocabulary(&req, &token).await });
    GenerationHandle { ticket, task }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::gemini::testing::SpyTransport;

  const TWO: &str = r#"[{"type":"MainIdea","question":"Q1","answer":"A","explanation":"E"},{"type":"MainIdea","question":"Q2","answer":"A","explanation":"E"}]"#;

  fn question_req(key: &str) -> QuestionRequest {
    QuestionRequest {
      passage: "The cat sat.".into(),
      counts: QuestionCounts::from([(QuestionType::MainIdea, 2)]),
      difficulty: Difficulty::Normal,
      api_key: Some(key.into()),
    }
  }

  #[tokio::test]
  async fn bulk_generation_sends_built_prompt_and_decodes_in_order() {
    let spy = SpyTransport::replying(vec![Ok(format!("```json\n{}\n```", TWO))]);
    let pipeline = Pipeline::new(spy.clone());
    let qs = pipeline.generate_questions(&question_req("k"), &CancellationToken::new()).await.unwrap();
    assert_eq!(qs.iter().map(|q| q.question.as_str()).collect::<Vec<_>>(), vec!["Q1", "Q2"]);
    let prompts = spy.prompts.lock().unwrap();
    assert!(prompts[0].contains("MainIdea (2개)"));
  }

  #[tokio::test]
  async fn every_entry_point_rejects_empty_credentials_without_calling_out() {
    let spy = SpyTransport::replying(vec![]);
    let pipeline = Pipeline::new(spy.clone());
    let token = CancellationToken::new();

    let q = pipeline.generate_questions(&question_req(""), &token).await;
    assert!(matches!(q, Err(GenerationError::MissingCredentials)));

    let r = RegenerateRequest { passage: "p".into(), kind: QuestionType::Mood, difficulty: Difficulty::Easy, api_key: Some(String::new()) };
    assert!(matches!(pipeline.regenerate_one(&r, &token).await, Err(GenerationError::MissingCredentials)));

    let v = VocabularyRequest { passage: "p".into(), words: None, api_key: Some(String::new()) };
    assert!(matches!(pipeline.generate_vocabulary(&v, &token).await, Err(GenerationError::MissingCredentials)));

    assert_eq!(spy.calls(), 0);
  }

  #[tokio::test]
  async fn count_total_beyond_u32_does_not_overflow() {
    let spy = SpyTransport::replying(vec![Ok(TWO.into())]);
    let pipeline = Pipeline::new(spy);
    let mut req = question_req("k");
    req.counts = QuestionCounts::from([(QuestionType::MainIdea, u32::MAX), (QuestionType::Mood, 1)]);
    let qs = pipeline.generate_questions(&req, &CancellationToken::new()).await.unwrap();
    assert_eq!(qs.len(), 2);
  }

  #[tokio::test]
  async fn malformed_payload_is_not_a_service_error() {
    let spy = SpyTransport::replying(vec![Ok("Sorry, I can't help with that.".into())]);
    let pipeline = Pipeline::new(spy);
    let r = pipeline.generate_questions(&question_req("k"), &CancellationToken::new()).await;
    assert!(matches!(r, Err(GenerationError::MalformedResponse { .. })));
  }

  #[tokio::test]
  async fn regenerate_takes_the_first_record_of_a_one_count_request() {
    let spy = SpyTransport::replying(vec![Ok(r#"[{"type":"Grammar","question":"New","options":["a","b","c","d","e"],"answer":"c","explanation":"E"}]"#.into())]);
    let pipeline = Pipeline::new(spy.clone());
    let r = RegenerateRequest { passage: "p".into(), kind: QuestionType::Grammar, difficulty: Difficulty::Hard, api_key: Some("k".into()) };
    let q = pipeline.regenerate_one(&r, &CancellationToken::new()).await.unwrap();
    assert_eq!(q.question, "New");
    assert!(spy.prompts.lock().unwrap()[0].contains("Grammar (1개)"));
  }

  #[tokio::test]
  async fn regenerate_with_empty_array_is_malformed() {
    let spy = SpyTransport::replying(vec![Ok("[]".into())]);
    let pipeline = Pipeline::new(spy);
    let r = RegenerateRequest { passage: "p".into(), kind: QuestionType::Grammar, difficulty: Difficulty::Hard, api_key: Some("k".into()) };
    assert!(matches!(pipeline.regenerate_one(&r, &CancellationToken::new()).await, Err(GenerationError::MalformedResponse { .. })));
  }

  #[tokio::test]
  async fn vocabulary_with_words_lists_them_in_the_prompt() {
    let spy = SpyTransport::replying(vec![Ok(r#"[{"word":"axis","definition":"d","synonyms":["s"],"antonyms":[],"exampleSentence":"x"}]"#.into())]);
    let pipeline = Pipeline::new(spy.clone());
    let v = VocabularyRequest { passage: "p".into(), words: Some(vec!["axis".into()]), api_key: Some("k".into()) };
    let notes = pipeline.generate_vocabulary(&v, &CancellationToken::new()).await.unwrap();
    assert_eq!(notes[0].synonyms, vec!["s".to_string()]);
    assert!(spy.prompts.lock().unwrap()[0].contains("user-selected words: axis."));
  }

  #[tokio::test]
  async fn cancelled_handle_resolves_to_cancelled() {
    let spy = SpyTransport::replying(vec![Ok(TWO.into())]);
    let pipeline = Pipeline::new(spy.clone());
    let ticket = Ticket::new();
    ticket.token.cancel();
    let handle = pipeline.spawn_questions(question_req("k"), ticket);
    assert!(matches!(handle.join().await, Err(GenerationError::Cancelled)));
    assert_eq!(spy.calls(), 0);
  }

  #[tokio::test]
  async fn spawned_handle_yields_the_result() {
    let spy = SpyTransport::replying(vec![Ok(TWO.into())]);
    let pipeline = Pipeline::new(spy);
    let handle = pipeline.spawn_questions(question_req("k"), Ticket::new());
    assert_eq!(handle.join().await.unwrap().len(), 2);
  }
}
