//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::{Difficulty, GeneratedQuestion, QuestionCounts, QuestionType, VocabularyEntry};
use crate::session::{SessionSnapshot, Slot};

/// Messages the client can send over WebSocket.
///
/// `Debug` is written by hand so the API key never reaches the logs.
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
  Ping,
  GenerateQuestions {
    passage: String,
    counts: QuestionCounts,
    #[serde(default)]
    difficulty: Difficulty,
    #[serde(rename = "apiKey", default)]
    api_key: Option<String>,
  },
  RegenerateQuestion {
    index: usize,
    passage: String,
    #[serde(default)]
    difficulty: Difficulty,
    #[serde(rename = "apiKey", default)]
    api_key: Option<String>,
  },
  GenerateVocabulary {
    passage: String,
    #[serde(default)]
    words: Option<Vec<String>>,
    #[serde(rename = "apiKey", default)]
    api_key: Option<String>,
  },
  Cancel {
    slot: Slot,
  },
  Reset,
}

fn redacted(key: &Option<String>) -> Option<&'static str> {
  key.as_ref().map(|_| "***")
}

impl fmt::Debug for ClientWsMessage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Ping => f.write_str("Ping"),
      Self::GenerateQuestions { passage, counts, difficulty, api_key } => f
        .debug_struct("GenerateQuestions")
        .field("passage_len", &passage.len())
        .field("counts", counts)
        .field("difficulty", difficulty)
        .field("api_key", &redacted(api_key))
        .finish(),
      Self::RegenerateQuestion { index, passage, difficulty, api_key } => f
        .debug_struct("RegenerateQuestion")
        .field("index", index)
        .field("passage_len", &passage.len())
        .field("difficulty", difficulty)
        .field("api_key", &redacted(api_key))
        .finish(),
      Self::GenerateVocabulary { passage, words, api_key } => f
        .debug_struct("GenerateVocabulary")
        .field("passage_len", &passage.len())
        .field("words", &words.as_ref().map(Vec::len))
        .field("api_key", &redacted(api_key))
        .finish(),
      Self::Cancel { slot } => f.debug_struct("Cancel").field("slot", slot).finish(),
      Self::Reset => f.write_str("Reset"),
    }
  }
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
  Pong,
  Snapshot {
    session: SessionSnapshot,
  },
  Error {
    kind: String,
    message: String,
  },
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Deserialize)]
pub struct QuestionsIn {
  pub passage: String,
  pub counts: QuestionCounts,
  #[serde(default)]
  pub difficulty: Difficulty,
  #[serde(rename = "apiKey", default)]
  pub api_key: Option<String>,
}
#[derive(Debug, Serialize, Deserialize)]
pub struct QuestionsOut {
  pub questions: Vec<GeneratedQuestion>,
}

#[derive(Debug, Deserialize)]
pub struct RegenerateIn {
  pub passage: String,
  #[serde(rename = "type")]
  pub kind: QuestionType,
  #[serde(default)]
  pub difficulty: Difficulty,
  #[serde(rename = "apiKey", default)]
  pub api_key: Option<String>,
}
#[derive(Debug, Serialize, Deserialize)]
pub struct RegenerateOut {
  pub question: GeneratedQuestion,
}

#[derive(Debug, Deserialize)]
pub struct VocabularyIn {
  pub passage: String,
  #[serde(default)]
  pub words: Option<Vec<String>>,
  #[serde(rename = "apiKey", default)]
  pub api_key: Option<String>,
}
#[derive(Debug, Serialize, Deserialize)]
pub struct VocabularyOut {
  pub notes: Vec<VocabularyEntry>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionTypeOut {
  pub id: &'static str,
  pub label: &'static str,
  pub multiple_choice: bool,
}

pub fn question_types() -> Vec<QuestionTypeOut> {
  QuestionType::ALL
    .into_iter()
    .map(|t| QuestionTypeOut { id: t.id(), label: t.label(), multiple_choice: t.is_multiple_choice() })
    .collect()
}

#[derive(Serialize)]
pub struct SamplesOut {
  pub passages: Vec<&'static str>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorOut {
  pub kind: String,
  pub message: String,
}

#[derive(Serialize)]
pub struct HealthOut {
  pub ok: bool,
}
