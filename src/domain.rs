//! Domain models: exam item kinds, difficulty tiers, and the records the model returns.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Exam item kinds. Declaration order is display order.
///
/// The model may echo either the identifier (`MainIdea`) or the Korean label
/// back in the `type` field, so every label is accepted as an alias.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum QuestionType {
  #[serde(alias = "주제/제목/요지/목적")]
  MainIdea,
  #[serde(alias = "심경/분위기 추론")]
  Mood,
  #[serde(alias = "필자의 주장 추론")]
  Claim,
  #[serde(alias = "함축 의미 추론")]
  InferentialMeaning,
  #[serde(alias = "내용 일치/불일치")]
  Comprehension,
  #[serde(alias = "어법성 판단")]
  Grammar,
  #[serde(alias = "어휘 추론")]
  Vocabulary,
  #[serde(alias = "지칭 추론")]
  PronounReference,
  #[serde(alias = "빈칸 추론")]
  FillInTheBlank,
  #[serde(alias = "무관한 문장 찾기")]
  IrrelevantSentence,
  #[serde(alias = "순서 배열")]
  ReorderParagraph,
  #[serde(alias = "문장 삽입")]
  SentenceInsertion,
  #[serde(alias = "요약문 완성")]
  SummaryCompletion,
  #[serde(alias = "서술형 (단어 배열)")]
  WordScramble,
}

impl QuestionType {
  pub const ALL: [QuestionType; 14] = [
    QuestionType::MainIdea,
    QuestionType::Mood,
    QuestionType::Claim,
    QuestionType::InferentialMeaning,
    QuestionType::Comprehension,
    QuestionType::Grammar,
    QuestionType::Vocabulary,
    QuestionType::PronounReference,
    QuestionType::FillInTheBlank,
    QuestionType::IrrelevantSentence,
    QuestionType::ReorderParagraph,
    QuestionType::SentenceInsertion,
    QuestionType::SummaryCompletion,
    QuestionType::WordScramble,
  ];

  /// Stable identifier used on the wire and inside prompts.
  pub fn id(self) -> &'static str {
    match self {
      QuestionType::MainIdea => "MainIdea",
      QuestionType::Mood => "Mood",
      QuestionType::Claim => "Claim",
      QuestionType::InferentialMeaning => "InferentialMeaning",
      QuestionType::Comprehension => "Comprehension",
      QuestionType::Grammar => "Grammar",
      QuestionType::Vocabulary => "Vocabulary",
      QuestionType::PronounReference => "PronounReference",
      QuestionType::FillInTheBlank => "FillInTheBlank",
      QuestionType::IrrelevantSentence => "IrrelevantSentence",
      QuestionType::ReorderParagraph => "ReorderParagraph",
      QuestionType::SentenceInsertion => "SentenceInsertion",
      QuestionType::SummaryCompletion => "SummaryCompletion",
      QuestionType::WordScramble => "WordScramble",
    }
  }

  /// Korean display label (exam terminology).
  pub fn label(self) -> &'static str {
    match self {
      QuestionType::MainIdea => "주제/제목/요지/목적",
      QuestionType::Mood => "심경/분위기 추론",
      QuestionType::Claim => "필자의 주장 추론",
      QuestionType::InferentialMeaning => "함축 의미 추론",
      QuestionType::Comprehension => "내용 일치/불일치",
      QuestionType::Grammar => "어법성 판단",
      QuestionType::Vocabulary => "어휘 추론",
      QuestionType::PronounReference => "지칭 추론",
      QuestionType::FillInTheBlank => "빈칸 추론",
      QuestionType::IrrelevantSentence => "무관한 문장 찾기",
      QuestionType::ReorderParagraph => "순서 배열",
      QuestionType::SentenceInsertion => "문장 삽입",
      QuestionType::SummaryCompletion => "요약문 완성",
      QuestionType::WordScramble => "서술형 (단어 배열)",
    }
  }

  /// Only word scramble is answered with a sentence instead of a numbered option.
  pub fn is_multiple_choice(self) -> bool {
    !matches!(self, QuestionType::WordScramble)
  }
}

/// Three fixed difficulty tiers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Difficulty {
  Easy,
  #[default]
  Normal,
  Hard,
}

impl Difficulty {
  pub fn label(self) -> &'static str {
    match self {
      Difficulty::Easy => "쉬움",
      Difficulty::Normal => "수능 유형 (기본)",
      Difficulty::Hard => "어려움",
    }
  }
}

/// Requested count per item kind. Zero means "not requested".
pub type QuestionCounts = BTreeMap<QuestionType, u32>;

/// One generated exam item.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeneratedQuestion {
  #[serde(rename = "type")]
  pub kind: QuestionType,
  pub question: String,
  /// Absent for non-multiple-choice kinds.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub options: Option<Vec<String>>,
  pub answer: String,
  pub explanation: String,
}

/// One vocabulary study note.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyEntry {
  pub word: String,
  pub definition: String,
  #[serde(default)]
  pub synonyms: Vec<String>,
  #[serde(default)]
  pub antonyms: Vec<String>,
  /// Expected to be quoted verbatim from the passage (instruction only, not checked).
  pub example_sentence: String,
}
