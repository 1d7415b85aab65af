//! Per-client generation session: three independent slots (bulk questions,
//! vocabulary, single-question regeneration) and the results they reconcile into.
//!
//! A slot is `Idle` or `Pending`; finishing a run records its outcome and puts
//! the slot back to `Idle`. Every run is identified by a `Ticket`. Starting a
//! new run does not cancel the previous one, but a completion whose ticket is
//! no longer current is dropped, so only the newest run can touch state.
//!
//! All methods are synchronous; the WebSocket loop feeds completions in.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Messages;
use crate::domain::{GeneratedQuestion, QuestionType, VocabularyEntry};
use crate::error::GenerationError;
use crate::pipeline::Ticket;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
  Questions,
  Vocabulary,
  Regeneration,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotState {
  Idle,
  Pending,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
  Success,
  Cancelled,
  Failed,
}

/// One entry of the question list. `Regenerating` keeps the old item for rollback.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QuestionItem {
  Ready { question: GeneratedQuestion },
  Regenerating {
    #[serde(skip)]
    previous: GeneratedQuestion,
  },
}

impl QuestionItem {
  pub fn question(&self) -> &GeneratedQuestion {
    match self {
      QuestionItem::Ready { question } => question,
      QuestionItem::Regenerating { previous } => previous,
    }
  }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ItemError {
  pub index: usize,
  pub message: String,
}

/// Why a regeneration could not start.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegenerateRejected {
  NoSuchIndex,
}

#[derive(Clone, Debug, Default)]
struct SlotTracker {
  current: Option<Ticket>,
  last_outcome: Option<Outcome>,
}

impl SlotTracker {
  fn begin(&mut self) -> Ticket {
    if let Some(stale) = &self.current {
      warn!(target: "generation", stale = %stale.id, "Starting a new run while the previous one is still pending");
    }
    let ticket = Ticket::new();
    self.current = Some(ticket.clone());
    ticket
  }

  /// Clears the slot if `id` is the current run.
  fn finish(&mut self, id: Uuid) -> bool {
    match &self.current {
      Some(t) if t.id == id => {
        self.current = None;
        true
      }
      _ => false,
    }
  }

  fn state(&self) -> SlotState {
    if self.current.is_some() { SlotState::Pending } else { SlotState::Idle }
  }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotSnapshot {
  pub state: SlotState,
  pub last_outcome: Option<Outcome>,
}

/// Serializable view sent to the client after every transition.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
  pub questions: Vec<QuestionItem>,
  pub vocabulary: Vec<VocabularyEntry>,
  pub question_slot: SlotSnapshot,
  pub vocabulary_slot: SlotSnapshot,
  pub regeneration_slot: SlotSnapshot,
  pub notice: Option<String>,
  pub error: Option<String>,
  pub item_error: Option<ItemError>,
}

pub struct Session {
  messages: Messages,
  questions: Vec<QuestionItem>,
  vocabulary: Vec<VocabularyEntry>,
  question_slot: SlotTracker,
  vocabulary_slot: SlotTracker,
  regeneration_slot: SlotTracker,
  /// Bumped whenever the question list is replaced, so a regeneration aimed at the old list is ignored.
  list_epoch: u64,
  regen_target: Option<(usize, u64)>,
  notice: Option<String>,
  error: Option<String>,
  item_error: Option<ItemError>,
}

impl Session {
  pub fn new(messages: Messages) -> Self {
    Self {
      messages,
      questions: Vec::new(),
      vocabulary: Vec::new(),
      question_slot: SlotTracker::default(),
      vocabulary_slot: SlotTracker::default(),
      regeneration_slot: SlotTracker::default(),
      list_epoch: 0,
      regen_target: None,
      notice: None,
      error: None,
      item_error: None,
    }
  }

  pub fn questions(&self) -> &[QuestionItem] {
    &self.questions
  }

  #[cfg(test)]
  pub fn vocabulary(&self) -> &[VocabularyEntry] {
    &self.vocabulary
  }

  #[cfg(test)]
  pub fn state(&self, slot: Slot) -> SlotState {
    self.tracker(slot).state()
  }

  #[cfg(test)]
  pub fn last_outcome(&self, slot: Slot) -> Option<Outcome> {
    self.tracker(slot).last_outcome
  }

  #[cfg(test)]
  pub fn notice(&self) -> Option<&str> {
    self.notice.as_deref()
  }

  #[cfg(test)]
  pub fn error(&self) -> Option<&str> {
    self.error.as_deref()
  }

  #[cfg(test)]
  pub fn item_error(&self) -> Option<&ItemError> {
    self.item_error.as_ref()
  }

  fn tracker(&self, slot: Slot) -> &SlotTracker {
    match slot {
      Slot::Questions => &self.question_slot,
      Slot::Vocabulary => &self.vocabulary_slot,
      Slot::Regeneration => &self.regeneration_slot,
    }
  }

  /// Signal the current run of `slot`, if any. The run still has to report back
  /// through its `complete_*` call.
  pub fn cancel(&mut self, slot: Slot) -> bool {
    match &self.tracker(slot).current {
      Some(ticket) => {
        info!(target: "generation", ?slot, id = %ticket.id, "Cancel requested");
        ticket.token.cancel();
        true
      }
      None => false,
    }
  }

  /// Drop all results and messages. Pending runs keep going but their tickets go stale.
  pub fn reset(&mut self) {
    let messages = self.messages.clone();
    *self = Session::new(messages);
  }

  // --- bulk questions ---

  pub fn begin_questions(&mut self) -> Ticket {
    self.notice = None;
    self.error = None;
    self.question_slot.begin()
  }

  pub fn complete_questions(
    &mut self,
    id: Uuid,
    result: Result<Vec<GeneratedQuestion>, GenerationError>,
  ) -> Option<Outcome> {
    if !self.question_slot.finish(id) {
      warn!(target: "generation", %id, "Dropping stale question result");
      return None;
    }
    let outcome = match result {
      Ok(questions) => {
        self.questions = questions.into_iter().map(|question| QuestionItem::Ready { question }).collect();
        self.list_epoch += 1;
        self.item_error = None;
        Outcome::Success
      }
      Err(GenerationError::Cancelled) => {
        self.notice = Some(self.messages.cancelled.clone());
        Outcome::Cancelled
      }
      Err(e) => {
        warn!(target: "generation", error = %e, kind = e.kind(), "Question generation failed");
        self.questions.clear();
        self.list_epoch += 1;
        self.item_error = None;
        self.error = Some(e.user_message(&self.messages, &self.messages.question_failed).to_string());
        Outcome::Failed
      }
    };
    self.question_slot.last_outcome = Some(outcome);
    Some(outcome)
  }

  // --- single-question regeneration ---

  /// Put a placeholder at `index` and return the run's ticket plus the kind to regenerate.
  /// A regeneration still pending elsewhere is rolled back first.
  pub fn begin_regeneration(&mut self, index: usize) -> Result<(Ticket, QuestionType), RegenerateRejected> {
    let kind = match self.questions.get(index) {
      Some(QuestionItem::Ready { question }) => question.kind,
      Some(QuestionItem::Regenerating { previous }) if self.regen_target.map(|(i, _)| i) == Some(index) => previous.kind,
      _ => return Err(RegenerateRejected::NoSuchIndex),
    };
    self.rollback_regeneration();

    let item = &mut self.questions[index];
    let previous = item.question().clone();
    *item = QuestionItem::Regenerating { previous };
    self.regen_target = Some((index, self.list_epoch));
    self.item_error = None;
    self.notice = None;
    Ok((self.regeneration_slot.begin(), kind))
  }

  pub fn complete_regeneration(
    &mut self,
    id: Uuid,
    result: Result<GeneratedQuestion, GenerationError>,
  ) -> Option<Outcome> {
    if !self.regeneration_slot.finish(id) {
      warn!(target: "generation", %id, "Dropping stale regeneration result");
      return None;
    }
    let Some((index, epoch)) = self.regen_target.take() else {
      return None;
    };
    if epoch != self.list_epoch {
      warn!(target: "generation", index, "Question list was replaced; dropping regeneration result");
      self.regeneration_slot.last_outcome = None;
      return None;
    }

    let outcome = match result {
      Ok(question) => {
        self.questions[index] = QuestionItem::Ready { question };
        Outcome::Success
      }
      Err(GenerationError::Cancelled) => {
        self.restore(index);
        self.notice = Some(self.messages.cancelled.clone());
        Outcome::Cancelled
      }
      Err(e) => {
        warn!(target: "generation", error = %e, kind = e.kind(), index, "Regeneration failed; restoring previous item");
        self.restore(index);
        let message = e.user_message(&self.messages, &self.messages.regenerate_failed).to_string();
        self.item_error = Some(ItemError { index, message });
        Outcome::Failed
      }
    };
    self.regeneration_slot.last_outcome = Some(outcome);
    Some(outcome)
  }

  fn restore(&mut self, index: usize) {
    if let Some(item) = self.questions.get_mut(index) {
      if let QuestionItem::Regenerating { previous } = item {
        let question = previous.clone();
        *item = QuestionItem::Ready { question };
      }
    }
  }

  fn rollback_regeneration(&mut self) {
    if let Some((index, epoch)) = self.regen_target.take() {
      if epoch == self.list_epoch {
        self.restore(index);
      }
    }
  }

  // --- vocabulary ---

  pub fn begin_vocabulary(&mut self) -> Ticket {
    self.notice = None;
    self.error = None;
    self.vocabulary_slot.begin()
  }

  pub fn complete_vocabulary(
    &mut self,
    id: Uuid,
    result: Result<Vec<VocabularyEntry>, GenerationError>,
  ) -> Option<Outcome> {
    if !self.vocabulary_slot.finish(id) {
      warn!(target: "generation", %id, "Dropping stale vocabulary result");
      return None;
    }
    let outcome = match result {
      Ok(notes) => {
        self.vocabulary = notes;
        Outcome::Success
      }
      Err(GenerationError::Cancelled) => {
        self.notice = Some(self.messages.cancelled.clone());
        Outcome::Cancelled
      }
      Err(e) => {
        warn!(target: "generation", error = %e, kind = e.kind(), "Vocabulary generation failed");
        self.vocabulary.clear();
        self.error = Some(e.user_message(&self.messages, &self.messages.vocabulary_failed).to_string());
        Outcome::Failed
      }
    };
    self.vocabulary_slot.last_outcome = Some(outcome);
    Some(outcome)
  }

  pub fn snapshot(&self) -> SessionSnapshot {
    let slot = |t: &SlotTracker| SlotSnapshot { state: t.state(), last_outcome: t.last_outcome };
    SessionSnapshot {
      questions: self.questions.clone(),
      vocabulary: self.vocabulary.clone(),
      question_slot: slot(&self.question_slot),
      vocabulary_slot: slot(&self.vocabulary_slot),
      regeneration_slot: slot(&self.regeneration_slot),
      notice: self.notice.clone(),
      error: self.error.clone(),
      item_error: self.item_error.clone(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn q(kind: QuestionType, text: &str) -> GeneratedQuestion {
    GeneratedQuestion {
      kind,
      question: text.into(),
      options: None,
      answer: "A".into(),
      explanation: "E".into(),
    }
  }

  fn five() -> Vec<GeneratedQuestion> {
    (0..5).map(|i| q(QuestionType::MainIdea, &format!("Q{}", i))).collect()
  }

  fn loaded() -> Session {
    let mut s = Session::new(Messages::default());
    let t = s.begin_questions();
    assert_eq!(s.complete_questions(t.id, Ok(five())), Some(Outcome::Success));
    s
  }

  fn plain(s: &Session) -> Vec<GeneratedQuestion> {
    s.questions().iter().map(|i| i.question().clone()).collect()
  }

  #[test]
  fn slot_goes_pending_then_back_to_idle() {
    let mut s = Session::new(Messages::default());
    assert_eq!(s.state(Slot::Questions), SlotState::Idle);
    let t = s.begin_questions();
    assert_eq!(s.state(Slot::Questions), SlotState::Pending);
    assert_eq!(s.state(Slot::Vocabulary), SlotState::Idle);
    s.complete_questions(t.id, Ok(vec![]));
    assert_eq!(s.state(Slot::Questions), SlotState::Idle);
    assert_eq!(s.last_outcome(Slot::Questions), Some(Outcome::Success));
  }

  #[test]
  fn regeneration_failure_rolls_back_only_the_target() {
    let mut s = loaded();
    let before = plain(&s);
    let (t, kind) = s.begin_regeneration(2).unwrap();
    assert_eq!(kind, QuestionType::MainIdea);
    assert!(matches!(s.questions()[2], QuestionItem::Regenerating { .. }));

    let outcome = s.complete_regeneration(t.id, Err(GenerationError::Service("boom".into())));
    assert_eq!(outcome, Some(Outcome::Failed));
    assert_eq!(plain(&s), before);
    assert!(s.questions().iter().all(|i| matches!(i, QuestionItem::Ready { .. })));
    let err = s.item_error().unwrap();
    assert_eq!(err.index, 2);
    assert_eq!(err.message, Messages::default().regenerate_failed);
    assert!(!err.message.contains("boom"));
  }

  #[test]
  fn regeneration_success_patches_in_place() {
    let mut s = loaded();
    let (t, _) = s.begin_regeneration(4).unwrap();
    s.complete_regeneration(t.id, Ok(q(QuestionType::MainIdea, "fresh")));
    let after = plain(&s);
    assert_eq!(after[4].question, "fresh");
    assert_eq!(after[..4], five()[..4]);
  }

  #[test]
  fn regeneration_cancel_restores_and_sets_notice() {
    let mut s = loaded();
    let (t, _) = s.begin_regeneration(0).unwrap();
    assert!(s.cancel(Slot::Regeneration));
    assert!(t.token.is_cancelled());
    s.complete_regeneration(t.id, Err(GenerationError::Cancelled));
    assert_eq!(plain(&s), five());
    assert_eq!(s.notice(), Some(Messages::default().cancelled.as_str()));
    assert!(s.item_error().is_none());
  }

  #[test]
  fn regeneration_rejects_out_of_range_index() {
    let mut s = loaded();
    assert_eq!(s.begin_regeneration(5).unwrap_err(), RegenerateRejected::NoSuchIndex);
    assert_eq!(s.state(Slot::Regeneration), SlotState::Idle);
  }

  #[test]
  fn second_regeneration_rolls_back_the_first_placeholder() {
    let mut s = loaded();
    let (first, _) = s.begin_regeneration(1).unwrap();
    let (second, _) = s.begin_regeneration(3).unwrap();
    assert!(!first.token.is_cancelled());
    assert!(matches!(s.questions()[1], QuestionItem::Ready { .. }));
    assert!(matches!(s.questions()[3], QuestionItem::Regenerating { .. }));

    assert_eq!(s.complete_regeneration(first.id, Ok(q(QuestionType::Mood, "late"))), None);
    assert_eq!(plain(&s)[1].question, "Q1");
    s.complete_regeneration(second.id, Ok(q(QuestionType::Mood, "new")));
    assert_eq!(plain(&s)[3].question, "new");
  }

  #[test]
  fn regeneration_result_for_a_replaced_list_is_ignored() {
    let mut s = loaded();
    let (regen, _) = s.begin_regeneration(2).unwrap();
    let bulk = s.begin_questions();
    s.complete_questions(bulk.id, Ok(vec![q(QuestionType::Claim, "only")]));
    assert_eq!(s.complete_regeneration(regen.id, Ok(q(QuestionType::Claim, "x"))), None);
    assert_eq!(plain(&s).len(), 1);
    assert_eq!(plain(&s)[0].question, "only");
  }

  #[test]
  fn bulk_failure_leaves_list_empty_with_generic_message() {
    let mut s = loaded();
    let t = s.begin_questions();
    s.complete_questions(t.id, Err(GenerationError::MalformedResponse { reason: "eof at line 1".into() }));
    assert!(s.questions().is_empty());
    assert_eq!(s.error(), Some(Messages::default().question_failed.as_str()));
    assert_eq!(s.last_outcome(Slot::Questions), Some(Outcome::Failed));
  }

  #[test]
  fn bulk_cancel_keeps_prior_results() {
    let mut s = loaded();
    let t = s.begin_questions();
    s.cancel(Slot::Questions);
    s.complete_questions(t.id, Err(GenerationError::Cancelled));
    assert_eq!(plain(&s), five());
    assert!(s.notice().is_some());
    assert!(s.error().is_none());
  }

  #[test]
  fn stale_bulk_result_is_dropped() {
    let mut s = Session::new(Messages::default());
    let old = s.begin_questions();
    let new = s.begin_questions();
    assert!(!old.token.is_cancelled());
    assert_eq!(s.complete_questions(old.id, Ok(five())), None);
    assert!(s.questions().is_empty());
    assert_eq!(s.state(Slot::Questions), SlotState::Pending);
    assert_eq!(s.complete_questions(new.id, Ok(vec![])), Some(Outcome::Success));
  }

  #[test]
  fn missing_credentials_gets_its_own_message() {
    let mut s = Session::new(Messages::default());
    let t = s.begin_vocabulary();
    s.complete_vocabulary(t.id, Err(GenerationError::MissingCredentials));
    assert_eq!(s.error(), Some(Messages::default().missing_credentials.as_str()));
  }

  #[test]
  fn vocabulary_slot_is_independent_of_questions() {
    let mut s = loaded();
    let v = s.begin_vocabulary();
    assert!(!s.cancel(Slot::Questions));
    let entry = VocabularyEntry {
      word: "axis".into(),
      definition: "d".into(),
      synonyms: vec![],
      antonyms: vec![],
      example_sentence: "x".into(),
    };
    s.complete_vocabulary(v.id, Ok(vec![entry]));
    assert_eq!(s.vocabulary().len(), 1);
    assert_eq!(plain(&s), five());
  }

  #[test]
  fn snapshot_hides_previous_value_of_placeholder() {
    let mut s = loaded();
    s.begin_regeneration(1).unwrap();
    let json = serde_json::to_value(s.snapshot()).unwrap();
    assert_eq!(json["questions"][1], serde_json::json!({ "status": "regenerating" }));
    assert_eq!(json["questions"][0]["status"], "ready");
    assert_eq!(json["regenerationSlot"]["state"], "pending");
  }

  #[test]
  fn reset_clears_everything() {
    let mut s = loaded();
    s.reset();
    assert!(s.questions().is_empty());
    assert_eq!(s.last_outcome(Slot::Questions), None);
  }
}
