//! WebSocket upgrade + message loop. Each connection owns one `Session`.
//!
//! Client messages start or cancel runs; finished runs come back over an
//! in-process channel and are reconciled into the session on this task only.
//! After every transition the full session snapshot is sent.

use std::sync::Arc;

use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use crate::domain::{GeneratedQuestion, VocabularyEntry};
use crate::error::GenerationError;
use crate::logic::{question_request, regenerate_request, vocabulary_request, Failure, INVALID_REQUEST};
use crate::pipeline::GenerationHandle;
use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::session::{Session, Slot};
use crate::state::AppState;

/// A finished run, tagged with its ticket id.
#[derive(Debug)]
pub enum Completion {
  Questions(Uuid, Result<Vec<GeneratedQuestion>, GenerationError>),
  Regeneration(Uuid, Result<GeneratedQuestion, GenerationError>),
  Vocabulary(Uuid, Result<Vec<VocabularyEntry>, GenerationError>),
}

const ALL_SLOTS: [Slot; 3] = [Slot::Questions, Slot::Vocabulary, Slot::Regeneration];

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "passage_quiz", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "passage_quiz", "WebSocket connected");
  let mut session = Session::new(state.messages.clone());
  let (tx, mut rx) = unbounded_channel::<Completion>();

  loop {
    let reply = tokio::select! {
      incoming = socket.recv() => match incoming {
        Some(Ok(Message::Text(txt))) => match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(msg) => {
            debug!(target: "passage_quiz", "WS received: {:?}", &msg);
            handle_client_ws(msg, &state, &mut session, &tx)
          }
          Err(e) => ServerWsMessage::Error { kind: INVALID_REQUEST.into(), message: format!("Invalid JSON: {}", e) },
        },
        Some(Ok(Message::Ping(payload))) => {
          let _ = socket.send(Message::Pong(payload)).await;
          continue;
        }
        Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
        Some(Ok(_)) => continue,
      },
      Some(done) = rx.recv() => {
        apply_completion(&mut session, done);
        ServerWsMessage::Snapshot { session: session.snapshot() }
      }
    };

    let out = serde_json::to_string(&reply).unwrap_or_else(|e| {
      serde_json::json!({ "type": "error", "kind": "internal", "message": format!("Serialization error: {}", e) }).to_string()
    });
    if let Err(e) = socket.send(Message::Text(out)).await {
      error!(target: "passage_quiz", error = %e, "WS send error");
      break;
    }
  }

  // Nobody is left to show the results.
  for slot in ALL_SLOTS {
    session.cancel(slot);
  }
  info!(target: "passage_quiz", "WebSocket disconnected");
}

/// Await a detached run and post its result back to the connection task.
fn forward<T: Send + 'static>(
  handle: GenerationHandle<T>,
  tx: &UnboundedSender<Completion>,
  wrap: fn(Uuid, Result<T, GenerationError>) -> Completion,
) {
  let tx = tx.clone();
  tokio::spawn(async move {
    let id = handle.id();
    let result = handle.join().await;
    // The receiver is gone only after disconnect.
    let _ = tx.send(wrap(id, result));
  });
}

fn rejected(f: Failure) -> ServerWsMessage {
  ServerWsMessage::Error { kind: f.kind.into(), message: f.message }
}

#[instrument(level = "info", skip_all)]
pub fn handle_client_ws(
  msg: ClientWsMessage,
  state: &AppState,
  session: &mut Session,
  tx: &UnboundedSender<Completion>,
) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::GenerateQuestions { passage, counts, difficulty, api_key } => {
      let req = match question_request(state, passage, counts, difficulty, api_key.as_deref()) {
        Ok(r) => r,
        Err(f) => return rejected(f),
      };
      let ticket = session.begin_questions();
      info!(target: "generation", id = %ticket.id, "WS generate_questions started");
      forward(state.pipeline.spawn_questions(req, ticket), tx, Completion::Questions);
      ServerWsMessage::Snapshot { session: session.snapshot() }
    }

    ClientWsMessage::RegenerateQuestion { index, passage, difficulty, api_key } => {
      let Some(kind) = session.questions().get(index).map(|item| item.question().kind) else {
        return rejected(Failure::invalid(&state.messages.invalid_index));
      };
      let req = match regenerate_request(state, passage, kind, difficulty, api_key.as_deref()) {
        Ok(r) => r,
        Err(f) => return rejected(f),
      };
      let ticket = match session.begin_regeneration(index) {
        Ok((ticket, _)) => ticket,
        Err(_) => return rejected(Failure::invalid(&state.messages.invalid_index)),
      };
      info!(target: "generation", id = %ticket.id, index, "WS regenerate_question started");
      forward(state.pipeline.spawn_regenerate(req, ticket), tx, Completion::Regeneration);
      ServerWsMessage::Snapshot { session: session.snapshot() }
    }

    ClientWsMessage::GenerateVocabulary { passage, words, api_key } => {
      let req = match vocabulary_request(state, passage, words, api_key.as_deref()) {
        Ok(r) => r,
        Err(f) => return rejected(f),
      };
      let ticket = session.begin_vocabulary();
      info!(target: "generation", id = %ticket.id, "WS generate_vocabulary started");
      forward(state.pipeline.spawn_vocabulary(req, ticket), tx, Completion::Vocabulary);
      ServerWsMessage::Snapshot { session: session.snapshot() }
    }

    ClientWsMessage::Cancel { slot } => {
      if !session.cancel(slot) {
        debug!(target: "generation", ?slot, "Cancel for an idle slot ignored");
      }
      ServerWsMessage::Snapshot { session: session.snapshot() }
    }

    ClientWsMessage::Reset => {
      for slot in ALL_SLOTS {
        session.cancel(slot);
      }
      session.reset();
      ServerWsMessage::Snapshot { session: session.snapshot() }
    }
  }
}

pub fn apply_completion(session: &mut Session, done: Completion) {
  let outcome = match done {
    Completion::Questions(id, r) => session.complete_questions(id, r),
    Completion::Regeneration(id, r) => session.complete_regeneration(id, r),
    Completion::Vocabulary(id, r) => session.complete_vocabulary(id, r),
  };
  debug!(target: "generation", ?outcome, "Completion applied");
}
