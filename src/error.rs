//! Typed failures of the generation pipeline.

use thiserror::Error;

use crate::config::Messages;

#[derive(Debug, Error)]
pub enum GenerationError {
  /// No API key supplied; the caller has to ask for one.
  #[error("no API key supplied")]
  MissingCredentials,
  /// The cancellation token fired at a checkpoint.
  #[error("generation cancelled")]
  Cancelled,
  /// Transport or service-level failure (network, auth, quota, bad request).
  #[error("generation service error: {0}")]
  Service(String),
  /// The service answered, but not with the declared structured shape.
  #[error("malformed model response: {reason}")]
  MalformedResponse { reason: String },
}

impl GenerationError {
  /// Machine-readable tag used on the wire.
  pub fn kind(&self) -> &'static str {
    match self {
      GenerationError::MissingCredentials => "missing_credentials",
      GenerationError::Cancelled => "cancelled",
      GenerationError::Service(_) => "service_error",
      GenerationError::MalformedResponse { .. } => "malformed_response",
    }
  }

  /// Localized text for the end user. Service and decode failures share one
  /// generic message; the raw diagnostic only goes to the logs.
  pub fn user_message<'a>(&self, messages: &'a Messages, generic: &'a str) -> &'a str {
    match self {
      GenerationError::MissingCredentials => &messages.missing_credentials,
      GenerationError::Cancelled => &messages.cancelled,
      GenerationError::Service(_) | GenerationError::MalformedResponse { .. } => generic,
    }
  }
}
