//! Application state: the generation pipeline, localized messages, and the
//! server-wide fallback API key.
//!
//! Nothing per-user lives here; slot state is owned by each WebSocket session.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::config::{load_app_config_from_env, GeminiSettings, Messages};
use crate::gemini::{GeminiTransport, Transport};
use crate::pipeline::Pipeline;
use crate::util::non_blank;

#[derive(Clone)]
pub struct AppState {
  pub pipeline: Pipeline,
  pub messages: Messages,
  default_api_key: Option<String>,
}

impl AppState {
  /// Build state from env: load config, resolve Gemini settings, build the transport.
  #[instrument(level = "info", skip_all)]
  pub fn from_env() -> Result<Self, reqwest::Error> {
    let cfg = load_app_config_from_env().unwrap_or_default();
    let settings = GeminiSettings::resolve(&cfg.gemini, |k| std::env::var(k).ok());
    let transport = GeminiTransport::new(&settings)?;

    info!(
      target: "passage_quiz",
      base_url = %settings.base_url,
      model = %settings.model,
      timeout = ?settings.timeout,
      server_key = settings.default_api_key.is_some(),
      "Gemini transport ready"
    );

    Ok(Self::with_transport(Arc::new(transport), cfg.messages, settings.default_api_key))
  }

  pub fn with_transport(transport: Arc<dyn Transport>, messages: Messages, default_api_key: Option<String>) -> Self {
    Self { pipeline: Pipeline::new(transport), messages, default_api_key }
  }

  /// Request key first, then the server-wide key. Blank keys count as absent.
  pub fn resolve_api_key(&self, requested: Option<&str>) -> Option<String> {
    non_blank(requested)
      .or_else(|| non_blank(self.default_api_key.as_deref()))
      .map(str::to_string)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::gemini::testing::SpyTransport;

  #[test]
  fn request_key_wins_and_blank_falls_back() {
    let state = AppState::with_transport(SpyTransport::replying(vec![]), Messages::default(), Some("server".into()));
    assert_eq!(state.resolve_api_key(Some(" mine ")).as_deref(), Some("mine"));
    assert_eq!(state.resolve_api_key(Some("")).as_deref(), Some("server"));
    assert_eq!(state.resolve_api_key(None).as_deref(), Some("server"));

    let bare = AppState::with_transport(SpyTransport::replying(vec![]), Messages::default(), None);
    assert_eq!(bare.resolve_api_key(Some("  ")), None);
  }
}
