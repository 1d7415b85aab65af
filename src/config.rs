//! Loading service configuration (Gemini settings + localized messages) from TOML.
//!
//! Every field is optional in the file; missing values fall back to env vars
//! and then to built-in defaults. See `AppConfig` for the expected schema.

use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
  #[serde(default)]
  pub gemini: GeminiCfg,
  #[serde(default)]
  pub messages: Messages,
}

/// `[gemini]` table. Env vars fill whatever the file leaves out.
#[derive(Clone, Debug, Deserialize, Default)]
pub struct GeminiCfg {
  #[serde(default)] pub base_url: Option<String>,
  #[serde(default)] pub model: Option<String>,
  #[serde(default)] pub timeout_secs: Option<u64>,
}

/// Resolved settings for the outbound transport.
#[derive(Clone, Debug, PartialEq)]
pub struct GeminiSettings {
  pub base_url: String,
  pub model: String,
  pub timeout: Duration,
  /// Server-wide fallback key, used when a request brings none.
  pub default_api_key: Option<String>,
}

impl GeminiSettings {
  /// File values win over env vars, env vars over defaults.
  pub fn resolve(cfg: &GeminiCfg, env: impl Fn(&str) -> Option<String>) -> Self {
    let base_url = cfg.base_url.clone()
      .or_else(|| env("GEMINI_BASE_URL"))
      .unwrap_or_else(|| DEFAULT_BASE_URL.into());
    let model = cfg.model.clone()
      .or_else(|| env("GEMINI_MODEL"))
      .unwrap_or_else(|| DEFAULT_MODEL.into());
    let timeout_secs = cfg.timeout_secs
      .or_else(|| env("GEMINI_TIMEOUT_SECS").and_then(|s| s.parse().ok()))
      .unwrap_or(DEFAULT_TIMEOUT_SECS);
    let default_api_key = env("GEMINI_API_KEY")
      .map(|k| k.trim().to_string())
      .filter(|k| !k.is_empty());

    Self {
      base_url: base_url.trim_end_matches('/').to_string(),
      model,
      timeout: Duration::from_secs(timeout_secs),
      default_api_key,
    }
  }
}

/// User-facing texts. Defaults are Korean, matching the exam audience.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Messages {
  pub missing_credentials: String,
  pub cancelled: String,
  pub question_failed: String,
  pub vocabulary_failed: String,
  pub regenerate_failed: String,
  pub empty_passage: String,
  pub no_types_selected: String,
  pub invalid_index: String,
}

impl Default for Messages {
  fn default() -> Self {
    Self {
      missing_credentials: "API 키가 제공되지 않았습니다. API 키를 설정해주세요.".into(),
      cancelled: "생성이 취소되었습니다.".into(),
      question_failed: "AI로부터 받은 응답을 처리하는 데 실패했습니다. 잠시 후 다시 시도해주세요.".into(),
      vocabulary_failed: "AI로부터 받은 어휘 노트를 처리하는 데 실패했습니다. 잠시 후 다시 시도해주세요.".into(),
      regenerate_failed: "문제를 다시 생성하는 데 실패했습니다. 잠시 후 다시 시도해주세요.".into(),
      empty_passage: "지문을 입력해주세요.".into(),
      no_types_selected: "하나 이상의 문제 유형을 선택해주세요.".into(),
      invalid_index: "다시 생성할 문제를 찾을 수 없습니다.".into(),
    }
  }
}

/// Attempt to load `AppConfig` from QUIZ_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_app_config_from_env() -> Option<AppConfig> {
  let path = std::env::var("QUIZ_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<AppConfig>(&s) {
      Ok(cfg) => {
        info!(target: "passage_quiz", %path, "Loaded config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "passage_quiz", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "passage_quiz", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
