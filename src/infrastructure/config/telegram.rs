//! Bot configuration.

use chrono::Duration;
use serde::Deserialize;

const fn default_session_timeout_secs() -> u64 {
    600
}

/// `[telegram]` section. The token itself comes from `TELEGRAM_BOT_TOKEN`.
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    /// How long a multi-step conversation waits for input.
    #[serde(default = "default_session_timeout_secs")]
    pub session_timeout_secs: u64,

    #[serde(skip)]
    pub bot_token: Option<String>,
}

impl TelegramConfig {
    #[must_use]
    pub fn session_timeout(&self) -> Duration {
        Duration::seconds(i64::try_from(self.session_timeout_secs).unwrap_or(i64::MAX))
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            session_timeout_secs: default_session_timeout_secs(),
            bot_token: None,
        }
    }
}
