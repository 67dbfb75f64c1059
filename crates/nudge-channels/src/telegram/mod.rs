//! Telegram Bot API channel.
//!
//! Uses long polling via `getUpdates`, `sendMessage`/`editMessageText` for
//! responses and `answerCallbackQuery` for inline button presses.
//! Docs: <https://core.telegram.org/bots/api>

mod polling;
pub(crate) mod send;
pub(crate) mod types;


use nudge_core::config::TelegramConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Telegram channel using the Bot API with long polling.
pub struct TelegramChannel {
    config: TelegramConfig,
    client: reqwest::Client,
    base_url: String,
    /// Tracks the last update_id to avoid reprocessing.
    last_update_id: Arc<Mutex<Option<i64>>>,
}

impl TelegramChannel {
    /// Create a new Telegram channel from config.
    pub fn new(config: TelegramConfig) -> Self {
        let base_url = format!("https://api.telegram.org/bot{}", config.bot_token);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.send_timeout_secs.max(1)))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("failed to build configured HTTP client, using defaults: {e}");
                reqwest::Client::new()
            });
        Self {
            config,
            client,
            base_url,
            last_update_id: Arc::new(Mutex::new(None)),
        }
    }
}
