mod channels;
mod defaults;


pub use channels::*;

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::error::NudgeError;
use defaults::*;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub dialogue: DialogueConfig,
    #[serde(default)]
    pub health: HealthConfig,
}

/// General bot settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Also write logs to `{data_dir}/logs/nudge.log`, rotated daily.
    #[serde(default)]
    pub log_to_file: bool,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            log_to_file: false,
        }
    }
}

/// Reminder store config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
    /// Acknowledged reminders older than this many days are purged.
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            retention_days: default_retention_days(),
        }
    }
}

/// Notification scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Pause after a tick fails as a whole (e.g. the store is unavailable).
    #[serde(default = "default_error_backoff")]
    pub error_backoff_secs: u64,
    /// Upper bound of the per-reminder retry delay after transient send failures.
    #[serde(default = "default_max_retry_backoff")]
    pub max_retry_backoff_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_secs: default_poll_interval(),
            error_backoff_secs: default_error_backoff(),
            max_retry_backoff_secs: default_max_retry_backoff(),
        }
    }
}

/// Conversation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueConfig {
    /// Maximum reminder text length in characters.
    #[serde(default = "default_max_text_len")]
    pub max_text_len: usize,
    /// Idle wizard sessions are dropped after this many seconds.
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,
    /// Reminders per page in the list view.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            max_text_len: default_max_text_len(),
            session_ttl_secs: default_session_ttl(),
            page_size: default_page_size(),
        }
    }
}

/// Liveness endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_health_host")]
    pub host: String,
    #[serde(default = "default_health_port")]
    pub port: u16,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_health_host(),
            port: default_health_port(),
        }
    }
}

/// Expand `~` to home directory.
pub fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return format!("{}/{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}

impl Config {
    /// Apply `TELEGRAM_BOT_TOKEN` and `PORT` from the environment.
    ///
    /// A token from the environment enables the Telegram channel.
    pub fn apply_env<F>(&mut self, var: F) -> Result<(), NudgeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = var("TELEGRAM_BOT_TOKEN").filter(|t| !t.trim().is_empty()) {
            let tg = self.channel.telegram.get_or_insert_with(TelegramConfig::default);
            tg.bot_token = token.trim().to_string();
            tg.enabled = true;
        }
        if let Some(port) = var("PORT").filter(|p| !p.trim().is_empty()) {
            self.health.port = port
                .trim()
                .parse()
                .map_err(|e| NudgeError::Config(format!("invalid PORT {port:?}: {e}")))?;
        }
        Ok(())
    }

    /// The Telegram config, if the channel is enabled with a token.
    pub fn telegram(&self) -> Option<&TelegramConfig> {
        self.channel
            .telegram
            .as_ref()
            .filter(|tg| tg.enabled && !tg.bot_token.is_empty())
    }
}

/// Load configuration from a TOML file.
///
/// Falls back to defaults if the file does not exist.
pub fn load(path: &str) -> Result<Config, NudgeError> {
    let path = Path::new(path);
    if !path.exists() {
        info!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| NudgeError::Config(format!("failed to read {}: {}", path.display(), e)))?;

    let config: Config = toml::from_str(&content)
        .map_err(|e| NudgeError::Config(format!("failed to parse config: {}", e)))?;

    Ok(config)
}
