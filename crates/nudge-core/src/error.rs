use thiserror::Error;

/// Top-level error type for nudge.
#[derive(Debug, Error)]
pub enum NudgeError {
    /// Error from a messaging channel. Treated as transient by the scheduler.
    #[error("channel error: {0}")]
    Channel(String),

    /// The recipient can no longer be reached (bot blocked, chat gone).
    /// Retrying will not help.
    #[error("recipient unreachable: {0}")]
    RecipientUnreachable(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Reminder storage error.
    #[error("store error: {0}")]
    Store(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl NudgeError {
    /// Whether a delivery failure is permanent for this recipient.
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::RecipientUnreachable(_))
    }
}
