use crate::{
    error::NudgeError,
    message::{IncomingMessage, OutgoingMessage},
};
use async_trait::async_trait;

/// Messaging Channel trait.
///
/// A messaging platform implements this trait to receive user events and to
/// send or edit bot messages.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Human-readable channel name.
    fn name(&self) -> &str;

    /// Start listening for incoming events.
    /// Returns a receiver that yields messages and button presses.
    async fn start(&self) -> Result<tokio::sync::mpsc::Receiver<IncomingMessage>, NudgeError>;

    /// Send a message, or edit one in place when `edit_message_id` is set.
    async fn send(&self, message: OutgoingMessage) -> Result<(), NudgeError>;

    /// Acknowledge a button press, optionally showing an alert to the user.
    async fn answer_callback(
        &self,
        _callback_id: &str,
        _alert: Option<&str>,
    ) -> Result<(), NudgeError> {
        Ok(())
    }

    /// Graceful shutdown.
    async fn stop(&self) -> Result<(), NudgeError>;
}
