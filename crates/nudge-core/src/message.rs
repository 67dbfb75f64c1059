use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An incoming event from a channel: a text message or an inline button press.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub id: Uuid,
    /// Channel name (e.g. "telegram").
    pub channel: String,
    /// Platform-specific user ID.
    pub sender_id: i64,
    /// Human-readable sender name (first name on Telegram).
    pub sender_name: Option<String>,
    /// Message text content. Empty for button presses.
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// Chat the response should be routed to.
    pub chat_id: i64,
    /// Present when this event is an inline button press.
    #[serde(default)]
    pub callback: Option<CallbackQuery>,
}

impl IncomingMessage {
    /// Display name for storing as the reminder owner name.
    pub fn display_name(&self) -> &str {
        self.sender_name.as_deref().unwrap_or("")
    }
}

/// An inline button press.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackQuery {
    /// Platform id used to acknowledge the press.
    pub id: String,
    /// Opaque button payload.
    pub data: String,
    /// The bot message that carried the pressed button.
    pub message_id: Option<i64>,
}

/// An outgoing message to send back through a channel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub chat_id: i64,
    pub text: String,
    /// Render `text` as Markdown (channels fall back to plain text on parse errors).
    #[serde(default)]
    pub markdown: bool,
    #[serde(default)]
    pub markup: Option<Markup>,
    /// Edit this message in place instead of sending a new one.
    #[serde(default)]
    pub edit_message_id: Option<i64>,
}

impl OutgoingMessage {
    /// A plain text message.
    pub fn text(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            ..Default::default()
        }
    }

    /// A Markdown message.
    pub fn markdown(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            markdown: true,
            ..Self::text(chat_id, text)
        }
    }

    pub fn with_markup(mut self, markup: Markup) -> Self {
        self.markup = Some(markup);
        self
    }

    /// Replace the given message instead of posting a new one.
    pub fn editing(mut self, message_id: Option<i64>) -> Self {
        self.edit_message_id = message_id;
        self
    }

    /// Edited messages can only carry inline keyboards.
    pub fn can_edit(&self) -> bool {
        !matches!(self.markup, Some(Markup::Reply { .. }))
    }
}

/// Keyboard attached to an outgoing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Markup {
    /// Buttons under the message; each press comes back as a [`CallbackQuery`].
    Inline(Vec<Vec<InlineButton>>),
    /// Persistent keyboard replacing the user's text keyboard; presses arrive as text.
    Reply {
        rows: Vec<Vec<String>>,
        placeholder: Option<String>,
    },
}

impl Markup {
    /// All inline buttons in reading order. Empty for reply keyboards.
    pub fn inline_buttons(&self) -> impl Iterator<Item = &InlineButton> {
        let rows: &[Vec<InlineButton>] = match self {
            Self::Inline(rows) => rows,
            Self::Reply { .. } => &[],
        };
        rows.iter().flatten()
    }
}

/// A single inline keyboard button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineButton {
    pub text: String,
    /// Callback payload returned when pressed.
    pub data: String,
}

impl InlineButton {
    pub fn new(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            data: data.into(),
        }
    }
}
