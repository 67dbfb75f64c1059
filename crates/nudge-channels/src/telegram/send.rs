//! Message sending: text, in-place edits, callback answers and command registration.

use super::types::TgResponse;
use super::TelegramChannel;
use nudge_core::{error::NudgeError, message::Markup};
use serde_json::{json, Value};
use tracing::{info, warn};

/// How a failed Bot API call should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ApiFailure {
    /// The user blocked the bot or the chat is gone.
    Unreachable,
    /// Markdown in the text could not be parsed.
    BadMarkdown,
    /// An edit that would leave the message unchanged.
    NotModified,
    /// Anything else, including transport errors.
    Other,
}

#[derive(Debug)]
pub(crate) struct ApiError {
    pub failure: ApiFailure,
    pub message: String,
}

impl From<ApiError> for NudgeError {
    fn from(e: ApiError) -> Self {
        match e.failure {
            ApiFailure::Unreachable => NudgeError::RecipientUnreachable(e.message),
            _ => NudgeError::Channel(e.message),
        }
    }
}

/// Classify a Bot API error from its HTTP status and description.
pub(crate) fn classify_failure(status: u16, description: &str) -> ApiFailure {
    let d = description.to_lowercase();
    if d.contains("message is not modified") {
        ApiFailure::NotModified
    } else if d.contains("can't parse entities") {
        ApiFailure::BadMarkdown
    } else if status == 403
        || d.contains("forbidden")
        || d.contains("blocked")
        || d.contains("chat not found")
        || d.contains("user is deactivated")
    {
        ApiFailure::Unreachable
    } else {
        ApiFailure::Other
    }
}

/// Bot API representation of a keyboard.
pub(crate) fn markup_json(markup: &Markup) -> Value {
    match markup {
        Markup::Inline(rows) => {
            let rows: Vec<Vec<Value>> = rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|b| json!({ "text": b.text, "callback_data": b.data }))
                        .collect()
                })
                .collect();
            json!({ "inline_keyboard": rows })
        }
        Markup::Reply { rows, placeholder } => {
            let rows: Vec<Vec<Value>> = rows
                .iter()
                .map(|row| row.iter().map(|t| json!({ "text": t })).collect())
                .collect();
            let mut kb = json!({ "keyboard": rows, "resize_keyboard": true });
            if let Some(p) = placeholder {
                kb["input_field_placeholder"] = json!(p);
            }
            kb
        }
    }
}

/// Body for `sendMessage`, or `editMessageText` when `message_id` is set.
pub(crate) fn message_body(
    chat_id: i64,
    message_id: Option<i64>,
    text: &str,
    markdown: bool,
    markup: Option<&Markup>,
) -> Value {
    let mut body = json!({ "chat_id": chat_id, "text": text });
    if let Some(id) = message_id {
        body["message_id"] = json!(id);
    }
    if markdown {
        body["parse_mode"] = json!("Markdown");
    }
    if let Some(m) = markup {
        body["reply_markup"] = markup_json(m);
    }
    body
}

impl TelegramChannel {
    /// POST a Bot API method and check the response envelope.
    async fn post(&self, method: &str, body: &Value) -> Result<(), ApiError> {
        let url = format!("{}/{method}", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| ApiError {
                failure: ApiFailure::Other,
                message: format!("telegram {method} failed: {e}"),
            })?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let error_text = resp.text().await.unwrap_or_default();
        let description = serde_json::from_str::<TgResponse<Value>>(&error_text)
            .ok()
            .and_then(|r| r.description)
            .unwrap_or(error_text);
        Err(ApiError {
            failure: classify_failure(status.as_u16(), &description),
            message: format!("telegram {method} failed ({status}): {description}"),
        })
    }

    /// Send a new message to a chat.
    pub(crate) async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        markdown: bool,
        markup: Option<&Markup>,
    ) -> Result<(), NudgeError> {
        let body = message_body(chat_id, None, text, markdown, markup);
        match self.post("sendMessage", &body).await {
            Err(e) if markdown && e.failure == ApiFailure::BadMarkdown => {
                warn!("Markdown parse failed, retrying as plain text: {}", e.message);
                let plain = message_body(chat_id, None, text, false, markup);
                self.post("sendMessage", &plain).await.map_err(Into::into)
            }
            other => other.map_err(Into::into),
        }
    }

    /// Replace the text and inline keyboard of an existing bot message.
    pub(crate) async fn edit_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        markdown: bool,
        markup: Option<&Markup>,
    ) -> Result<(), NudgeError> {
        let body = message_body(chat_id, Some(message_id), text, markdown, markup);
        let result = match self.post("editMessageText", &body).await {
            Err(e) if markdown && e.failure == ApiFailure::BadMarkdown => {
                warn!("Markdown parse failed, retrying edit as plain text: {}", e.message);
                let plain = message_body(chat_id, Some(message_id), text, false, markup);
                self.post("editMessageText", &plain).await
            }
            other => other,
        };
        match result {
            Err(e) if e.failure == ApiFailure::NotModified => Ok(()),
            other => other.map_err(Into::into),
        }
    }

    /// Stop the loading indicator on a pressed button, optionally with an alert popup.
    pub(crate) async fn answer_callback_query(
        &self,
        callback_id: &str,
        alert: Option<&str>,
    ) -> Result<(), NudgeError> {
        let mut body = json!({ "callback_query_id": callback_id });
        if let Some(text) = alert {
            body["text"] = json!(text);
            body["show_alert"] = json!(true);
        }
        self.post("answerCallbackQuery", &body)
            .await
            .map_err(Into::into)
    }

    /// Register bot commands with Telegram so users see an autocomplete menu.
    /// Best-effort: logs failures but does not propagate errors.
    pub(crate) async fn register_commands(&self) {
        let commands = json!({
            "commands": [
                { "command": "start", "description": "Main menu" },
                { "command": "list", "description": "All your reminders" },
                { "command": "upcoming", "description": "Next three reminders" },
                { "command": "repeating", "description": "Recurring reminders" },
                { "command": "help", "description": "How to use the bot" },
            ]
        });

        match self.post("setMyCommands", &commands).await {
            Ok(()) => info!("registered Telegram bot commands"),
            Err(e) => warn!("failed to register Telegram bot commands: {}", e.message),
        }
    }
}
