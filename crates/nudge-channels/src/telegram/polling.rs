//! Long-polling update loop and Channel trait implementation.

use super::types::{TgResponse, TgUpdate, TgUser};
use super::TelegramChannel;
use async_trait::async_trait;
use nudge_core::{
    config::TelegramConfig,
    error::NudgeError,
    message::{CallbackQuery, IncomingMessage, OutgoingMessage},
    traits::Channel,
};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&self) -> Result<mpsc::Receiver<IncomingMessage>, NudgeError> {
        self.register_commands().await;

        let (tx, rx) = mpsc::channel(64);
        let client = self.client.clone();
        let base_url = self.base_url.clone();
        let config = self.config.clone();
        let last_update_id = self.last_update_id.clone();

        info!("Telegram channel starting long polling...");

        tokio::spawn(async move {
            let mut backoff_secs: u64 = 1;

            loop {
                let last = last_update_id.lock().await;
                let offset = last.map(|id| id + 1);
                drop(last);

                let mut url = format!("{base_url}/getUpdates?timeout=30");
                if let Some(off) = offset {
                    url.push_str(&format!("&offset={off}"));
                }

                let resp = match client
                    .get(&url)
                    .timeout(Duration::from_secs(35))
                    .send()
                    .await
                {
                    Ok(r) => r,
                    Err(e) => {
                        error!("telegram poll error (retry in {backoff_secs}s): {e}");
                        tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
                        backoff_secs = (backoff_secs * 2).min(60);
                        continue;
                    }
                };

                let body: TgResponse<Vec<TgUpdate>> = match resp.json().await {
                    Ok(b) => b,
                    Err(e) => {
                        error!("telegram parse error (retry in {backoff_secs}s): {e}");
                        tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
                        backoff_secs = (backoff_secs * 2).min(60);
                        continue;
                    }
                };

                if !body.ok {
                    error!(
                        "telegram API error (retry in {backoff_secs}s): {}",
                        body.description.unwrap_or_default()
                    );
                    tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
                    backoff_secs = (backoff_secs * 2).min(60);
                    continue;
                }

                // Successful poll -- reset backoff.
                backoff_secs = 1;

                let updates = body.result.unwrap_or_default();

                if let Some(last_update) = updates.last() {
                    *last_update_id.lock().await = Some(last_update.update_id);
                }

                for update in updates {
                    let Some(incoming) = to_incoming(update, &config) else {
                        continue;
                    };
                    if tx.send(incoming).await.is_err() {
                        info!("telegram channel receiver dropped, stopping poll");
                        return;
                    }
                }
            }
        });

        Ok(rx)
    }

    async fn send(&self, message: OutgoingMessage) -> Result<(), NudgeError> {
        if let Some(message_id) = message.edit_message_id.filter(|_| message.can_edit()) {
            match self
                .edit_text(
                    message.chat_id,
                    message_id,
                    &message.text,
                    message.markdown,
                    message.markup.as_ref(),
                )
                .await
            {
                Ok(()) => return Ok(()),
                Err(e) if e.is_permanent() => return Err(e),
                Err(e) => debug!("edit of message {message_id} failed, sending new: {e}"),
            }
        }

        self.send_text(
            message.chat_id,
            &message.text,
            message.markdown,
            message.markup.as_ref(),
        )
        .await
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        alert: Option<&str>,
    ) -> Result<(), NudgeError> {
        self.answer_callback_query(callback_id, alert).await
    }

    async fn stop(&self) -> Result<(), NudgeError> {
        info!("Telegram channel stopped");
        Ok(())
    }
}

/// Convert a raw update into an incoming event.
///
/// Returns `None` for updates the bot does not handle: non-text messages,
/// group chats and users outside the allowlist.
pub(crate) fn to_incoming(update: TgUpdate, config: &TelegramConfig) -> Option<IncomingMessage> {
    if let Some(query) = update.callback_query {
        if !is_allowed(config, &query.from) {
            return None;
        }
        let (chat_id, message_id) = match &query.message {
            Some(m) => (m.chat.id, Some(m.message_id)),
            None => (query.from.id, None),
        };
        return Some(IncomingMessage {
            id: Uuid::new_v4(),
            channel: "telegram".to_string(),
            sender_id: query.from.id,
            sender_name: Some(display_name(&query.from)),
            text: String::new(),
            timestamp: chrono::Utc::now(),
            chat_id,
            callback: Some(CallbackQuery {
                id: query.id,
                data: query.data.unwrap_or_default(),
                message_id,
            }),
        });
    }

    let msg = update.message?;
    let text = msg.text?;
    let user = msg.from?;

    if !is_allowed(config, &user) {
        return None;
    }

    // Reminders are personal: drop group traffic.
    if matches!(msg.chat.chat_type.as_str(), "group" | "supergroup") {
        debug!("telegram: ignoring group message from chat {}", msg.chat.id);
        return None;
    }

    Some(IncomingMessage {
        id: Uuid::new_v4(),
        channel: "telegram".to_string(),
        sender_id: user.id,
        sender_name: Some(display_name(&user)),
        text,
        timestamp: chrono::Utc::now(),
        chat_id: msg.chat.id,
        callback: None,
    })
}

fn is_allowed(config: &TelegramConfig, user: &TgUser) -> bool {
    if config.is_allowed(user.id) {
        return true;
    }
    warn!("ignoring update from unauthorized user {}", user.id);
    false
}

fn display_name(user: &TgUser) -> String {
    match &user.last_name {
        Some(ln) => format!("{} {ln}", user.first_name),
        None => user.first_name.clone(),
    }
}
