//! Conversation handling: wizard steps and inline button actions turned into replies.
//!
//! - `session`: per-user wizard state with idle expiry
//! - `creation`: the creation wizard
//! - `editing`: text, time and repeat edits of an existing reminder
//! - `views`: lists, details, delete, complete and snooze

mod creation;
mod editing;
mod error;
mod session;
mod views;

#[cfg(test)]
mod tests;

pub use error::FlowError;
pub use session::{Creation, Edit, Session, SessionMap};

use crate::callback::Action;
use crate::commands::{self, Command};
use crate::{keyboards, render};
use chrono::NaiveDateTime;
use nudge_core::{
    config::DialogueConfig,
    message::{IncomingMessage, OutgoingMessage},
};
use nudge_store::{Reminder, Store};
use std::time::Duration;
use tracing::{debug, error, warn};

/// Who is talking and where the reply goes.
#[derive(Debug, Clone)]
pub struct Ctx {
    pub user_id: i64,
    pub user_name: String,
    pub chat_id: i64,
    /// Bot message carrying the pressed button; replies edit it in place.
    pub message_id: Option<i64>,
    /// The event is a button press.
    pub callback: bool,
    pub now: NaiveDateTime,
}

impl Ctx {
    pub fn from_incoming(incoming: &IncomingMessage, now: NaiveDateTime) -> Self {
        Self {
            user_id: incoming.sender_id,
            user_name: incoming.display_name().to_string(),
            chat_id: incoming.chat_id,
            message_id: incoming.callback.as_ref().and_then(|c| c.message_id),
            callback: incoming.callback.is_some(),
            now,
        }
    }

    /// Markdown reply, editing the pressed message when there is one.
    pub fn reply(&self, text: impl Into<String>) -> OutgoingMessage {
        OutgoingMessage::markdown(self.chat_id, text).editing(self.message_id)
    }
}

/// Everything to send back for one event.
#[derive(Debug, Default)]
pub struct Response {
    pub messages: Vec<OutgoingMessage>,
    /// Text for the button-press acknowledgement, shown as an alert.
    pub alert: Option<String>,
}

impl Response {
    pub fn reply(message: OutgoingMessage) -> Self {
        Self {
            messages: vec![message],
            alert: None,
        }
    }

    pub fn alert(text: impl Into<String>) -> Self {
        Self {
            messages: Vec::new(),
            alert: Some(text.into()),
        }
    }
}

/// Reminder conversations for all users.
pub struct Dialogue {
    pub(super) store: Store,
    pub(super) sessions: SessionMap,
    pub(super) config: DialogueConfig,
}

impl Dialogue {
    pub fn new(store: Store, config: DialogueConfig) -> Self {
        Self {
            store,
            sessions: SessionMap::new(Duration::from_secs(config.session_ttl_secs)),
            config,
        }
    }

    pub fn sessions(&self) -> &SessionMap {
        &self.sessions
    }

    /// Handle typed text: a command or menu button, else input for the active wizard step.
    pub async fn handle_text(&self, ctx: &Ctx, text: &str) -> Response {
        let result = self.route_text(ctx, text).await;
        self.recover(ctx, result)
    }

    /// Handle a decoded button press.
    pub async fn handle_action(&self, ctx: &Ctx, action: Action) -> Response {
        let result = self.route_action(ctx, action).await;
        self.recover(ctx, result)
    }

    async fn route_text(&self, ctx: &Ctx, text: &str) -> Result<Response, FlowError> {
        // Commands and menu buttons abandon any wizard in progress.
        if let Some(cmd) = Command::parse(text) {
            if let Some(session) = self.sessions.clear(ctx.user_id).await {
                debug!("user {}: {session:?} cancelled by {cmd:?}", ctx.user_id);
            }
            return commands::handle(cmd, self, ctx).await;
        }

        match self.sessions.get(ctx.user_id).await {
            Some(Session::Creating(step)) => self.creation_input(ctx, step, text).await,
            Some(Session::Editing(step)) => self.edit_input(ctx, step, text).await,
            None => Ok(Response::reply(
                ctx.reply(render::didnt_understand())
                    .with_markup(keyboards::main_menu()),
            )),
        }
    }

    async fn route_action(&self, ctx: &Ctx, action: Action) -> Result<Response, FlowError> {
        match action {
            Action::Start => self.main_menu(ctx).await,
            Action::Create => self.start_creation(ctx).await,
            Action::ListPage(page) => self.list_page(ctx, page).await,
            Action::Noop => Ok(Response::default()),
            Action::View(id) => self.view(ctx, id).await,
            Action::DeleteConfirm(id) => self.delete_confirm(ctx, id).await,
            Action::DeleteYes(id) => self.delete(ctx, id).await,
            Action::DoneNow(id) => self.complete(ctx, id, true).await,
            Action::Done(id) => self.complete(ctx, id, false).await,
            Action::SnoozeMenu(id) => self.snooze_menu(ctx, id).await,
            Action::Snooze(id, by) => self.snooze(ctx, id, by).await,
            Action::Repeat(_)
            | Action::Interval(_)
            | Action::IntervalBack
            | Action::Day(_)
            | Action::DaysDone
            | Action::DaysCancel => self.creation_action(ctx, action).await,
            Action::EditText(id) => self.begin_edit_text(ctx, id).await,
            Action::EditTime(id) => self.begin_edit_time(ctx, id).await,
            Action::EditRepeat(id) => self.repeat_menu(ctx, id).await,
            Action::EditRepeatKind(id, kind) => self.edit_repeat_kind(ctx, id, kind).await,
            Action::EditInterval(id, days) => self.edit_interval(ctx, id, days).await,
            Action::EditDay(id, day) => self.edit_day(ctx, id, day).await,
            Action::EditDaysDone(id) => self.edit_days_done(ctx, id).await,
            Action::EditDaysCancel(id) => self.edit_days_cancel(ctx, id).await,
        }
    }

    /// Turn a failed step into something the user can act on.
    fn recover(&self, ctx: &Ctx, result: Result<Response, FlowError>) -> Response {
        let err = match result {
            Ok(response) => return response,
            Err(e) => e,
        };
        let reply = |text: String| Response::reply(ctx.reply(text));
        match err {
            FlowError::Parse(e) => reply(render::bad_time(&e.0)),
            FlowError::TextEmpty => reply(render::text_empty(self.config.max_text_len)),
            FlowError::TextTooLong { len, max } => reply(render::text_too_long(len, max)),
            FlowError::NotInFuture => reply(render::not_in_future()),
            FlowError::NoDaysSelected => Response::alert(render::no_days_alert()),
            FlowError::Stale => Response::alert(render::stale_alert()),
            FlowError::NotFound(_) => Response::reply(
                ctx.reply(render::not_found())
                    .with_markup(keyboards::to_list()),
            ),
            FlowError::AccessDenied(id) => {
                warn!("user {} tried to access reminder {id}", ctx.user_id);
                reply(render::access_denied())
            }
            FlowError::Internal(e) => {
                error!("user {}: {e}", ctx.user_id);
                if ctx.callback {
                    Response::alert(render::internal_error())
                } else {
                    reply(render::internal_error())
                }
            }
        }
    }

    /// Load a reminder the requester owns.
    pub(super) async fn owned(&self, ctx: &Ctx, id: i64) -> Result<Reminder, FlowError> {
        let reminder = self
            .store
            .get(id)
            .await?
            .ok_or(FlowError::NotFound(id))?;
        if reminder.user_id != ctx.user_id {
            return Err(FlowError::AccessDenied(id));
        }
        Ok(reminder)
    }

    /// Trimmed reminder text within the length limit.
    pub(super) fn validate_text(&self, text: &str) -> Result<String, FlowError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(FlowError::TextEmpty);
        }
        let len = text.chars().count();
        let max = self.config.max_text_len;
        if len > max {
            return Err(FlowError::TextTooLong { len, max });
        }
        Ok(text.to_string())
    }

    /// Parse a time that must lie after `ctx.now`.
    pub(super) fn future_time(&self, ctx: &Ctx, text: &str) -> Result<NaiveDateTime, FlowError> {
        let time = crate::timeparse::parse(text, ctx.now)?;
        if time <= ctx.now {
            return Err(FlowError::NotInFuture);
        }
        Ok(time)
    }
}
