//! Slash commands and menu buttons. Both arrive as plain text.


use crate::dialogue::{Ctx, Dialogue, FlowError, Response};
use crate::keyboards::{BTN_CREATE, BTN_HELP, BTN_LIST, BTN_RECURRING, BTN_UPCOMING};

/// Known bot commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    List,
    Upcoming,
    Repeating,
    Create,
}

impl Command {
    /// Parse a command or a menu button label. Returns `None` for anything else,
    /// which is then treated as wizard input.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        match text {
            BTN_CREATE => return Some(Self::Create),
            BTN_LIST => return Some(Self::List),
            BTN_UPCOMING => return Some(Self::Upcoming),
            BTN_RECURRING => return Some(Self::Repeating),
            BTN_HELP => return Some(Self::Help),
            _ => {}
        }

        let first = text.split_whitespace().next()?;
        // Strip @botname suffix (e.g. "/help@nudge_bot" → "/help").
        let cmd = first.split('@').next().unwrap_or(first);
        match cmd {
            "/start" => Some(Self::Start),
            "/help" => Some(Self::Help),
            "/list" | "/reminders" => Some(Self::List),
            "/upcoming" => Some(Self::Upcoming),
            "/repeating" => Some(Self::Repeating),
            _ => None,
        }
    }
}

/// Handle a command and return the reply.
pub async fn handle(cmd: Command, dialogue: &Dialogue, ctx: &Ctx) -> Result<Response, FlowError> {
    match cmd {
        Command::Start => dialogue.welcome(ctx).await,
        Command::Help => dialogue.help(ctx).await,
        Command::List => dialogue.list_page(ctx, 0).await,
        Command::Upcoming => dialogue.upcoming(ctx).await,
        Command::Repeating => dialogue.series(ctx).await,
        Command::Create => dialogue.start_creation(ctx).await,
    }
}
