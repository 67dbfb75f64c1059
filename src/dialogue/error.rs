use crate::timeparse::ParseError;
use nudge_core::error::NudgeError;
use thiserror::Error;

/// Why a conversation step could not be completed.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("reminder text is empty")]
    TextEmpty,

    #[error("reminder text has {len} characters, limit is {max}")]
    TextTooLong { len: usize, max: usize },

    #[error("time is not in the future")]
    NotInFuture,

    #[error("no weekday selected")]
    NoDaysSelected,

    /// The button belongs to a wizard step that is no longer active.
    #[error("wizard step is no longer active")]
    Stale,

    #[error("reminder {0} not found")]
    NotFound(i64),

    #[error("reminder {0} belongs to another user")]
    AccessDenied(i64),

    #[error(transparent)]
    Internal(#[from] NudgeError),
}
