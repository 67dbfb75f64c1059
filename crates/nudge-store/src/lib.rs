//! # nudge-store
//!
//! Reminder model and the SQLite-backed reminder store.

pub mod reminder;
pub mod store;

pub use reminder::{
    DaySet, DeliveryOutcome, DeliveryReport, NewReminder, Reminder, ReminderUpdate, RepeatKind,
    RepeatSpec, TIME_FORMAT,
};
pub use store::Store;
