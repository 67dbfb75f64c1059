//! # nudge-channels
//!
//! Messaging platform integrations for nudge.

pub mod telegram;

pub use telegram::TelegramChannel;
