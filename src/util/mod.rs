//! Shared helpers

pub mod bot_log;
pub mod time;

pub use bot_log::BotLog;
