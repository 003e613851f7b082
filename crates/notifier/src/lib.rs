//! Alert delivery
//!
//! Formats opportunities into push messages and hands them to a sink:
//! Telegram when credentials are configured, the log otherwise.

pub mod format;
pub mod sink;
pub mod telegram;

pub use format::alert_message;
pub use sink::{AlertSink, LogSink, Notifier};
pub use telegram::{TelegramConfig, TelegramSink};
