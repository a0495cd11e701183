//! Telegram bot integration and handlers

pub mod api;
pub mod bot;
pub mod handlers;
pub mod keyboards;
pub mod update;
pub mod webhook;

// Re-exports for convenience
pub use api::{BotApi, TelegramApi};
pub use bot::Command;
pub use handlers::{handle_update, HandlerDeps};
pub use update::{decode_update, InboundUpdate};
