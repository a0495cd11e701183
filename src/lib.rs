//! filerelay - Telegram bot that relays files to a channel and hands back share links
//!
//! # Module Structure
//!
//! - `core`: configuration, errors, logging, rate limiting and the HTTP server
//! - `storage`: the file registry, its optional Redis mirror, and the REST file store
//! - `telegram`: Bot API client, update decoding, workflows and the webhook
//! - `testing`: in-memory doubles shared by unit and integration tests

pub mod cli;
pub mod core;
pub mod storage;
pub mod telegram;
pub mod testing;

// Re-export commonly used types for convenience
pub use crate::core::{config, AppError, AppResult, BotConfig};
pub use crate::storage::{FileRegistry, UploadRecord};
pub use crate::telegram::{handle_update, HandlerDeps};
