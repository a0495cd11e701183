//! Core utilities, configuration, and common functionality

pub mod config;
pub mod error;
pub mod files_api;
pub mod logging;
pub mod rate_limiter;
pub mod web_server;

// Re-exports for convenience
pub use config::BotConfig;
pub use error::{AppError, AppResult};
pub use logging::{init_logger, log_startup_configuration};
