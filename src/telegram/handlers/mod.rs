//! Update handlers
//!
//! Each workflow takes [`HandlerDeps`] and a decoded update and returns an
//! outcome describing what it did, so the webhook and the tests drive exactly
//! the same code.

pub mod commands;
pub mod deletion;
mod dispatch;
mod types;
pub mod uploads;

pub use commands::CommandOutcome;
pub use deletion::DeleteOutcome;
pub use dispatch::handle_update;
pub use types::HandlerDeps;
pub use uploads::UploadOutcome;
