//! In-memory doubles for the bot's external collaborators
//!
//! [`RecordingApi`] stands in for the Bot API and records every call it
//! receives; [`MemoryStore`] stands in for the Redis mirror. Both are used by
//! unit tests and by the integration tests under `tests/`.
//!
//! ```rust
//! use filerelay::testing::RecordingApi;
//!
//! let api = RecordingApi::new();
//! api.fail_on("deleteMessage");
//! ```

pub mod memory;
pub mod recorder;

pub use memory::MemoryStore;
pub use recorder::{ApiCall, RecordingApi};
