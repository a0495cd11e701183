//! File registry, its optional mirror, and the REST file store

pub mod files;
pub mod persist;
pub mod registry;

// Re-exports for convenience
pub use files::{FileStore, StorageStats, StoredFile};
pub use persist::{RecordStore, RedisStore};
pub use registry::{FileKind, FileRegistry, UploadRecord};
