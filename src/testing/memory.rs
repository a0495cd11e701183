//! Record mirror kept in a map, with the same key layout as Redis

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use crate::core::error::{AppError, AppResult};
use crate::storage::persist::{record_key, RecordStore};
use crate::storage::registry::UploadRecord;

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
    unavailable: Mutex<bool>,
}

impl MemoryStore {
    fn entries(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Stored keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.entries().keys().cloned().collect()
    }

    /// Raw JSON stored under `key`.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries().get(key).cloned()
    }

    /// Makes every operation fail, as for an unreachable server.
    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = unavailable;
    }

    fn check(&self) -> AppResult<()> {
        if *self.unavailable.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) {
            return Err(AppError::Validation("record store unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn save(&self, record: &UploadRecord) -> AppResult<()> {
        self.check()?;
        let value = serde_json::to_string(record)?;
        self.entries().insert(record_key(record.channel_message_id), value);
        Ok(())
    }

    async fn remove(&self, channel_message_id: i32) -> AppResult<()> {
        self.check()?;
        self.entries().remove(&record_key(channel_message_id));
        Ok(())
    }

    async fn clear(&self) -> AppResult<usize> {
        self.check()?;
        let mut entries = self.entries();
        let count = entries.len();
        entries.clear();
        Ok(count)
    }

    async fn load_all(&self) -> AppResult<Vec<UploadRecord>> {
        self.check()?;
        let raw: Vec<String> = self.entries().values().cloned().collect();
        raw.iter()
            .map(|value| serde_json::from_str(value).map_err(AppError::from))
            .collect()
    }
}
