//! In-process registry of files relayed to the channel
//!
//! Maps a channel message id to the metadata recorded when the file was
//! forwarded. Records are immutable once inserted and disappear on deletion,
//! on a retention sweep, or when the process restarts (unless a
//! [`RecordStore`](super::persist::RecordStore) mirror reloads them).

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use strum::{AsRefStr, Display, EnumString};

/// Kind of attachment, which also selects the Bot API send method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FileKind {
    Document,
    Photo,
    Video,
    Audio,
    Voice,
}

impl FileKind {
    /// Bot API method used to (re-)send a file of this kind.
    pub fn send_method(self) -> &'static str {
        match self {
            FileKind::Document => "sendDocument",
            FileKind::Photo => "sendPhoto",
            FileKind::Video => "sendVideo",
            FileKind::Audio => "sendAudio",
            FileKind::Voice => "sendVoice",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            FileKind::Document => "📄",
            FileKind::Photo => "🖼",
            FileKind::Video => "🎬",
            FileKind::Audio => "🎵",
            FileKind::Voice => "🎙",
        }
    }
}

/// One file relayed to the channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadRecord {
    /// Id of the message in the destination channel (registry key)
    pub channel_message_id: i32,
    /// Telegram file_id; a reference, never the content
    pub file_id: String,
    /// Telegram file_unique_id, only used for de-duplication
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_unique_id: Option<String>,
    pub file_type: FileKind,
    /// Telegram id of the user who submitted the file
    pub owner_id: i64,
    pub uploaded_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
}

impl UploadRecord {
    /// Whether `user_id` may delete this record, given the admin flag.
    pub fn can_be_deleted_by(&self, user_id: i64, is_admin: bool) -> bool {
        is_admin || self.owner_id == user_id
    }

    /// Short label for listings: file name, caption, or the kind.
    pub fn label(&self) -> String {
        self.file_name
            .clone()
            .or_else(|| self.caption.clone())
            .unwrap_or_else(|| self.file_type.to_string())
    }
}

/// Concurrent map from channel message id to [`UploadRecord`].
///
/// Every operation locks only the shard holding the key, so read-modify-write
/// sequences on one id are serialized while unrelated ids proceed in parallel.
#[derive(Debug, Default)]
pub struct FileRegistry {
    records: DashMap<i32, UploadRecord>,
}

impl FileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a record, returning the one it displaced (only if Telegram reused an id).
    pub fn insert(&self, record: UploadRecord) -> Option<UploadRecord> {
        self.records.insert(record.channel_message_id, record)
    }

    pub fn get(&self, channel_message_id: i32) -> Option<UploadRecord> {
        self.records.get(&channel_message_id).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, channel_message_id: i32) -> bool {
        self.records.contains_key(&channel_message_id)
    }

    pub fn remove(&self, channel_message_id: i32) -> Option<UploadRecord> {
        self.records.remove(&channel_message_id).map(|(_, record)| record)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Removes every record, returning how many were dropped.
    pub fn clear(&self) -> usize {
        let count = self.records.len();
        self.records.clear();
        count
    }

    /// Records submitted by `owner_id`, newest first.
    pub fn by_owner(&self, owner_id: i64) -> Vec<UploadRecord> {
        let mut records: Vec<UploadRecord> = self
            .records
            .iter()
            .filter(|entry| entry.owner_id == owner_id)
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by(|a, b| {
            b.uploaded_at
                .cmp(&a.uploaded_at)
                .then(b.channel_message_id.cmp(&a.channel_message_id))
        });
        records
    }

    /// Existing record of the same content submitted by the same owner.
    pub fn find_duplicate(&self, owner_id: i64, file_unique_id: &str) -> Option<UploadRecord> {
        self.records
            .iter()
            .find(|entry| entry.owner_id == owner_id && entry.file_unique_id.as_deref() == Some(file_unique_id))
            .map(|entry| entry.value().clone())
    }

    /// Distinct owners, ascending.
    pub fn owners(&self) -> Vec<i64> {
        let mut owners: Vec<i64> = self.records.iter().map(|entry| entry.owner_id).collect();
        owners.sort_unstable();
        owners.dedup();
        owners
    }

    /// Total declared size of all records.
    pub fn total_size(&self) -> u64 {
        self.records.iter().filter_map(|entry| entry.file_size).sum()
    }

    /// Removes records uploaded more than `max_age` before `now`.
    ///
    /// Returns the removed ids. Each removal re-checks the record under its
    /// shard lock, so a concurrent re-insert of the same id is never dropped.
    pub fn sweep_older_than(&self, now: DateTime<Utc>, max_age: Duration) -> Vec<i32> {
        let Ok(max_age) = chrono::Duration::from_std(max_age) else {
            return Vec::new();
        };
        let cutoff = now - max_age;

        let expired: Vec<i32> = self
            .records
            .iter()
            .filter(|entry| entry.uploaded_at < cutoff)
            .map(|entry| *entry.key())
            .collect();

        expired
            .into_iter()
            .filter(|id| self.records.remove_if(id, |_, record| record.uploaded_at < cutoff).is_some())
            .collect()
    }
}
