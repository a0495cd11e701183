//! Optional key-value mirror of the file registry
//!
//! The registry stays the source of truth for every request; the mirror only
//! lets records survive a restart. Layout: `file_{channel_message_id}` →
//! [`UploadRecord`] as JSON.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use std::sync::Arc;
use std::time::Duration;

use super::registry::{FileRegistry, UploadRecord};
use crate::core::error::AppResult;

const KEY_PREFIX: &str = "file_";
const SCAN_BATCH: usize = 200;

/// Storage key of a record.
pub fn record_key(channel_message_id: i32) -> String {
    format!("{}{}", KEY_PREFIX, channel_message_id)
}

/// Backing store the registry is mirrored into.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn save(&self, record: &UploadRecord) -> AppResult<()>;
    async fn remove(&self, channel_message_id: i32) -> AppResult<()>;
    async fn clear(&self) -> AppResult<usize>;
    async fn load_all(&self) -> AppResult<Vec<UploadRecord>>;
}

/// Redis-backed [`RecordStore`].
#[derive(Clone)]
pub struct RedisStore {
    conn: redis::aio::MultiplexedConnection,
}

impl RedisStore {
    pub async fn connect(url: &str) -> AppResult<Self> {
        let client = redis::Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(Self { conn })
    }

    /// Every mirrored key, walked with SCAN so the server is never blocked.
    async fn keys(&self) -> AppResult<Vec<String>> {
        let mut conn = self.conn.clone();
        let pattern = format!("{}*", KEY_PREFIX);
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        // SCAN may repeat keys across batches.
        keys.sort_unstable();
        keys.dedup();
        Ok(keys)
    }
}

#[async_trait]
impl RecordStore for RedisStore {
    async fn save(&self, record: &UploadRecord) -> AppResult<()> {
        let mut conn = self.conn.clone();
        let value = serde_json::to_string(record)?;
        let _: () = conn.set(record_key(record.channel_message_id), value).await?;
        Ok(())
    }

    async fn remove(&self, channel_message_id: i32) -> AppResult<()> {
        let mut conn = self.conn.clone();
        let _: usize = conn.del(record_key(channel_message_id)).await?;
        Ok(())
    }

    async fn clear(&self) -> AppResult<usize> {
        let keys = self.keys().await?;
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn.clone();
        let removed: usize = conn.del(keys).await?;
        Ok(removed)
    }

    async fn load_all(&self) -> AppResult<Vec<UploadRecord>> {
        let mut records = Vec::new();
        let mut conn = self.conn.clone();
        for key in self.keys().await? {
            let raw: Option<String> = conn.get(&key).await?;
            let Some(raw) = raw else { continue };
            match decode_record(&raw) {
                Ok(record) => records.push(record),
                Err(e) => log::warn!("Skipping unreadable mirror entry {}: {}", key, e),
            }
        }
        Ok(records)
    }
}

fn decode_record(raw: &str) -> AppResult<UploadRecord> {
    Ok(serde_json::from_str(raw)?)
}

/// Loads every mirrored record into the registry. Returns how many were restored.
pub async fn restore_registry(store: &dyn RecordStore, registry: &FileRegistry) -> AppResult<usize> {
    let records = store.load_all().await?;
    let count = records.len();
    for record in records {
        registry.insert(record);
    }
    Ok(count)
}

/// Best-effort mirror helpers: failures are logged, never propagated.
pub async fn mirror_save(store: Option<&dyn RecordStore>, record: &UploadRecord) {
    if let Some(store) = store {
        if let Err(e) = store.save(record).await {
            log::warn!(
                "Failed to mirror record {}: {}",
                record_key(record.channel_message_id),
                e
            );
        }
    }
}

pub async fn mirror_remove(store: Option<&dyn RecordStore>, channel_message_id: i32) {
    if let Some(store) = store {
        if let Err(e) = store.remove(channel_message_id).await {
            log::warn!("Failed to drop mirrored {}: {}", record_key(channel_message_id), e);
        }
    }
}

pub async fn mirror_clear(store: Option<&dyn RecordStore>) {
    if let Some(store) = store {
        match store.clear().await {
            Ok(count) => log::info!("Cleared {} mirrored records", count),
            Err(e) => log::warn!("Failed to clear record mirror: {}", e),
        }
    }
}

/// Drops records older than `retention` from the registry and the mirror.
pub async fn sweep_expired(
    registry: &FileRegistry,
    store: Option<&dyn RecordStore>,
    now: DateTime<Utc>,
    retention: Duration,
) -> Vec<i32> {
    let removed = registry.sweep_older_than(now, retention);
    for &id in &removed {
        mirror_remove(store, id).await;
    }
    removed
}

/// Spawns the periodic retention sweep.
pub fn spawn_retention_sweep(
    registry: Arc<FileRegistry>,
    store: Option<Arc<dyn RecordStore>>,
    retention: Duration,
    every: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let removed = sweep_expired(&registry, store.as_deref(), Utc::now(), retention).await;
            if !removed.is_empty() {
                log::info!("Retention sweep removed {} uploads", removed.len());
            }
        }
    })
}
