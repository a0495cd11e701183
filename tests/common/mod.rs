//! Common test utilities
//!
//! This module is shared across all integration tests

#![allow(dead_code)]

use serde_json::json;
use std::sync::Arc;

use filerelay::core::config::{BotConfig, ChannelTarget};
use filerelay::core::rate_limiter::RateLimiter;
use filerelay::storage::persist::RecordStore;
use filerelay::storage::registry::FileRegistry;
use filerelay::telegram::api::TelegramApi;
use filerelay::telegram::handlers::HandlerDeps;
use filerelay::telegram::update::{decode_update, IncomingCallback, IncomingMessage, InboundUpdate};
use filerelay::testing::{MemoryStore, RecordingApi};

pub const CHANNEL: &str = "relay_files";
pub const ADMIN_ID: i64 = 1000;
pub const USER_A: i64 = 555;
pub const USER_B: i64 = 777;

/// Handler dependencies wired to in-memory doubles.
pub struct TestBot {
    pub api: Arc<RecordingApi>,
    pub store: Arc<MemoryStore>,
    pub deps: HandlerDeps,
}

impl TestBot {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Builds the harness after letting `adjust` tweak the default test config.
    pub fn with_config(adjust: impl FnOnce(&mut BotConfig)) -> Self {
        let mut config = test_config();
        adjust(&mut config);

        let api = Arc::new(RecordingApi::new());
        let store = Arc::new(MemoryStore::default());
        let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit_max, config.rate_limit_window));

        let deps = HandlerDeps::new(
            Arc::new(config),
            Arc::clone(&api) as Arc<dyn TelegramApi>,
            Arc::new(FileRegistry::new()),
            rate_limiter,
            Some(Arc::clone(&store) as Arc<dyn RecordStore>),
        );

        Self { api, store, deps }
    }

    pub fn registry(&self) -> &FileRegistry {
        &self.deps.registry
    }
}

pub fn test_config() -> BotConfig {
    let mut config = BotConfig::new("123456:TEST-TOKEN", ChannelTarget::Username(CHANNEL.to_string()));
    config.admin_ids = vec![ADMIN_ID];
    config.bot_username = Some("relay_test_bot".to_string());
    config
}

fn message_json(user_id: i64, extra: serde_json::Value) -> serde_json::Value {
    let mut message = json!({
        "message_id": 1,
        "date": 1735992000,
        "from": {"id": user_id, "is_bot": false, "first_name": "Test"},
        "chat": {"id": user_id, "type": "private", "first_name": "Test"}
    });
    if let (Some(target), Some(extra)) = (message.as_object_mut(), extra.as_object()) {
        for (key, value) in extra {
            target.insert(key.clone(), value.clone());
        }
    }
    json!({"update_id": 1, "message": message})
}

pub fn decode(value: serde_json::Value) -> InboundUpdate {
    decode_update(value.to_string().as_bytes())
}

pub fn message_update(user_id: i64, extra: serde_json::Value) -> InboundUpdate {
    decode(message_json(user_id, extra))
}

pub fn message(user_id: i64, extra: serde_json::Value) -> IncomingMessage {
    match message_update(user_id, extra) {
        InboundUpdate::Message(msg) => msg,
        other => panic!("expected a message, got {:?}", other),
    }
}

/// A document message carrying `file_id` (and a unique id derived from it).
pub fn document(user_id: i64, file_id: &str) -> IncomingMessage {
    message(
        user_id,
        json!({
            "caption": "quarterly report",
            "document": {
                "file_id": file_id,
                "file_unique_id": format!("uniq-{}", file_id),
                "file_size": 2048,
                "file_name": "report.pdf"
            }
        }),
    )
}

pub fn text(user_id: i64, text: &str) -> IncomingMessage {
    message(user_id, json!({"text": text}))
}

/// A button press with `data` on message 11 of the user's private chat.
pub fn callback_update(user_id: i64, data: &str) -> InboundUpdate {
    decode(json!({
        "update_id": 2,
        "callback_query": {
            "id": format!("cb-{}-{}", user_id, data),
            "from": {"id": user_id, "is_bot": false, "first_name": "Test"},
            "chat_instance": "1",
            "data": data,
            "message": {"message_id": 11, "date": 1735992000, "chat": {"id": user_id, "type": "private"}}
        }
    }))
}

pub fn callback(user_id: i64, data: &str) -> IncomingCallback {
    match callback_update(user_id, data) {
        InboundUpdate::Callback(cb) => cb,
        other => panic!("expected a callback, got {:?}", other),
    }
}
