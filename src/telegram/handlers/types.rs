//! Handler dependencies and shared reply helpers

use std::sync::Arc;

use chrono::{DateTime, Utc};
use teloxide::types::InlineKeyboardMarkup;

use crate::core::config::BotConfig;
use crate::core::rate_limiter::RateLimiter;
use crate::storage::persist::RecordStore;
use crate::storage::registry::FileRegistry;
use crate::telegram::api::TelegramApi;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub config: Arc<BotConfig>,
    pub api: Arc<dyn TelegramApi>,
    pub registry: Arc<FileRegistry>,
    pub rate_limiter: Arc<RateLimiter>,
    pub store: Option<Arc<dyn RecordStore>>,
    pub bot_username: Option<String>,
    pub started_at: DateTime<Utc>,
}

impl HandlerDeps {
    /// Create new handler dependencies
    pub fn new(
        config: Arc<BotConfig>,
        api: Arc<dyn TelegramApi>,
        registry: Arc<FileRegistry>,
        rate_limiter: Arc<RateLimiter>,
        store: Option<Arc<dyn RecordStore>>,
    ) -> Self {
        let bot_username = config.bot_username.clone();
        Self {
            config,
            api,
            registry,
            rate_limiter,
            store,
            bot_username,
            started_at: Utc::now(),
        }
    }

    /// Overrides the username used for links and command mentions.
    pub fn with_bot_username(mut self, username: Option<String>) -> Self {
        if username.is_some() {
            self.bot_username = username;
        }
        self
    }

    pub fn store(&self) -> Option<&dyn RecordStore> {
        self.store.as_deref()
    }

    pub fn is_admin(&self, user_id: i64) -> bool {
        self.config.is_admin(user_id)
    }

    /// Sends a reply, logging instead of failing when Telegram rejects it.
    pub async fn reply(&self, chat_id: i64, text: &str) {
        self.reply_with(chat_id, text, None).await;
    }

    pub async fn reply_with(&self, chat_id: i64, text: &str, keyboard: Option<InlineKeyboardMarkup>) -> Option<i32> {
        match self.api.send_message(chat_id, text, keyboard).await {
            Ok(id) => Some(id),
            Err(e) => {
                log::error!("Failed to send reply to chat {}: {}", chat_id, e);
                None
            }
        }
    }

    /// Answers a callback query; a stale query id is only worth a debug line.
    pub async fn answer(&self, callback_id: &str, text: Option<&str>) {
        if let Err(e) = self.api.answer_callback_query(callback_id, text).await {
            log::debug!("Failed to answer callback {}: {}", callback_id, e);
        }
    }
}
