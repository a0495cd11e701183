//! Bot API double that records calls instead of performing them

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Mutex, MutexGuard};
use teloxide::types::InlineKeyboardMarkup;

use crate::core::config::ChannelTarget;
use crate::core::error::{AppError, AppResult};
use crate::storage::registry::FileKind;
use crate::telegram::api::TelegramApi;

/// One recorded Bot API call.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    SendMessage {
        chat_id: i64,
        text: String,
        keyboard: Option<InlineKeyboardMarkup>,
    },
    SendFile {
        channel: ChannelTarget,
        kind: FileKind,
        file_id: String,
        caption: Option<String>,
    },
    EditMessageText {
        chat_id: i64,
        message_id: i32,
        text: String,
        keyboard: Option<InlineKeyboardMarkup>,
    },
    DeleteMessage {
        channel: ChannelTarget,
        message_id: i32,
    },
    AnswerCallbackQuery {
        callback_id: String,
        text: Option<String>,
    },
    SendChatAction {
        chat_id: i64,
        kind: FileKind,
    },
    GetChat {
        channel: ChannelTarget,
    },
    SetWebhook {
        url: String,
        secret: Option<String>,
    },
    DeleteWebhook,
    GetMe,
}

impl ApiCall {
    /// Bot API method name of the call.
    pub fn method(&self) -> &'static str {
        match self {
            ApiCall::SendMessage { .. } => "sendMessage",
            ApiCall::SendFile { kind, .. } => kind.send_method(),
            ApiCall::EditMessageText { .. } => "editMessageText",
            ApiCall::DeleteMessage { .. } => "deleteMessage",
            ApiCall::AnswerCallbackQuery { .. } => "answerCallbackQuery",
            ApiCall::SendChatAction { .. } => "sendChatAction",
            ApiCall::GetChat { .. } => "getChat",
            ApiCall::SetWebhook { .. } => "setWebhook",
            ApiCall::DeleteWebhook => "deleteWebhook",
            ApiCall::GetMe => "getMe",
        }
    }
}

/// [`TelegramApi`] that records calls and answers them locally.
///
/// Message ids are handed out sequentially starting at 100. Any method can be
/// made to fail with [`fail_on`](Self::fail_on); `sendMessage` can also fail
/// for individual chats.
#[derive(Debug)]
pub struct RecordingApi {
    calls: Mutex<Vec<ApiCall>>,
    failing_methods: Mutex<HashSet<&'static str>>,
    unreachable_chats: Mutex<HashSet<i64>>,
    next_message_id: AtomicI32,
    username: Option<String>,
}

impl Default for RecordingApi {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failing_methods: Mutex::new(HashSet::new()),
            unreachable_chats: Mutex::new(HashSet::new()),
            next_message_id: AtomicI32::new(100),
            username: Some("relay_test_bot".to_string()),
        }
    }
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl RecordingApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call to `method` (e.g. `"sendDocument"`) fail from now on.
    pub fn fail_on(&self, method: &'static str) {
        locked(&self.failing_methods).insert(method);
    }

    /// Lets `method` succeed again.
    pub fn recover(&self, method: &'static str) {
        locked(&self.failing_methods).remove(method);
    }

    /// Makes `sendMessage` to `chat_id` fail, as for a user who blocked the bot.
    pub fn block_chat(&self, chat_id: i64) {
        locked(&self.unreachable_chats).insert(chat_id);
    }

    /// Sets the id the next message-creating call returns.
    pub fn set_next_message_id(&self, id: i32) {
        self.next_message_id.store(id, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        locked(&self.calls).clone()
    }

    pub fn calls_to(&self, method: &str) -> Vec<ApiCall> {
        self.calls().into_iter().filter(|call| call.method() == method).collect()
    }

    pub fn count(&self, method: &str) -> usize {
        self.calls_to(method).len()
    }

    /// Texts of all `sendMessage` calls to `chat_id`, in order.
    pub fn messages_to(&self, chat_id: i64) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ApiCall::SendMessage { chat_id: to, text, .. } if to == chat_id => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn last_message_to(&self, chat_id: i64) -> Option<String> {
        self.messages_to(chat_id).pop()
    }

    pub fn clear(&self) {
        locked(&self.calls).clear();
    }

    fn record(&self, call: ApiCall) -> AppResult<()> {
        let method = call.method();
        let blocked_chat = match &call {
            ApiCall::SendMessage { chat_id, .. } => locked(&self.unreachable_chats).contains(chat_id),
            _ => false,
        };
        locked(&self.calls).push(call);

        if blocked_chat {
            return Err(AppError::Api {
                method,
                description: "Forbidden: bot was blocked by the user".to_string(),
            });
        }
        if locked(&self.failing_methods).contains(method) {
            return Err(AppError::Api {
                method,
                description: "Bad Request: injected failure".to_string(),
            });
        }
        Ok(())
    }

    fn next_id(&self) -> i32 {
        self.next_message_id.fetch_add(1, Ordering::SeqCst)
    }
}

#[async_trait]
impl TelegramApi for RecordingApi {
    async fn send_message(&self, chat_id: i64, text: &str, keyboard: Option<InlineKeyboardMarkup>) -> AppResult<i32> {
        self.record(ApiCall::SendMessage {
            chat_id,
            text: text.to_string(),
            keyboard,
        })?;
        Ok(self.next_id())
    }

    async fn send_file(
        &self,
        channel: &ChannelTarget,
        kind: FileKind,
        file_id: &str,
        caption: Option<&str>,
    ) -> AppResult<i32> {
        self.record(ApiCall::SendFile {
            channel: channel.clone(),
            kind,
            file_id: file_id.to_string(),
            caption: caption.map(str::to_string),
        })?;
        Ok(self.next_id())
    }

    async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i32,
        text: &str,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> AppResult<()> {
        self.record(ApiCall::EditMessageText {
            chat_id,
            message_id,
            text: text.to_string(),
            keyboard,
        })
    }

    async fn delete_message(&self, channel: &ChannelTarget, message_id: i32) -> AppResult<()> {
        self.record(ApiCall::DeleteMessage {
            channel: channel.clone(),
            message_id,
        })
    }

    async fn answer_callback_query(&self, callback_id: &str, text: Option<&str>) -> AppResult<()> {
        self.record(ApiCall::AnswerCallbackQuery {
            callback_id: callback_id.to_string(),
            text: text.map(str::to_string),
        })
    }

    async fn send_upload_action(&self, chat_id: i64, kind: FileKind) -> AppResult<()> {
        self.record(ApiCall::SendChatAction { chat_id, kind })
    }

    async fn verify_channel(&self, channel: &ChannelTarget) -> AppResult<()> {
        self.record(ApiCall::GetChat {
            channel: channel.clone(),
        })
    }

    async fn set_webhook(&self, url: &str, secret: Option<&str>) -> AppResult<()> {
        self.record(ApiCall::SetWebhook {
            url: url.to_string(),
            secret: secret.map(str::to_string),
        })
    }

    async fn delete_webhook(&self) -> AppResult<()> {
        self.record(ApiCall::DeleteWebhook)
    }

    async fn get_me_username(&self) -> AppResult<Option<String>> {
        self.record(ApiCall::GetMe)?;
        Ok(self.username.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_and_numbers_messages() {
        let api = RecordingApi::new();
        let first = api.send_message(1, "hi", None).await.unwrap();
        let second = api.send_message(1, "again", None).await.unwrap();

        assert_eq!(second, first + 1);
        assert_eq!(api.messages_to(1), vec!["hi".to_string(), "again".to_string()]);
        assert_eq!(api.count("sendMessage"), 2);
    }

    #[tokio::test]
    async fn test_injected_failures_are_still_recorded() {
        let api = RecordingApi::new();
        let channel = ChannelTarget::Username("files".to_string());
        api.fail_on("sendVideo");

        let err = api.send_file(&channel, FileKind::Video, "v", None).await.unwrap_err();
        assert_eq!(err.api_method(), Some("sendVideo"));
        assert_eq!(api.count("sendVideo"), 1);

        api.recover("sendVideo");
        assert!(api.send_file(&channel, FileKind::Video, "v", None).await.is_ok());
    }

    #[tokio::test]
    async fn test_blocked_chat() {
        let api = RecordingApi::new();
        api.block_chat(7);
        assert!(api.send_message(7, "x", None).await.is_err());
        assert!(api.send_message(8, "x", None).await.is_ok());
    }
}
