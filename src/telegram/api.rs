//! Outbound Bot API calls
//!
//! Workflows talk to Telegram only through [`TelegramApi`], so they can run
//! against [`BotApi`] in production and against a recording double in tests.

use async_trait::async_trait;
use reqwest::ClientBuilder;
use secrecy::ExposeSecret;
use teloxide::prelude::*;
use teloxide::types::{
    CallbackQueryId, ChatAction, FileId, InlineKeyboardMarkup, InputFile, MessageId, Recipient,
};
use teloxide::utils::command::BotCommands;
use teloxide::RequestError;

use crate::core::config::{network, BotConfig, ChannelTarget};
use crate::core::error::{AppError, AppResult};
use crate::storage::registry::FileKind;
use crate::telegram::bot::Command;

/// The subset of the Bot API used by the bot.
///
/// Message and chat ids are plain integers; the channel is addressed through
/// [`ChannelTarget`]. Every method resolves to `Err` on transport failure or
/// on a response with `ok: false`.
#[async_trait]
pub trait TelegramApi: Send + Sync {
    /// `sendMessage`; returns the new message id.
    async fn send_message(&self, chat_id: i64, text: &str, keyboard: Option<InlineKeyboardMarkup>) -> AppResult<i32>;

    /// `sendDocument` / `sendPhoto` / `sendVideo` / `sendAudio` / `sendVoice` into the channel;
    /// returns the channel message id.
    async fn send_file(
        &self,
        channel: &ChannelTarget,
        kind: FileKind,
        file_id: &str,
        caption: Option<&str>,
    ) -> AppResult<i32>;

    /// `editMessageText`
    async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i32,
        text: &str,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> AppResult<()>;

    /// `deleteMessage` in the channel
    async fn delete_message(&self, channel: &ChannelTarget, message_id: i32) -> AppResult<()>;

    /// `answerCallbackQuery`, optionally with a toast text
    async fn answer_callback_query(&self, callback_id: &str, text: Option<&str>) -> AppResult<()>;

    /// `sendChatAction` with the upload action matching `kind`
    async fn send_upload_action(&self, chat_id: i64, kind: FileKind) -> AppResult<()>;

    /// `getChat` on the channel, used to verify the bot can reach it
    async fn verify_channel(&self, channel: &ChannelTarget) -> AppResult<()>;

    /// `setWebhook`
    async fn set_webhook(&self, url: &str, secret: Option<&str>) -> AppResult<()>;

    /// `deleteWebhook`
    async fn delete_webhook(&self) -> AppResult<()>;

    /// `getMe`; returns the bot username if it has one
    async fn get_me_username(&self) -> AppResult<Option<String>>;
}

/// Maps a teloxide error into [`AppError`], keeping the method name for API rejections.
fn api_error(method: &'static str) -> impl FnOnce(RequestError) -> AppError {
    move |err| match err {
        RequestError::Api(api) => AppError::Api {
            method,
            description: api.to_string(),
        },
        other => AppError::Telegram(other),
    }
}

pub fn recipient(channel: &ChannelTarget) -> Recipient {
    match channel {
        ChannelTarget::Username(name) => Recipient::ChannelUsername(format!("@{}", name)),
        ChannelTarget::Id(id) => Recipient::Id(ChatId(*id)),
    }
}

fn upload_action(kind: FileKind) -> ChatAction {
    match kind {
        FileKind::Document => ChatAction::UploadDocument,
        FileKind::Photo => ChatAction::UploadPhoto,
        FileKind::Video => ChatAction::UploadVideo,
        FileKind::Audio | FileKind::Voice => ChatAction::UploadVoice,
    }
}

/// [`TelegramApi`] backed by teloxide.
///
/// Holds two bots sharing one token: `control` with a short timeout for
/// messages, edits and deletions, and `transfer` with a longer one for the
/// file send methods.
#[derive(Clone)]
pub struct BotApi {
    control: Bot,
    transfer: Bot,
}

impl BotApi {
    /// Creates the client pair from configuration, honoring `BOT_API_URL`.
    pub fn new(config: &BotConfig) -> AppResult<Self> {
        let token = config.bot_token.expose_secret();
        let mut control = Bot::with_client(
            token,
            ClientBuilder::new().timeout(network::control_timeout()).build()?,
        );
        let mut transfer = Bot::with_client(
            token,
            ClientBuilder::new().timeout(network::transfer_timeout()).build()?,
        );

        if let Some(ref api_url) = config.bot_api_url {
            log::info!("Using custom Bot API URL: {}", api_url);
            let url = url::Url::parse(api_url)?;
            control = control.set_api_url(url.clone());
            transfer = transfer.set_api_url(url);
        }

        Ok(Self { control, transfer })
    }

    /// Wraps existing bots (used to point the client at a mock server).
    pub fn from_bots(control: Bot, transfer: Bot) -> Self {
        Self { control, transfer }
    }

    /// Publishes the command list shown in Telegram's UI.
    pub async fn setup_bot_commands(&self) -> AppResult<()> {
        self.control
            .set_my_commands(Command::bot_commands())
            .await
            .map_err(api_error("setMyCommands"))?;
        Ok(())
    }
}

#[async_trait]
impl TelegramApi for BotApi {
    async fn send_message(&self, chat_id: i64, text: &str, keyboard: Option<InlineKeyboardMarkup>) -> AppResult<i32> {
        let mut request = self.control.send_message(ChatId(chat_id), text);
        if let Some(keyboard) = keyboard {
            request = request.reply_markup(keyboard);
        }
        let message = request.await.map_err(api_error("sendMessage"))?;
        Ok(message.id.0)
    }

    async fn send_file(
        &self,
        channel: &ChannelTarget,
        kind: FileKind,
        file_id: &str,
        caption: Option<&str>,
    ) -> AppResult<i32> {
        let to = recipient(channel);
        let input = InputFile::file_id(FileId(file_id.to_string()));
        let caption = caption.map(str::to_string);

        let sent = match kind {
            FileKind::Document => {
                let mut request = self.transfer.send_document(to, input);
                if let Some(caption) = caption {
                    request = request.caption(caption);
                }
                request.await
            }
            FileKind::Photo => {
                let mut request = self.transfer.send_photo(to, input);
                if let Some(caption) = caption {
                    request = request.caption(caption);
                }
                request.await
            }
            FileKind::Video => {
                let mut request = self.transfer.send_video(to, input);
                if let Some(caption) = caption {
                    request = request.caption(caption);
                }
                request.await
            }
            FileKind::Audio => {
                let mut request = self.transfer.send_audio(to, input);
                if let Some(caption) = caption {
                    request = request.caption(caption);
                }
                request.await
            }
            FileKind::Voice => {
                let mut request = self.transfer.send_voice(to, input);
                if let Some(caption) = caption {
                    request = request.caption(caption);
                }
                request.await
            }
        }
        .map_err(api_error(kind.send_method()))?;

        Ok(sent.id.0)
    }

    async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i32,
        text: &str,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> AppResult<()> {
        let mut request = self
            .control
            .edit_message_text(ChatId(chat_id), MessageId(message_id), text);
        if let Some(keyboard) = keyboard {
            request = request.reply_markup(keyboard);
        }
        request.await.map_err(api_error("editMessageText"))?;
        Ok(())
    }

    async fn delete_message(&self, channel: &ChannelTarget, message_id: i32) -> AppResult<()> {
        self.control
            .delete_message(recipient(channel), MessageId(message_id))
            .await
            .map_err(api_error("deleteMessage"))?;
        Ok(())
    }

    async fn answer_callback_query(&self, callback_id: &str, text: Option<&str>) -> AppResult<()> {
        let mut request = self
            .control
            .answer_callback_query(CallbackQueryId(callback_id.to_string()));
        if let Some(text) = text {
            request = request.text(text);
        }
        request.await.map_err(api_error("answerCallbackQuery"))?;
        Ok(())
    }

    async fn send_upload_action(&self, chat_id: i64, kind: FileKind) -> AppResult<()> {
        self.control
            .send_chat_action(ChatId(chat_id), upload_action(kind))
            .await
            .map_err(api_error("sendChatAction"))?;
        Ok(())
    }

    async fn verify_channel(&self, channel: &ChannelTarget) -> AppResult<()> {
        self.control
            .get_chat(recipient(channel))
            .await
            .map_err(api_error("getChat"))?;
        Ok(())
    }

    async fn set_webhook(&self, url: &str, secret: Option<&str>) -> AppResult<()> {
        let url = url::Url::parse(url)?;
        let mut request = self.control.set_webhook(url);
        if let Some(secret) = secret {
            request = request.secret_token(secret);
        }
        request.await.map_err(api_error("setWebhook"))?;
        Ok(())
    }

    async fn delete_webhook(&self) -> AppResult<()> {
        self.control.delete_webhook().await.map_err(api_error("deleteWebhook"))?;
        Ok(())
    }

    async fn get_me_username(&self) -> AppResult<Option<String>> {
        let me = self.control.get_me().await.map_err(api_error("getMe"))?;
        Ok(me.username.clone())
    }
}
