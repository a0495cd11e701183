//! Inbound webhook payloads
//!
//! The JSON body posted by Telegram is decoded once, here, into a closed set
//! of variants. Handlers match on [`InboundUpdate`] and [`Attachment`]
//! instead of probing for keys.

use serde::Deserialize;

use crate::storage::registry::FileKind;

#[derive(Debug, Clone, Deserialize)]
struct RawUpdate {
    #[serde(default)]
    update_id: i64,
    message: Option<RawMessage>,
    callback_query: Option<RawCallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawUser {
    id: i64,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    first_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawChat {
    id: i64,
}

#[derive(Debug, Clone, Deserialize)]
struct RawFile {
    file_id: String,
    #[serde(default)]
    file_unique_id: Option<String>,
    #[serde(default)]
    file_size: Option<u64>,
    #[serde(default)]
    file_name: Option<String>,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawMessage {
    message_id: i32,
    from: Option<RawUser>,
    chat: RawChat,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    caption: Option<String>,
    #[serde(default)]
    document: Option<RawFile>,
    #[serde(default)]
    photo: Option<Vec<RawFile>>,
    #[serde(default)]
    video: Option<RawFile>,
    #[serde(default)]
    audio: Option<RawFile>,
    #[serde(default)]
    voice: Option<RawFile>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawCallbackQuery {
    id: String,
    from: RawUser,
    #[serde(default)]
    data: Option<String>,
    #[serde(default)]
    message: Option<RawCallbackMessage>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawCallbackMessage {
    message_id: i32,
    chat: RawChat,
}

/// A decoded webhook update.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundUpdate {
    Message(IncomingMessage),
    Callback(IncomingCallback),
    /// Valid JSON of a kind the bot does not handle, or not an update at all
    Ignored,
}

/// The file-bearing part of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub kind: FileKind,
    pub file_id: String,
    pub file_unique_id: Option<String>,
    pub file_size: Option<u64>,
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IncomingMessage {
    pub update_id: i64,
    pub message_id: i32,
    pub chat_id: i64,
    /// Sender id; falls back to the chat id for anonymous senders
    pub user_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub text: Option<String>,
    pub caption: Option<String>,
    pub attachment: Option<Attachment>,
}

impl IncomingMessage {
    pub fn attachment(&self) -> Option<&Attachment> {
        self.attachment.as_ref()
    }

    /// Text of a bot command (`/start`, `/info 42`), if this message is one.
    pub fn command_text(&self) -> Option<&str> {
        self.text.as_deref().filter(|text| text.starts_with('/'))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IncomingCallback {
    pub update_id: i64,
    pub callback_id: String,
    pub user_id: i64,
    /// Chat and id of the message carrying the pressed button
    pub origin: Option<(i64, i32)>,
    pub action: CallbackAction,
}

/// Menu pages reachable through `menu:<page>` buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuPage {
    Main,
    Help,
    Stats,
}

/// Decoded `callback_data` of an inline button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    /// `del:<channel message id>`
    Delete(i32),
    /// `menu:<page>`
    Menu(MenuPage),
    Unknown(String),
}

pub const DELETE_PREFIX: &str = "del:";
pub const MENU_PREFIX: &str = "menu:";

impl CallbackAction {
    pub fn parse(data: &str) -> Self {
        if let Some(id) = data.strip_prefix(DELETE_PREFIX) {
            return match id.trim().parse::<i32>() {
                Ok(id) => CallbackAction::Delete(id),
                Err(_) => CallbackAction::Unknown(data.to_string()),
            };
        }
        match data.strip_prefix(MENU_PREFIX) {
            Some("main") => CallbackAction::Menu(MenuPage::Main),
            Some("help") => CallbackAction::Menu(MenuPage::Help),
            Some("stats") => CallbackAction::Menu(MenuPage::Stats),
            _ => CallbackAction::Unknown(data.to_string()),
        }
    }

    /// Inverse of [`parse`](Self::parse), used when building keyboards.
    pub fn encode(&self) -> String {
        match self {
            CallbackAction::Delete(id) => format!("{}{}", DELETE_PREFIX, id),
            CallbackAction::Menu(MenuPage::Main) => format!("{}main", MENU_PREFIX),
            CallbackAction::Menu(MenuPage::Help) => format!("{}help", MENU_PREFIX),
            CallbackAction::Menu(MenuPage::Stats) => format!("{}stats", MENU_PREFIX),
            CallbackAction::Unknown(raw) => raw.clone(),
        }
    }
}

fn attach(kind: FileKind, file: RawFile) -> Attachment {
    Attachment {
        kind,
        file_id: file.file_id,
        file_unique_id: file.file_unique_id,
        file_size: file.file_size,
        file_name: file.file_name,
    }
}

impl RawMessage {
    /// First present of document, photo (largest), video, audio, voice.
    fn take_attachment(&mut self) -> Option<Attachment> {
        if let Some(doc) = self.document.take() {
            return Some(attach(FileKind::Document, doc));
        }
        if let Some(sizes) = self.photo.take() {
            let largest = sizes.into_iter().max_by_key(|p| {
                let area = u64::from(p.width.unwrap_or(0)) * u64::from(p.height.unwrap_or(0));
                (area, p.file_size.unwrap_or(0))
            });
            if let Some(photo) = largest {
                return Some(attach(FileKind::Photo, photo));
            }
        }
        if let Some(video) = self.video.take() {
            return Some(attach(FileKind::Video, video));
        }
        if let Some(audio) = self.audio.take() {
            return Some(attach(FileKind::Audio, audio));
        }
        self.voice.take().map(|voice| attach(FileKind::Voice, voice))
    }
}

/// Decodes a webhook body. Anything unparseable becomes [`InboundUpdate::Ignored`].
pub fn decode_update(body: &[u8]) -> InboundUpdate {
    let raw: RawUpdate = match serde_json::from_slice(body) {
        Ok(raw) => raw,
        Err(e) => {
            log::debug!("Ignoring undecodable webhook payload: {}", e);
            return InboundUpdate::Ignored;
        }
    };

    if let Some(mut message) = raw.message {
        let attachment = message.take_attachment();
        let from = message.from.take();
        return InboundUpdate::Message(IncomingMessage {
            update_id: raw.update_id,
            message_id: message.message_id,
            chat_id: message.chat.id,
            user_id: from.as_ref().map(|u| u.id).unwrap_or(message.chat.id),
            username: from.as_ref().and_then(|u| u.username.clone()),
            first_name: from.and_then(|u| u.first_name),
            text: message.text,
            caption: message.caption,
            attachment,
        });
    }

    if let Some(query) = raw.callback_query {
        let action = query
            .data
            .as_deref()
            .map(CallbackAction::parse)
            .unwrap_or_else(|| CallbackAction::Unknown(String::new()));
        return InboundUpdate::Callback(IncomingCallback {
            update_id: raw.update_id,
            callback_id: query.id,
            user_id: query.from.id,
            origin: query.message.map(|m| (m.chat.id, m.message_id)),
            action,
        });
    }

    InboundUpdate::Ignored
}
