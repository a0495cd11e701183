//! Inline keyboards attached to bot replies

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::telegram::update::{CallbackAction, MenuPage};

/// Keyboard under an upload confirmation: delete button and, when the link
/// is a valid URL, a button opening the channel post.
pub fn upload_keyboard(channel_message_id: i32, share_link: &str) -> InlineKeyboardMarkup {
    let mut row = vec![InlineKeyboardButton::callback(
        "🗑 Delete",
        CallbackAction::Delete(channel_message_id).encode(),
    )];
    match url::Url::parse(share_link) {
        Ok(url) => row.push(InlineKeyboardButton::url("🔗 Open", url)),
        Err(e) => log::warn!("Share link {} is not a valid URL: {}", share_link, e),
    }
    InlineKeyboardMarkup::new(vec![row])
}

/// Main menu shown by /start and the "back" buttons.
pub fn main_menu_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback("📖 Help", CallbackAction::Menu(MenuPage::Help).encode()),
        InlineKeyboardButton::callback("📊 Stats", CallbackAction::Menu(MenuPage::Stats).encode()),
    ]])
}

pub fn back_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        "⬅️ Back",
        CallbackAction::Menu(MenuPage::Main).encode(),
    )]])
}
