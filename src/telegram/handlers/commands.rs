//! Command handler implementations (/start, /help, /stats, /list, /info, /restart, /broadcast)
//! and the menu callbacks that share their texts.

use chrono::Utc;
use indoc::formatdoc;

use super::types::HandlerDeps;
use crate::core::config::limits;
use crate::storage::files::bytes_to_mb;
use crate::storage::persist::mirror_clear;
use crate::storage::registry::UploadRecord;
use crate::telegram::bot::{
    parse_command, Command, ADMIN_ONLY_TEXT, HELP_TEXT, NOT_FOUND_TEXT, WELCOME_TEXT,
};
use crate::telegram::keyboards::{back_keyboard, main_menu_keyboard};
use crate::telegram::update::{IncomingCallback, IncomingMessage, MenuPage};

/// What a command did, for logging and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Replied,
    /// Admin-only command from a non-admin; nothing changed
    Denied,
    Restarted { cleared_records: usize },
    Broadcast { delivered: usize, failed: usize },
    /// Command addressed to another bot; ignored
    NotForUs,
    Unknown,
}

pub async fn handle_command(deps: &HandlerDeps, msg: &IncomingMessage, text: &str) -> CommandOutcome {
    let Some(command) = parse_command(text, deps.bot_username.as_deref()) else {
        if addressed_elsewhere(text, deps.bot_username.as_deref()) {
            return CommandOutcome::NotForUs;
        }
        deps.reply(msg.chat_id, HELP_TEXT).await;
        return CommandOutcome::Unknown;
    };

    log::info!("Command {:?} from user {}", command, msg.user_id);

    match command {
        Command::Start => {
            deps.reply_with(msg.chat_id, WELCOME_TEXT, Some(main_menu_keyboard())).await;
            CommandOutcome::Replied
        }
        Command::Help => {
            deps.reply(msg.chat_id, HELP_TEXT).await;
            CommandOutcome::Replied
        }
        Command::Stats => {
            deps.reply(msg.chat_id, &stats_text(deps).await).await;
            CommandOutcome::Replied
        }
        Command::List => {
            let records = deps.registry.by_owner(msg.user_id);
            deps.reply(msg.chat_id, &list_text(deps, &records)).await;
            CommandOutcome::Replied
        }
        Command::Info(arg) => {
            deps.reply(msg.chat_id, &info_text(deps, msg.user_id, &arg)).await;
            CommandOutcome::Replied
        }
        Command::Restart => handle_restart(deps, msg).await,
        Command::Broadcast(text) => handle_broadcast(deps, msg, &text).await,
    }
}

fn addressed_elsewhere(text: &str, bot_username: Option<&str>) -> bool {
    let head = text.split_whitespace().next().unwrap_or("");
    match head.split_once('@') {
        Some((_, mention)) => !bot_username.is_some_and(|name| name.eq_ignore_ascii_case(mention)),
        None => false,
    }
}

async fn handle_restart(deps: &HandlerDeps, msg: &IncomingMessage) -> CommandOutcome {
    if !deps.is_admin(msg.user_id) {
        log::warn!("Non-admin user {} attempted /restart", msg.user_id);
        deps.reply(msg.chat_id, ADMIN_ONLY_TEXT).await;
        return CommandOutcome::Denied;
    }

    let cleared_records = deps.registry.clear();
    deps.rate_limiter.clear().await;
    mirror_clear(deps.store()).await;
    log::warn!(
        "Admin {} reset state: {} registry entries dropped",
        msg.user_id,
        cleared_records
    );

    deps.reply(
        msg.chat_id,
        &format!(
            "🔄 State reset. Cleared {} uploads and all rate limits.",
            cleared_records
        ),
    )
    .await;
    CommandOutcome::Restarted { cleared_records }
}

async fn handle_broadcast(deps: &HandlerDeps, msg: &IncomingMessage, text: &str) -> CommandOutcome {
    if !deps.is_admin(msg.user_id) {
        log::warn!("Non-admin user {} attempted /broadcast", msg.user_id);
        deps.reply(msg.chat_id, ADMIN_ONLY_TEXT).await;
        return CommandOutcome::Denied;
    }

    let text = text.trim();
    if text.is_empty() {
        deps.reply(msg.chat_id, "Usage: /broadcast <text>").await;
        return CommandOutcome::Replied;
    }

    let mut delivered = 0;
    let mut failed = 0;
    for owner in deps.registry.owners() {
        match deps.api.send_message(owner, text, None).await {
            Ok(_) => delivered += 1,
            Err(e) => {
                log::warn!("Broadcast to {} failed: {}", owner, e);
                failed += 1;
            }
        }
    }

    log::info!("Broadcast by {}: {} delivered, {} failed", msg.user_id, delivered, failed);
    deps.reply(
        msg.chat_id,
        &format!("📣 Broadcast sent: {} delivered, {} failed.", delivered, failed),
    )
    .await;
    CommandOutcome::Broadcast { delivered, failed }
}

/// Edits the menu message in place for `menu:<page>` buttons.
pub async fn handle_menu(deps: &HandlerDeps, callback: &IncomingCallback, page: MenuPage) {
    let (text, keyboard) = match page {
        MenuPage::Main => (WELCOME_TEXT.to_string(), main_menu_keyboard()),
        MenuPage::Help => (HELP_TEXT.to_string(), back_keyboard()),
        MenuPage::Stats => (stats_text(deps).await, back_keyboard()),
    };

    deps.answer(&callback.callback_id, None).await;

    if let Some((chat_id, message_id)) = callback.origin {
        match deps
            .api
            .edit_message_text(chat_id, message_id, &text, Some(keyboard.clone()))
            .await
        {
            Ok(()) => return,
            Err(e) => log::debug!("Menu edit failed for message {}: {}", message_id, e),
        }
    }
    let chat_id = callback.origin.map(|(chat_id, _)| chat_id).unwrap_or(callback.user_id);
    deps.reply_with(chat_id, &text, Some(keyboard)).await;
}

async fn stats_text(deps: &HandlerDeps) -> String {
    let uptime = Utc::now().signed_duration_since(deps.started_at);
    let hours = uptime.num_hours();
    let minutes = uptime.num_minutes() % 60;

    formatdoc! {"
        📊 Statistics

        Files in registry: {files}
        Uploaders: {owners}
        Declared size: {size} MB
        Rate limit: {max} per {window} s
        Channel: {channel}
        Uptime: {hours}h {minutes}m",
        files = deps.registry.len(),
        owners = deps.registry.owners().len(),
        size = bytes_to_mb(deps.registry.total_size()),
        max = deps.rate_limiter.max_per_window(),
        window = deps.rate_limiter.window().as_secs(),
        channel = deps.config.channel.display_name(),
        hours = hours,
        minutes = minutes,
    }
}

fn list_text(deps: &HandlerDeps, records: &[UploadRecord]) -> String {
    if records.is_empty() {
        return "You have no uploads yet. Send me a file to get started.".to_string();
    }

    let mut text = format!("📂 Your last uploads ({} total):\n", records.len());
    for record in records.iter().take(limits::LIST_PAGE_SIZE) {
        text.push_str(&format!(
            "\n{} #{} {}\n{}",
            record.file_type.emoji(),
            record.channel_message_id,
            record.label(),
            deps.config.channel.share_link(record.channel_message_id)
        ));
    }
    text
}

fn info_text(deps: &HandlerDeps, user_id: i64, arg: &str) -> String {
    let Ok(id) = arg.trim().parse::<i32>() else {
        return "Usage: /info <id>".to_string();
    };
    let Some(record) = deps.registry.get(id) else {
        return NOT_FOUND_TEXT.to_string();
    };
    if !record.can_be_deleted_by(user_id, deps.is_admin(user_id)) {
        return "⛔ You can only inspect your own files.".to_string();
    }

    let mut text = formatdoc! {"
        {emoji} Upload #{id}

        Type: {kind}
        Owner: {owner}
        Uploaded: {at}
        Link: {link}",
        emoji = record.file_type.emoji(),
        id = record.channel_message_id,
        kind = record.file_type,
        owner = record.owner_id,
        at = record.uploaded_at.format("%Y-%m-%d %H:%M:%S UTC"),
        link = deps.config.channel.share_link(record.channel_message_id),
    };
    if let Some(name) = &record.file_name {
        text.push_str(&format!("\nName: {}", name));
    }
    if let Some(size) = record.file_size {
        text.push_str(&format!("\nSize: {} MB", bytes_to_mb(size)));
    }
    if let Some(caption) = &record.caption {
        text.push_str(&format!("\nCaption: {}", caption));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_addressed_elsewhere() {
        assert!(addressed_elsewhere("/help@otherbot", Some("relaybot")));
        assert!(!addressed_elsewhere("/help@RelayBot", Some("relaybot")));
        assert!(!addressed_elsewhere("/help", Some("relaybot")));
        assert!(addressed_elsewhere("/help@relaybot", None));
    }
}
