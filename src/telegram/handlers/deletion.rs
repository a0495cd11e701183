//! Ownership-checked removal of a channel post

use super::types::HandlerDeps;
use crate::storage::persist::mirror_remove;
use crate::telegram::bot::{DELETED_TEXT, DELETE_FAILED_TEXT, NOT_FOUND_TEXT, PERMISSION_DENIED_TEXT};
use crate::telegram::update::IncomingCallback;

/// What the deletion workflow decided for one `del:<id>` press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// No record: never uploaded, already deleted, or lost on restart
    NotFound,
    /// Requester is neither the owner nor an admin; nothing changed
    Forbidden,
    /// Telegram refused `deleteMessage`; the record is kept
    Failed,
    Deleted,
}

impl DeleteOutcome {
    fn text(self) -> &'static str {
        match self {
            DeleteOutcome::NotFound => NOT_FOUND_TEXT,
            DeleteOutcome::Forbidden => PERMISSION_DENIED_TEXT,
            DeleteOutcome::Failed => DELETE_FAILED_TEXT,
            DeleteOutcome::Deleted => DELETED_TEXT,
        }
    }
}

/// Deletes channel message `channel_message_id` on behalf of the callback sender.
pub async fn handle_delete(deps: &HandlerDeps, callback: &IncomingCallback, channel_message_id: i32) -> DeleteOutcome {
    let outcome = delete_record(deps, callback.user_id, channel_message_id).await;
    report(deps, callback, outcome).await;
    outcome
}

async fn delete_record(deps: &HandlerDeps, user_id: i64, channel_message_id: i32) -> DeleteOutcome {
    let Some(record) = deps.registry.get(channel_message_id) else {
        log::info!(
            "Delete of unknown message {} requested by user {}",
            channel_message_id,
            user_id
        );
        return DeleteOutcome::NotFound;
    };

    if !record.can_be_deleted_by(user_id, deps.is_admin(user_id)) {
        log::warn!(
            "User {} tried to delete message {} owned by {}",
            user_id,
            channel_message_id,
            record.owner_id
        );
        return DeleteOutcome::Forbidden;
    }

    if let Err(e) = deps.api.delete_message(&deps.config.channel, channel_message_id).await {
        log::error!("Failed to delete channel message {}: {}", channel_message_id, e);
        return DeleteOutcome::Failed;
    }

    // A concurrent press may already have removed it; both saw the post gone.
    if deps.registry.remove(channel_message_id).is_some() {
        mirror_remove(deps.store(), channel_message_id).await;
    }
    log::info!("User {} deleted channel message {}", user_id, channel_message_id);
    DeleteOutcome::Deleted
}

/// Edits the confirmation message in place, or sends a new message when that fails.
async fn report(deps: &HandlerDeps, callback: &IncomingCallback, outcome: DeleteOutcome) {
    let text = outcome.text();
    deps.answer(&callback.callback_id, Some(text)).await;

    let edited = match callback.origin {
        Some((chat_id, message_id)) => match deps.api.edit_message_text(chat_id, message_id, text, None).await {
            Ok(()) => true,
            Err(e) => {
                log::debug!("Could not edit message {} in chat {}: {}", message_id, chat_id, e);
                false
            }
        },
        None => false,
    };

    if !edited {
        let chat_id = callback.origin.map(|(chat_id, _)| chat_id).unwrap_or(callback.user_id);
        deps.reply(chat_id, text).await;
    }
}
