//! Routes a decoded update to the workflow that owns it

use super::commands::{handle_command, handle_menu};
use super::deletion::handle_delete;
use super::types::HandlerDeps;
use super::uploads::handle_upload;
use crate::telegram::update::{CallbackAction, InboundUpdate};

/// Processes one update to completion. Every failure is handled (logged and,
/// where possible, reported to the user) inside the workflows.
pub async fn handle_update(deps: &HandlerDeps, update: InboundUpdate) {
    match update {
        InboundUpdate::Message(msg) => {
            if let Some(text) = msg.command_text() {
                handle_command(deps, &msg, text).await;
            } else {
                handle_upload(deps, &msg).await;
            }
        }
        InboundUpdate::Callback(callback) => match callback.action {
            CallbackAction::Delete(id) => {
                handle_delete(deps, &callback, id).await;
            }
            CallbackAction::Menu(page) => handle_menu(deps, &callback, page).await,
            CallbackAction::Unknown(ref data) => {
                log::debug!("Unknown callback data {:?} from user {}", data, callback.user_id);
                deps.answer(&callback.callback_id, None).await;
            }
        },
        InboundUpdate::Ignored => log::debug!("Ignoring update without message or callback"),
    }
}
