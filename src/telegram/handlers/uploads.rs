//! Relays a user's file to the channel and answers with a share link

use chrono::Utc;
use std::time::Duration;

use super::types::HandlerDeps;
use crate::storage::persist::mirror_save;
use crate::storage::registry::UploadRecord;
use crate::telegram::bot::{UNSUPPORTED_TEXT, UPLOAD_FAILED_TEXT};
use crate::telegram::keyboards::upload_keyboard;
use crate::telegram::update::{Attachment, IncomingMessage};

/// What the upload workflow decided for one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The message carried no supported attachment
    Unsupported,
    /// The owner exhausted the rate window
    RateLimited { retry_after: Option<Duration> },
    /// Declared size is over the configured ceiling
    TooLarge { size: u64, limit: u64 },
    /// Same content already relayed by the same owner
    Duplicate { channel_message_id: i32 },
    /// Posted to the channel and recorded
    Forwarded { channel_message_id: i32, link: String },
    /// The channel post failed; nothing was recorded
    Failed,
}

pub async fn handle_upload(deps: &HandlerDeps, msg: &IncomingMessage) -> UploadOutcome {
    let Some(attachment) = msg.attachment() else {
        log::debug!(
            "Message {} from {} has no supported attachment",
            msg.message_id,
            msg.user_id
        );
        deps.reply(msg.chat_id, UNSUPPORTED_TEXT).await;
        return UploadOutcome::Unsupported;
    };

    if !deps.rate_limiter.admit(msg.user_id).await {
        let retry_after = deps.rate_limiter.retry_after(msg.user_id).await;
        log::info!("Rate limited upload from user {}", msg.user_id);
        deps.reply(msg.chat_id, &rate_limit_text(deps.rate_limiter.max_per_window(), deps.rate_limiter.window(), retry_after))
            .await;
        return UploadOutcome::RateLimited { retry_after };
    }

    if let (Some(limit), Some(size)) = (deps.config.max_file_size_bytes, attachment.file_size) {
        if size > limit {
            log::info!(
                "Rejected {} byte {} from user {} (limit {})",
                size,
                attachment.kind,
                msg.user_id,
                limit
            );
            deps.reply(msg.chat_id, &too_large_text(size, limit)).await;
            return UploadOutcome::TooLarge { size, limit };
        }
    }

    if deps.config.dedup_uploads {
        if let Some(existing) = attachment
            .file_unique_id
            .as_deref()
            .and_then(|uniq| deps.registry.find_duplicate(msg.user_id, uniq))
        {
            let link = deps.config.channel.share_link(existing.channel_message_id);
            log::info!(
                "Duplicate upload from user {} matches message {}",
                msg.user_id,
                existing.channel_message_id
            );
            deps.reply_with(
                msg.chat_id,
                &format!("♻️ You already uploaded this file:\n{}", link),
                Some(upload_keyboard(existing.channel_message_id, &link)),
            )
            .await;
            return UploadOutcome::Duplicate {
                channel_message_id: existing.channel_message_id,
            };
        }
    }

    if let Err(e) = deps.api.send_upload_action(msg.chat_id, attachment.kind).await {
        log::debug!("Chat action for {} failed: {}", msg.chat_id, e);
    }

    let caption = msg.caption.as_deref();
    let channel_message_id = match deps
        .api
        .send_file(&deps.config.channel, attachment.kind, &attachment.file_id, caption)
        .await
    {
        Ok(id) => id,
        Err(e) => {
            log::error!(
                "Failed to forward {} from user {} to {}: {}",
                attachment.kind,
                msg.user_id,
                deps.config.channel.display_name(),
                e
            );
            deps.reply(msg.chat_id, UPLOAD_FAILED_TEXT).await;
            return UploadOutcome::Failed;
        }
    };

    let record = new_record(channel_message_id, msg.user_id, attachment, msg.caption.clone());
    if let Some(displaced) = deps.registry.insert(record.clone()) {
        log::warn!(
            "Channel message id {} reused; replaced record of user {}",
            channel_message_id,
            displaced.owner_id
        );
    }
    mirror_save(deps.store(), &record).await;

    let link = deps.config.channel.share_link(channel_message_id);
    log::info!(
        "Relayed {} from user {} as channel message {}",
        attachment.kind,
        msg.user_id,
        channel_message_id
    );
    deps.reply_with(
        msg.chat_id,
        &format!("✅ File uploaded!\n{} {}", attachment.kind.emoji(), link),
        Some(upload_keyboard(channel_message_id, &link)),
    )
    .await;

    UploadOutcome::Forwarded { channel_message_id, link }
}

fn new_record(channel_message_id: i32, owner_id: i64, attachment: &Attachment, caption: Option<String>) -> UploadRecord {
    UploadRecord {
        channel_message_id,
        file_id: attachment.file_id.clone(),
        file_unique_id: attachment.file_unique_id.clone(),
        file_type: attachment.kind,
        owner_id,
        uploaded_at: Utc::now(),
        caption,
        file_name: attachment.file_name.clone(),
        file_size: attachment.file_size,
    }
}

fn rate_limit_text(max: usize, window: Duration, retry_after: Option<Duration>) -> String {
    let mut text = format!(
        "⏳ Slow down: at most {} uploads per {} seconds.",
        max,
        window.as_secs()
    );
    if let Some(wait) = retry_after {
        text.push_str(&format!(" Try again in {} s.", wait.as_secs().max(1)));
    }
    text
}

fn too_large_text(size: u64, limit: u64) -> String {
    format!(
        "📦 File is too large ({:.1} MB). The limit is {:.0} MB.",
        size as f64 / (1024.0 * 1024.0),
        limit as f64 / (1024.0 * 1024.0)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_text() {
        let text = rate_limit_text(3, Duration::from_secs(60), Some(Duration::from_millis(200)));
        assert!(text.contains("at most 3 uploads per 60 seconds"));
        assert!(text.contains("Try again in 1 s"));

        assert!(!rate_limit_text(3, Duration::from_secs(60), None).contains("Try again"));
    }

    #[test]
    fn test_too_large_text() {
        let text = too_large_text(75 * 1024 * 1024, 50 * 1024 * 1024);
        assert_eq!(text, "📦 File is too large (75.0 MB). The limit is 50 MB.");
    }
}
