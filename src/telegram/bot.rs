use indoc::indoc;
use teloxide::utils::command::BotCommands;

/// Bot commands enum with descriptions
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "I can do the following:")]
pub enum Command {
    #[command(description = "show the main menu")]
    Start,
    #[command(description = "how to upload and delete files")]
    Help,
    #[command(description = "registry and rate limit statistics")]
    Stats,
    #[command(description = "your most recent uploads")]
    List,
    #[command(description = "details of an upload: /info <id>")]
    Info(String),
    #[command(description = "reset all state (administrators only)")]
    Restart,
    #[command(description = "message every uploader (administrators only)")]
    Broadcast(String),
}

/// Parses a command message, tolerating argument-taking commands sent bare.
///
/// Returns `None` for unknown commands and for commands addressed to another bot.
pub fn parse_command(text: &str, bot_username: Option<&str>) -> Option<Command> {
    let username = bot_username.unwrap_or("");
    match Command::parse(text, username) {
        Ok(command) => Some(command),
        Err(_) => {
            let head = text.split_whitespace().next()?.strip_prefix('/')?;
            let (name, mention) = match head.split_once('@') {
                Some((name, mention)) => (name, Some(mention)),
                None => (head, None),
            };
            if let Some(mention) = mention {
                if !mention.eq_ignore_ascii_case(username) {
                    return None;
                }
            }
            let rest = text[text.find(char::is_whitespace).unwrap_or(text.len())..].trim().to_string();
            match name.to_ascii_lowercase().as_str() {
                "info" => Some(Command::Info(rest)),
                "broadcast" => Some(Command::Broadcast(rest)),
                _ => None,
            }
        }
    }
}

pub const WELCOME_TEXT: &str = indoc! {"
    👋 Send me a document, photo, video, audio file or voice message.

    I will post it to the channel and reply with a link you can share.
    Each reply carries a 🗑 button that removes the post again."};

pub const HELP_TEXT: &str = indoc! {"
    📖 How it works

    • Send any document, photo, video, audio or voice message.
    • The file is posted to the channel and you get a share link.
    • Press 🗑 Delete under the reply to remove the post.
      Only you and the administrators can delete your files.

    Commands:
    /list  your last uploads
    /info <id>  details of one upload
    /stats  bot statistics"};

pub const UNSUPPORTED_TEXT: &str =
    "🤷 I only accept documents, photos, videos, audio files and voice messages.";

pub const UPLOAD_FAILED_TEXT: &str = "❌ Could not post your file to the channel. Please try again later.";

pub const NOT_FOUND_TEXT: &str = "❌ File not found. It may have been deleted already.";

pub const PERMISSION_DENIED_TEXT: &str = "⛔ You can only delete your own files.";

pub const DELETE_FAILED_TEXT: &str = "❌ Could not delete the post. Please try again later.";

pub const DELETED_TEXT: &str = "✅ File deleted from the channel.";

pub const ADMIN_ONLY_TEXT: &str = "⛔ This command is for administrators only.";
