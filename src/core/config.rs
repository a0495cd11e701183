use secrecy::{ExposeSecret, SecretString};
use std::path::PathBuf;
use subtle::ConstantTimeEq;
use std::time::Duration;

use crate::core::error::{AppError, AppResult};

/// Network configuration
pub mod network {
    use super::Duration;

    /// Timeout for control calls (sendMessage, deleteMessage, editMessageText, ...)
    pub const CONTROL_TIMEOUT_SECS: u64 = 10;

    /// Timeout for file transfer calls (sendDocument, sendVideo, ...)
    pub const TRANSFER_TIMEOUT_SECS: u64 = 60;

    pub fn control_timeout() -> Duration {
        Duration::from_secs(CONTROL_TIMEOUT_SECS)
    }

    pub fn transfer_timeout() -> Duration {
        Duration::from_secs(TRANSFER_TIMEOUT_SECS)
    }
}

/// Rate limiting configuration
pub mod rate_limit {
    /// Uploads admitted per window when RATE_LIMIT_MAX is unset
    pub const DEFAULT_MAX_UPLOADS: usize = 3;

    /// Window length when RATE_LIMIT_WINDOW_SECS is unset
    pub const DEFAULT_WINDOW_SECS: u64 = 60;

    /// How often empty windows are dropped from memory
    pub const CLEANUP_INTERVAL_SECS: u64 = 300;
}

/// Limits applied to uploads
pub mod limits {
    /// Default ceiling for files relayed by the bot (MAX_FILE_SIZE_MB)
    pub const DEFAULT_MAX_FILE_SIZE_MB: u64 = 50;

    /// Default body limit for the REST upload endpoint (MAX_CONTENT_MB)
    pub const DEFAULT_MAX_CONTENT_MB: usize = 50;

    /// How many uploads /list shows
    pub const LIST_PAGE_SIZE: usize = 10;
}

/// Retention sweep defaults
pub mod retention {
    pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 600;
}

pub const DEFAULT_WEB_PORT: u16 = 8080;

const MB: u64 = 1024 * 1024;

/// Destination channel for relayed files.
///
/// Public channels are addressed by `@username`; private ones by their
/// numeric `-100…` id, which changes the shape of the share link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelTarget {
    Username(String),
    Id(i64),
}

impl ChannelTarget {
    pub fn parse(raw: &str) -> AppResult<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(AppError::Config("CHANNEL_ID is empty".to_string()));
        }
        if let Ok(id) = raw.parse::<i64>() {
            return Ok(ChannelTarget::Id(id));
        }
        let name = raw.trim_start_matches('@');
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(AppError::Config(format!("invalid CHANNEL_ID: {}", raw)));
        }
        Ok(ChannelTarget::Username(name.to_string()))
    }

    /// Builds the public deep link for a message in this channel.
    ///
    /// `@files` + 42 → `https://t.me/files/42`;
    /// `-1001234567890` + 42 → `https://t.me/c/1234567890/42`.
    pub fn share_link(&self, message_id: i32) -> String {
        match self {
            ChannelTarget::Username(name) => format!("https://t.me/{}/{}", name, message_id),
            ChannelTarget::Id(id) => {
                let raw = id.to_string();
                let internal = raw
                    .strip_prefix("-100")
                    .map(str::to_string)
                    .unwrap_or_else(|| id.unsigned_abs().to_string());
                format!("https://t.me/c/{}/{}", internal, message_id)
            }
        }
    }

    /// Human readable form for logs and /stats.
    pub fn display_name(&self) -> String {
        match self {
            ChannelTarget::Username(name) => format!("@{}", name),
            ChannelTarget::Id(id) => id.to_string(),
        }
    }
}

/// Runtime configuration of the bot and the HTTP server.
///
/// Built once at startup by [`BotConfig::from_env`] and shared behind an `Arc`.
/// Secrets are only ever sourced from the environment; there are no literal
/// fallbacks.
#[derive(Debug)]
pub struct BotConfig {
    pub bot_token: SecretString,
    pub channel: ChannelTarget,
    pub admin_ids: Vec<i64>,
    pub webhook_url: Option<String>,
    pub webhook_secret: Option<SecretString>,
    pub bot_api_url: Option<String>,
    pub bot_username: Option<String>,
    pub api_key: Option<SecretString>,
    pub upload_folder: PathBuf,
    pub max_content_bytes: usize,
    /// `None` disables the size check
    pub max_file_size_bytes: Option<u64>,
    pub rate_limit_max: usize,
    pub rate_limit_window: Duration,
    /// `None` disables the retention sweep
    pub retention: Option<Duration>,
    pub sweep_interval: Duration,
    pub dedup_uploads: bool,
    pub redis_url: Option<String>,
    pub web_port: u16,
}

impl BotConfig {
    /// Configuration with defaults for everything but the token and channel.
    pub fn new(bot_token: impl Into<String>, channel: ChannelTarget) -> Self {
        Self {
            bot_token: SecretString::from(bot_token.into()),
            channel,
            admin_ids: Vec::new(),
            webhook_url: None,
            webhook_secret: None,
            bot_api_url: None,
            bot_username: None,
            api_key: None,
            upload_folder: default_upload_folder(),
            max_content_bytes: limits::DEFAULT_MAX_CONTENT_MB * 1024 * 1024,
            max_file_size_bytes: Some(limits::DEFAULT_MAX_FILE_SIZE_MB * 1024 * 1024),
            rate_limit_max: rate_limit::DEFAULT_MAX_UPLOADS,
            rate_limit_window: Duration::from_secs(rate_limit::DEFAULT_WINDOW_SECS),
            retention: None,
            sweep_interval: Duration::from_secs(retention::DEFAULT_SWEEP_INTERVAL_SECS),
            dedup_uploads: false,
            redis_url: None,
            web_port: DEFAULT_WEB_PORT,
        }
    }

    /// Reads the configuration from the process environment.
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let token = get("BOT_TOKEN")
            .or_else(|| get("TELOXIDE_TOKEN"))
            .ok_or_else(|| AppError::Config("BOT_TOKEN is not set".to_string()))?;
        let channel = get("CHANNEL_ID")
            .ok_or_else(|| AppError::Config("CHANNEL_ID is not set".to_string()))
            .and_then(|raw| ChannelTarget::parse(&raw))?;

        let mut config = Self::new(token, channel);

        config.admin_ids = get("ADMIN_IDS").map(|raw| parse_admin_ids(&raw)).unwrap_or_default();
        config.webhook_url = get("WEBHOOK_URL").map(|url| url.trim_end_matches('/').to_string());
        config.webhook_secret = get("WEBHOOK_SECRET").map(SecretString::from);
        config.bot_api_url = get("BOT_API_URL");
        config.bot_username = get("BOT_USERNAME").map(|name| name.trim_start_matches('@').to_string());
        config.api_key = get("ADMIN_API_KEY").map(SecretString::from);
        if let Some(folder) = get("UPLOAD_FOLDER") {
            config.upload_folder = PathBuf::from(folder);
        }

        let max_content_mb = parse_or(&get, "MAX_CONTENT_MB", limits::DEFAULT_MAX_CONTENT_MB);
        config.max_content_bytes = max_content_mb.checked_mul(MB as usize).unwrap_or_else(|| {
            warn_overflow("MAX_CONTENT_MB", max_content_mb);
            limits::DEFAULT_MAX_CONTENT_MB * MB as usize
        });

        let max_file_mb = parse_or(&get, "MAX_FILE_SIZE_MB", limits::DEFAULT_MAX_FILE_SIZE_MB);
        config.max_file_size_bytes = (max_file_mb > 0).then(|| {
            max_file_mb.checked_mul(MB).unwrap_or_else(|| {
                warn_overflow("MAX_FILE_SIZE_MB", max_file_mb);
                limits::DEFAULT_MAX_FILE_SIZE_MB * MB
            })
        });

        config.rate_limit_max = parse_or(&get, "RATE_LIMIT_MAX", rate_limit::DEFAULT_MAX_UPLOADS);
        config.rate_limit_window =
            Duration::from_secs(parse_or(&get, "RATE_LIMIT_WINDOW_SECS", rate_limit::DEFAULT_WINDOW_SECS));

        let retention_hours: u64 = parse_or(&get, "RETENTION_HOURS", 0);
        config.retention = match retention_hours.checked_mul(3600) {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => {
                warn_overflow("RETENTION_HOURS", retention_hours);
                None
            }
        };
        config.sweep_interval = Duration::from_secs(parse_or(
            &get,
            "SWEEP_INTERVAL_SECS",
            retention::DEFAULT_SWEEP_INTERVAL_SECS,
        ));

        config.dedup_uploads = get("DEDUP_UPLOADS").map(|v| parse_bool(&v)).unwrap_or(false);
        config.redis_url = get("REDIS_URL");
        config.web_port = parse_or(&get, "WEB_PORT", DEFAULT_WEB_PORT);

        Ok(config)
    }

    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admin_ids.contains(&user_id)
    }

    /// Full webhook endpoint registered with Telegram.
    pub fn webhook_endpoint(&self) -> Option<String> {
        self.webhook_url.as_ref().map(|base| format!("{}/webhook", base))
    }

    /// Checks a bearer token presented to the REST API.
    pub fn api_key_matches(&self, presented: &str) -> bool {
        self.api_key
            .as_ref()
            .is_some_and(|key| secure_compare(key.expose_secret(), presented))
    }

    /// Checks the `X-Telegram-Bot-Api-Secret-Token` header of a webhook call.
    pub fn webhook_secret_matches(&self, presented: Option<&str>) -> bool {
        match &self.webhook_secret {
            Some(secret) => presented.is_some_and(|presented| secure_compare(secret.expose_secret(), presented)),
            None => true,
        }
    }
}

/// Constant-time comparison for secrets; only the length can leak.
fn secure_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

fn default_upload_folder() -> PathBuf {
    std::env::temp_dir().join("filerelay")
}

fn parse_admin_ids(raw: &str) -> Vec<i64> {
    raw.split([',', ' ', '\n', '\t'])
        .filter_map(|part| part.trim().parse::<i64>().ok())
        .collect()
}

fn parse_bool(raw: &str) -> bool {
    matches!(raw.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

fn warn_overflow<T: std::fmt::Display>(key: &str, value: T) {
    log::warn!("{}={} is out of range, using default", key, value);
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display + Copy,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            log::warn!("Invalid {}={:?}, using default {}", key, raw, default);
            default
        }),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_channel_target_parse() {
        assert_eq!(
            ChannelTarget::parse("@my_files").unwrap(),
            ChannelTarget::Username("my_files".to_string())
        );
        assert_eq!(
            ChannelTarget::parse("my_files").unwrap(),
            ChannelTarget::Username("my_files".to_string())
        );
        assert_eq!(
            ChannelTarget::parse("-1001234567890").unwrap(),
            ChannelTarget::Id(-1001234567890)
        );
        assert!(ChannelTarget::parse("").is_err());
        assert!(ChannelTarget::parse("@bad name").is_err());
    }

    #[test]
    fn test_share_link_formats() {
        let public = ChannelTarget::Username("my_files".to_string());
        assert_eq!(public.share_link(42), "https://t.me/my_files/42");

        let private = ChannelTarget::Id(-1001234567890);
        assert_eq!(private.share_link(7), "https://t.me/c/1234567890/7");
    }

    #[test]
    fn test_from_lookup_requires_token_and_channel() {
        assert!(BotConfig::from_lookup(lookup(&[])).is_err());
        assert!(BotConfig::from_lookup(lookup(&[("BOT_TOKEN", "123:abc")])).is_err());
        assert!(BotConfig::from_lookup(lookup(&[("CHANNEL_ID", "@files")])).is_err());
    }

    #[test]
    fn test_from_lookup_defaults() {
        let config = BotConfig::from_lookup(lookup(&[("BOT_TOKEN", "123:abc"), ("CHANNEL_ID", "@files")])).unwrap();

        assert_eq!(config.channel, ChannelTarget::Username("files".to_string()));
        assert!(config.admin_ids.is_empty());
        assert_eq!(config.rate_limit_max, 3);
        assert_eq!(config.rate_limit_window, Duration::from_secs(60));
        assert_eq!(config.max_file_size_bytes, Some(50 * 1024 * 1024));
        assert_eq!(config.retention, None);
        assert!(!config.dedup_uploads);
        assert_eq!(config.web_port, 8080);
        assert_eq!(config.webhook_endpoint(), None);
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = BotConfig::from_lookup(lookup(&[
            ("TELOXIDE_TOKEN", "123:abc"),
            ("CHANNEL_ID", "-1009876"),
            ("ADMIN_IDS", "1, 2 3,oops"),
            ("WEBHOOK_URL", "https://example.com/"),
            ("MAX_FILE_SIZE_MB", "0"),
            ("RATE_LIMIT_MAX", "5"),
            ("RATE_LIMIT_WINDOW_SECS", "not-a-number"),
            ("RETENTION_HOURS", "2"),
            ("DEDUP_UPLOADS", "yes"),
            ("ADMIN_API_KEY", "secret"),
            ("WEB_PORT", "9000"),
        ]))
        .unwrap();

        assert_eq!(config.admin_ids, vec![1, 2, 3]);
        assert!(config.is_admin(2));
        assert!(!config.is_admin(4));
        assert_eq!(config.webhook_endpoint().as_deref(), Some("https://example.com/webhook"));
        assert_eq!(config.max_file_size_bytes, None);
        assert_eq!(config.rate_limit_max, 5);
        assert_eq!(config.rate_limit_window, Duration::from_secs(60));
        assert_eq!(config.retention, Some(Duration::from_secs(7200)));
        assert!(config.dedup_uploads);
        assert!(config.api_key_matches("secret"));
        assert!(!config.api_key_matches("guess"));
        assert_eq!(config.web_port, 9000);
    }

    #[test]
    fn test_out_of_range_sizes_fall_back_to_defaults() {
        let huge = u64::MAX.to_string();
        let config = BotConfig::from_lookup(lookup(&[
            ("BOT_TOKEN", "123:abc"),
            ("CHANNEL_ID", "@files"),
            ("MAX_CONTENT_MB", &usize::MAX.to_string()),
            ("MAX_FILE_SIZE_MB", &huge),
            ("RETENTION_HOURS", &huge),
        ]))
        .unwrap();

        assert_eq!(config.max_content_bytes, 50 * 1024 * 1024);
        assert_eq!(config.max_file_size_bytes, Some(50 * 1024 * 1024));
        assert_eq!(config.retention, None);
    }

    #[test]
    fn test_secure_compare() {
        assert!(secure_compare("s3cret", "s3cret"));
        assert!(!secure_compare("s3cret", "s3creT"));
        assert!(!secure_compare("s3cret", "s3cret-longer"));
        assert!(!secure_compare("s3cret", ""));
        assert!(secure_compare("", ""));
    }

    #[test]
    fn test_webhook_secret_optional() {
        let mut config = BotConfig::new("t", ChannelTarget::Username("files".to_string()));
        assert!(config.webhook_secret_matches(None));

        config.webhook_secret = Some(SecretString::from("s3cret".to_string()));
        assert!(config.webhook_secret_matches(Some("s3cret")));
        assert!(!config.webhook_secret_matches(Some("other")));
        assert!(!config.webhook_secret_matches(None));
    }

    #[test]
    fn test_api_key_unset_rejects_everything() {
        let config = BotConfig::new("t", ChannelTarget::Username("files".to_string()));
        assert!(!config.api_key_matches(""));
        assert!(!config.api_key_matches("anything"));
    }
}
