//! Configuration loading from the real process environment.
//!
//! These tests mutate process-wide environment variables, so they run serially.

use serial_test::serial;
use std::time::Duration;

use filerelay::core::config::{BotConfig, ChannelTarget};

const VARS: &[&str] = &[
    "BOT_TOKEN",
    "TELOXIDE_TOKEN",
    "CHANNEL_ID",
    "ADMIN_IDS",
    "WEBHOOK_URL",
    "RATE_LIMIT_MAX",
    "RATE_LIMIT_WINDOW_SECS",
    "MAX_FILE_SIZE_MB",
    "RETENTION_HOURS",
];

fn reset_env() {
    for var in VARS {
        std::env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_from_env_requires_token_and_channel() {
    reset_env();
    assert!(BotConfig::from_env().is_err());

    std::env::set_var("BOT_TOKEN", "123:abc");
    assert!(BotConfig::from_env().is_err());

    std::env::set_var("CHANNEL_ID", "@relay_files");
    let config = BotConfig::from_env().unwrap();
    assert_eq!(config.channel, ChannelTarget::Username("relay_files".to_string()));
    reset_env();
}

#[test]
#[serial]
fn test_from_env_reads_overrides() {
    reset_env();
    std::env::set_var("TELOXIDE_TOKEN", "123:abc");
    std::env::set_var("CHANNEL_ID", "-1001234567890");
    std::env::set_var("ADMIN_IDS", "1, 2,3");
    std::env::set_var("WEBHOOK_URL", "https://bot.example.com/");
    std::env::set_var("RATE_LIMIT_MAX", "5");
    std::env::set_var("RATE_LIMIT_WINDOW_SECS", "30");
    std::env::set_var("MAX_FILE_SIZE_MB", "0");
    std::env::set_var("RETENTION_HOURS", "24");

    let config = BotConfig::from_env().unwrap();

    assert_eq!(config.channel, ChannelTarget::Id(-1001234567890));
    assert_eq!(config.admin_ids, vec![1, 2, 3]);
    assert_eq!(config.webhook_endpoint().as_deref(), Some("https://bot.example.com/webhook"));
    assert_eq!(config.rate_limit_max, 5);
    assert_eq!(config.rate_limit_window, Duration::from_secs(30));
    assert_eq!(config.max_file_size_bytes, None);
    assert_eq!(config.retention, Some(Duration::from_secs(24 * 3600)));
    reset_env();
}
