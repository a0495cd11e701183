//! Logging initialization and startup diagnostics
//!
//! This module provides:
//! - Logger initialization (tracing subscriber + `log` bridge)
//! - A redacted dump of the effective configuration at startup

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use crate::core::config::BotConfig;

/// Initialize the global logger.
///
/// Call sites use the `log` macros; records are forwarded into a `tracing`
/// fmt subscriber filtered by `RUST_LOG` (default `info`).
///
/// # Returns
/// * `Ok(())` - Logger initialized successfully
/// * `Err(anyhow::Error)` - A logger was already installed
pub fn init_logger() -> Result<()> {
    tracing_log::LogTracer::init().map_err(|e| anyhow::anyhow!("Failed to install log bridge: {}", e))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).with_target(true).finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

/// Logs the effective configuration at application startup.
///
/// Tokens and keys are reported as set/unset only.
pub fn log_startup_configuration(config: &BotConfig) {
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("📦 filerelay configuration");
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("Channel: {}", config.channel.display_name());
    log::info!("Admins: {}", config.admin_ids.len());
    match config.webhook_endpoint() {
        Some(endpoint) => log::info!("Webhook: {}", endpoint),
        None => log::warn!("⚠️  WEBHOOK_URL: not set (GET /setwebhook will answer 400)"),
    }
    log::info!(
        "Webhook secret: {}",
        if config.webhook_secret.is_some() { "set" } else { "not set" }
    );
    if let Some(ref api_url) = config.bot_api_url {
        log::info!("Bot API URL: {}", api_url);
    }
    if config.api_key.is_some() {
        log::info!("REST API: enabled, files in {}", config.upload_folder.display());
    } else {
        log::warn!("⚠️  ADMIN_API_KEY: not set, REST API will answer 503");
    }
    log::info!(
        "Rate limit: {} uploads / {}s",
        config.rate_limit_max,
        config.rate_limit_window.as_secs()
    );
    match config.max_file_size_bytes {
        Some(bytes) => log::info!("Max file size: {} MB", bytes / 1024 / 1024),
        None => log::info!("Max file size: unlimited"),
    }
    match config.retention {
        Some(age) => log::info!(
            "Retention: {}h (sweep every {}s)",
            age.as_secs() / 3600,
            config.sweep_interval.as_secs()
        ),
        None => log::info!("Retention: disabled"),
    }
    log::info!("Dedup uploads: {}", config.dedup_uploads);
    log::info!(
        "Registry mirror: {}",
        if config.redis_url.is_some() { "redis" } else { "memory only" }
    );
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}
