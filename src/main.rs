use anyhow::Result;
use dotenvy::dotenv;
use std::sync::Arc;
use std::time::Duration;

use filerelay::cli::{Cli, Commands};
use filerelay::core::config::{rate_limit, BotConfig};
use filerelay::core::rate_limiter::RateLimiter;
use filerelay::core::web_server::{start_web_server, AppState};
use filerelay::core::{init_logger, log_startup_configuration};
use filerelay::storage::files::FileStore;
use filerelay::storage::persist::{restore_registry, spawn_retention_sweep, RecordStore, RedisStore};
use filerelay::storage::registry::FileRegistry;
use filerelay::telegram::api::{BotApi, TelegramApi};
use filerelay::telegram::handlers::HandlerDeps;
use filerelay::telegram::webhook::register_webhook;

/// Main entry point
///
/// Parses CLI arguments and dispatches to the chosen subcommand.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // A panicking request task must not go unnoticed in the logs.
    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("Panic caught: {:?}", panic_info);
        if let Some(location) = panic_info.location() {
            log::error!("Panic at {}:{}:{}", location.file(), location.line(), location.column());
        }
    }));

    // Load environment variables from .env if present
    let _ = dotenv();

    init_logger()?;

    match cli.command {
        Some(Commands::Run { register_webhook }) => run_bot(register_webhook).await,
        None => run_bot(false).await,
        Some(Commands::SetWebhook) => set_webhook().await,
        Some(Commands::DeleteWebhook) => delete_webhook().await,
    }
}

async fn run_bot(register: bool) -> Result<()> {
    log::info!("Starting bot...");

    let config = Arc::new(BotConfig::from_env()?);
    log_startup_configuration(&config);

    let api = BotApi::new(&config)?;

    if let Err(e) = api.verify_channel(&config.channel).await {
        log::warn!(
            "Channel {} is not reachable yet ({}). Is the bot an administrator there?",
            config.channel.display_name(),
            e
        );
    }
    if let Err(e) = api.setup_bot_commands().await {
        log::warn!("Failed to publish bot commands: {}", e);
    }

    let bot_username = match config.bot_username.clone() {
        Some(name) => Some(name),
        None => match api.get_me_username().await {
            Ok(name) => name,
            Err(e) => {
                log::warn!("getMe failed, commands with @mentions will not be matched: {}", e);
                None
            }
        },
    };

    let registry = Arc::new(FileRegistry::new());
    let store = open_record_store(&config, &registry).await;

    let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit_max, config.rate_limit_window));
    Arc::clone(&rate_limiter).spawn_cleanup_task(Duration::from_secs(rate_limit::CLEANUP_INTERVAL_SECS));

    if let Some(retention) = config.retention {
        spawn_retention_sweep(Arc::clone(&registry), store.clone(), retention, config.sweep_interval);
        log::info!(
            "Retention sweep every {}s drops uploads older than {}h",
            config.sweep_interval.as_secs(),
            retention.as_secs() / 3600
        );
    }

    let api: Arc<dyn TelegramApi> = Arc::new(api);

    if register {
        match config.webhook_endpoint() {
            Some(endpoint) => {
                if let Err(e) = register_webhook(api.as_ref(), &config, &endpoint).await {
                    log::error!("Failed to register webhook: {}", e);
                }
            }
            None => log::warn!("--register-webhook given but WEBHOOK_URL is not set"),
        }
    }

    let files = FileStore::open(&config.upload_folder).await?;
    let deps = HandlerDeps::new(Arc::clone(&config), api, registry, rate_limiter, store)
        .with_bot_username(bot_username);

    start_web_server(config.web_port, AppState::new(deps, files)).await
}

/// Connects the Redis mirror when configured and reloads its records.
async fn open_record_store(config: &BotConfig, registry: &FileRegistry) -> Option<Arc<dyn RecordStore>> {
    let url = config.redis_url.as_deref()?;
    let store = match RedisStore::connect(url).await {
        Ok(store) => store,
        Err(e) => {
            log::error!("Redis mirror unavailable, continuing in memory only: {}", e);
            return None;
        }
    };

    match restore_registry(&store, registry).await {
        Ok(count) => log::info!("Restored {} uploads from Redis", count),
        Err(e) => log::warn!("Failed to restore uploads from Redis: {}", e),
    }
    Some(Arc::new(store))
}

async fn set_webhook() -> Result<()> {
    let config = BotConfig::from_env()?;
    let endpoint = config
        .webhook_endpoint()
        .ok_or_else(|| anyhow::anyhow!("WEBHOOK_URL is not set"))?;
    let api = BotApi::new(&config)?;
    register_webhook(&api, &config, &endpoint).await?;
    println!("Webhook set to {}", endpoint);
    Ok(())
}

async fn delete_webhook() -> Result<()> {
    let config = BotConfig::from_env()?;
    let api = BotApi::new(&config)?;
    api.delete_webhook().await?;
    println!("Webhook deleted");
    Ok(())
}
