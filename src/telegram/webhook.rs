//! Webhook endpoints: update intake and webhook registration

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use secrecy::ExposeSecret;
use serde_json::json;

use crate::core::config::BotConfig;
use crate::core::error::AppResult;
use crate::core::web_server::AppState;
use crate::telegram::api::TelegramApi;
use crate::telegram::handlers::handle_update;
use crate::telegram::update::decode_update;

/// Header Telegram echoes the `secret_token` given to `setWebhook` in.
pub const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/webhook", post(webhook_handler))
        .route("/setwebhook", get(set_webhook_handler))
}

/// POST /webhook
///
/// Always answers 200 once the secret matches, so Telegram never retries an
/// update the bot could not make sense of.
async fn webhook_handler(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let presented = headers.get(SECRET_HEADER).and_then(|value| value.to_str().ok());
    if !state.deps.config.webhook_secret_matches(presented) {
        log::warn!("Rejected webhook call with a wrong or missing secret token");
        return (StatusCode::UNAUTHORIZED, Json(json!({"ok": false}))).into_response();
    }

    let update = decode_update(&body);
    handle_update(&state.deps, update).await;

    Json(json!({"ok": true})).into_response()
}

/// GET /setwebhook
async fn set_webhook_handler(State(state): State<AppState>) -> Response {
    let Some(endpoint) = state.deps.config.webhook_endpoint() else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"success": false, "error": "WEBHOOK_URL is not configured"})),
        )
            .into_response();
    };

    match register_webhook(state.deps.api.as_ref(), &state.deps.config, &endpoint).await {
        Ok(()) => Json(json!({
            "success": true,
            "webhook_set": true,
            "webhook_url": endpoint,
        }))
        .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"success": false, "error": e.to_string()})),
        )
            .into_response(),
    }
}

/// Registers `endpoint` with Telegram, passing the configured secret along.
pub async fn register_webhook(api: &dyn TelegramApi, config: &BotConfig, endpoint: &str) -> AppResult<()> {
    let secret = config.webhook_secret.as_ref().map(|s| s.expose_secret());
    api.set_webhook(endpoint, secret).await?;
    log::info!("Webhook registered at {}", endpoint);
    Ok(())
}
