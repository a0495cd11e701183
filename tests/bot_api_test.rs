//! BotApi against a mocked Bot API server (wiremock)
//!
//! Run with: cargo test --test bot_api_test

use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use filerelay::core::config::ChannelTarget;
use filerelay::core::error::AppError;
use filerelay::storage::registry::FileKind;
use filerelay::telegram::api::{BotApi, TelegramApi};

/// Test harness pointing both BotApi clients at one mock server
struct MockBotApi {
    server: MockServer,
    api: BotApi,
}

impl MockBotApi {
    async fn new() -> Self {
        let server = MockServer::start().await;
        let bot = teloxide::Bot::new("test_token_12345:ABCDEF").set_api_url(server.uri().parse().unwrap());
        let api = BotApi::from_bots(bot.clone(), bot);
        Self { server, api }
    }

    /// Answers `method` (case-insensitive) with `result`.
    async fn mock_ok(&self, name: &str, result: serde_json::Value) {
        Mock::given(method("POST"))
            .and(path_regex(format!("(?i)/bot[^/]+/{}$", name)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true, "result": result})))
            .mount(&self.server)
            .await;
    }

    async fn mock_error(&self, name: &str, description: &str) {
        Mock::given(method("POST"))
            .and(path_regex(format!("(?i)/bot[^/]+/{}$", name)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": false,
                "error_code": 400,
                "description": description
            })))
            .mount(&self.server)
            .await;
    }
}

fn message(id: i32, chat_id: i64) -> serde_json::Value {
    json!({
        "message_id": id,
        "from": {"id": 987654321, "is_bot": true, "first_name": "TestBot", "username": "test_bot"},
        "chat": {"id": chat_id, "type": "private", "first_name": "Test"},
        "date": 1735992000,
        "text": "ok"
    })
}

#[tokio::test]
async fn test_send_message_returns_message_id() {
    let mock = MockBotApi::new().await;
    mock.mock_ok("sendMessage", message(42, 123456789)).await;

    let id = mock.api.send_message(123456789, "hello", None).await.unwrap();
    assert_eq!(id, 42);
}

#[tokio::test]
async fn test_send_file_uses_kind_method_and_channel() {
    let mock = MockBotApi::new().await;
    Mock::given(method("POST"))
        .and(path_regex("(?i)/bot[^/]+/sendDocument$"))
        .and(body_string_contains("@relay_files"))
        .and(body_string_contains("BQACAgIAAxkBAAIB"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true, "result": message(77, 1)})))
        .expect(1)
        .mount(&mock.server)
        .await;

    let channel = ChannelTarget::Username("relay_files".to_string());
    let id = mock
        .api
        .send_file(&channel, FileKind::Document, "BQACAgIAAxkBAAIB", Some("caption"))
        .await
        .unwrap();
    assert_eq!(id, 77);
}

#[tokio::test]
async fn test_rejection_maps_to_api_error_with_method() {
    let mock = MockBotApi::new().await;
    mock.mock_error("deleteMessage", "Bad Request: message to delete not found").await;

    let err = mock
        .api
        .delete_message(&ChannelTarget::Id(-1001234567890), 5)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Api { method: "deleteMessage", .. }));
}

#[tokio::test]
async fn test_webhook_management_and_get_me() {
    let mock = MockBotApi::new().await;
    mock.mock_ok("setWebhook", json!(true)).await;
    mock.mock_ok("deleteWebhook", json!(true)).await;
    mock.mock_ok(
        "getMe",
        json!({
            "id": 987654321,
            "is_bot": true,
            "first_name": "Relay",
            "username": "relay_test_bot",
            "can_join_groups": true,
            "can_read_all_group_messages": false,
            "supports_inline_queries": false,
            "can_connect_to_business": false,
            "has_main_web_app": false
        }),
    )
    .await;

    mock.api
        .set_webhook("https://bot.example.com/webhook", Some("s3cret"))
        .await
        .unwrap();
    mock.api.delete_webhook().await.unwrap();
    assert_eq!(
        mock.api.get_me_username().await.unwrap().as_deref(),
        Some("relay_test_bot")
    );
}

#[tokio::test]
async fn test_callback_answer_and_chat_action() {
    let mock = MockBotApi::new().await;
    mock.mock_ok("answerCallbackQuery", json!(true)).await;
    mock.mock_ok("sendChatAction", json!(true)).await;

    mock.api.answer_callback_query("cb-1", Some("done")).await.unwrap();
    mock.api.send_upload_action(123456789, FileKind::Photo).await.unwrap();
}

#[tokio::test]
async fn test_setup_bot_commands() {
    let mock = MockBotApi::new().await;
    Mock::given(method("POST"))
        .and(path_regex("(?i)/bot[^/]+/setMyCommands$"))
        .and(body_string_contains("broadcast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true, "result": true})))
        .expect(1)
        .mount(&mock.server)
        .await;

    mock.api.setup_bot_commands().await.unwrap();
}
