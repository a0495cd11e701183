//! REST file API under `/api`, guarded by a bearer key.

use axum::{
    extract::{Multipart, Path, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;

use crate::core::error::AppError;
use crate::core::web_server::AppState;

/// Multipart field carrying the uploaded file.
pub const UPLOAD_FIELD: &str = "fileuploader";

/// Routes to be nested under `/api`.
pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload_handler))
        .route("/files", get(list_handler))
        .route("/files/{name}", get(download_handler).delete(delete_handler))
        .route("/info/{name}", get(info_handler))
        .route("/stats", get(stats_handler))
        .route_layer(middleware::from_fn_with_state(state, require_api_key))
}

fn error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({"error": message.into()}))).into_response()
}

fn internal(err: AppError) -> Response {
    log::error!("File API failure: {}", err);
    error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}

fn not_found() -> Response {
    error(StatusCode::NOT_FOUND, "File not found")
}

async fn require_api_key(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if state.deps.config.api_key.is_none() {
        return error(StatusCode::SERVICE_UNAVAILABLE, "API key is not configured");
    }

    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));
    let Some(presented) = presented else {
        return error(StatusCode::UNAUTHORIZED, "Missing or invalid Authorization header");
    };
    if !state.deps.config.api_key_matches(presented.trim()) {
        log::warn!("Rejected file API call with an invalid key");
        return error(StatusCode::FORBIDDEN, "Invalid API key");
    }

    next.run(request).await
}

/// Absolute URL clients can fetch `name` from.
fn download_url(state: &AppState, headers: &HeaderMap, name: &str) -> String {
    let base = state.deps.config.webhook_url.clone().or_else(|| {
        headers
            .get(header::HOST)
            .and_then(|host| host.to_str().ok())
            .map(|host| format!("http://{}", host))
    });
    format!("{}/api/files/{}", base.unwrap_or_default(), name)
}

/// POST /api/upload
async fn upload_handler(State(state): State<AppState>, headers: HeaderMap, mut multipart: Multipart) -> Response {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return error(StatusCode::BAD_REQUEST, e.body_text()),
        };
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let original = field.file_name().unwrap_or_default().to_string();
        if original.trim().is_empty() {
            return error(StatusCode::BAD_REQUEST, "No file selected");
        }
        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => return error(StatusCode::BAD_REQUEST, e.body_text()),
        };

        return match state.files.save(&original, &bytes).await {
            Ok(stored) => Json(json!({
                "success": true,
                "downloadUrl": download_url(&state, &headers, &stored.name),
                "fileName": stored.name,
                "fileInfo": stored,
            }))
            .into_response(),
            Err(e) => internal(e),
        };
    }

    error(StatusCode::BAD_REQUEST, "No file provided")
}

/// GET /api/files
async fn list_handler(State(state): State<AppState>) -> Response {
    match state.files.list().await {
        Ok(files) => {
            let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
            Json(json!({"success": true, "files": names, "fileDetails": files})).into_response()
        }
        Err(e) => internal(e),
    }
}

/// GET /api/files/{name}
async fn download_handler(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    match state.files.read(&name).await {
        Ok(Some(bytes)) => (
            [
                (header::CONTENT_TYPE, "application/octet-stream".to_string()),
                (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", name)),
            ],
            bytes,
        )
            .into_response(),
        Ok(None) => not_found(),
        Err(e) => internal(e),
    }
}

/// DELETE /api/files/{name}
async fn delete_handler(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    match state.files.delete(&name).await {
        Ok(true) => Json(json!({"success": true, "message": "File deleted"})).into_response(),
        Ok(false) => not_found(),
        Err(e) => internal(e),
    }
}

/// GET /api/info/{name}
async fn info_handler(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    match state.files.info(&name).await {
        Ok(Some(info)) => Json(json!({"success": true, "fileInfo": info})).into_response(),
        Ok(None) => not_found(),
        Err(e) => internal(e),
    }
}

/// GET /api/stats
async fn stats_handler(State(state): State<AppState>) -> Response {
    match state.files.stats().await {
        Ok(stats) => Json(json!({"success": true, "stats": stats})).into_response(),
        Err(e) => internal(e),
    }
}
