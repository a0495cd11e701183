use thiserror::Error;

/// Centralized error types for the application
///
/// Workflows convert every failure into this enum, log it, and turn it into a
/// chat reply or an HTTP status. Nothing here is fatal once the server runs.
///
/// # Example
///
/// ```no_run
/// use filerelay::core::error::AppError;
///
/// fn handle_error(err: AppError) {
///     eprintln!("Error: {}", err);
/// }
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// Transport or decoding failure talking to the Bot API
    #[error("Telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    /// The Bot API answered, but with `ok: false`
    #[error("Telegram API rejected {method}: {description}")]
    Api { method: &'static str, description: String },

    /// HTTP client construction errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO errors (REST file store)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Key-value mirror errors
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// URL parsing errors
    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Anyhow errors (for general error handling)
    #[error("Application error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

impl AppError {
    /// Name of the upstream method for API errors, used in log lines.
    pub fn api_method(&self) -> Option<&'static str> {
        match self {
            AppError::Api { method, .. } => Some(*method),
            _ => None,
        }
    }
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;
