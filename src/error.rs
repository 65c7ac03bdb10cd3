//! Error types for pingu-bot.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Startup and server errors surfaced from `main`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Reply client error: {0}")]
    Reply(#[from] ReplyError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors. Only raised at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Delivery-level failures. Any of these rejects the whole delivery.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error(transparent)]
    Adapt(#[from] AdaptError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl WebhookError {
    /// HTTP status surfaced to the platform for this rejection.
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::Adapt(_) | WebhookError::Parse(_) => StatusCode::BAD_REQUEST,
            WebhookError::Auth(_) => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        (
            self.status_code(),
            Json(serde_json::json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}

/// The inbound delivery looked like an envelope but could not be unwrapped.
#[derive(Debug, thiserror::Error)]
pub enum AdaptError {
    #[error("Bad envelope: {0}")]
    BadEnvelope(String),
}

/// Signature verification failures.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing signature header")]
    MissingSignature,

    #[error("Invalid signature")]
    InvalidSignature,
}

/// The authenticated body did not decode into an event batch.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Malformed event batch: {0}")]
    MalformedBatch(#[source] serde_json::Error),
}

/// Per-reply failures. Recorded by the dispatch loop, never fatal to a delivery.
#[derive(Debug, thiserror::Error)]
pub enum ReplyError {
    #[error("Reply transport failed: {0}")]
    Transport(String),

    #[error("Reply rejected by platform ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Result type alias for pingu-bot.
pub type Result<T> = std::result::Result<T, Error>;
