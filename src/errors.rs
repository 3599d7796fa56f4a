use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("payment gateway error: {0}")]
    Gateway(String),

    #[error("invalid webhook signature")]
    InvalidSignature,

    #[error("unauthorized")]
    Unauthorized,

    #[error("store error: {0}")]
    Store(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl AppError {
    pub fn store(e: anyhow::Error) -> Self {
        AppError::Store(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Gateway/store details go to the log, never to the caller.
        let (status, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, format!("not found: {msg}")),
            AppError::InvalidSignature => {
                tracing::warn!("webhook rejected: invalid signature");
                (StatusCode::BAD_REQUEST, "invalid signature".to_string())
            }
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".to_string()),
            AppError::Gateway(detail) => {
                tracing::error!(error = %detail, "payment gateway failure");
                (
                    StatusCode::BAD_GATEWAY,
                    "payment provider is unavailable, please try again".to_string(),
                )
            }
            AppError::Store(detail) => {
                tracing::error!(error = %detail, "store failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                )
            }
            AppError::Config(detail) => {
                tracing::error!(error = %detail, "configuration failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                )
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}
