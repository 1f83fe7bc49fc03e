use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Every route renders from an in-memory snapshot, so the only failure left
/// is encoding the exposition output.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Metrics encoding failed: {0}")]
    Metrics(#[from] prometheus::Error),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::Metrics(err) => {
                tracing::error!(error = %err, "Failed to encode metrics");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };

        let body = json!({
            "error": "An internal error occurred",
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
