pub mod health;
pub mod metrics;
pub mod status;

use axum::http::StatusCode;
use axum::Router;

use crate::state::AppState;

/// All monitor routes plus the plain-text 404 fallback.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(metrics::router())
        .merge(status::router())
        .fallback(not_found)
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not Found\n")
}
