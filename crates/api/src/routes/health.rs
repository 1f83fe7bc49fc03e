use axum::{routing::get, Router};

use crate::state::AppState;

/// GET /health -- liveness of the monitor itself.
async fn health_check() -> &'static str {
    "healthy\n"
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
