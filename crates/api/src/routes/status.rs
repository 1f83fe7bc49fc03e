use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::{routing::get, Json, Router};

use crate::export::status::{historical, StatusReport};
use crate::state::AppState;

/// GET /status -- slot health, gameplay, stream state, per-series summaries,
/// recent alerts and the effective configuration.
async fn status(State(state): State<AppState>) -> Response {
    let snapshot = state.monitor.snapshot().await;
    Json(StatusReport::build(&snapshot, &state.config)).into_response()
}

/// GET /alerts -- bounded alert history, most-recent-first.
async fn alerts(State(state): State<AppState>) -> Response {
    Json(state.monitor.snapshot().await.alerts).into_response()
}

/// GET /historical -- ring buffer contents by category, then slot.
async fn history(State(state): State<AppState>) -> Response {
    let snapshot = state.monitor.snapshot().await;
    Json(historical(&snapshot)).into_response()
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/status", get(status))
        .route("/alerts", get(alerts))
        .route("/historical", get(history))
}
