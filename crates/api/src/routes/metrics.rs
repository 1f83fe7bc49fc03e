use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::{routing::get, Router};
use slotwatch_core::sample::Slot;

use crate::error::AppResult;
use crate::export::exposition;
use crate::state::AppState;

/// GET /metrics -- Prometheus text exposition, rebuilt on every scrape.
async fn metrics(State(state): State<AppState>) -> AppResult<Response> {
    let snapshot = state.monitor.snapshot().await;
    let polled: Vec<Slot> = state.config.slots.iter().map(|target| target.slot).collect();
    let body = exposition::render(&snapshot, &polled)?;
    Ok(([(CONTENT_TYPE, exposition::CONTENT_TYPE)], body).into_response())
}

pub fn router() -> Router<AppState> {
    Router::new().route("/metrics", get(metrics))
}
