use std::sync::Arc;

use slotwatch_collector::monitor::Monitor;

use crate::config::MonitorConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything lives behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Owner of samples, slot health, alerts and stream status.
    pub monitor: Arc<Monitor>,
    pub config: Arc<MonitorConfig>,
}
