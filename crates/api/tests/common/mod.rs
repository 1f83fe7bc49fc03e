use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use slotwatch_api::config::MonitorConfig;
use slotwatch_api::router::build_app_router;
use slotwatch_api::state::AppState;
use slotwatch_collector::monitor::Monitor;
use slotwatch_events::AlertNotifier;

/// Build a test `MonitorConfig` from defaults plus `vars`.
pub fn test_config(vars: &[(&str, &str)]) -> MonitorConfig {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    MonitorConfig::from_lookup(|var| map.get(var).cloned()).unwrap()
}

/// Build the full application router around a fresh monitor.
///
/// Returns the monitor too so tests can feed it samples directly.
pub fn build_test_app(config: MonitorConfig) -> (Router, Arc<Monitor>) {
    let monitor = Arc::new(Monitor::new(
        config.monitor_settings(),
        AlertNotifier::new(None).unwrap(),
    ));
    let state = AppState {
        monitor: Arc::clone(&monitor),
        config: Arc::new(config),
    };
    (build_app_router(state), monitor)
}

pub async fn send(app: Router, method: Method, uri: &str) -> Response {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response {
    send(app, Method::GET, uri).await
}

pub async fn body_text(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
