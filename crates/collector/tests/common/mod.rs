use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use slotwatch_collector::monitor::{Monitor, MonitorSettings, MonitorSnapshot};
use slotwatch_core::sample::Slot;
use slotwatch_core::thresholds::ThresholdConfig;
use slotwatch_events::AlertNotifier;
use tokio::time::Instant;

pub type Received = Arc<Mutex<Vec<serde_json::Value>>>;

/// Serve `app` on an ephemeral localhost port.
pub async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Spawn a webhook receiver that records every body posted to `/hook`.
pub async fn spawn_webhook_receiver() -> (String, Received) {
    let received: Received = Arc::default();

    async fn hook(State(received): State<Received>, Json(body): Json<serde_json::Value>) {
        received.lock().unwrap().push(body);
    }

    let app = Router::new()
        .route("/hook", post(hook))
        .with_state(Arc::clone(&received));
    let addr = serve(app).await;
    (format!("http://{addr}/hook"), received)
}

/// Build a monitor with default thresholds for the given slots.
pub fn build_monitor(slots: &[Slot], webhook_url: Option<String>, stream_enabled: bool) -> Arc<Monitor> {
    Arc::new(Monitor::new(
        MonitorSettings {
            slots: slots.to_vec(),
            thresholds: ThresholdConfig::default(),
            history_capacity: 60,
            alert_history_limit: 100,
            stream_enabled,
        },
        AlertNotifier::new(webhook_url).unwrap(),
    ))
}

/// Re-check the monitor every 20ms until `condition` holds, panicking after 5s.
pub async fn wait_for<F>(monitor: &Monitor, what: &str, condition: F) -> MonitorSnapshot
where
    F: Fn(&MonitorSnapshot) -> bool,
{
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let snapshot = monitor.snapshot().await;
        if condition(&snapshot) {
            return snapshot;
        }
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// Wait until the receiver has recorded at least `count` bodies.
pub async fn wait_for_posts(received: &Received, count: usize) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while received.lock().unwrap().len() < count {
        assert!(Instant::now() < deadline, "timed out waiting for {count} webhook posts");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
