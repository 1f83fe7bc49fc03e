//! Integration tests for the metrics, status, alerts and historical endpoints.

mod common;

use axum::http::{header, StatusCode};
use chrono::Utc;
use common::{body_json, body_text, build_test_app, get, test_config};
use slotwatch_collector::frames::GameFrame;
use slotwatch_core::health::CheckOutcome;
use slotwatch_core::sample::Slot;

fn check(healthy: bool, status: u16, response_time_ms: f64) -> CheckOutcome {
    CheckOutcome {
        healthy,
        response_time_ms,
        status_code: Some(status),
        error: (!healthy).then(|| format!("health endpoint returned HTTP {status}")),
        checked_at: Utc::now(),
    }
}

fn frame(json: &str) -> GameFrame {
    GameFrame::parse(json).expect("valid frame")
}

// ---------------------------------------------------------------------------
// Test: /metrics is valid exposition text with sentinel values before polling
// ---------------------------------------------------------------------------

#[tokio::test]
async fn metrics_are_valid_exposition_before_first_poll() {
    let (app, _monitor) = build_test_app(test_config(&[]));
    let response = get(app, "/metrics").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/plain; version=0.0.4"
    );

    let text = body_text(response).await;
    for line in text.lines().filter(|l| !l.is_empty()) {
        let ok = line.starts_with("# HELP ")
            || line.starts_with("# TYPE ")
            || line
                .rsplit_once(' ')
                .is_some_and(|(series, value)| {
                    series.starts_with("slotwatch_") && value.parse::<f64>().is_ok()
                });
        assert!(ok, "invalid exposition line: {line}");
    }
    assert!(text.contains(r#"slotwatch_metric_value{category="health",slot="blue"} 0"#));
    assert!(text.contains(r#"slotwatch_metric_value{category="health",slot="green"} 0"#));
    assert!(text.contains("slotwatch_stream_connected 0"));
}

// ---------------------------------------------------------------------------
// Test: /status lists every configured slot even before the first poll
// ---------------------------------------------------------------------------

#[tokio::test]
async fn status_reports_unknown_slots_before_first_poll() {
    let (app, _monitor) = build_test_app(test_config(&[("BLUE_URL", "http://blue.internal:8080")]));
    let response = get(app, "/status").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;

    for slot in ["blue", "green"] {
        assert_eq!(json["slots"][slot]["healthy"], false, "{slot}");
        assert_eq!(json["slots"][slot]["checksTotal"], 0, "{slot}");
    }
    assert_eq!(json["slots"]["blue"]["url"], "http://blue.internal:8080");
    assert!(json["uptime"].as_f64().unwrap() >= 0.0);
    assert_eq!(json["checks"], 0);
    assert!(json["gameplay"]["fps"].is_null());
    assert_eq!(json["recentAlerts"], serde_json::json!([]));
}

// ---------------------------------------------------------------------------
// Test: a low-fps update shows up in /status and /alerts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn low_fps_update_is_visible_in_status_and_alerts() {
    let (app, monitor) = build_test_app(test_config(&[]));
    monitor
        .record_frame(frame(r#"{"type":"performance_update","data":{"fps":20}}"#))
        .await;

    let status = body_json(get(app.clone(), "/status").await).await;
    assert_eq!(status["gameplay"]["fps"], 20.0);

    let alerts = body_json(get(app, "/alerts").await).await;
    let alerts = alerts.as_array().unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0]["category"], "fps");
    assert_eq!(alerts[0]["severity"], "critical");
    assert_eq!(alerts[0]["state"], "open");
    assert_eq!(alerts[0]["id"], "game:fps:low_fps");
}

// ---------------------------------------------------------------------------
// Test: a resolved fps alert carries resolvedAt after openedAt
// ---------------------------------------------------------------------------

#[tokio::test]
async fn resolved_alert_is_reported_once_as_resolved() {
    let (app, monitor) = build_test_app(test_config(&[]));
    monitor
        .record_frame(frame(r#"{"type":"performance_update","data":{"fps":20}}"#))
        .await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    monitor
        .record_frame(frame(r#"{"type":"performance_update","data":{"fps":60}}"#))
        .await;

    let alerts = body_json(get(app, "/alerts").await).await;
    let alerts = alerts.as_array().unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0]["state"], "resolved");

    let opened: chrono::DateTime<Utc> = alerts[0]["openedAt"].as_str().unwrap().parse().unwrap();
    let resolved: chrono::DateTime<Utc> =
        alerts[0]["resolvedAt"].as_str().unwrap().parse().unwrap();
    assert!(resolved > opened);
}

// ---------------------------------------------------------------------------
// Test: /historical groups samples by category, then slot
// ---------------------------------------------------------------------------

#[tokio::test]
async fn historical_returns_buffers_by_category_and_slot() {
    let (app, monitor) = build_test_app(test_config(&[("HISTORY_CAPACITY", "2")]));
    monitor.record_check(Slot::Blue, check(false, 500, 4.0)).await;
    monitor.record_check(Slot::Blue, check(false, 500, 5.0)).await;
    monitor.record_check(Slot::Blue, check(true, 200, 6.0)).await;

    let response = get(app, "/historical").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;

    let latency = json["latency"]["blue"].as_array().unwrap();
    assert_eq!(latency.len(), 2);
    assert_eq!(latency[0]["value"], 5.0);
    assert_eq!(latency[1]["value"], 6.0);
    assert_eq!(json["health"]["blue"][1]["value"], 1.0);
    assert!(json["health"].get("green").is_none());
}

// ---------------------------------------------------------------------------
// Test: polled values and counters reach /metrics
// ---------------------------------------------------------------------------

#[tokio::test]
async fn metrics_reflect_checks_and_alerts() {
    let (app, monitor) = build_test_app(test_config(&[]));
    monitor.record_check(Slot::Green, check(false, 503, 8.0)).await;
    monitor.record_check(Slot::Green, check(false, 503, 9.0)).await;

    let text = body_text(get(app, "/metrics").await).await;

    assert!(text.contains(r#"slotwatch_metric_value{category="latency",slot="green"} 9"#));
    assert!(text.contains(r#"slotwatch_metric_average{category="latency",slot="green"} 8.5"#));
    assert!(text.contains(r#"slotwatch_slot_consecutive_failures{slot="green"} 2"#));
    assert!(text.contains("slotwatch_checks_total 2"));
    assert!(text.contains("slotwatch_alerts_total 1"));
    assert!(text.contains("slotwatch_alerts_open 1"));
}
