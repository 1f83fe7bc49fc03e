//! Well-known message types and metric names.
//!
//! These are the discriminators used on the game WebSocket protocol and the
//! metric family names published on `/metrics`.

/// Outbound frame asking the game instance to start streaming channels.
pub const MSG_TYPE_SUBSCRIBE: &str = "subscribe";

/// Frame rate, frame time, entity count and memory usage bundle.
///
/// This is the primary liveness signal for gameplay health and the only
/// frame type that triggers threshold evaluation.
pub const MSG_TYPE_PERFORMANCE_UPDATE: &str = "performance_update";

/// Average pathfinding request time.
pub const MSG_TYPE_PATHFINDING_METRICS: &str = "pathfinding_metrics";

/// Average unit-selection time.
pub const MSG_TYPE_SELECTION_METRICS: &str = "selection_metrics";

/// Resource usage (memory) report.
pub const MSG_TYPE_RESOURCE_METRICS: &str = "resource_metrics";

/// Channels requested in the subscribe frame when none are configured.
pub const DEFAULT_CHANNELS: [&str; 4] = ["performance", "pathfinding", "selection", "resources"];

/// Latest value per `(slot, category)` series.
pub const METRIC_VALUE: &str = "slotwatch_metric_value";

/// Rolling mean over the ring buffer per `(slot, category)` series.
pub const METRIC_AVERAGE: &str = "slotwatch_metric_average";

/// 1 when the last health check of a slot succeeded.
pub const METRIC_SLOT_UP: &str = "slotwatch_slot_up";

/// Current run of failed health checks per slot.
pub const METRIC_SLOT_CONSECUTIVE_FAILURES: &str = "slotwatch_slot_consecutive_failures";

/// Seconds since the monitor started.
pub const METRIC_UPTIME_SECONDS: &str = "slotwatch_uptime_seconds";

/// Health checks performed across all slots.
pub const METRIC_CHECKS_TOTAL: &str = "slotwatch_checks_total";

/// Alert lifecycles opened since start.
pub const METRIC_ALERTS_TOTAL: &str = "slotwatch_alerts_total";

/// Alerts currently open.
pub const METRIC_ALERTS_OPEN: &str = "slotwatch_alerts_open";

/// 1 while the game WebSocket is connected.
pub const METRIC_STREAM_CONNECTED: &str = "slotwatch_stream_connected";
