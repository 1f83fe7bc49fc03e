//! Per-slot service health state carried between polling cycles.

use serde::Serialize;

use crate::types::Timestamp;

/// Result of one health check against a deployment slot.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckOutcome {
    pub healthy: bool,
    /// Round-trip time, or time until the failure was determined.
    pub response_time_ms: f64,
    pub status_code: Option<u16>,
    pub error: Option<String>,
    pub checked_at: Timestamp,
}

/// Minimal state the monitor keeps per slot.
///
/// [`Default`] is the "unknown" sentinel reported before the first check:
/// unhealthy, zero response time, never checked.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotHealth {
    pub healthy: bool,
    pub last_response_time_ms: f64,
    pub last_checked_at: Option<Timestamp>,
    pub consecutive_failures: u32,
    pub last_status_code: Option<u16>,
    pub last_error: Option<String>,
    pub checks_total: u64,
    pub successes_total: u64,
}

impl SlotHealth {
    pub fn record(&mut self, outcome: &CheckOutcome) {
        self.healthy = outcome.healthy;
        self.last_response_time_ms = outcome.response_time_ms;
        self.last_checked_at = Some(outcome.checked_at);
        self.last_status_code = outcome.status_code;
        self.last_error = outcome.error.clone();
        self.checks_total += 1;
        if outcome.healthy {
            self.successes_total += 1;
            self.consecutive_failures = 0;
        } else {
            self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        }
    }

    /// Share of successful checks since start, as a percentage.
    ///
    /// Zero before the first check.
    pub fn uptime_percent(&self) -> f64 {
        if self.checks_total == 0 {
            return 0.0;
        }
        self.successes_total as f64 * 100.0 / self.checks_total as f64
    }
}
