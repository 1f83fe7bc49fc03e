//! Timer-driven health polling of deployment slots.
//!
//! Each slot gets its own task and ticker, so a slow or dead slot never
//! delays checks of the other. A tick always produces a [`CheckOutcome`]:
//! fetch errors become failed outcomes rather than propagating.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use slotwatch_core::health::CheckOutcome;
use slotwatch_core::sample::Slot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::monitor::Monitor;

/// Default interval between health checks of one slot.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Default timeout for a single health request.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(10);

/// Why a health check failed.
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("request timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("health endpoint returned HTTP {0}")]
    HttpStatus(u16),
}

/// A deployment slot and the base URL its `/health` lives under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotTarget {
    pub slot: Slot,
    pub base_url: String,
}

impl SlotTarget {
    pub fn new(slot: Slot, base_url: impl Into<String>) -> Self {
        Self {
            slot,
            base_url: base_url.into(),
        }
    }

    pub fn health_url(&self) -> String {
        format!("{}/health", self.base_url.trim_end_matches('/'))
    }
}

/// Issues health requests with a bounded timeout.
#[derive(Debug, Clone)]
pub struct HealthPoller {
    client: reqwest::Client,
    timeout: Duration,
}

impl HealthPoller {
    pub fn new(timeout: Duration) -> Result<Self, PollError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, timeout })
    }

    /// Check one slot. Never fails: errors are folded into the outcome,
    /// with the response time measured until the failure was known.
    pub async fn check(&self, target: &SlotTarget) -> CheckOutcome {
        let started = Instant::now();
        let result = self.fetch(target).await;
        let response_time_ms = started.elapsed().as_secs_f64() * 1000.0;
        let checked_at = Utc::now();

        match result {
            Ok(status) => CheckOutcome {
                healthy: true,
                response_time_ms,
                status_code: Some(status),
                error: None,
                checked_at,
            },
            Err(e) => {
                let status_code = match e {
                    PollError::HttpStatus(code) => Some(code),
                    _ => None,
                };
                CheckOutcome {
                    healthy: false,
                    response_time_ms,
                    status_code,
                    error: Some(e.to_string()),
                    checked_at,
                }
            }
        }
    }

    async fn fetch(&self, target: &SlotTarget) -> Result<u16, PollError> {
        let response = self
            .client
            .get(target.health_url())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PollError::Timeout(self.timeout)
                } else {
                    PollError::Request(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PollError::HttpStatus(status.as_u16()));
        }
        Ok(status.as_u16())
    }
}

/// Poll one slot until `cancel` fires.
///
/// The first check runs immediately. An in-flight request is allowed to
/// finish (or time out) before cancellation is observed.
pub async fn run_slot(
    poller: HealthPoller,
    target: SlotTarget,
    interval: Duration,
    monitor: Arc<Monitor>,
    cancel: CancellationToken,
) {
    tracing::info!(
        slot = %target.slot,
        url = %target.health_url(),
        interval_secs = interval.as_secs_f64(),
        "Health poller started",
    );

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!(slot = %target.slot, "Health poller stopping");
                break;
            }
            _ = ticker.tick() => {
                let outcome = poller.check(&target).await;
                if outcome.healthy {
                    tracing::debug!(
                        slot = %target.slot,
                        response_time_ms = outcome.response_time_ms,
                        "Health check passed",
                    );
                } else {
                    tracing::warn!(
                        slot = %target.slot,
                        status_code = ?outcome.status_code,
                        error = outcome.error.as_deref().unwrap_or_default(),
                        "Health check failed",
                    );
                }
                monitor.record_check(target.slot, outcome).await;
            }
        }
    }
}

/// Spawn one polling task per target.
pub fn spawn_pollers(
    poller: &HealthPoller,
    targets: &[SlotTarget],
    interval: Duration,
    monitor: &Arc<Monitor>,
    cancel: &CancellationToken,
) -> Vec<JoinHandle<()>> {
    targets
        .iter()
        .map(|target| {
            tokio::spawn(run_slot(
                poller.clone(),
                target.clone(),
                interval,
                Arc::clone(monitor),
                cancel.clone(),
            ))
        })
        .collect()
}
