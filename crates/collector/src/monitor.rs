//! Shared monitor state.
//!
//! [`Monitor`] is the single owner of everything mutable: ring buffers,
//! per-slot health, the alert manager, the latest gameplay snapshot and
//! stream connection status. Producers (pollers, the stream consumer) call
//! into it; HTTP handlers read consistent copies via [`Monitor::snapshot`].
//!
//! Each producer call holds the write lock for its whole batch of samples,
//! so samples of one series are always stored in the order they were
//! produced. Alert notifications are dispatched after the lock is released.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::Serialize;
use slotwatch_core::alert::{Alert, AlertManager, AlertTransition};
use slotwatch_core::health::{CheckOutcome, SlotHealth};
use slotwatch_core::ring_buffer::MetricStore;
use slotwatch_core::sample::{Category, GameplaySnapshot, Sample, SampleSource, Slot};
use slotwatch_core::thresholds::ThresholdConfig;
use slotwatch_core::types::Timestamp;
use slotwatch_events::AlertNotifier;
use tokio::sync::RwLock;

use crate::frames::GameFrame;

/// Sizing and thresholds for a [`Monitor`].
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    /// Deployment slots polled over HTTP. Always reported in `/status`.
    pub slots: Vec<Slot>,
    pub thresholds: ThresholdConfig,
    pub history_capacity: usize,
    pub alert_history_limit: usize,
    /// Whether a game stream is configured at all.
    pub stream_enabled: bool,
}

/// Game stream connection status.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamStatus {
    pub enabled: bool,
    pub connected: bool,
    pub connects_total: u64,
    pub frames_total: u64,
    pub last_connected_at: Option<Timestamp>,
    pub last_message_at: Option<Timestamp>,
}

/// Point-in-time copy of the monitor state, used by the exporters.
#[derive(Debug, Clone)]
pub struct MonitorSnapshot {
    pub taken_at: Timestamp,
    pub started_at: Timestamp,
    pub checks_total: u64,
    pub alerts_total: u64,
    pub open_alerts: usize,
    pub slots: BTreeMap<Slot, SlotHealth>,
    pub gameplay: GameplaySnapshot,
    pub stream: StreamStatus,
    pub store: MetricStore,
    /// Bounded alert history, most-recent-first.
    pub alerts: Vec<Alert>,
}

impl MonitorSnapshot {
    pub fn uptime_seconds(&self) -> f64 {
        (self.taken_at - self.started_at)
            .to_std()
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0)
    }
}

struct MonitorState {
    store: MetricStore,
    alerts: AlertManager,
    slots: BTreeMap<Slot, SlotHealth>,
    gameplay: GameplaySnapshot,
    stream: StreamStatus,
    checks_total: u64,
    /// Stream samples stored but not yet evaluated, latest per category.
    /// Drained by the next performance update.
    pending: BTreeMap<Category, Sample>,
}

pub struct Monitor {
    state: RwLock<MonitorState>,
    thresholds: ThresholdConfig,
    notifier: AlertNotifier,
    started_at: Timestamp,
}

impl Monitor {
    pub fn new(settings: MonitorSettings, notifier: AlertNotifier) -> Self {
        let slots = settings
            .slots
            .iter()
            .map(|slot| (*slot, SlotHealth::default()))
            .collect();

        Self {
            state: RwLock::new(MonitorState {
                store: MetricStore::new(settings.history_capacity),
                alerts: AlertManager::new(settings.alert_history_limit),
                slots,
                gameplay: GameplaySnapshot::default(),
                stream: StreamStatus {
                    enabled: settings.stream_enabled,
                    ..Default::default()
                },
                checks_total: 0,
                pending: BTreeMap::new(),
            }),
            thresholds: settings.thresholds,
            notifier,
            started_at: Utc::now(),
        }
    }

    /// Record one health check: exactly one `health` and one `latency`
    /// sample, slot health update, and threshold evaluation.
    ///
    /// Latency is only evaluated for successful checks; a failed check is
    /// already covered by the health rule.
    pub async fn record_check(&self, slot: Slot, outcome: CheckOutcome) -> Vec<AlertTransition> {
        let health = Sample::flag(
            slot,
            Category::Health,
            outcome.healthy,
            outcome.checked_at,
            SampleSource::Poll,
        )
        .with_status_code(outcome.status_code)
        .with_error(outcome.error.clone());
        let latency = Sample::new(
            slot,
            Category::Latency,
            outcome.response_time_ms,
            outcome.checked_at,
            SampleSource::Poll,
        )
        .with_status_code(outcome.status_code)
        .with_error(outcome.error.clone());

        let transitions = {
            let mut state = self.state.write().await;
            state.slots.entry(slot).or_default().record(&outcome);
            state.checks_total += 1;

            let mut transitions = Vec::new();
            transitions.extend(state.alerts.observe(&health, &self.thresholds));
            if outcome.healthy {
                transitions.extend(state.alerts.observe(&latency, &self.thresholds));
            }
            state.store.record(health);
            state.store.record(latency);
            transitions
        };

        self.dispatch(&transitions);
        transitions
    }

    /// Store the samples carried by a stream frame.
    ///
    /// Timing and resource frames are held back until the next performance
    /// update, which replaces the gameplay snapshot and evaluates its own
    /// samples plus each held-back sample exactly once. A category carried by
    /// the update itself supersedes the held-back sample of that category.
    pub async fn record_frame(&self, frame: GameFrame) -> Vec<AlertTransition> {
        let now = Utc::now();
        let samples = frame.samples(now);

        let transitions = {
            let mut state = self.state.write().await;
            state.stream.frames_total += 1;
            state.stream.last_message_at = Some(now);

            for sample in &samples {
                state.store.record(sample.clone());
            }

            if let GameFrame::Performance(snapshot) = &frame {
                state.gameplay = GameplaySnapshot {
                    received_at: Some(now),
                    ..snapshot.clone()
                };
            }

            let mut transitions = Vec::new();
            if frame.triggers_evaluation() {
                for sample in &samples {
                    state.pending.remove(&sample.category());
                }
                let deferred = std::mem::take(&mut state.pending);
                for sample in samples.iter().chain(deferred.values()) {
                    transitions.extend(state.alerts.observe(sample, &self.thresholds));
                }
            } else {
                for sample in samples {
                    state.pending.insert(sample.category(), sample);
                }
            }
            transitions
        };

        self.dispatch(&transitions);
        transitions
    }

    pub async fn set_stream_connected(&self, connected: bool) {
        let mut state = self.state.write().await;
        state.stream.connected = connected;
        if connected {
            state.stream.connects_total += 1;
            state.stream.last_connected_at = Some(Utc::now());
        }
    }

    pub async fn snapshot(&self) -> MonitorSnapshot {
        let state = self.state.read().await;
        MonitorSnapshot {
            taken_at: Utc::now(),
            started_at: self.started_at,
            checks_total: state.checks_total,
            alerts_total: state.alerts.alerts_total(),
            open_alerts: state.alerts.open_count(),
            slots: state.slots.clone(),
            gameplay: state.gameplay.clone(),
            stream: state.stream.clone(),
            store: state.store.clone(),
            alerts: state.alerts.history().cloned().collect(),
        }
    }

    fn dispatch(&self, transitions: &[AlertTransition]) {
        for transition in transitions {
            // Handles are dropped: delivery runs detached.
            let _ = self.notifier.notify(transition);
        }
    }
}
