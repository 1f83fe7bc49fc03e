//! JSON views for `/status` and `/historical`.

use std::collections::BTreeMap;

use serde::Serialize;
use slotwatch_collector::monitor::{MonitorSnapshot, StreamStatus};
use slotwatch_core::alert::Alert;
use slotwatch_core::health::SlotHealth;
use slotwatch_core::sample::{Category, GameplaySnapshot, Sample, Slot};
use slotwatch_core::thresholds::{Rule, ThresholdConfig};
use slotwatch_core::types::Timestamp;

use crate::config::MonitorConfig;

/// Number of alerts included in `recentAlerts`.
pub const RECENT_ALERTS: usize = 10;

/// `/status` payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport<'a> {
    /// Seconds since the monitor started.
    pub uptime: f64,
    /// Health checks performed across all slots.
    pub checks: u64,
    pub slots: BTreeMap<Slot, SlotStatus<'a>>,
    pub gameplay: &'a GameplaySnapshot,
    pub stream: &'a StreamStatus,
    pub metrics: BTreeMap<Slot, BTreeMap<Category, SeriesSummary>>,
    pub alerts_total: u64,
    pub open_alerts: usize,
    pub recent_alerts: &'a [Alert],
    pub config: ConfigSummary<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotStatus<'a> {
    pub url: Option<&'a str>,
    #[serde(flatten)]
    pub health: &'a SlotHealth,
    pub uptime_percent: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesSummary {
    pub latest: f64,
    pub average: f64,
    pub samples: usize,
    pub updated_at: Timestamp,
}

/// Effective configuration, without secrets.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSummary<'a> {
    pub poll_interval_seconds: u64,
    pub health_timeout_seconds: u64,
    pub history_capacity: usize,
    pub alert_history_limit: usize,
    pub webhook_configured: bool,
    pub stream_url: Option<&'a str>,
    pub thresholds: &'a ThresholdConfig,
    /// The rule each category is evaluated against.
    pub rules: Vec<Rule>,
}

impl<'a> StatusReport<'a> {
    pub fn build(snapshot: &'a MonitorSnapshot, config: &'a MonitorConfig) -> Self {
        let slots = snapshot
            .slots
            .iter()
            .map(|(slot, health)| {
                let url = config
                    .slots
                    .iter()
                    .find(|target| target.slot == *slot)
                    .map(|target| target.base_url.as_str());
                let status = SlotStatus {
                    url,
                    health,
                    uptime_percent: health.uptime_percent(),
                };
                (*slot, status)
            })
            .collect();

        let mut metrics: BTreeMap<Slot, BTreeMap<Category, SeriesSummary>> = BTreeMap::new();
        for ((slot, category), series) in snapshot.store.iter() {
            let (Some(latest), Some(average)) =
                (series.latest(), snapshot.store.average(*slot, *category))
            else {
                continue;
            };
            metrics.entry(*slot).or_default().insert(
                *category,
                SeriesSummary {
                    latest: latest.value(),
                    average,
                    samples: series.len(),
                    updated_at: latest.timestamp(),
                },
            );
        }

        let recent = snapshot.alerts.len().min(RECENT_ALERTS);

        Self {
            uptime: snapshot.uptime_seconds(),
            checks: snapshot.checks_total,
            slots,
            gameplay: &snapshot.gameplay,
            stream: &snapshot.stream,
            metrics,
            alerts_total: snapshot.alerts_total,
            open_alerts: snapshot.open_alerts,
            recent_alerts: &snapshot.alerts[..recent],
            config: ConfigSummary {
                poll_interval_seconds: config.poll_interval.as_secs(),
                health_timeout_seconds: config.health_timeout.as_secs(),
                history_capacity: config.history_capacity,
                alert_history_limit: config.alert_history_limit,
                webhook_configured: config.webhook_url.is_some(),
                stream_url: config.stream.as_ref().map(|s| s.url.as_str()),
                thresholds: &config.thresholds,
                rules: config.thresholds.rules(),
            },
        }
    }
}

/// `/historical` payload: ring buffer contents grouped by category, then slot,
/// oldest sample first.
pub type Historical<'a> = BTreeMap<Category, BTreeMap<Slot, Vec<&'a Sample>>>;

pub fn historical(snapshot: &MonitorSnapshot) -> Historical<'_> {
    let mut out: Historical<'_> = BTreeMap::new();
    for ((slot, category), series) in snapshot.store.iter() {
        out.entry(*category)
            .or_default()
            .insert(*slot, series.iter().collect());
    }
    out
}
