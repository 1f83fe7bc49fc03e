//! Prometheus text exposition.
//!
//! A fresh [`Registry`] is filled from the snapshot on every scrape, so the
//! output always reflects exactly one consistent read of the monitor.

use std::collections::BTreeMap;

use prometheus::core::Collector;
use prometheus::{Encoder, Gauge, GaugeVec, IntCounter, IntGauge, Opts, Registry, TextEncoder};
use slotwatch_collector::monitor::MonitorSnapshot;
use slotwatch_core::metric_names::{
    METRIC_ALERTS_OPEN, METRIC_ALERTS_TOTAL, METRIC_AVERAGE, METRIC_CHECKS_TOTAL,
    METRIC_SLOT_CONSECUTIVE_FAILURES, METRIC_SLOT_UP, METRIC_STREAM_CONNECTED,
    METRIC_UPTIME_SECONDS, METRIC_VALUE,
};
use slotwatch_core::sample::{Category, Slot};

/// Content type of the text exposition format.
pub const CONTENT_TYPE: &str = prometheus::TEXT_FORMAT;

const SERIES_LABELS: &[&str] = &["slot", "category"];

/// Render the snapshot in the Prometheus text format.
///
/// Every slot in `polled` emits `health` and `latency` values even before
/// its first check, using the unknown sentinel of 0.
pub fn render(snapshot: &MonitorSnapshot, polled: &[Slot]) -> Result<String, prometheus::Error> {
    let registry = Registry::new();

    let value = register(
        &registry,
        GaugeVec::new(
            Opts::new(METRIC_VALUE, "Latest sample value per slot and category"),
            SERIES_LABELS,
        )?,
    )?;
    let average = register(
        &registry,
        GaugeVec::new(
            Opts::new(METRIC_AVERAGE, "Mean over the retained samples per slot and category"),
            SERIES_LABELS,
        )?,
    )?;

    let mut latest: BTreeMap<(Slot, Category), f64> = polled
        .iter()
        .flat_map(|slot| [((*slot, Category::Health), 0.0), ((*slot, Category::Latency), 0.0)])
        .collect();
    for ((slot, category), series) in snapshot.store.iter() {
        if let Some(sample) = series.latest() {
            latest.insert((*slot, *category), sample.value());
        }
        if let Some(mean) = snapshot.store.average(*slot, *category) {
            average
                .with_label_values(&[slot.as_str(), category.as_str()])
                .set(mean);
        }
    }
    for ((slot, category), v) in latest {
        value.with_label_values(&[slot.as_str(), category.as_str()]).set(v);
    }

    let up = register(
        &registry,
        GaugeVec::new(
            Opts::new(METRIC_SLOT_UP, "1 if the last health check of the slot succeeded"),
            &["slot"],
        )?,
    )?;
    let failures = register(
        &registry,
        GaugeVec::new(
            Opts::new(
                METRIC_SLOT_CONSECUTIVE_FAILURES,
                "Current run of failed health checks per slot",
            ),
            &["slot"],
        )?,
    )?;
    for (slot, health) in &snapshot.slots {
        up.with_label_values(&[slot.as_str()])
            .set(if health.healthy { 1.0 } else { 0.0 });
        failures
            .with_label_values(&[slot.as_str()])
            .set(f64::from(health.consecutive_failures));
    }

    register(
        &registry,
        Gauge::new(METRIC_UPTIME_SECONDS, "Seconds since the monitor started")?,
    )?
    .set(snapshot.uptime_seconds());
    register(
        &registry,
        IntCounter::new(METRIC_CHECKS_TOTAL, "Health checks performed across all slots")?,
    )?
    .inc_by(snapshot.checks_total);
    register(
        &registry,
        IntCounter::new(METRIC_ALERTS_TOTAL, "Alerts opened since start")?,
    )?
    .inc_by(snapshot.alerts_total);
    register(
        &registry,
        IntGauge::new(METRIC_ALERTS_OPEN, "Alerts currently open")?,
    )?
    .set(i64::try_from(snapshot.open_alerts).unwrap_or(i64::MAX));
    register(
        &registry,
        IntGauge::new(METRIC_STREAM_CONNECTED, "1 while the game WebSocket is connected")?,
    )?
    .set(i64::from(snapshot.stream.connected));

    let mut buffer = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

fn register<C>(registry: &Registry, collector: C) -> Result<C, prometheus::Error>
where
    C: Collector + Clone + 'static,
{
    registry.register(Box::new(collector.clone()))?;
    Ok(collector)
}
