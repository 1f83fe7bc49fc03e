//! Alert records and their lifecycle.
//!
//! [`AlertManager`] runs every observed sample through the threshold
//! evaluator and applies the per-identity state machine
//! `none -> open -> resolved`. It returns an [`AlertTransition`] only when
//! something should be announced; repeated violations on an open alert are
//! folded into the existing record silently.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use serde::Serialize;
use uuid::Uuid;

use crate::sample::{Category, Sample, Slot};
use crate::thresholds::{evaluate, Breach, Evaluation, RuleState, ThresholdConfig};
use crate::types::Timestamp;

/// Default number of alert records kept for `/alerts`.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Severity level of a threshold violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertState {
    Open,
    Resolved,
}

/// Deterministic alert identity: `"{slot}:{category}:{rule}"`.
///
/// Re-detecting the same condition always yields the same id, so a series
/// can only ever have one open alert.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct AlertId(String);

impl AlertId {
    pub fn new(slot: Slot, category: Category, rule: &str) -> Self {
        Self(format!("{slot}:{category}:{rule}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AlertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One lifecycle instance of an alert.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: AlertId,
    /// Unique per lifecycle; a new violation after resolution gets a new one.
    pub instance: Uuid,
    pub slot: Slot,
    pub category: Category,
    pub rule: &'static str,
    pub severity: Severity,
    pub state: AlertState,
    pub message: String,
    /// Most recent offending value.
    pub value: f64,
    pub threshold: f64,
    pub opened_at: Timestamp,
    pub resolved_at: Option<Timestamp>,
    pub down_duration_seconds: Option<i64>,
    pub consecutive_failures: u32,
}

/// A state change worth announcing.
#[derive(Debug, Clone, PartialEq)]
pub enum AlertTransition {
    Opened(Alert),
    Resolved(Alert),
}

impl AlertTransition {
    pub fn alert(&self) -> &Alert {
        match self {
            AlertTransition::Opened(alert) | AlertTransition::Resolved(alert) => alert,
        }
    }
}

/// Human-readable summary of a breach.
pub fn describe(slot: Slot, category: Category, breach: &Breach) -> String {
    match category {
        Category::Health => format!("{slot} deployment is failing health checks"),
        _ => {
            let side = if breach.value < breach.threshold {
                "below"
            } else {
                "above"
            };
            format!(
                "{slot} {category} is {:.2}, {side} {} threshold {:.2}",
                breach.value,
                match breach.severity {
                    Severity::Warning => "warning",
                    Severity::Critical => "critical",
                },
                breach.threshold
            )
        }
    }
}

/// Owns alert state: evaluator memory, open alerts and bounded history.
#[derive(Debug)]
pub struct AlertManager {
    rule_states: HashMap<AlertId, RuleState>,
    open: HashMap<AlertId, Alert>,
    /// Most-recent-first.
    history: VecDeque<Alert>,
    history_limit: usize,
    alerts_total: u64,
}

impl Default for AlertManager {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl AlertManager {
    pub fn new(history_limit: usize) -> Self {
        Self {
            rule_states: HashMap::new(),
            open: HashMap::new(),
            history: VecDeque::new(),
            history_limit: history_limit.max(1),
            alerts_total: 0,
        }
    }

    /// Evaluate `sample` and apply the resulting lifecycle transition.
    ///
    /// Timestamps on the alert come from the sample, so `resolved_at` is
    /// never earlier than `opened_at` as long as samples for a series arrive
    /// in order.
    pub fn observe(&mut self, sample: &Sample, config: &ThresholdConfig) -> Option<AlertTransition> {
        let rule = config.rule_for(sample.category());
        let id = AlertId::new(sample.slot(), sample.category(), rule.name);

        let prior = self.rule_states.get(&id).copied().unwrap_or_default();
        let (evaluation, next) = evaluate(sample, prior, config);
        self.rule_states.insert(id.clone(), next);

        match evaluation {
            Evaluation::NoChange => None,
            Evaluation::Violation(breach) => {
                if let Some(alert) = self.open.get_mut(&id) {
                    alert.consecutive_failures = alert.consecutive_failures.saturating_add(1);
                    alert.value = breach.value;
                    if breach.severity > alert.severity {
                        alert.severity = breach.severity;
                        alert.threshold = breach.threshold;
                    }
                    alert.message = describe(alert.slot, alert.category, &breach);
                    let updated = alert.clone();
                    self.replace_in_history(updated);
                    return None;
                }

                let alert = Alert {
                    id: id.clone(),
                    instance: Uuid::now_v7(),
                    slot: sample.slot(),
                    category: sample.category(),
                    rule: rule.name,
                    severity: breach.severity,
                    state: AlertState::Open,
                    message: describe(sample.slot(), sample.category(), &breach),
                    value: breach.value,
                    threshold: breach.threshold,
                    opened_at: sample.timestamp(),
                    resolved_at: None,
                    down_duration_seconds: None,
                    consecutive_failures: next.consecutive_violations,
                };
                self.open.insert(id, alert.clone());
                self.history.push_front(alert.clone());
                self.history.truncate(self.history_limit);
                self.alerts_total += 1;
                Some(AlertTransition::Opened(alert))
            }
            Evaluation::Recovery => {
                let mut alert = self.open.remove(&id)?;
                let resolved_at = sample.timestamp();
                alert.state = AlertState::Resolved;
                alert.resolved_at = Some(resolved_at);
                alert.down_duration_seconds =
                    Some((resolved_at - alert.opened_at).num_seconds().max(0));
                alert.message = format!("{} {} recovered", alert.slot, alert.category);
                self.replace_in_history(alert.clone());
                Some(AlertTransition::Resolved(alert))
            }
        }
    }

    /// Overwrite the history entry of the same lifecycle instance, if it is
    /// still retained.
    fn replace_in_history(&mut self, alert: Alert) {
        if let Some(entry) = self
            .history
            .iter_mut()
            .find(|entry| entry.instance == alert.instance)
        {
            *entry = alert;
        }
    }

    /// Full bounded history, most-recent-first.
    pub fn history(&self) -> impl Iterator<Item = &Alert> {
        self.history.iter()
    }

    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    /// Lifecycles opened since start, including ones evicted from history.
    pub fn alerts_total(&self) -> u64 {
        self.alerts_total
    }
}
