//! Slack-compatible webhook payloads built from alert transitions.

use serde::Serialize;
use slotwatch_core::alert::{Alert, AlertTransition, Severity};

/// Top-level webhook body: `{ "text": ..., "attachments": [...] }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookMessage {
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attachment {
    /// Slack colour keyword: `danger`, `warning` or `good`.
    pub color: &'static str,
    pub title: String,
    pub fields: Vec<AttachmentField>,
    /// Unix seconds.
    pub ts: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttachmentField {
    pub title: &'static str,
    pub value: String,
    pub short: bool,
}

impl AttachmentField {
    fn short(title: &'static str, value: impl ToString) -> Self {
        Self {
            title,
            value: value.to_string(),
            short: true,
        }
    }
}

impl WebhookMessage {
    pub fn for_transition(transition: &AlertTransition) -> Self {
        match transition {
            AlertTransition::Opened(alert) => Self::opened(alert),
            AlertTransition::Resolved(alert) => Self::recovered(alert),
        }
    }

    fn opened(alert: &Alert) -> Self {
        let (label, color) = match alert.severity {
            Severity::Critical => ("CRITICAL", "danger"),
            Severity::Warning => ("WARNING", "warning"),
        };
        let mut fields = detail_fields(alert);
        fields.push(AttachmentField::short("Opened At", alert.opened_at.to_rfc3339()));

        Self {
            text: format!("[{label}] {}", alert.message),
            attachments: vec![Attachment {
                color,
                title: format!("Alert {}", alert.id),
                fields,
                ts: alert.opened_at.timestamp(),
            }],
        }
    }

    fn recovered(alert: &Alert) -> Self {
        let down_secs = alert.down_duration_seconds.unwrap_or(0);
        let resolved_at = alert.resolved_at.unwrap_or(alert.opened_at);
        let mut fields = detail_fields(alert);
        fields.push(AttachmentField::short("Down Duration (s)", down_secs));
        fields.push(AttachmentField::short("Resolved At", resolved_at.to_rfc3339()));

        Self {
            text: format!(
                "[RECOVERED] {} {} recovered after {down_secs}s",
                alert.slot, alert.category
            ),
            attachments: vec![Attachment {
                color: "good",
                title: format!("Alert {}", alert.id),
                fields,
                ts: resolved_at.timestamp(),
            }],
        }
    }
}

fn detail_fields(alert: &Alert) -> Vec<AttachmentField> {
    vec![
        AttachmentField::short("Slot", alert.slot),
        AttachmentField::short("Category", alert.category),
        AttachmentField::short(
            "Severity",
            match alert.severity {
                Severity::Critical => "critical",
                Severity::Warning => "warning",
            },
        ),
        AttachmentField::short("Value", format!("{:.2}", alert.value)),
        AttachmentField::short("Threshold", format!("{:.2}", alert.threshold)),
        AttachmentField::short("Consecutive Failures", alert.consecutive_failures),
    ]
}
