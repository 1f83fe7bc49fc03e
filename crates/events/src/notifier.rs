//! Fire-and-forget dispatch of alert transitions.

use slotwatch_core::alert::AlertTransition;
use tokio::task::JoinHandle;

use crate::delivery::webhook::{WebhookDelivery, WebhookError};
use crate::message::WebhookMessage;

/// Announces alert transitions on the configured webhook.
///
/// Every call to [`notify`](Self::notify) spawns its own task; the caller
/// never waits on delivery. Without a webhook URL, transitions are only
/// logged.
#[derive(Debug, Clone)]
pub struct AlertNotifier {
    url: Option<String>,
    delivery: WebhookDelivery,
}

impl AlertNotifier {
    pub fn new(url: Option<String>) -> Result<Self, WebhookError> {
        Ok(Self {
            url,
            delivery: WebhookDelivery::new()?,
        })
    }

    /// Log the transition and, if a webhook is configured, deliver it on a
    /// detached task.
    ///
    /// Must be called from within a tokio runtime. The returned handle is
    /// only useful to tests; production callers drop it.
    pub fn notify(&self, transition: &AlertTransition) -> Option<JoinHandle<()>> {
        let alert = transition.alert();
        match transition {
            AlertTransition::Opened(_) => tracing::warn!(
                alert_id = %alert.id,
                severity = ?alert.severity,
                value = alert.value,
                threshold = alert.threshold,
                "Alert opened: {}",
                alert.message,
            ),
            AlertTransition::Resolved(_) => tracing::info!(
                alert_id = %alert.id,
                down_duration_seconds = alert.down_duration_seconds.unwrap_or(0),
                "Alert resolved",
            ),
        }

        let Some(url) = self.url.clone() else {
            tracing::debug!(alert_id = %alert.id, "No webhook configured, skipping delivery");
            return None;
        };

        let message = WebhookMessage::for_transition(transition);
        let delivery = self.delivery.clone();
        let alert_id = alert.id.clone();

        Some(tokio::spawn(async move {
            match delivery.deliver(&url, &message).await {
                Ok(()) => tracing::debug!(alert_id = %alert_id, "Webhook delivered"),
                Err(e) => tracing::warn!(
                    alert_id = %alert_id,
                    error = %e,
                    "Webhook delivery failed, not retrying",
                ),
            }
        }))
    }
}
