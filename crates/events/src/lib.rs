//! Outbound alert notifications.
//!
//! - [`WebhookDelivery`] -- single-attempt POST of a Slack-compatible
//!   [`WebhookMessage`].
//! - [`AlertNotifier`] -- turns alert transitions into messages and
//!   dispatches them on detached tasks so alerting never blocks monitoring.

pub mod delivery;
pub mod message;
pub mod notifier;

pub use delivery::webhook::{WebhookDelivery, WebhookError};
pub use message::{Attachment, AttachmentField, WebhookMessage};
pub use notifier::AlertNotifier;
