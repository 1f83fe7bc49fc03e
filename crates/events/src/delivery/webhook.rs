//! Single-attempt webhook delivery.
//!
//! [`WebhookDelivery`] POSTs a JSON-encoded [`WebhookMessage`] to an
//! external URL. One attempt per message; failures are returned to the
//! caller, which logs them and moves on.

use std::time::Duration;

use crate::message::WebhookMessage;

/// HTTP request timeout for a delivery attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for webhook delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The remote server returned a non-2xx status code.
    #[error("Webhook returned HTTP {0}")]
    HttpStatus(u16),
}

// ---------------------------------------------------------------------------
// WebhookDelivery
// ---------------------------------------------------------------------------

/// Delivers alert messages to an external webhook endpoint.
#[derive(Debug, Clone)]
pub struct WebhookDelivery {
    client: reqwest::Client,
}

impl WebhookDelivery {
    /// Create a delivery service with the default request timeout.
    pub fn new() -> Result<Self, WebhookError> {
        Self::with_timeout(REQUEST_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, WebhookError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Execute a single POST request and check the response status.
    pub async fn deliver(&self, url: &str, message: &WebhookMessage) -> Result<(), WebhookError> {
        let response = self.client.post(url).json(message).send().await?;
        if !response.status().is_success() {
            return Err(WebhookError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> WebhookMessage {
        WebhookMessage {
            text: "hello".into(),
            attachments: Vec::new(),
        }
    }

    #[test]
    fn new_does_not_fail() {
        assert!(WebhookDelivery::new().is_ok());
    }

    #[test]
    fn webhook_error_display_http_status() {
        let err = WebhookError::HttpStatus(502);
        assert_eq!(err.to_string(), "Webhook returned HTTP 502");
    }

    #[test]
    fn webhook_error_display_request() {
        // Build a reqwest error from an invalid URL.
        let req_err = reqwest::Client::new().get("://bad").build().unwrap_err();
        let err = WebhookError::Request(req_err);
        assert!(err.to_string().contains("HTTP request failed"));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_request_error() {
        // Bind then drop a listener so the port is known to be closed.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let delivery = WebhookDelivery::with_timeout(Duration::from_secs(2)).unwrap();
        let result = delivery.deliver(&format!("http://{addr}/hook"), &message()).await;
        assert!(matches!(result, Err(WebhookError::Request(_))));
    }
}
