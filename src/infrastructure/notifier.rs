//! Notification sink that logs in place of real delivery

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tracing::{error, info};

use crate::domain::notification::{NotificationAttributes, NotificationSink};

/// Simulated delivery latency of the logging sink
pub const DEFAULT_DELIVERY_DELAY: Duration = Duration::from_millis(100);

/// Notifier that serializes the event and logs it
#[derive(Debug, Clone)]
pub struct LogNotifier {
    delivery_delay: Duration,
}

impl LogNotifier {
    pub fn new(delivery_delay: Duration) -> Self {
        Self { delivery_delay }
    }

    /// Builds the JSON payload with the event name and a unix timestamp attached
    pub fn build_payload(
        event: &str,
        mut attributes: NotificationAttributes,
    ) -> Result<String, serde_json::Error> {
        attributes.insert("message".to_string(), Value::from(event));
        attributes.insert("timestamp".to_string(), Value::from(Utc::now().timestamp()));

        serde_json::to_string(&attributes)
    }
}

impl Default for LogNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_DELIVERY_DELAY)
    }
}

#[async_trait]
impl NotificationSink for LogNotifier {
    async fn send(&self, event: &str, attributes: NotificationAttributes) {
        let payload = match Self::build_payload(event, attributes) {
            Ok(payload) => payload,
            Err(e) => {
                error!(event = %event, error = %e, "error marshaling notification");
                return;
            }
        };

        tokio::time::sleep(self.delivery_delay).await;

        info!(payload = %payload, "notification sent");
    }
}
