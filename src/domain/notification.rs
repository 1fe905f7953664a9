//! Best-effort notification side channel

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

/// Attributes attached to a notification event
pub type NotificationAttributes = Map<String, Value>;

/// Receives notifications about completed mutations
///
/// Delivery is best effort: implementations log failures and never report
/// them back to the caller.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, event: &str, attributes: NotificationAttributes);
}

/// Dispatches a notification on a detached task
///
/// The caller does not wait for delivery. A notification still in flight when
/// the process exits is lost.
pub fn dispatch(
    sink: Arc<dyn NotificationSink>,
    event: impl Into<String>,
    attributes: NotificationAttributes,
) {
    let event = event.into();

    tokio::spawn(async move {
        sink.send(&event, attributes).await;
    });
}
