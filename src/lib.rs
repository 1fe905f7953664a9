//! Entity Store Service
//!
//! CRUD over an S3-compatible object store, with:
//! - Generic key-value storage per entity kind
//! - Per-operation timeouts and best-effort notifications
//! - Token-bucket rate limiting and Prometheus request metrics
//! - Bounded graceful shutdown

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use crate::config::AppConfig;

use std::sync::Arc;

use tracing::info;

use api::state::AppState;
use domain::User;
use infrastructure::notifier::LogNotifier;
use infrastructure::services::UserService;
use infrastructure::storage::StorageFactory;

/// Create application state from configuration
///
/// Connects to the configured backend and verifies the bucket before
/// returning, so storage failures abort startup.
pub async fn create_app_state(config: &AppConfig) -> anyhow::Result<AppState> {
    let storage_config = config.storage.to_storage_config()?;
    info!(
        backend = ?storage_config.storage_type(),
        bucket = %config.storage.bucket,
        "Initializing storage"
    );

    let storage = StorageFactory::create::<User>(&storage_config, &config.storage.bucket).await?;

    let mut service =
        UserService::new(storage).with_timeout(config.storage.operation_timeout());

    if config.notification.enabled {
        service = service.with_notifier(Arc::new(LogNotifier::new(
            config.notification.delivery_delay(),
        )));
    }

    Ok(AppState::new(service))
}
