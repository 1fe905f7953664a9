//! CRUD orchestration over a key-value store
//!
//! Assigns identities, derives storage keys, bounds every operation with its own
//! deadline and translates storage errors into domain errors. Storage failures
//! are wrapped with the attempted operation and never retried here.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::domain::notification::{self, NotificationAttributes, NotificationSink};
use crate::domain::storage::{storage_key, KeyValueStore, StorageEntity, StorageError};
use crate::domain::DomainError;

/// Deadline applied to each service operation unless overridden
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(10);

/// CRUD service for one entity kind
pub struct CrudService<E: StorageEntity> {
    storage: Arc<dyn KeyValueStore<E>>,
    notifier: Option<Arc<dyn NotificationSink>>,
    timeout: Duration,
}

impl<E: StorageEntity> std::fmt::Debug for CrudService<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrudService")
            .field("kind", &E::KIND)
            .field("timeout", &self.timeout)
            .field("notifications", &self.notifier.is_some())
            .finish()
    }
}

impl<E: StorageEntity> CrudService<E> {
    /// Create a new service over the given storage
    pub fn new(storage: Arc<dyn KeyValueStore<E>>) -> Self {
        Self {
            storage,
            notifier: None,
            timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }

    /// Override the per-operation deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Send best-effort notifications after successful mutations
    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationSink>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Persist a new entity under a freshly generated identity
    ///
    /// Any identity on the input is discarded.
    pub async fn create(&self, entity: E) -> Result<E, DomainError> {
        let mut created = entity;
        created.set_id(generate_id());
        let key = self.key_for(created.id());

        self.with_deadline("create", async {
            self.storage
                .set(&key, created.clone())
                .await
                .map_err(|e| DomainError::storage(format!("failed to create {}", E::KIND), e))
        })
        .await?;

        debug!(kind = E::KIND, id = %created.id(), "entity created");
        self.notify("created", created.id());

        Ok(created)
    }

    /// Fetch an entity by identity
    pub async fn get(&self, id: &str) -> Result<E, DomainError> {
        let key = self.key_for(id);

        self.with_deadline("get", async { self.storage.get(&key).await.map_err(Self::read_error) })
            .await
    }

    /// Fetch every entity; an empty store yields an empty list
    pub async fn get_all(&self) -> Result<Vec<E>, DomainError> {
        self.with_deadline("list", async {
            self.storage.get_all().await.map_err(|e| {
                DomainError::storage(format!("failed to get {} list", E::KIND), e)
            })
        })
        .await
    }

    /// Overwrite an existing entity
    ///
    /// Fails fast without touching storage when the identity is missing. The
    /// existence probe and the write are not atomic: concurrent updates of the
    /// same identity are last-write-wins.
    pub async fn update(&self, entity: E) -> Result<(), DomainError> {
        if !entity.has_id() {
            return Err(DomainError::missing_identity(E::KIND));
        }

        let key = self.key_for(entity.id());

        self.with_deadline("update", async {
            self.storage.get(&key).await.map_err(Self::read_error)?;

            self.storage
                .set(&key, entity.clone())
                .await
                .map_err(|e| DomainError::storage(format!("failed to update {}", E::KIND), e))
        })
        .await?;

        debug!(kind = E::KIND, id = %entity.id(), "entity updated");
        self.notify("updated", entity.id());

        Ok(())
    }

    /// Delete an entity; deleting an unknown identity succeeds
    pub async fn delete(&self, id: &str) -> Result<(), DomainError> {
        let key = self.key_for(id);

        self.with_deadline("delete", async {
            self.storage
                .delete(&key)
                .await
                .map_err(|e| DomainError::storage(format!("failed to delete {}", E::KIND), e))
        })
        .await?;

        debug!(kind = E::KIND, id = %id, "entity deleted");
        self.notify("deleted", id);

        Ok(())
    }

    fn key_for(&self, id: &str) -> String {
        storage_key(E::KIND, id)
    }

    fn read_error(err: StorageError) -> DomainError {
        match err {
            StorageError::KeyNotFound { .. } => {
                DomainError::not_found(format!("{} does not exist", E::KIND))
            }
            other => DomainError::storage(format!("failed to get {}", E::KIND), other),
        }
    }

    async fn with_deadline<T, F>(&self, operation: &str, work: F) -> Result<T, DomainError>
    where
        F: Future<Output = Result<T, DomainError>>,
    {
        tokio::time::timeout(self.timeout, work)
            .await
            .map_err(|_| DomainError::timeout(format!("{} {}", operation, E::KIND), self.timeout))?
    }

    fn notify(&self, action: &str, id: &str) {
        let Some(notifier) = &self.notifier else {
            return;
        };

        let mut attributes = NotificationAttributes::new();
        attributes.insert(format!("{}_id", E::KIND), Value::from(id));

        notification::dispatch(
            Arc::clone(notifier),
            format!("{}_{}", E::KIND, action),
            attributes,
        );
    }
}

fn generate_id() -> String {
    Uuid::new_v4().to_string()
}
