//! Storage factory for runtime backend selection

use std::sync::Arc;

use tracing::info;

use crate::domain::storage::{KeyValueStore, StorageEntity, StorageError};

use super::client::ObjectStoreClient;
use super::in_memory::InMemoryObjectStore;
use super::object_storage::ObjectStorage;
use super::s3::{S3Config, S3ObjectStore};

/// Supported storage types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageType {
    /// In-memory object store (for testing/development)
    InMemory,
    /// S3-compatible object store
    S3,
}

impl StorageType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "memory" | "inmemory" | "in-memory" | "in_memory" => Some(Self::InMemory),
            "s3" | "minio" => Some(Self::S3),
            _ => None,
        }
    }
}

/// Storage backend configuration
#[derive(Debug, Clone)]
pub enum StorageConfig {
    /// In-memory storage configuration
    InMemory,
    /// S3-compatible storage configuration
    S3(S3Config),
}

impl StorageConfig {
    /// Creates an in-memory storage configuration
    pub fn in_memory() -> Self {
        Self::InMemory
    }

    /// Creates an S3 storage configuration
    pub fn s3(config: S3Config) -> Self {
        Self::S3(config)
    }

    /// Returns the storage type
    pub fn storage_type(&self) -> StorageType {
        match self {
            Self::InMemory => StorageType::InMemory,
            Self::S3(_) => StorageType::S3,
        }
    }
}

/// Factory for creating storage instances
#[derive(Debug)]
pub struct StorageFactory;

impl StorageFactory {
    /// Creates the object store client for the configuration
    pub async fn create_client(config: &StorageConfig) -> Arc<dyn ObjectStoreClient> {
        match config {
            StorageConfig::InMemory => Arc::new(InMemoryObjectStore::new()),
            StorageConfig::S3(s3_config) => {
                info!(endpoint = %s3_config.endpoint_url(), "connecting to object store");
                Arc::new(S3ObjectStore::connect(s3_config).await)
            }
        }
    }

    /// Creates a storage engine for one entity kind, verifying its bucket
    pub async fn create<E>(
        config: &StorageConfig,
        bucket: &str,
    ) -> Result<Arc<dyn KeyValueStore<E>>, StorageError>
    where
        E: StorageEntity,
    {
        let client = Self::create_client(config).await;
        Self::create_with_client(client, bucket).await
    }

    /// Creates a storage engine over an existing client
    pub async fn create_with_client<E>(
        client: Arc<dyn ObjectStoreClient>,
        bucket: &str,
    ) -> Result<Arc<dyn KeyValueStore<E>>, StorageError>
    where
        E: StorageEntity,
    {
        let storage: ObjectStorage<E> = ObjectStorage::new(client, bucket).await?;
        info!(bucket = %storage.bucket(), kind = E::KIND, "storage ready");

        Ok(Arc::new(storage))
    }
}
