//! Key-value storage engine over an object store bucket

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info};

use crate::domain::storage::{KeyValueStore, StorageError};

use super::client::{ObjectStoreClient, ObjectStoreError};

const CONTENT_TYPE_JSON: &str = "application/json";
const GET_ALL_CONCURRENCY: usize = 8;

/// JSON values stored one object per key in a single bucket
///
/// The engine is only handed out after the bucket has been verified, so every
/// operation can assume the bucket exists.
pub struct ObjectStorage<T, C: ?Sized = dyn ObjectStoreClient> {
    client: Arc<C>,
    bucket: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T, C: ?Sized> fmt::Debug for ObjectStorage<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectStorage")
            .field("bucket", &self.bucket)
            .finish_non_exhaustive()
    }
}

impl<T, C> ObjectStorage<T, C>
where
    C: ObjectStoreClient + ?Sized,
{
    /// Verifies the bucket exists, creating it if absent, and returns the engine
    pub async fn new(client: Arc<C>, bucket: impl Into<String>) -> Result<Self, StorageError> {
        let bucket = bucket.into();

        let exists = client.bucket_exists(&bucket).await.map_err(|e| {
            StorageError::transport("bucket check", &bucket, e.to_string())
        })?;

        if !exists {
            client.create_bucket(&bucket).await.map_err(|e| {
                StorageError::transport("bucket creation", &bucket, e.to_string())
            })?;

            info!(bucket = %bucket, "bucket created");
        }

        Ok(Self {
            client,
            bucket,
            _marker: PhantomData,
        })
    }

    /// Name of the backing bucket
    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

impl<T, C> ObjectStorage<T, C>
where
    T: DeserializeOwned + Send + Sync + 'static,
    C: ObjectStoreClient + ?Sized,
{
    async fn fetch(&self, key: &str) -> Result<T, StorageError> {
        let body = self
            .client
            .get_object(&self.bucket, key)
            .await
            .map_err(|e| match e {
                ObjectStoreError::NoSuchKey => StorageError::key_not_found(key),
                other => StorageError::transport("get", key, other.to_string()),
            })?;

        serde_json::from_slice(&body).map_err(|source| StorageError::Deserialization {
            key: key.to_string(),
            source,
        })
    }
}

#[async_trait]
impl<T, C> KeyValueStore<T> for ObjectStorage<T, C>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
    C: ObjectStoreClient + ?Sized + 'static,
{
    async fn set(&self, key: &str, value: T) -> Result<(), StorageError> {
        let body = serde_json::to_vec(&value).map_err(|source| StorageError::Serialization {
            key: key.to_string(),
            source,
        })?;

        self.client
            .put_object(&self.bucket, key, Bytes::from(body), CONTENT_TYPE_JSON)
            .await
            .map_err(|e| StorageError::transport("put", key, e.to_string()))?;

        info!(bucket = %self.bucket, key = %key, "data saved to object store");

        Ok(())
    }

    async fn get(&self, key: &str) -> Result<T, StorageError> {
        self.fetch(key).await
    }

    async fn get_all(&self) -> Result<Vec<T>, StorageError> {
        let keys = self
            .client
            .list_keys(&self.bucket)
            .await
            .map_err(|e| StorageError::transport("list", &self.bucket, e.to_string()))?;

        debug!(bucket = %self.bucket, count = keys.len(), "listed object keys");

        // A key deleted between listing and fetching is skipped
        let values: Vec<Option<T>> = stream::iter(keys)
            .map(|key| async move {
                match self.fetch(&key).await {
                    Ok(value) => Ok(Some(value)),
                    Err(StorageError::KeyNotFound { .. }) => Ok(None),
                    Err(e) => Err(e),
                }
            })
            .buffered(GET_ALL_CONCURRENCY)
            .try_collect()
            .await?;

        Ok(values.into_iter().flatten().collect())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.client
            .remove_object(&self.bucket, key)
            .await
            .map_err(|e| StorageError::transport("delete", key, e.to_string()))?;

        debug!(bucket = %self.bucket, key = %key, "object removed");

        Ok(())
    }
}
