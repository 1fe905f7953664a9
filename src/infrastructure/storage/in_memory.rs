//! In-memory object store implementation

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;

use super::client::{ObjectStoreClient, ObjectStoreError};

/// Thread-safe in-memory object store
///
/// Useful for testing and development. Data is lost when the process terminates.
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    buckets: RwLock<HashMap<String, BTreeMap<String, Bytes>>>,
}

impl InMemoryObjectStore {
    /// Creates a new store without any buckets
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with the given buckets already present
    pub fn with_buckets<'a>(buckets: impl IntoIterator<Item = &'a str>) -> Self {
        let store = Self::new();
        {
            let mut map = store
                .buckets
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner);

            for bucket in buckets {
                map.insert(bucket.to_string(), BTreeMap::new());
            }
        }
        store
    }

    /// Writes raw bytes, bypassing serialization (for seeding test fixtures)
    pub fn insert_raw(&self, bucket: &str, key: &str, body: impl Into<Bytes>) {
        let mut buckets = self
            .buckets
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        buckets
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), body.into());
    }

    /// Number of objects in a bucket
    pub fn object_count(&self, bucket: &str) -> usize {
        self.buckets
            .read()
            .map(|buckets| buckets.get(bucket).map_or(0, BTreeMap::len))
            .unwrap_or(0)
    }
}

fn lock_error(e: impl std::fmt::Display) -> ObjectStoreError {
    ObjectStoreError::transport(format!("Failed to acquire lock: {}", e))
}

#[async_trait]
impl ObjectStoreClient for InMemoryObjectStore {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, ObjectStoreError> {
        let buckets = self.buckets.read().map_err(lock_error)?;
        Ok(buckets.contains_key(bucket))
    }

    async fn create_bucket(&self, bucket: &str) -> Result<(), ObjectStoreError> {
        let mut buckets = self.buckets.write().map_err(lock_error)?;
        buckets.entry(bucket.to_string()).or_default();
        Ok(())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        _content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        let mut buckets = self.buckets.write().map_err(lock_error)?;
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| ObjectStoreError::NoSuchBucket(bucket.to_string()))?;

        objects.insert(key.to_string(), body);
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, ObjectStoreError> {
        let buckets = self.buckets.read().map_err(lock_error)?;
        let objects = buckets
            .get(bucket)
            .ok_or_else(|| ObjectStoreError::NoSuchBucket(bucket.to_string()))?;

        objects.get(key).cloned().ok_or(ObjectStoreError::NoSuchKey)
    }

    async fn remove_object(&self, bucket: &str, key: &str) -> Result<(), ObjectStoreError> {
        let mut buckets = self.buckets.write().map_err(lock_error)?;
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| ObjectStoreError::NoSuchBucket(bucket.to_string()))?;

        objects.remove(key);
        Ok(())
    }

    async fn list_keys(&self, bucket: &str) -> Result<Vec<String>, ObjectStoreError> {
        let buckets = self.buckets.read().map_err(lock_error)?;
        let objects = buckets
            .get(bucket)
            .ok_or_else(|| ObjectStoreError::NoSuchBucket(bucket.to_string()))?;

        Ok(objects.keys().cloned().collect())
    }
}
