//! Object store client seam
//!
//! The storage engine talks to the object store only through this trait, so the
//! S3 transport can be swapped for the in-memory store in tests and development.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Errors reported by an object store client
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ObjectStoreError {
    #[error("no such key")]
    NoSuchKey,

    #[error("no such bucket: {0}")]
    NoSuchBucket(String),

    #[error("{0}")]
    Transport(String),
}

impl ObjectStoreError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }
}

/// Operations consumed from an object store
#[async_trait]
pub trait ObjectStoreClient: Send + Sync + std::fmt::Debug {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, ObjectStoreError>;

    async fn create_bucket(&self, bucket: &str) -> Result<(), ObjectStoreError>;

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<(), ObjectStoreError>;

    /// Returns `ObjectStoreError::NoSuchKey` if the object doesn't exist
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, ObjectStoreError>;

    /// Removing an absent object succeeds
    async fn remove_object(&self, bucket: &str, key: &str) -> Result<(), ObjectStoreError>;

    /// Lists every key in the bucket, draining pagination
    async fn list_keys(&self, bucket: &str) -> Result<Vec<String>, ObjectStoreError>;
}
