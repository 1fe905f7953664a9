//! Storage infrastructure - Object store backed key-value storage

mod client;
mod factory;
mod in_memory;
mod object_storage;
mod s3;

pub use client::{ObjectStoreClient, ObjectStoreError};
pub use factory::{StorageConfig, StorageFactory, StorageType};
pub use in_memory::InMemoryObjectStore;
pub use object_storage::ObjectStorage;
pub use s3::{S3Config, S3ObjectStore};
