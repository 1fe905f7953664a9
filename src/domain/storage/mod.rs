//! Storage domain - Generic key-value abstraction over an object store

mod entity;
mod repository;

pub use entity::{storage_key, StorageEntity};
pub use repository::{KeyValueStore, StorageError};

#[cfg(test)]
pub use repository::MockKeyValueStore;
