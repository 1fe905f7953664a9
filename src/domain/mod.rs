//! Domain layer - entities, storage contracts and errors

pub mod error;
pub mod notification;
pub mod storage;
pub mod user;

pub use error::DomainError;
pub use notification::{NotificationAttributes, NotificationSink};
pub use storage::{storage_key, KeyValueStore, StorageEntity, StorageError};
pub use user::User;
