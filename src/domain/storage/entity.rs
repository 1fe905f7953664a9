//! Storage entity traits and key derivation

use std::fmt::Debug;

use serde::{de::DeserializeOwned, Serialize};

/// Trait for types that can be stored by identity
///
/// The identity is assigned by the service layer; an empty identity means
/// the entity has not been persisted yet.
pub trait StorageEntity: Clone + Debug + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Entity kind, used as the key namespace (e.g. `user`)
    const KIND: &'static str;

    /// Returns the entity's identity
    fn id(&self) -> &str;

    /// Replaces the entity's identity
    fn set_id(&mut self, id: String);

    /// Whether an identity has been assigned
    fn has_id(&self) -> bool {
        !self.id().is_empty()
    }
}

/// Builds the storage key for an entity kind and identity, `<kind>:<id>`
pub fn storage_key(kind: &str, id: &str) -> String {
    format!("{}:{}", kind, id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    struct TestEntity {
        id: String,
        name: String,
    }

    impl StorageEntity for TestEntity {
        const KIND: &'static str = "test";

        fn id(&self) -> &str {
            &self.id
        }

        fn set_id(&mut self, id: String) {
            self.id = id;
        }
    }

    #[test]
    fn test_storage_key_format() {
        assert_eq!(storage_key("user", "abc"), "user:abc");
    }

    #[test]
    fn test_has_id() {
        let mut entity = TestEntity {
            id: String::new(),
            name: "Test".to_string(),
        };
        assert!(!entity.has_id());

        entity.set_id("entity-1".to_string());
        assert!(entity.has_id());
        assert_eq!(storage_key(TestEntity::KIND, entity.id()), "test:entity-1");
    }
}
