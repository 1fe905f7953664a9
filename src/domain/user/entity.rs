//! User entity

use serde::{Deserialize, Serialize};

use crate::domain::storage::StorageEntity;

/// User record stored by identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Service-assigned identity; empty until created
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub email: String,
}

impl User {
    /// Create a user without an identity
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            email: email.into(),
        }
    }

    /// Builder-style identity assignment
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}

impl StorageEntity for User {
    const KIND: &'static str = "user";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}
