//! Infrastructure services

mod crud_service;

pub use crud_service::{CrudService, DEFAULT_OPERATION_TIMEOUT};

use crate::domain::User;

/// CRUD service for users
pub type UserService = CrudService<User>;
