//! User domain

mod entity;
mod validation;

pub use entity::User;
pub use validation::{validate_user_fields, validate_user_id, UserValidationError};
