//! Application state for shared services

use std::sync::Arc;

use crate::infrastructure::services::UserService;

/// Shared handler state
#[derive(Debug, Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
}

impl AppState {
    pub fn new(user_service: UserService) -> Self {
        Self {
            user_service: Arc::new(user_service),
        }
    }
}
