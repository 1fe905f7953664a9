//! Infrastructure layer - External service implementations

pub mod logging;
pub mod notifier;
pub mod observability;
pub mod rate_limiter;
pub mod services;
pub mod storage;
