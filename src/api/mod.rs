//! API layer - HTTP endpoints, middleware and server lifecycle

pub mod health;
pub mod middleware;
pub mod router;
pub mod server;
pub mod state;
pub mod types;
pub mod users;

pub use router::{create_router, RouterOptions};
pub use server::{
    shutdown_signal, DrainOutcome, Server, ServerError, ServerState, ShutdownReport,
    ShutdownTrigger,
};
pub use state::AppState;
