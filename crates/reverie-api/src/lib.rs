//! Reverie API crate - axum HTTP server and route handlers.
//!
//! Provides the REST API for the retrieval layer: document store and
//! retrieve endpoints, the chat endpoint, and health checks.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
