//! API Module
//!
//! HTTP surface for the prefetch daemon: router configuration, handlers
//! and shared application state.

mod handlers;
mod routes;

pub use handlers::AppState;
pub use routes::create_router;
