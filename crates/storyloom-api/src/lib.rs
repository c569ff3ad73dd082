//! Storyloom HTTP API.
//!
//! Exposes the game engine and the finalization pipeline over axum. The
//! binary in `main.rs` wires the production adapters; tests build the same
//! router over in-memory ones.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use axum::Router;

use crate::state::AppState;

/// Builds the application router with every route under `/api/v1`.
pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::router())
        .with_state(state)
}
