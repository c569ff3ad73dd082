//! Route modules, all mounted under `/api/v1`.

pub mod games;
pub mod health;
pub mod images;
pub mod scenes;

use axum::Router;

use crate::state::AppState;

/// Returns every route of the API, relative to `/api/v1`.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(games::router())
        .merge(scenes::router())
        .merge(images::router())
}
