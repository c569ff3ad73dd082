//! Serves published images from the blob store.

use axum::Router;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;

use crate::error::ApiError;
use crate::state::AppState;

/// GET /images/{*key}
async fn get_image(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let bytes = state.blobs.get(&key).await?;
    Ok(([(header::CONTENT_TYPE, "image/png")], bytes))
}

/// Returns the router for image downloads.
pub fn router() -> Router<AppState> {
    Router::new().route("/images/{*key}", get(get_image))
}
