//! Routes for turns. Turn submissions answer with the generated image.

use axum::extract::{Path, State};
use axum::http::header::{self, HeaderName};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use storyloom_game::application::command_handlers::{self, TurnResult};
use storyloom_game::application::query_handlers::{self, SceneView};
use storyloom_game::domain::commands;

use crate::error::ApiError;
use crate::state::AppState;

/// Id of the stored scene.
pub const SCENE_ID_HEADER: &str = "x-scene-id";
/// Card the turn used.
pub const CARD_ID_HEADER: &str = "x-card-id";
/// Turn index the scene was stored under.
pub const TURN_INDEX_HEADER: &str = "x-turn-index";

/// Request body for POST /games/{game_id}/scenes.
#[derive(Debug, Deserialize)]
pub struct SubmitTurnRequest {
    /// The player taking the turn.
    pub user_id: String,
    /// The player's prompt.
    pub prompt: String,
    /// Turn index, starting at 1.
    pub turn_index: u32,
}

/// Request body for POST /games/{game_id}/scenes/ending.
#[derive(Debug, Deserialize)]
pub struct SubmitEndingTurnRequest {
    /// The player taking the turn.
    pub user_id: String,
    /// Turn index, starting at 1.
    pub turn_index: u32,
}

fn image_response(turn: TurnResult) -> Response {
    (
        [
            (header::CONTENT_TYPE, "image/png".to_string()),
            (
                HeaderName::from_static(SCENE_ID_HEADER),
                turn.scene_id.to_string(),
            ),
            (HeaderName::from_static(CARD_ID_HEADER), turn.card_id.to_string()),
            (
                HeaderName::from_static(TURN_INDEX_HEADER),
                turn.order.to_string(),
            ),
        ],
        turn.image,
    )
        .into_response()
}

/// POST /games/{game_id}/scenes
#[instrument(skip(state, request), fields(%game_id, user_id = %request.user_id, turn = request.turn_index))]
async fn submit_turn(
    State(state): State<AppState>,
    Path(game_id): Path<Uuid>,
    Json(request): Json<SubmitTurnRequest>,
) -> Result<Response, ApiError> {
    let command = commands::SubmitTurn {
        correlation_id: Uuid::new_v4(),
        game_id,
        user_id: request.user_id,
        prompt: request.prompt,
        turn_index: request.turn_index,
    };

    info!(correlation_id = %command.correlation_id, "handling submit_turn command");

    let turn = command_handlers::handle_submit_turn(
        &command,
        state.clock.as_ref(),
        &state.validator,
        &state.engine,
        &*state.sessions,
        &*state.scenes,
        &*state.images,
    )
    .await?;

    Ok(image_response(turn))
}

/// POST /games/{game_id}/scenes/ending
#[instrument(skip(state, request), fields(%game_id, user_id = %request.user_id, turn = request.turn_index))]
async fn submit_ending_turn(
    State(state): State<AppState>,
    Path(game_id): Path<Uuid>,
    Json(request): Json<SubmitEndingTurnRequest>,
) -> Result<Response, ApiError> {
    let command = commands::SubmitEndingTurn {
        correlation_id: Uuid::new_v4(),
        game_id,
        user_id: request.user_id,
        turn_index: request.turn_index,
    };

    info!(correlation_id = %command.correlation_id, "handling submit_ending_turn command");

    let turn = command_handlers::handle_submit_ending_turn(
        &command,
        state.clock.as_ref(),
        &state.engine,
        &*state.sessions,
        &*state.scenes,
        &*state.images,
    )
    .await?;

    Ok(image_response(turn))
}

/// GET /games/{game_id}/scenes
async fn list_scenes(
    State(state): State<AppState>,
    Path(game_id): Path<Uuid>,
) -> Result<Json<Vec<SceneView>>, ApiError> {
    let scenes = query_handlers::list_scenes(game_id, &*state.sessions, &*state.scenes).await?;
    Ok(Json(scenes))
}

/// Returns the router for turns.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/games/{game_id}/scenes", post(submit_turn).get(list_scenes))
        .route("/games/{game_id}/scenes/ending", post(submit_ending_turn))
}
