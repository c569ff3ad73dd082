//! Routes for game sessions: start, inspect, reroll, vote and finalize.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use storyloom_game::application::command_handlers::{self, VoteOutcome};
use storyloom_game::application::query_handlers::{self, GameView, PlayerHandView};
use storyloom_game::domain::cards::EndingCard;
use storyloom_game::domain::commands;
use storyloom_game::domain::session::{DrawingStyle, PlayerHand};

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /games.
#[derive(Debug, Deserialize)]
pub struct StartGameRequest {
    /// Players in seating order.
    pub player_ids: Vec<String>,
    /// Drawing style index, `0..=8`.
    pub drawing_style: u8,
}

/// Response body for POST /games.
#[derive(Debug, Serialize)]
pub struct StartGameResponse {
    /// The new game.
    pub game_id: Uuid,
    /// Drawing style index.
    pub drawing_style: u8,
    /// Dealt hands, in seating order.
    pub player_hands: Vec<PlayerHand>,
    /// Ending cards left for rerolls.
    pub remaining_ending_cards: usize,
    /// When the game started.
    pub created_at: DateTime<Utc>,
}

/// Request body naming the acting player.
#[derive(Debug, Deserialize)]
pub struct PlayerRequest {
    /// The player.
    pub user_id: String,
}

/// Request body for POST /games/{game_id}/prompt-check.
#[derive(Debug, Deserialize)]
pub struct PromptCheckRequest {
    /// The player.
    pub user_id: String,
    /// Prompt to check.
    pub prompt: String,
}

/// Response body for POST /games/{game_id}/prompt-check.
#[derive(Debug, Serialize)]
pub struct PromptCheckResponse {
    /// The card the prompt would spend.
    pub card_id: u32,
}

/// Request body for POST /games/{game_id}/votes.
#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    /// The player whose turn is judged.
    pub user_id: String,
    /// The card the turn used.
    pub card_id: u32,
    /// Keep or discard the latest scene.
    pub accepted: bool,
    /// The turn being judged. Required when `accepted` is false.
    #[serde(default)]
    pub turn_index: Option<u32>,
}

/// Response body for POST /games/{game_id}/votes.
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum VoteResponse {
    /// The latest scene was removed.
    SceneDiscarded {
        /// The removed scene.
        scene_id: Uuid,
        /// Its turn index.
        order: u32,
    },
    /// The card left the player's hand.
    CardSpent {
        /// The spent card.
        card_id: u32,
    },
    /// The vote had already been applied.
    AlreadyResolved,
}

impl From<VoteOutcome> for VoteResponse {
    fn from(outcome: VoteOutcome) -> Self {
        match outcome {
            VoteOutcome::SceneDiscarded { scene_id, order } => {
                Self::SceneDiscarded { scene_id, order }
            }
            VoteOutcome::CardSpent { card_id } => Self::CardSpent { card_id },
            VoteOutcome::AlreadyResolved => Self::AlreadyResolved,
        }
    }
}

/// Request body for POST /games/{game_id}/finalize.
#[derive(Debug, Deserialize)]
pub struct FinalizeRequest {
    /// Discard the game instead of compiling a book.
    #[serde(default)]
    pub forced: bool,
}

/// POST /games
#[instrument(skip(state, request), fields(players = request.player_ids.len()))]
async fn start_game(
    State(state): State<AppState>,
    Json(request): Json<StartGameRequest>,
) -> Result<(StatusCode, Json<StartGameResponse>), ApiError> {
    let command = commands::StartGame {
        correlation_id: Uuid::new_v4(),
        player_ids: request.player_ids,
        drawing_style: DrawingStyle::try_from(request.drawing_style)?,
    };

    info!(correlation_id = %command.correlation_id, "handling start_game command");

    let session = command_handlers::handle_start_game(
        &command,
        state.clock.as_ref(),
        &*state.rng,
        &state.card_pool,
        &state.engine,
        &*state.sessions,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(StartGameResponse {
            game_id: session.game_id,
            drawing_style: session.drawing_style.index(),
            remaining_ending_cards: session.remaining_ending_cards.len(),
            player_hands: session.player_hands,
            created_at: session.created_at,
        }),
    ))
}

/// GET /games/{game_id}
async fn get_game(
    State(state): State<AppState>,
    Path(game_id): Path<Uuid>,
) -> Result<Json<GameView>, ApiError> {
    let view = query_handlers::get_game(game_id, &*state.sessions).await?;
    Ok(Json(view))
}

/// GET /games/{game_id}/players/{user_id}
async fn get_player_hand(
    State(state): State<AppState>,
    Path((game_id, user_id)): Path<(Uuid, String)>,
) -> Result<Json<PlayerHandView>, ApiError> {
    let view = query_handlers::get_player_hand(game_id, &user_id, &*state.sessions).await?;
    Ok(Json(view))
}

/// POST /games/{game_id}/ending-card/reroll
#[instrument(skip(state, request), fields(%game_id, user_id = %request.user_id))]
async fn reroll_ending_card(
    State(state): State<AppState>,
    Path(game_id): Path<Uuid>,
    Json(request): Json<PlayerRequest>,
) -> Result<Json<EndingCard>, ApiError> {
    let command = commands::RerollEndingCard {
        correlation_id: Uuid::new_v4(),
        game_id,
        user_id: request.user_id,
    };

    let card =
        command_handlers::handle_reroll_ending_card(&command, &state.locks, &*state.sessions)
            .await?;

    Ok(Json(card))
}

/// POST /games/{game_id}/prompt-check
async fn check_prompt(
    State(state): State<AppState>,
    Path(game_id): Path<Uuid>,
    Json(request): Json<PromptCheckRequest>,
) -> Result<Json<PromptCheckResponse>, ApiError> {
    let card_id = query_handlers::check_prompt(
        game_id,
        &request.user_id,
        &request.prompt,
        &state.validator,
        &*state.sessions,
    )
    .await?;
    Ok(Json(PromptCheckResponse { card_id }))
}

/// POST /games/{game_id}/votes
#[instrument(skip(state, request), fields(%game_id, accepted = request.accepted))]
async fn cast_vote(
    State(state): State<AppState>,
    Path(game_id): Path<Uuid>,
    Json(request): Json<VoteRequest>,
) -> Result<Json<VoteResponse>, ApiError> {
    let command = commands::CastVote {
        correlation_id: Uuid::new_v4(),
        game_id,
        user_id: request.user_id,
        card_id: request.card_id,
        accepted: request.accepted,
        turn_index: request.turn_index,
    };

    let outcome =
        command_handlers::handle_cast_vote(&command, &state.locks, &*state.sessions, &*state.scenes)
            .await?;

    Ok(Json(outcome.into()))
}

/// POST /games/{game_id}/finalize
///
/// Answers `200` with the book, or `204` when the game was discarded.
#[instrument(skip(state, request), fields(%game_id, forced = request.forced))]
async fn finalize(
    State(state): State<AppState>,
    Path(game_id): Path<Uuid>,
    Json(request): Json<FinalizeRequest>,
) -> Result<Response, ApiError> {
    let book = state.finalizer.finalize(game_id, request.forced).await?;
    Ok(match book {
        Some(book) => Json(book).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

/// Returns the router for game sessions.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/games", post(start_game))
        .route("/games/{game_id}", get(get_game))
        .route("/games/{game_id}/players/{user_id}", get(get_player_hand))
        .route("/games/{game_id}/ending-card/reroll", post(reroll_ending_card))
        .route("/games/{game_id}/prompt-check", post(check_prompt))
        .route("/games/{game_id}/votes", post(cast_vote))
        .route("/games/{game_id}/finalize", post(finalize))
}
