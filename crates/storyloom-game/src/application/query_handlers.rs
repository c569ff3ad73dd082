//! Query handlers for the game context.
//!
//! These read the session record and the scene keyspace and return read-only
//! view DTOs. They never write.

use chrono::{DateTime, Utc};
use serde::Serialize;
use storyloom_core::error::DomainError;
use storyloom_core::repository::{SceneKind, SceneRepository, SessionRepository};
use uuid::Uuid;

use crate::application::session_gateway;
use crate::domain::cards::{EndingCard, StoryCard};
use crate::domain::validation::PromptValidator;

/// Read-only view of one player's hand.
#[derive(Debug, Serialize)]
pub struct PlayerHandView {
    /// The game.
    pub game_id: Uuid,
    /// The player.
    pub user_id: String,
    /// Unspent story cards.
    pub story_cards: Vec<StoryCard>,
    /// Current ending card.
    pub ending_card: EndingCard,
}

/// Read-only view of a game.
#[derive(Debug, Serialize)]
pub struct GameView {
    /// The game.
    pub game_id: Uuid,
    /// Drawing style index.
    pub drawing_style: u8,
    /// Players in seating order.
    pub players: Vec<String>,
    /// Ending cards left for rerolls.
    pub remaining_ending_cards: usize,
    /// When the game started.
    pub created_at: DateTime<Utc>,
    /// Number of session replaces so far.
    pub version: i64,
}

/// Read-only view of a stored scene, without the image bytes.
#[derive(Debug, Serialize)]
pub struct SceneView {
    /// The scene.
    pub scene_id: Uuid,
    /// Author.
    pub user_id: String,
    /// Turn index.
    pub order: u32,
    /// Prompt text.
    pub prompt: String,
    /// Story or ending turn.
    pub kind: SceneKind,
    /// When the scene was stored.
    pub created_at: DateTime<Utc>,
}

/// Retrieves one player's hand.
///
/// # Errors
///
/// Returns `DomainError::UnknownGame` or `DomainError::UnknownPlayer`.
pub async fn get_player_hand(
    game_id: Uuid,
    user_id: &str,
    sessions: &dyn SessionRepository,
) -> Result<PlayerHandView, DomainError> {
    let session = session_gateway::load_session(sessions, game_id).await?;
    let hand = session.hand(user_id)?;
    Ok(PlayerHandView {
        game_id,
        user_id: hand.user_id.clone(),
        story_cards: hand.story_cards.clone(),
        ending_card: hand.ending_card.clone(),
    })
}

/// Retrieves a game summary.
///
/// # Errors
///
/// Returns `DomainError::UnknownGame` if the session is missing or expired.
pub async fn get_game(
    game_id: Uuid,
    sessions: &dyn SessionRepository,
) -> Result<GameView, DomainError> {
    let session = session_gateway::load_session(sessions, game_id).await?;
    Ok(GameView {
        game_id,
        drawing_style: session.drawing_style.index(),
        players: session
            .player_hands
            .iter()
            .map(|h| h.user_id.clone())
            .collect(),
        remaining_ending_cards: session.remaining_ending_cards.len(),
        created_at: session.created_at,
        version: session.version,
    })
}

/// Lists the scenes of a live game in turn order.
///
/// # Errors
///
/// Returns `DomainError::UnknownGame` if the session is missing or expired.
pub async fn list_scenes(
    game_id: Uuid,
    sessions: &dyn SessionRepository,
    scenes: &dyn SceneRepository,
) -> Result<Vec<SceneView>, DomainError> {
    session_gateway::load_session(sessions, game_id).await?;
    let views = scenes
        .list_by_game(game_id)
        .await?
        .into_iter()
        .map(|s| SceneView {
            scene_id: s.id,
            user_id: s.user_id,
            order: s.order,
            prompt: s.prompt,
            kind: s.kind,
            created_at: s.created_at,
        })
        .collect();
    Ok(views)
}

/// Checks a prompt against the player's hand without generating anything.
///
/// # Errors
///
/// Returns `DomainError::UnknownGame`, `DomainError::UnknownPlayer`, or any
/// `PromptValidator` error.
pub async fn check_prompt(
    game_id: Uuid,
    user_id: &str,
    prompt: &str,
    validator: &PromptValidator,
    sessions: &dyn SessionRepository,
) -> Result<u32, DomainError> {
    let session = session_gateway::load_session(sessions, game_id).await?;
    validator.validate(prompt, session.hand(user_id)?)
}
