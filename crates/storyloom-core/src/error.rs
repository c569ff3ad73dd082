//! Domain error types.

use thiserror::Error;
use uuid::Uuid;

/// Top-level domain error type.
///
/// Validation outcomes (`ProfanityDetected`, `NoCardUsed`,
/// `MultipleCardsUsed`, `InvalidPlayerCount`, `Validation`) are expected,
/// user-facing results. `GenerationUnavailable` and `StorageUnavailable` are
/// collaborator failures the caller may retry.
#[derive(Debug, Error)]
pub enum DomainError {
    /// No session exists (or it expired) for the game.
    #[error("unknown game: {0}")]
    UnknownGame(Uuid),

    /// The user does not take part in the game.
    #[error("user {user_id} is not a player in game {game_id}")]
    UnknownPlayer {
        /// The game that was addressed.
        game_id: Uuid,
        /// The user that is not part of it.
        user_id: String,
    },

    /// A game needs at least two players.
    #[error("invalid player count: {0} (at least 2 players are required)")]
    InvalidPlayerCount(usize),

    /// A card pool ran dry.
    #[error("card pool exhausted: {0}")]
    EmptyPool(String),

    /// The prompt contains a banned term.
    #[error("prompt contains a banned term")]
    ProfanityDetected,

    /// The prompt does not reference any card in the player's hand.
    #[error("prompt does not use any card from the player's hand")]
    NoCardUsed,

    /// The prompt references more than one card from the player's hand.
    #[error("prompt uses more than one card: {0:?}")]
    MultipleCardsUsed(Vec<u32>),

    /// An illustration collaborator failed or returned unusable output.
    #[error("generation unavailable: {0}")]
    GenerationUnavailable(String),

    /// The blob store rejected the uploads.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A record (scene, blob, book) was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A malformed command (reserved turn index, duplicate player, ...).
    #[error("validation error: {0}")]
    Validation(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl DomainError {
    /// Returns `true` for collaborator failures a caller may retry as-is.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::GenerationUnavailable(_) | Self::StorageUnavailable(_)
        )
    }
}
