//! Commands for the game context.

use storyloom_core::command::Command;
use uuid::Uuid;

use super::session::DrawingStyle;

/// Command to deal cards and open a new game.
#[derive(Debug, Clone)]
pub struct StartGame {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Players in seating order.
    pub player_ids: Vec<String>,
    /// Illustration style for the whole game.
    pub drawing_style: DrawingStyle,
}

impl Command for StartGame {
    fn command_type(&self) -> &'static str {
        "game.start_game"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to play a story turn.
#[derive(Debug, Clone)]
pub struct SubmitTurn {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The game being played.
    pub game_id: Uuid,
    /// The player taking the turn.
    pub user_id: String,
    /// The player's prompt.
    pub prompt: String,
    /// Turn index, starting at 1.
    pub turn_index: u32,
}

impl Command for SubmitTurn {
    fn command_type(&self) -> &'static str {
        "game.submit_turn"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to play the closing turn with the player's ending card.
#[derive(Debug, Clone)]
pub struct SubmitEndingTurn {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The game being played.
    pub game_id: Uuid,
    /// The player taking the turn.
    pub user_id: String,
    /// Turn index, starting at 1.
    pub turn_index: u32,
}

impl Command for SubmitEndingTurn {
    fn command_type(&self) -> &'static str {
        "game.submit_ending_turn"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command carrying the group's verdict on the latest scene.
#[derive(Debug, Clone)]
pub struct CastVote {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The game being played.
    pub game_id: Uuid,
    /// The player whose turn is being judged.
    pub user_id: String,
    /// The card the turn spent.
    pub card_id: u32,
    /// Whether the scene is kept.
    pub accepted: bool,
    /// The turn being judged. Required for a reject, which only removes that
    /// turn.
    pub turn_index: Option<u32>,
}

impl Command for CastVote {
    fn command_type(&self) -> &'static str {
        "game.cast_vote"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to swap a player's ending card for a fresh one.
#[derive(Debug, Clone)]
pub struct RerollEndingCard {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The game being played.
    pub game_id: Uuid,
    /// The player rerolling.
    pub user_id: String,
}

impl Command for RerollEndingCard {
    fn command_type(&self) -> &'static str {
        "game.reroll_ending_card"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}
