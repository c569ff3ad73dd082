//! The game session: roster, hands, the ending-card reroll pool and the
//! drawing style.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storyloom_core::error::DomainError;
use uuid::Uuid;

use super::allocation::Allocation;
use super::cards::{EndingCard, StoryCard};

/// Illustration style chosen when the game starts. Carried on the wire as its
/// index `0..=8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum DrawingStyle {
    /// Cel animation.
    Animation,
    /// 3D cartoon.
    Cartoon3d,
    /// Comic strip.
    ComicStrip,
    /// Claymation.
    Claymation,
    /// Crayon drawing.
    CrayonDrawing,
    /// Pixel art.
    PixelArt,
    /// Minimalist illustration.
    MinimalistIllustration,
    /// Watercolor.
    Watercolor,
    /// Storybook illustration.
    StorybookIllustration,
}

impl DrawingStyle {
    const ALL: [Self; 9] = [
        Self::Animation,
        Self::Cartoon3d,
        Self::ComicStrip,
        Self::Claymation,
        Self::CrayonDrawing,
        Self::PixelArt,
        Self::MinimalistIllustration,
        Self::Watercolor,
        Self::StorybookIllustration,
    ];

    /// Wire index of the style.
    #[must_use]
    pub fn index(self) -> u8 {
        match self {
            Self::Animation => 0,
            Self::Cartoon3d => 1,
            Self::ComicStrip => 2,
            Self::Claymation => 3,
            Self::CrayonDrawing => 4,
            Self::PixelArt => 5,
            Self::MinimalistIllustration => 6,
            Self::Watercolor => 7,
            Self::StorybookIllustration => 8,
        }
    }

    /// Prompt fragment sent to the illustration service.
    #[must_use]
    pub fn prompt_fragment(self) -> &'static str {
        match self {
            Self::Animation => "animation style",
            Self::Cartoon3d => "3D cartoon style",
            Self::ComicStrip => "comic strip style",
            Self::Claymation => "claymation style",
            Self::CrayonDrawing => "crayon drawing style",
            Self::PixelArt => "pixel art style",
            Self::MinimalistIllustration => "minimalist illustration style",
            Self::Watercolor => "watercolor style",
            Self::StorybookIllustration => "storybook illustration style",
        }
    }
}

impl TryFrom<u8> for DrawingStyle {
    type Error = DomainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .get(usize::from(value))
            .copied()
            .ok_or_else(|| DomainError::Validation(format!("unknown drawing style {value}")))
    }
}

impl From<DrawingStyle> for u8 {
    fn from(style: DrawingStyle) -> Self {
        style.index()
    }
}

/// The cards one player currently holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerHand {
    /// The player.
    pub user_id: String,
    /// Unspent story cards, in deal order.
    pub story_cards: Vec<StoryCard>,
    /// The player's current ending card.
    pub ending_card: EndingCard,
}

impl PlayerHand {
    /// Returns `true` if the hand still holds the story card.
    #[must_use]
    pub fn holds(&self, card_id: u32) -> bool {
        self.story_cards.iter().any(|c| c.id == card_id)
    }
}

/// The state of one running game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSession {
    /// Game identifier.
    pub game_id: Uuid,
    /// Illustration style for every scene and the cover.
    pub drawing_style: DrawingStyle,
    /// One hand per player, in seating order.
    pub player_hands: Vec<PlayerHand>,
    /// Ending cards available for rerolls. Never holds a card a player holds.
    pub remaining_ending_cards: Vec<EndingCard>,
    /// When the game started.
    pub created_at: DateTime<Utc>,
    /// Number of replaces applied to the stored record. Not part of the
    /// payload; the store tracks it.
    #[serde(skip)]
    pub version: i64,
}

impl GameSession {
    /// Creates a session from a fresh allocation.
    #[must_use]
    pub fn new(
        game_id: Uuid,
        drawing_style: DrawingStyle,
        allocation: Allocation,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            game_id,
            drawing_style,
            player_hands: allocation.player_hands,
            remaining_ending_cards: allocation.remaining_ending_cards,
            created_at,
            version: 0,
        }
    }

    /// The hand of `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::UnknownPlayer` if the user is not in the game.
    pub fn hand(&self, user_id: &str) -> Result<&PlayerHand, DomainError> {
        self.player_hands
            .iter()
            .find(|h| h.user_id == user_id)
            .ok_or_else(|| self.unknown_player(user_id))
    }

    fn hand_mut(&mut self, user_id: &str) -> Result<&mut PlayerHand, DomainError> {
        let game_id = self.game_id;
        self.player_hands
            .iter_mut()
            .find(|h| h.user_id == user_id)
            .ok_or_else(|| DomainError::UnknownPlayer {
                game_id,
                user_id: user_id.to_owned(),
            })
    }

    fn unknown_player(&self, user_id: &str) -> DomainError {
        DomainError::UnknownPlayer {
            game_id: self.game_id,
            user_id: user_id.to_owned(),
        }
    }

    /// Removes a story card from the player's hand.
    ///
    /// Returns `false` when the card was already gone, so a repeated accept
    /// vote is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::UnknownPlayer` if the user is not in the game.
    pub fn spend_card(&mut self, user_id: &str, card_id: u32) -> Result<bool, DomainError> {
        let hand = self.hand_mut(user_id)?;
        let before = hand.story_cards.len();
        hand.story_cards.retain(|c| c.id != card_id);
        Ok(hand.story_cards.len() < before)
    }

    /// Replaces the player's ending card with the front of the reroll pool.
    ///
    /// The old card is discarded, never returned to the pool.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::UnknownPlayer` if the user is not in the game and
    /// `DomainError::EmptyPool` if no ending cards remain.
    pub fn reroll_ending_card(&mut self, user_id: &str) -> Result<EndingCard, DomainError> {
        self.hand(user_id)?;
        if self.remaining_ending_cards.is_empty() {
            return Err(DomainError::EmptyPool("ending".to_owned()));
        }
        let next = self.remaining_ending_cards.remove(0);
        let hand = self.hand_mut(user_id)?;
        hand.ending_card = next.clone();
        Ok(next)
    }
}
