//! Per-game card allocation.
//!
//! Each call works on its own shuffled copies of the pool's lists, so
//! concurrent games never share draw state.

use std::collections::{HashSet, VecDeque};

use storyloom_core::error::DomainError;
use storyloom_core::rng::{DeterministicRng, shuffle};

use super::cards::{CardCategory, CardPool, EndingCard, StoryCard};
use super::session::PlayerHand;

/// The result of dealing a new game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    /// One hand per player, in the order the players were given.
    pub player_hands: Vec<PlayerHand>,
    /// Ending cards left for rerolls.
    pub remaining_ending_cards: Vec<EndingCard>,
}

/// Deals hands from a `CardPool`.
#[derive(Debug, Clone, Copy)]
pub struct CardAllocator<'a> {
    pool: &'a CardPool,
}

impl<'a> CardAllocator<'a> {
    /// Create an allocator over `pool`.
    #[must_use]
    pub fn new(pool: &'a CardPool) -> Self {
        Self { pool }
    }

    /// Deals one story card per category and one ending card to every player.
    ///
    /// Person cards are dealt first. The four other categories are dealt in a
    /// random order drawn separately for each player. Ending cards are dealt
    /// in player order and the rest are returned as the reroll pool.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidPlayerCount` for fewer than two players,
    /// `DomainError::Validation` if a user id repeats, and
    /// `DomainError::EmptyPool` if a category or the ending list has fewer
    /// cards than there are players.
    pub fn allocate(
        &self,
        player_ids: &[String],
        rng: &mut dyn DeterministicRng,
    ) -> Result<Allocation, DomainError> {
        let players = player_ids.len();
        if players < 2 {
            return Err(DomainError::InvalidPlayerCount(players));
        }
        let mut unique = HashSet::new();
        if let Some(dup) = player_ids.iter().find(|id| !unique.insert(id.as_str())) {
            return Err(DomainError::Validation(format!("duplicate player {dup}")));
        }

        let mut decks: Vec<(CardCategory, VecDeque<StoryCard>)> = Vec::with_capacity(5);
        for category in CardCategory::ALL {
            let mut cards = self.pool.story_cards(category).to_vec();
            if cards.len() < players {
                return Err(DomainError::EmptyPool(category.to_string()));
            }
            shuffle(rng, &mut cards);
            decks.push((category, cards.into()));
        }

        let mut endings = self.pool.ending_cards().to_vec();
        if endings.len() < players {
            return Err(DomainError::EmptyPool("ending".to_owned()));
        }
        shuffle(rng, &mut endings);
        let mut endings: VecDeque<EndingCard> = endings.into();

        let mut dealt: Vec<(String, Vec<StoryCard>)> = Vec::with_capacity(players);
        for user_id in player_ids {
            let mut order = CardCategory::NON_PERSON;
            shuffle(rng, &mut order);

            let mut story_cards = Vec::with_capacity(CardCategory::ALL.len());
            for category in std::iter::once(CardCategory::Person).chain(order) {
                story_cards.push(draw(&mut decks, category)?);
            }
            dealt.push((user_id.clone(), story_cards));
        }

        let mut player_hands = Vec::with_capacity(players);
        for (user_id, story_cards) in dealt {
            let ending_card = endings
                .pop_front()
                .ok_or_else(|| DomainError::EmptyPool("ending".to_owned()))?;
            player_hands.push(PlayerHand {
                user_id,
                story_cards,
                ending_card,
            });
        }

        Ok(Allocation {
            player_hands,
            remaining_ending_cards: endings.into(),
        })
    }
}

fn draw(
    decks: &mut [(CardCategory, VecDeque<StoryCard>)],
    category: CardCategory,
) -> Result<StoryCard, DomainError> {
    decks
        .iter_mut()
        .find(|(c, _)| *c == category)
        .and_then(|(_, deck)| deck.pop_front())
        .ok_or_else(|| DomainError::EmptyPool(category.to_string()))
}
