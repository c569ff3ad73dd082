//! Command handlers for the game context.
//!
//! Each handler loads the session through the gateway, applies the domain
//! operation and writes back only what changed. The session record and the
//! scene keyspace are never written in the same handler.

use std::sync::Mutex;

use storyloom_core::clock::Clock;
use storyloom_core::command::Command;
use storyloom_core::error::DomainError;
use storyloom_core::ports::{ImageGenerator, SceneImageRequest};
use storyloom_core::repository::{SceneKind, SceneRecord, SceneRepository, SessionRepository};
use storyloom_core::rng::DeterministicRng;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::application::config::{EngineConfig, summarize_prompts};
use crate::application::session_gateway::{self, SessionLocks};
use crate::domain::allocation::CardAllocator;
use crate::domain::cards::{CardPool, EndingCard};
use crate::domain::commands::{
    CastVote, RerollEndingCard, StartGame, SubmitEndingTurn, SubmitTurn,
};
use crate::domain::session::GameSession;
use crate::domain::validation::PromptValidator;

/// Result of a generated turn.
#[derive(Debug, Clone)]
pub struct TurnResult {
    /// The stored scene.
    pub scene_id: Uuid,
    /// The story card the prompt spends, or the ending card for an ending
    /// turn.
    pub card_id: u32,
    /// The turn index the scene was stored under.
    pub order: u32,
    /// Illustration bytes.
    pub image: Vec<u8>,
}

/// What a vote did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
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
    /// Nothing left to do; the vote was already applied.
    AlreadyResolved,
}

/// Handles the `StartGame` command: deals hands and stores a new session.
///
/// The `Mutex` is locked only around the synchronous allocation so no guard
/// is held across an await point.
///
/// # Errors
///
/// Returns `DomainError::InvalidPlayerCount`, `DomainError::Validation` or
/// `DomainError::EmptyPool` from allocation, or the repository's error.
#[instrument(
    skip_all,
    fields(
        command = command.command_type(),
        correlation_id = %command.correlation_id(),
    )
)]
pub async fn handle_start_game(
    command: &StartGame,
    clock: &dyn Clock,
    rng: &Mutex<dyn DeterministicRng + Send>,
    pool: &CardPool,
    config: &EngineConfig,
    sessions: &dyn SessionRepository,
) -> Result<GameSession, DomainError> {
    let allocation = {
        let mut rng_guard = rng
            .lock()
            .map_err(|e| DomainError::Infrastructure(format!("RNG mutex poisoned: {e}")))?;
        CardAllocator::new(pool).allocate(&command.player_ids, &mut *rng_guard)?
    };

    let game_id = Uuid::new_v4();
    let session = GameSession::new(game_id, command.drawing_style, allocation, clock.now());
    session_gateway::create_session(sessions, &session, config.session_ttl).await?;

    info!(%game_id, players = session.player_hands.len(), "game started");
    Ok(session)
}

/// Handles the `SubmitTurn` command: validates the prompt, requests an
/// illustration and stores the scene under the turn index.
///
/// # Errors
///
/// Returns `DomainError::UnknownGame` / `DomainError::UnknownPlayer` for an
/// unknown game or player, `DomainError::Validation` for turn `0` or a turn
/// that already has a scene, any `PromptValidator` error, and
/// `DomainError::GenerationUnavailable` if the illustration fails or comes
/// back empty.
#[instrument(
    skip_all,
    fields(
        command = command.command_type(),
        correlation_id = %command.correlation_id(),
        game_id = %command.game_id,
        turn = command.turn_index,
    )
)]
pub async fn handle_submit_turn(
    command: &SubmitTurn,
    clock: &dyn Clock,
    validator: &PromptValidator,
    config: &EngineConfig,
    sessions: &dyn SessionRepository,
    scenes: &dyn SceneRepository,
    images: &dyn ImageGenerator,
) -> Result<TurnResult, DomainError> {
    let session = session_gateway::load_session(sessions, command.game_id).await?;
    let hand = session.hand(&command.user_id)?;
    let existing = check_turn_slot(scenes, command.game_id, command.turn_index).await?;

    let card_id = validator.validate(&command.prompt, hand)?;

    let request = SceneImageRequest {
        style: session.drawing_style.prompt_fragment().to_owned(),
        prior_summary: prior_summary(&existing, config.summary_char_budget),
        user_prompt: command.prompt.clone(),
        ending: false,
    };
    let image = generate(images, &request).await?;

    let scene = SceneRecord {
        id: Uuid::new_v4(),
        game_id: command.game_id,
        user_id: command.user_id.clone(),
        order: command.turn_index,
        prompt: command.prompt.clone(),
        image,
        kind: SceneKind::Story,
        created_at: clock.now(),
    };
    scenes.save(&scene).await?;

    info!(scene_id = %scene.id, card_id, "scene generated");
    Ok(TurnResult {
        scene_id: scene.id,
        card_id,
        order: scene.order,
        image: scene.image,
    })
}

/// Handles the `SubmitEndingTurn` command: illustrates the player's ending
/// card as the closing scene.
///
/// The ending card's text is the prompt, so no card-usage validation applies.
///
/// # Errors
///
/// Same as `handle_submit_turn`, minus the validation outcomes.
#[instrument(
    skip_all,
    fields(
        command = command.command_type(),
        correlation_id = %command.correlation_id(),
        game_id = %command.game_id,
        turn = command.turn_index,
    )
)]
pub async fn handle_submit_ending_turn(
    command: &SubmitEndingTurn,
    clock: &dyn Clock,
    config: &EngineConfig,
    sessions: &dyn SessionRepository,
    scenes: &dyn SceneRepository,
    images: &dyn ImageGenerator,
) -> Result<TurnResult, DomainError> {
    let session = session_gateway::load_session(sessions, command.game_id).await?;
    let ending_card = session.hand(&command.user_id)?.ending_card.clone();
    let existing = check_turn_slot(scenes, command.game_id, command.turn_index).await?;

    let request = SceneImageRequest {
        style: session.drawing_style.prompt_fragment().to_owned(),
        prior_summary: prior_summary(&existing, config.summary_char_budget),
        user_prompt: ending_card.content.clone(),
        ending: true,
    };
    let image = generate(images, &request).await?;

    let scene = SceneRecord {
        id: Uuid::new_v4(),
        game_id: command.game_id,
        user_id: command.user_id.clone(),
        order: command.turn_index,
        prompt: ending_card.content,
        image,
        kind: SceneKind::Ending,
        created_at: clock.now(),
    };
    scenes.save(&scene).await?;

    info!(scene_id = %scene.id, ending_card_id = ending_card.id, "ending scene generated");
    Ok(TurnResult {
        scene_id: scene.id,
        card_id: ending_card.id,
        order: scene.order,
        image: scene.image,
    })
}

/// Handles the `CastVote` command.
///
/// A rejection removes the highest-order scene, and only when that scene is
/// the judged turn written by the judged player. It leaves the session alone.
/// An acceptance removes the card from the hand and leaves the scenes alone.
/// Repeating either is a no-op.
///
/// # Errors
///
/// Returns `DomainError::UnknownGame` / `DomainError::UnknownPlayer` for an
/// unknown game or player, `DomainError::Validation` for a rejection without
/// a turn index, or a repository error.
#[instrument(
    skip_all,
    fields(
        command = command.command_type(),
        correlation_id = %command.correlation_id(),
        game_id = %command.game_id,
        accepted = command.accepted,
    )
)]
pub async fn handle_cast_vote(
    command: &CastVote,
    locks: &SessionLocks,
    sessions: &dyn SessionRepository,
    scenes: &dyn SceneRepository,
) -> Result<VoteOutcome, DomainError> {
    if command.accepted {
        let _guard = locks.acquire(command.game_id).await;
        let mut session = session_gateway::load_session(sessions, command.game_id).await?;
        if !session.spend_card(&command.user_id, command.card_id)? {
            info!(card_id = command.card_id, "card already spent");
            return Ok(VoteOutcome::AlreadyResolved);
        }
        session_gateway::replace_session(sessions, &mut session).await?;
        info!(card_id = command.card_id, "card spent");
        return Ok(VoteOutcome::CardSpent {
            card_id: command.card_id,
        });
    }

    let session = session_gateway::load_session(sessions, command.game_id).await?;
    session.hand(&command.user_id)?;
    let Some(turn_index) = command.turn_index else {
        return Err(DomainError::Validation(
            "a reject vote must name the judged turn".to_owned(),
        ));
    };

    let Some(latest) = scenes
        .list_by_game(command.game_id)
        .await?
        .into_iter()
        .max_by_key(|s| s.order)
    else {
        info!("no scene to discard");
        return Ok(VoteOutcome::AlreadyResolved);
    };
    if latest.order != turn_index || latest.user_id != command.user_id {
        info!(latest = latest.order, "judged turn is no longer the latest scene");
        return Ok(VoteOutcome::AlreadyResolved);
    }

    if !scenes.delete(command.game_id, latest.id).await? {
        return Ok(VoteOutcome::AlreadyResolved);
    }
    info!(scene_id = %latest.id, order = latest.order, "scene discarded");
    Ok(VoteOutcome::SceneDiscarded {
        scene_id: latest.id,
        order: latest.order,
    })
}

/// Handles the `RerollEndingCard` command: swaps the player's ending card for
/// the front of the reroll pool.
///
/// # Errors
///
/// Returns `DomainError::UnknownGame` / `DomainError::UnknownPlayer` for an
/// unknown game or player, `DomainError::EmptyPool` if no ending cards
/// remain, or a repository error.
#[instrument(
    skip_all,
    fields(
        command = command.command_type(),
        correlation_id = %command.correlation_id(),
        game_id = %command.game_id,
    )
)]
pub async fn handle_reroll_ending_card(
    command: &RerollEndingCard,
    locks: &SessionLocks,
    sessions: &dyn SessionRepository,
) -> Result<EndingCard, DomainError> {
    let _guard = locks.acquire(command.game_id).await;
    let mut session = session_gateway::load_session(sessions, command.game_id).await?;
    let card = session.reroll_ending_card(&command.user_id)?;
    session_gateway::replace_session(sessions, &mut session).await?;

    info!(
        ending_card_id = card.id,
        remaining = session.remaining_ending_cards.len(),
        "ending card rerolled"
    );
    Ok(card)
}

async fn check_turn_slot(
    scenes: &dyn SceneRepository,
    game_id: Uuid,
    turn_index: u32,
) -> Result<Vec<SceneRecord>, DomainError> {
    if turn_index == 0 {
        return Err(DomainError::Validation(
            "turn index 0 is reserved for the cover".to_owned(),
        ));
    }
    let existing = scenes.list_by_game(game_id).await?;
    if existing.iter().any(|s| s.order == turn_index) {
        return Err(DomainError::Validation(format!(
            "turn {turn_index} already has a scene"
        )));
    }
    Ok(existing)
}

fn prior_summary(existing: &[SceneRecord], budget: usize) -> Option<String> {
    let summary = summarize_prompts(existing.iter().map(|s| s.prompt.as_str()), budget);
    (!summary.is_empty()).then_some(summary)
}

async fn generate(
    images: &dyn ImageGenerator,
    request: &SceneImageRequest,
) -> Result<Vec<u8>, DomainError> {
    let generated = images.generate_scene(request).await.map_err(|e| {
        warn!(error = %e, "illustration request failed");
        match e {
            DomainError::GenerationUnavailable(_) => e,
            other => DomainError::GenerationUnavailable(other.to_string()),
        }
    })?;
    if generated.bytes.is_empty() {
        warn!("illustration service returned an empty image");
        return Err(DomainError::GenerationUnavailable(
            "empty image returned".to_owned(),
        ));
    }
    Ok(generated.bytes)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{DateTime, TimeZone, Utc};

    use super::*;
    use crate::application::session_gateway::{create_session, load_session};
    use crate::domain::allocation::Allocation;
    use crate::domain::cards::{CardCatalog, CardCategory, StoryCard};
    use crate::domain::session::{DrawingStyle, PlayerHand};
    use crate::domain::tokenizer::SimpleTokenizer;
    use crate::domain::validation::{Denylist, KeywordMatch};
    use storyloom_test_support::{
        FailingImageGenerator, FixedClock, RecordingSceneRepository, RecordingSessionRepository,
        SequenceRng, StubImageGenerator,
    };

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()
    }

    fn story(id: u32, category: CardCategory, keyword: &str) -> StoryCard {
        StoryCard {
            id,
            category,
            keyword: keyword.to_owned(),
            variant_keywords: Vec::new(),
        }
    }

    fn ending(id: u32) -> EndingCard {
        EndingCard {
            id,
            content: format!("and so ending {id} came true"),
        }
    }

    fn validator() -> PromptValidator {
        PromptValidator::new(
            Denylist::new(["heck"]),
            Box::new(SimpleTokenizer),
            KeywordMatch::Exact,
        )
    }

    /// Stores a two-player session: ana holds `drop` (1) and `sword` (2), ben
    /// holds `castle` (3).
    async fn seeded_sessions(game_id: Uuid) -> RecordingSessionRepository {
        let session = GameSession::new(
            game_id,
            DrawingStyle::Watercolor,
            Allocation {
                player_hands: vec![
                    PlayerHand {
                        user_id: "ana".to_owned(),
                        story_cards: vec![
                            story(1, CardCategory::Object, "drop"),
                            story(2, CardCategory::Object, "sword"),
                        ],
                        ending_card: ending(10),
                    },
                    PlayerHand {
                        user_id: "ben".to_owned(),
                        story_cards: vec![story(3, CardCategory::Place, "castle")],
                        ending_card: ending(11),
                    },
                ],
                remaining_ending_cards: vec![ending(12)],
            },
            fixed_now(),
        );
        let repo = RecordingSessionRepository::new();
        create_session(&repo, &session, Duration::from_secs(1800))
            .await
            .unwrap();
        repo
    }

    fn scene(game_id: Uuid, order: u32, prompt: &str) -> SceneRecord {
        SceneRecord {
            id: Uuid::new_v4(),
            game_id,
            user_id: "ana".to_owned(),
            order,
            prompt: prompt.to_owned(),
            image: vec![1, 2, 3],
            kind: SceneKind::Story,
            created_at: fixed_now(),
        }
    }

    fn submit(game_id: Uuid, user_id: &str, prompt: &str, turn_index: u32) -> SubmitTurn {
        SubmitTurn {
            correlation_id: Uuid::new_v4(),
            game_id,
            user_id: user_id.to_owned(),
            prompt: prompt.to_owned(),
            turn_index,
        }
    }

    fn vote(game_id: Uuid, card_id: u32, accepted: bool, turn_index: Option<u32>) -> CastVote {
        CastVote {
            correlation_id: Uuid::new_v4(),
            game_id,
            user_id: "ana".to_owned(),
            card_id,
            accepted,
            turn_index,
        }
    }

    #[tokio::test]
    async fn test_handle_start_game_stores_session_with_ttl() {
        // Arrange
        let mut story_cards = Vec::new();
        for (i, category) in CardCategory::ALL.into_iter().enumerate() {
            let base = u32::try_from(i).unwrap() * 10;
            story_cards.push(story(base + 1, category, &format!("{category}-a")));
            story_cards.push(story(base + 2, category, &format!("{category}-b")));
        }
        let pool = CardPool::from_catalog(CardCatalog {
            story_cards,
            ending_cards: vec![ending(1), ending(2), ending(3)],
        })
        .unwrap();
        let rng: Mutex<SequenceRng> = Mutex::new(SequenceRng::new(Vec::new()));
        let rng_ref: &Mutex<dyn DeterministicRng + Send> = &rng;
        let sessions = RecordingSessionRepository::new();
        let command = StartGame {
            correlation_id: Uuid::new_v4(),
            player_ids: vec!["ana".to_owned(), "ben".to_owned()],
            drawing_style: DrawingStyle::PixelArt,
        };

        // Act
        let session = handle_start_game(
            &command,
            &FixedClock(fixed_now()),
            rng_ref,
            &pool,
            &EngineConfig::default(),
            &sessions,
        )
        .await
        .unwrap();

        // Assert
        assert_eq!(session.player_hands.len(), 2);
        assert_eq!(session.player_hands[0].story_cards[0].id, 1);
        assert_eq!(session.remaining_ending_cards.len(), 1);
        assert_eq!(session.created_at, fixed_now());
        let created = sessions.created();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].0.game_id, session.game_id);
        assert_eq!(created[0].1, Duration::from_secs(1800));
    }

    #[tokio::test]
    async fn test_handle_submit_turn_stores_scene_and_returns_card() {
        // Arrange
        let game_id = Uuid::new_v4();
        let sessions = seeded_sessions(game_id).await;
        let scenes = RecordingSceneRepository::new();
        let images = StubImageGenerator::new(vec![0x89, 0x50]);

        // Act
        let result = handle_submit_turn(
            &submit(game_id, "ana", "the drop broke", 1),
            &FixedClock(fixed_now()),
            &validator(),
            &EngineConfig::default(),
            &sessions,
            &scenes,
            &images,
        )
        .await
        .unwrap();

        // Assert
        assert_eq!(result.card_id, 1);
        assert_eq!(result.order, 1);
        assert_eq!(result.image, vec![0x89, 0x50]);
        let stored = scenes.scenes();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, result.scene_id);
        assert_eq!(stored[0].kind, SceneKind::Story);
        let requests = images.requests();
        assert_eq!(requests[0].style, "watercolor style");
        assert_eq!(requests[0].prior_summary, None);
        assert!(!requests[0].ending);
        assert!(sessions.replaced().is_empty());
    }

    #[tokio::test]
    async fn test_handle_submit_turn_sends_prior_summary() {
        // Arrange
        let game_id = Uuid::new_v4();
        let sessions = seeded_sessions(game_id).await;
        let scenes = RecordingSceneRepository::with_scenes(vec![
            scene(game_id, 2, "a storm rolled in"),
            scene(game_id, 1, "a knight woke up"),
        ]);
        let images = StubImageGenerator::new(vec![1]);

        // Act
        handle_submit_turn(
            &submit(game_id, "ana", "the sword shone", 3),
            &FixedClock(fixed_now()),
            &validator(),
            &EngineConfig::default(),
            &sessions,
            &scenes,
            &images,
        )
        .await
        .unwrap();

        // Assert
        assert_eq!(
            images.requests()[0].prior_summary.as_deref(),
            Some("a knight woke up. a storm rolled in")
        );
    }

    #[tokio::test]
    async fn test_handle_submit_turn_rejects_reserved_and_taken_turns() {
        // Arrange
        let game_id = Uuid::new_v4();
        let sessions = seeded_sessions(game_id).await;
        let scenes = RecordingSceneRepository::with_scenes(vec![scene(game_id, 1, "first")]);
        let images = StubImageGenerator::new(vec![1]);
        let clock = FixedClock(fixed_now());
        let validator = validator();
        let config = EngineConfig::default();

        // Act
        let cover_slot = handle_submit_turn(
            &submit(game_id, "ana", "the drop broke", 0),
            &clock,
            &validator,
            &config,
            &sessions,
            &scenes,
            &images,
        )
        .await;
        let taken_slot = handle_submit_turn(
            &submit(game_id, "ana", "the drop broke", 1),
            &clock,
            &validator,
            &config,
            &sessions,
            &scenes,
            &images,
        )
        .await;

        // Assert
        assert!(matches!(cover_slot, Err(DomainError::Validation(_))));
        assert!(matches!(taken_slot, Err(DomainError::Validation(_))));
        assert!(images.requests().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_submits_for_one_turn_store_one_scene() {
        // Arrange
        let game_id = Uuid::new_v4();
        let sessions = seeded_sessions(game_id).await;
        let scenes = RecordingSceneRepository::new();
        let images = StubImageGenerator::new(vec![1]).with_delay(Duration::from_millis(50));
        let clock = FixedClock(fixed_now());
        let validator = validator();
        let config = EngineConfig::default();
        let drop_turn = submit(game_id, "ana", "the drop broke", 1);
        let castle_turn = submit(game_id, "ben", "the castle fell", 1);

        // Act
        let (a, b) = tokio::join!(
            handle_submit_turn(
                &drop_turn, &clock, &validator, &config, &sessions, &scenes, &images
            ),
            handle_submit_turn(
                &castle_turn, &clock, &validator, &config, &sessions, &scenes, &images
            ),
        );

        // Assert
        assert_eq!(images.requests().len(), 2);
        let (winner, loser) = if a.is_ok() { (a, b) } else { (b, a) };
        let winner = winner.unwrap();
        assert!(matches!(loser, Err(DomainError::Validation(_))));
        assert_eq!(scenes.scenes().len(), 1);
        assert_eq!(scenes.scenes()[0].id, winner.scene_id);
    }

    #[tokio::test]
    async fn test_handle_submit_turn_rejects_unknown_game_and_player() {
        // Arrange
        let game_id = Uuid::new_v4();
        let sessions = seeded_sessions(game_id).await;
        let scenes = RecordingSceneRepository::new();
        let images = StubImageGenerator::new(vec![1]);
        let clock = FixedClock(fixed_now());
        let validator = validator();
        let config = EngineConfig::default();

        // Act
        let unknown_game = handle_submit_turn(
            &submit(Uuid::new_v4(), "ana", "the drop broke", 1),
            &clock,
            &validator,
            &config,
            &sessions,
            &scenes,
            &images,
        )
        .await;
        let unknown_player = handle_submit_turn(
            &submit(game_id, "mallory", "the drop broke", 1),
            &clock,
            &validator,
            &config,
            &sessions,
            &scenes,
            &images,
        )
        .await;

        // Assert
        assert!(matches!(unknown_game, Err(DomainError::UnknownGame(_))));
        assert!(matches!(
            unknown_player,
            Err(DomainError::UnknownPlayer { .. })
        ));
    }

    #[tokio::test]
    async fn test_handle_submit_turn_does_not_store_when_validation_fails() {
        // Arrange
        let game_id = Uuid::new_v4();
        let sessions = seeded_sessions(game_id).await;
        let scenes = RecordingSceneRepository::new();
        let images = StubImageGenerator::new(vec![1]);

        // Act
        let result = handle_submit_turn(
            &submit(game_id, "ana", "the drop and the sword", 1),
            &FixedClock(fixed_now()),
            &validator(),
            &EngineConfig::default(),
            &sessions,
            &scenes,
            &images,
        )
        .await;

        // Assert
        assert!(matches!(result, Err(DomainError::MultipleCardsUsed(_))));
        assert!(scenes.scenes().is_empty());
        assert!(images.requests().is_empty());
    }

    #[tokio::test]
    async fn test_handle_submit_turn_maps_generation_failure() {
        // Arrange
        let game_id = Uuid::new_v4();
        let sessions = seeded_sessions(game_id).await;
        let scenes = RecordingSceneRepository::new();

        // Act
        let failed = handle_submit_turn(
            &submit(game_id, "ana", "the drop broke", 1),
            &FixedClock(fixed_now()),
            &validator(),
            &EngineConfig::default(),
            &sessions,
            &scenes,
            &FailingImageGenerator,
        )
        .await;
        let empty = handle_submit_turn(
            &submit(game_id, "ana", "the drop broke", 1),
            &FixedClock(fixed_now()),
            &validator(),
            &EngineConfig::default(),
            &sessions,
            &scenes,
            &StubImageGenerator::new(Vec::new()),
        )
        .await;

        // Assert
        assert!(matches!(failed, Err(DomainError::GenerationUnavailable(_))));
        assert!(matches!(empty, Err(DomainError::GenerationUnavailable(_))));
        assert!(scenes.scenes().is_empty());
    }

    #[tokio::test]
    async fn test_handle_submit_ending_turn_uses_ending_card_text() {
        // Arrange
        let game_id = Uuid::new_v4();
        let sessions = seeded_sessions(game_id).await;
        let scenes = RecordingSceneRepository::new();
        let images = StubImageGenerator::new(vec![7]);
        let command = SubmitEndingTurn {
            correlation_id: Uuid::new_v4(),
            game_id,
            user_id: "ben".to_owned(),
            turn_index: 4,
        };

        // Act
        let result = handle_submit_ending_turn(
            &command,
            &FixedClock(fixed_now()),
            &EngineConfig::default(),
            &sessions,
            &scenes,
            &images,
        )
        .await
        .unwrap();

        // Assert
        assert_eq!(result.card_id, 11);
        let requests = images.requests();
        assert!(requests[0].ending);
        assert_eq!(requests[0].user_prompt, "and so ending 11 came true");
        let stored = scenes.scenes();
        assert_eq!(stored[0].kind, SceneKind::Ending);
        assert_eq!(stored[0].order, 4);
    }

    #[tokio::test]
    async fn test_reject_vote_deletes_only_latest_scene() {
        // Arrange
        let game_id = Uuid::new_v4();
        let sessions = seeded_sessions(game_id).await;
        let first = scene(game_id, 1, "first");
        let second = scene(game_id, 2, "second");
        let scenes = RecordingSceneRepository::with_scenes(vec![second.clone(), first.clone()]);

        // Act
        let outcome = handle_cast_vote(
            &vote(game_id, 1, false, Some(2)),
            &SessionLocks::disabled(),
            &sessions,
            &scenes,
        )
        .await
        .unwrap();

        // Assert
        assert_eq!(
            outcome,
            VoteOutcome::SceneDiscarded {
                scene_id: second.id,
                order: 2
            }
        );
        assert_eq!(scenes.deleted(), vec![second.id]);
        assert_eq!(scenes.scenes(), vec![first]);
        assert!(sessions.replaced().is_empty());
    }

    #[tokio::test]
    async fn test_reject_vote_is_idempotent() {
        // Arrange
        let game_id = Uuid::new_v4();
        let sessions = seeded_sessions(game_id).await;
        let first = scene(game_id, 1, "first");
        let second = scene(game_id, 2, "second");
        let scenes = RecordingSceneRepository::with_scenes(vec![first.clone(), second]);
        let locks = SessionLocks::disabled();

        // Act
        let once = handle_cast_vote(&vote(game_id, 1, false, Some(2)), &locks, &sessions, &scenes)
            .await
            .unwrap();
        let twice = handle_cast_vote(&vote(game_id, 1, false, Some(2)), &locks, &sessions, &scenes)
            .await
            .unwrap();

        // Assert
        assert!(matches!(once, VoteOutcome::SceneDiscarded { order: 2, .. }));
        assert_eq!(twice, VoteOutcome::AlreadyResolved);
        assert_eq!(scenes.scenes(), vec![first]);
    }

    #[tokio::test]
    async fn test_reject_vote_without_turn_index_is_invalid() {
        // Arrange
        let game_id = Uuid::new_v4();
        let sessions = seeded_sessions(game_id).await;
        let first = scene(game_id, 1, "first");
        let second = scene(game_id, 2, "second");
        let scenes = RecordingSceneRepository::with_scenes(vec![first.clone(), second.clone()]);
        let locks = SessionLocks::disabled();

        // Act
        let command = vote(game_id, 1, false, None);
        let once = handle_cast_vote(&command, &locks, &sessions, &scenes).await;
        let twice = handle_cast_vote(&command, &locks, &sessions, &scenes).await;

        // Assert
        assert!(matches!(once, Err(DomainError::Validation(_))));
        assert!(matches!(twice, Err(DomainError::Validation(_))));
        assert_eq!(scenes.scenes(), vec![first, second]);
        assert!(scenes.deleted().is_empty());
    }

    #[tokio::test]
    async fn test_reject_vote_leaves_another_players_scene() {
        // Arrange
        let game_id = Uuid::new_v4();
        let sessions = seeded_sessions(game_id).await;
        let mut bens = scene(game_id, 1, "the castle fell");
        bens.user_id = "ben".to_owned();
        let scenes = RecordingSceneRepository::with_scenes(vec![bens.clone()]);

        // Act
        let outcome = handle_cast_vote(
            &vote(game_id, 1, false, Some(1)),
            &SessionLocks::disabled(),
            &sessions,
            &scenes,
        )
        .await
        .unwrap();

        // Assert
        assert_eq!(outcome, VoteOutcome::AlreadyResolved);
        assert_eq!(scenes.scenes(), vec![bens]);
    }

    #[tokio::test]
    async fn test_reject_vote_with_no_scenes_is_a_no_op() {
        let game_id = Uuid::new_v4();
        let sessions = seeded_sessions(game_id).await;
        let scenes = RecordingSceneRepository::new();

        let outcome = handle_cast_vote(
            &vote(game_id, 1, false, Some(1)),
            &SessionLocks::disabled(),
            &sessions,
            &scenes,
        )
        .await
        .unwrap();

        assert_eq!(outcome, VoteOutcome::AlreadyResolved);
        assert!(scenes.deleted().is_empty());
    }

    #[tokio::test]
    async fn test_accept_vote_spends_card_and_leaves_scenes() {
        // Arrange
        let game_id = Uuid::new_v4();
        let sessions = seeded_sessions(game_id).await;
        let scenes = RecordingSceneRepository::with_scenes(vec![scene(game_id, 1, "first")]);
        let locks = SessionLocks::per_game();

        // Act
        let once = handle_cast_vote(&vote(game_id, 2, true, Some(1)), &locks, &sessions, &scenes)
            .await
            .unwrap();
        let twice = handle_cast_vote(&vote(game_id, 2, true, Some(1)), &locks, &sessions, &scenes)
            .await
            .unwrap();

        // Assert
        assert_eq!(once, VoteOutcome::CardSpent { card_id: 2 });
        assert_eq!(twice, VoteOutcome::AlreadyResolved);
        let session = load_session(&sessions, game_id).await.unwrap();
        let hand = session.hand("ana").unwrap();
        assert!(!hand.holds(2));
        assert!(hand.holds(1));
        assert_eq!(session.version, 1);
        assert_eq!(sessions.replaced().len(), 1);
        assert_eq!(scenes.scenes().len(), 1);
        assert!(scenes.deleted().is_empty());
    }

    #[tokio::test]
    async fn test_vote_rejects_unknown_player() {
        let game_id = Uuid::new_v4();
        let sessions = seeded_sessions(game_id).await;
        let scenes = RecordingSceneRepository::with_scenes(vec![scene(game_id, 1, "first")]);
        let mut command = vote(game_id, 1, false, None);
        command.user_id = "mallory".to_owned();

        let result =
            handle_cast_vote(&command, &SessionLocks::disabled(), &sessions, &scenes).await;

        assert!(matches!(result, Err(DomainError::UnknownPlayer { .. })));
        assert_eq!(scenes.scenes().len(), 1);
    }

    #[tokio::test]
    async fn test_reroll_replaces_ending_card_then_reports_empty_pool() {
        // Arrange
        let game_id = Uuid::new_v4();
        let sessions = seeded_sessions(game_id).await;
        let locks = SessionLocks::disabled();
        let command = RerollEndingCard {
            correlation_id: Uuid::new_v4(),
            game_id,
            user_id: "ana".to_owned(),
        };

        // Act
        let card = handle_reroll_ending_card(&command, &locks, &sessions)
            .await
            .unwrap();
        let exhausted = handle_reroll_ending_card(&command, &locks, &sessions).await;

        // Assert
        assert_eq!(card.id, 12);
        assert!(matches!(exhausted, Err(DomainError::EmptyPool(_))));
        let session = load_session(&sessions, game_id).await.unwrap();
        assert_eq!(session.hand("ana").unwrap().ending_card.id, 12);
        assert_eq!(session.hand("ben").unwrap().ending_card.id, 11);
        assert!(session.remaining_ending_cards.is_empty());
        assert_eq!(sessions.replaced().len(), 1);
    }
}
