//! In-process scene keyspace, grouped by game.
//!
//! Every save pushes the game's deadline out by the configured lifetime.
//! Scenes of an abandoned game read as absent once it passes and are dropped
//! by `cleanup_expired`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use storyloom_core::clock::Clock;
use storyloom_core::error::DomainError;
use storyloom_core::repository::{SceneRecord, SceneRepository};
use tokio::sync::RwLock;
use uuid::Uuid;

struct GameScenes {
    scenes: Vec<SceneRecord>,
    expires_at: DateTime<Utc>,
}

/// Scene repository held in process memory.
///
/// Each game's scenes are kept sorted by turn index, one scene per index.
pub struct MemorySceneRepository {
    games: RwLock<HashMap<Uuid, GameScenes>>,
    clock: Arc<dyn Clock>,
    ttl: TimeDelta,
}

impl std::fmt::Debug for MemorySceneRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySceneRepository")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl MemorySceneRepository {
    /// Create an empty keyspace whose games live `ttl` past their last save.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            games: RwLock::new(HashMap::new()),
            clock,
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
        }
    }

    /// Removes every expired game and returns how many scenes went with them.
    pub async fn cleanup_expired(&self) -> usize {
        let now = self.clock.now();
        let mut games = self.games.write().await;
        let mut removed = 0;
        games.retain(|_, game| {
            let live = game.expires_at > now;
            if !live {
                removed += game.scenes.len();
            }
            live
        });
        removed
    }

    fn deadline(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

#[async_trait]
impl SceneRepository for MemorySceneRepository {
    async fn save(&self, scene: &SceneRecord) -> Result<(), DomainError> {
        let now = self.clock.now();
        let mut games = self.games.write().await;
        let game = games.entry(scene.game_id).or_insert_with(|| GameScenes {
            scenes: Vec::new(),
            expires_at: now,
        });
        if game.expires_at <= now {
            game.scenes.clear();
        }
        if game
            .scenes
            .iter()
            .any(|s| s.order == scene.order && s.id != scene.id)
        {
            return Err(DomainError::Validation(format!(
                "turn {} already has a scene",
                scene.order
            )));
        }
        game.scenes.retain(|s| s.id != scene.id);
        let at = game.scenes.partition_point(|s| s.order <= scene.order);
        game.scenes.insert(at, scene.clone());
        game.expires_at = self.deadline(now);
        Ok(())
    }

    async fn list_by_game(&self, game_id: Uuid) -> Result<Vec<SceneRecord>, DomainError> {
        let now = self.clock.now();
        Ok(self
            .games
            .read()
            .await
            .get(&game_id)
            .filter(|game| game.expires_at > now)
            .map(|game| game.scenes.clone())
            .unwrap_or_default())
    }

    async fn delete(&self, game_id: Uuid, scene_id: Uuid) -> Result<bool, DomainError> {
        let now = self.clock.now();
        let mut games = self.games.write().await;
        let Some(game) = games.get_mut(&game_id) else {
            return Ok(false);
        };
        if game.expires_at <= now {
            games.remove(&game_id);
            return Ok(false);
        }
        let before = game.scenes.len();
        game.scenes.retain(|s| s.id != scene_id);
        let removed = game.scenes.len() < before;
        if game.scenes.is_empty() {
            games.remove(&game_id);
        }
        Ok(removed)
    }

    async fn delete_all(&self, game_id: Uuid) -> Result<usize, DomainError> {
        let now = self.clock.now();
        Ok(self
            .games
            .write()
            .await
            .remove(&game_id)
            .filter(|game| game.expires_at > now)
            .map_or(0, |game| game.scenes.len()))
    }
}
