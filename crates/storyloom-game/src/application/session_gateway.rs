//! The single path through which session records are read and written.
//!
//! Records are whole-document, last-writer-wins. `SessionLocks` can optionally
//! serialize read-modify-write cycles per game within one process.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use storyloom_core::error::DomainError;
use storyloom_core::repository::{SessionRepository, StoredSession};
use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

use crate::domain::session::GameSession;

/// Rebuilds a `GameSession` from its stored record.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the payload does not deserialize.
pub fn reconstitute(stored: &StoredSession) -> Result<GameSession, DomainError> {
    let mut session: GameSession = serde_json::from_value(stored.payload.clone())
        .map_err(|e| DomainError::Infrastructure(format!("session deserialization failed: {e}")))?;
    session.version = stored.version;
    Ok(session)
}

/// Serializes a `GameSession` into its stored record.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if serialization fails.
pub fn to_stored_session(session: &GameSession) -> Result<StoredSession, DomainError> {
    let payload = serde_json::to_value(session)
        .map_err(|e| DomainError::Infrastructure(format!("session serialization failed: {e}")))?;
    Ok(StoredSession {
        game_id: session.game_id,
        payload,
        version: session.version,
    })
}

/// Loads the session for `game_id`.
///
/// # Errors
///
/// Returns `DomainError::UnknownGame` if no live record exists, or the
/// repository's error.
pub async fn load_session(
    repo: &dyn SessionRepository,
    game_id: Uuid,
) -> Result<GameSession, DomainError> {
    let stored = repo
        .get(game_id)
        .await?
        .ok_or(DomainError::UnknownGame(game_id))?;
    reconstitute(&stored)
}

/// Stores a brand new session with the given lifetime.
///
/// # Errors
///
/// Returns the repository's error.
pub async fn create_session(
    repo: &dyn SessionRepository,
    session: &GameSession,
    ttl: Duration,
) -> Result<(), DomainError> {
    repo.create(&to_stored_session(session)?, ttl).await
}

/// Overwrites the stored session and bumps its version.
///
/// # Errors
///
/// Returns `DomainError::UnknownGame` if the record expired meanwhile, or the
/// repository's error.
pub async fn replace_session(
    repo: &dyn SessionRepository,
    session: &mut GameSession,
) -> Result<(), DomainError> {
    session.version += 1;
    let stored = to_stored_session(session)?;
    if let Err(e) = repo.replace(&stored).await {
        session.version -= 1;
        return Err(e);
    }
    Ok(())
}

/// Optional per-game async mutexes around session read-modify-write.
///
/// Disabled by default, which leaves concurrent writers last-writer-wins.
#[derive(Debug, Default)]
pub struct SessionLocks {
    games: Option<Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>>,
}

impl SessionLocks {
    /// No locking.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// One async mutex per game.
    #[must_use]
    pub fn per_game() -> Self {
        Self {
            games: Some(Mutex::new(HashMap::new())),
        }
    }

    /// Returns `true` when writes are serialized.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.games.is_some()
    }

    /// Waits for the game's mutex. Returns `None` when locking is disabled.
    pub async fn acquire(&self, game_id: Uuid) -> Option<OwnedMutexGuard<()>> {
        let games = self.games.as_ref()?;
        let lock = {
            let mut map = games.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(map.entry(game_id).or_default())
        };
        Some(lock.lock_owned().await)
    }

    /// Drops the game's mutex once the game is gone.
    pub fn forget(&self, game_id: Uuid) {
        if let Some(games) = &self.games {
            games
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&game_id);
        }
    }
}
