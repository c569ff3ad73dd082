//! In-process TTL cache of session records.
//!
//! The deadline is fixed when a record is created; `replace` keeps it. Expired
//! records read as absent and are dropped lazily or by `cleanup_expired`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use storyloom_core::clock::Clock;
use storyloom_core::error::DomainError;
use storyloom_core::repository::{SessionRepository, StoredSession};
use tokio::sync::RwLock;
use uuid::Uuid;

struct CacheEntry {
    session: StoredSession,
    expires_at: DateTime<Utc>,
}

/// Session repository held in process memory.
pub struct MemorySessionRepository {
    entries: RwLock<HashMap<Uuid, CacheEntry>>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for MemorySessionRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySessionRepository").finish_non_exhaustive()
    }
}

impl MemorySessionRepository {
    /// Create an empty cache that reads time from `clock`.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Removes every expired record and returns how many were removed.
    pub async fn cleanup_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    /// Number of records held, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns `true` if no records are held.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl SessionRepository for MemorySessionRepository {
    async fn create(&self, session: &StoredSession, ttl: Duration) -> Result<(), DomainError> {
        let ttl = TimeDelta::from_std(ttl)
            .map_err(|e| DomainError::Validation(format!("session ttl out of range: {e}")))?;
        let entry = CacheEntry {
            session: session.clone(),
            expires_at: self.clock.now() + ttl,
        };
        self.entries.write().await.insert(session.game_id, entry);
        Ok(())
    }

    async fn get(&self, game_id: Uuid) -> Result<Option<StoredSession>, DomainError> {
        let now = self.clock.now();
        let entries = self.entries.read().await;
        Ok(entries
            .get(&game_id)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.session.clone()))
    }

    async fn replace(&self, session: &StoredSession) -> Result<(), DomainError> {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        let live = entries
            .get(&session.game_id)
            .is_some_and(|entry| entry.expires_at > now);
        if !live {
            entries.remove(&session.game_id);
            return Err(DomainError::UnknownGame(session.game_id));
        }
        if let Some(entry) = entries.get_mut(&session.game_id) {
            entry.session = session.clone();
        }
        Ok(())
    }

    async fn delete(&self, game_id: Uuid) -> Result<(), DomainError> {
        self.entries.write().await.remove(&game_id);
        Ok(())
    }
}
