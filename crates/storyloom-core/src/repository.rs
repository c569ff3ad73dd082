//! Repository abstractions for session, scene and book storage.
//!
//! Sessions live in a TTL cache as one serialized record per game. Scenes live
//! in their own keyspace so they can be listed, ordered and purged per game
//! without rewriting the session record. Books are the only durable artifact.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Stored representation of a game session: one opaque JSON document.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSession {
    /// Game identifier (the cache key).
    pub game_id: Uuid,
    /// Serialized session payload.
    pub payload: serde_json::Value,
    /// Number of replaces applied since creation.
    pub version: i64,
}

/// Key-value store for session records.
///
/// `replace` is a whole-record, last-writer-wins overwrite. The TTL is set by
/// `create` and is not extended by `replace`, so long games expire at a fixed
/// deadline instead of being kept alive by chatty clients.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Stores a new session record that expires after `ttl`.
    async fn create(&self, session: &StoredSession, ttl: Duration) -> Result<(), DomainError>;

    /// Loads a session record. Expired records read as `None`.
    async fn get(&self, game_id: Uuid) -> Result<Option<StoredSession>, DomainError>;

    /// Overwrites an existing session record, keeping its expiry.
    ///
    /// Returns `DomainError::UnknownGame` when the record is absent or expired.
    async fn replace(&self, session: &StoredSession) -> Result<(), DomainError>;

    /// Removes a session record. Removing an absent record is not an error.
    async fn delete(&self, game_id: Uuid) -> Result<(), DomainError>;
}

/// What a scene illustrates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneKind {
    /// A regular turn that spends a story card.
    Story,
    /// A closing turn built from the player's ending card.
    Ending,
}

/// One generated turn, pending or accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneRecord {
    /// Scene identifier.
    pub id: Uuid,
    /// The game the scene belongs to.
    pub game_id: Uuid,
    /// The player who wrote the prompt.
    pub user_id: String,
    /// Turn index. `0` is reserved for the cover.
    pub order: u32,
    /// The player's prompt text.
    pub prompt: String,
    /// Illustration bytes returned by the generation service.
    pub image: Vec<u8>,
    /// Story turn or ending turn.
    pub kind: SceneKind,
    /// When the scene was stored.
    pub created_at: DateTime<Utc>,
}

/// Keyspace for scenes, grouped by game.
#[async_trait]
pub trait SceneRepository: Send + Sync {
    /// Stores a scene, or replaces the one with the same id.
    ///
    /// Fails with `DomainError::Validation` if another scene of the game
    /// already holds the same turn index. The check and the insert are one
    /// atomic step.
    async fn save(&self, scene: &SceneRecord) -> Result<(), DomainError>;

    /// Lists every scene of a game, ordered by `order` ascending.
    async fn list_by_game(&self, game_id: Uuid) -> Result<Vec<SceneRecord>, DomainError>;

    /// Removes one scene. Returns whether it existed.
    async fn delete(&self, game_id: Uuid, scene_id: Uuid) -> Result<bool, DomainError>;

    /// Removes every scene of a game. Returns how many were removed.
    async fn delete_all(&self, game_id: Uuid) -> Result<usize, DomainError>;
}

/// One page of a compiled book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookScene {
    /// Turn index the page came from.
    pub order: u32,
    /// The prompt that produced the page.
    pub prompt: String,
    /// Public URL of the page illustration.
    pub image_url: String,
}

/// The persisted artifact produced by finalizing a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    /// Book identifier.
    pub book_id: Uuid,
    /// Generated title.
    pub title: String,
    /// Public URL of the cover.
    pub cover_url: String,
    /// Pages in turn order.
    pub scenes: Vec<BookScene>,
    /// When the book was compiled.
    pub created_at: DateTime<Utc>,
}

/// Durable store for compiled books.
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// Persists a book and returns its identifier.
    async fn save_book(&self, book: &Book) -> Result<Uuid, DomainError>;
}
