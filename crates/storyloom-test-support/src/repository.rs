//! In-memory session, scene and book stores that record what they were given.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use storyloom_core::error::DomainError;
use storyloom_core::repository::{
    Book, BookRepository, SceneRecord, SceneRepository, SessionRepository, StoredSession,
};
use uuid::Uuid;

/// A session repository backed by a map that records every write.
///
/// Expiry is not modelled; use the store crate's cache for TTL behavior.
#[derive(Debug, Default)]
pub struct RecordingSessionRepository {
    sessions: Mutex<HashMap<Uuid, StoredSession>>,
    created: Mutex<Vec<(StoredSession, Duration)>>,
    replaced: Mutex<Vec<StoredSession>>,
    deleted: Mutex<Vec<Uuid>>,
}

impl RecordingSessionRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a repository that already holds `session`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn with_session(session: StoredSession) -> Self {
        let repo = Self::default();
        repo.sessions
            .lock()
            .unwrap()
            .insert(session.game_id, session);
        repo
    }

    /// Returns the record currently stored for `game_id`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn current(&self, game_id: Uuid) -> Option<StoredSession> {
        self.sessions.lock().unwrap().get(&game_id).cloned()
    }

    /// Returns every `create` call with its TTL.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn created(&self) -> Vec<(StoredSession, Duration)> {
        self.created.lock().unwrap().clone()
    }

    /// Returns every successful `replace` call.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn replaced(&self) -> Vec<StoredSession> {
        self.replaced.lock().unwrap().clone()
    }

    /// Returns every `delete` call.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn deleted(&self) -> Vec<Uuid> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionRepository for RecordingSessionRepository {
    async fn create(&self, session: &StoredSession, ttl: Duration) -> Result<(), DomainError> {
        self.created.lock().unwrap().push((session.clone(), ttl));
        self.sessions
            .lock()
            .unwrap()
            .insert(session.game_id, session.clone());
        Ok(())
    }

    async fn get(&self, game_id: Uuid) -> Result<Option<StoredSession>, DomainError> {
        Ok(self.current(game_id))
    }

    async fn replace(&self, session: &StoredSession) -> Result<(), DomainError> {
        let mut sessions = self.sessions.lock().unwrap();
        if !sessions.contains_key(&session.game_id) {
            return Err(DomainError::UnknownGame(session.game_id));
        }
        sessions.insert(session.game_id, session.clone());
        self.replaced.lock().unwrap().push(session.clone());
        Ok(())
    }

    async fn delete(&self, game_id: Uuid) -> Result<(), DomainError> {
        self.sessions.lock().unwrap().remove(&game_id);
        self.deleted.lock().unwrap().push(game_id);
        Ok(())
    }
}

/// A session repository that always returns an infrastructure error.
#[derive(Debug)]
pub struct FailingSessionRepository;

#[async_trait]
impl SessionRepository for FailingSessionRepository {
    async fn create(&self, _session: &StoredSession, _ttl: Duration) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn get(&self, _game_id: Uuid) -> Result<Option<StoredSession>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn replace(&self, _session: &StoredSession) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn delete(&self, _game_id: Uuid) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }
}

/// A scene repository backed by a vector that records deletions.
#[derive(Debug, Default)]
pub struct RecordingSceneRepository {
    scenes: Mutex<Vec<SceneRecord>>,
    deleted: Mutex<Vec<Uuid>>,
}

impl RecordingSceneRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a repository that already holds `scenes`.
    #[must_use]
    pub fn with_scenes(scenes: Vec<SceneRecord>) -> Self {
        Self {
            scenes: Mutex::new(scenes),
            deleted: Mutex::new(Vec::new()),
        }
    }

    /// Returns a snapshot of every stored scene, in insertion order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn scenes(&self) -> Vec<SceneRecord> {
        self.scenes.lock().unwrap().clone()
    }

    /// Returns the ids of every scene removed through `delete` or
    /// `delete_all`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn deleted(&self) -> Vec<Uuid> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl SceneRepository for RecordingSceneRepository {
    async fn save(&self, scene: &SceneRecord) -> Result<(), DomainError> {
        let mut scenes = self.scenes.lock().unwrap();
        if scenes
            .iter()
            .any(|s| s.game_id == scene.game_id && s.order == scene.order && s.id != scene.id)
        {
            return Err(DomainError::Validation(format!(
                "turn {} already has a scene",
                scene.order
            )));
        }
        scenes.retain(|s| s.id != scene.id);
        scenes.push(scene.clone());
        Ok(())
    }

    async fn list_by_game(&self, game_id: Uuid) -> Result<Vec<SceneRecord>, DomainError> {
        let mut scenes: Vec<SceneRecord> = self
            .scenes
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.game_id == game_id)
            .cloned()
            .collect();
        scenes.sort_by_key(|s| s.order);
        Ok(scenes)
    }

    async fn delete(&self, game_id: Uuid, scene_id: Uuid) -> Result<bool, DomainError> {
        let mut scenes = self.scenes.lock().unwrap();
        let before = scenes.len();
        scenes.retain(|s| !(s.game_id == game_id && s.id == scene_id));
        let removed = scenes.len() < before;
        if removed {
            self.deleted.lock().unwrap().push(scene_id);
        }
        Ok(removed)
    }

    async fn delete_all(&self, game_id: Uuid) -> Result<usize, DomainError> {
        let mut scenes = self.scenes.lock().unwrap();
        let mut deleted = self.deleted.lock().unwrap();
        let before = scenes.len();
        scenes.retain(|s| {
            if s.game_id == game_id {
                deleted.push(s.id);
                false
            } else {
                true
            }
        });
        Ok(before - scenes.len())
    }
}

/// A scene repository that always returns an infrastructure error.
#[derive(Debug)]
pub struct FailingSceneRepository;

#[async_trait]
impl SceneRepository for FailingSceneRepository {
    async fn save(&self, _scene: &SceneRecord) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn list_by_game(&self, _game_id: Uuid) -> Result<Vec<SceneRecord>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn delete(&self, _game_id: Uuid, _scene_id: Uuid) -> Result<bool, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn delete_all(&self, _game_id: Uuid) -> Result<usize, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }
}

/// A book repository that records every saved book.
#[derive(Debug, Default)]
pub struct RecordingBookRepository {
    saved: Mutex<Vec<Book>>,
}

impl RecordingBookRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of every saved book.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn saved(&self) -> Vec<Book> {
        self.saved.lock().unwrap().clone()
    }
}

#[async_trait]
impl BookRepository for RecordingBookRepository {
    async fn save_book(&self, book: &Book) -> Result<Uuid, DomainError> {
        self.saved.lock().unwrap().push(book.clone());
        Ok(book.book_id)
    }
}

/// A book repository that always returns an infrastructure error.
#[derive(Debug)]
pub struct FailingBookRepository;

#[async_trait]
impl BookRepository for FailingBookRepository {
    async fn save_book(&self, _book: &Book) -> Result<Uuid, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }
}
