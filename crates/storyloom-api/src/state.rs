//! Shared application state.

use std::sync::{Arc, Mutex};

use storyloom_book::FinalizationPipeline;
use storyloom_core::clock::Clock;
use storyloom_core::ports::{BlobStore, ImageGenerator};
use storyloom_core::repository::{SceneRepository, SessionRepository};
use storyloom_core::rng::DeterministicRng;
use storyloom_game::application::config::EngineConfig;
use storyloom_game::application::session_gateway::SessionLocks;
use storyloom_game::domain::cards::CardPool;
use storyloom_game::domain::validation::PromptValidator;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Clock for timestamps.
    pub clock: Arc<dyn Clock>,
    /// Random number generator for card allocation.
    pub rng: Arc<Mutex<dyn DeterministicRng + Send>>,
    /// Card catalog, read-only after startup.
    pub card_pool: Arc<CardPool>,
    /// Prompt validator.
    pub validator: Arc<PromptValidator>,
    /// Game handler settings.
    pub engine: EngineConfig,
    /// Per-game write serialization, shared with the finalizer.
    pub locks: Arc<SessionLocks>,
    /// Session cache.
    pub sessions: Arc<dyn SessionRepository>,
    /// Scene keyspace.
    pub scenes: Arc<dyn SceneRepository>,
    /// Scene illustration service.
    pub images: Arc<dyn ImageGenerator>,
    /// Published images.
    pub blobs: Arc<dyn BlobStore>,
    /// Book compilation.
    pub finalizer: Arc<FinalizationPipeline>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("engine", &self.engine)
            .field("finalizer", &self.finalizer)
            .finish_non_exhaustive()
    }
}
