//! The finalization pipeline.
//!
//! A normal finalize requests a title and cover, publishes the cover and every
//! scene image, persists the book and only then deletes the game's scenes and
//! session. Any failure before the book is persisted leaves the game intact so
//! the call can be retried. Images already uploaded by a failed attempt are
//! not rolled back; a retry writes under a new book id.

use std::sync::Arc;

use storyloom_core::clock::Clock;
use storyloom_core::error::DomainError;
use storyloom_core::ports::{BlobStore, CoverGenerator, CoverRequest, GeneratedCover, ImageAsset};
use storyloom_core::repository::{
    Book, BookRepository, BookScene, SceneRecord, SceneRepository, SessionRepository,
};
use storyloom_game::application::config::{DEFAULT_SUMMARY_CHAR_BUDGET, summarize_prompts};
use storyloom_game::application::session_gateway::{self, SessionLocks};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Default number of concurrent scene uploads.
pub const DEFAULT_UPLOAD_CONCURRENCY: usize = 2;

/// Tunables for finalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Maximum scene uploads in flight.
    pub upload_concurrency: usize,
    /// Maximum characters of the story summary sent for the cover.
    pub summary_char_budget: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            upload_concurrency: DEFAULT_UPLOAD_CONCURRENCY,
            summary_char_budget: DEFAULT_SUMMARY_CHAR_BUDGET,
        }
    }
}

/// Blob key of a scene image.
#[must_use]
pub fn scene_key(book_id: Uuid, order: u32) -> String {
    format!("{book_id}/{order}.png")
}

/// Blob key of an uploaded cover.
#[must_use]
pub fn cover_key(book_id: Uuid) -> String {
    scene_key(book_id, 0)
}

/// Compiles finished games into books.
pub struct FinalizationPipeline {
    sessions: Arc<dyn SessionRepository>,
    scenes: Arc<dyn SceneRepository>,
    blobs: Arc<dyn BlobStore>,
    books: Arc<dyn BookRepository>,
    covers: Arc<dyn CoverGenerator>,
    clock: Arc<dyn Clock>,
    locks: Arc<SessionLocks>,
    config: PipelineConfig,
}

impl std::fmt::Debug for FinalizationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinalizationPipeline")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl FinalizationPipeline {
    /// Create a pipeline with default settings and no session locking.
    #[must_use]
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        scenes: Arc<dyn SceneRepository>,
        blobs: Arc<dyn BlobStore>,
        books: Arc<dyn BookRepository>,
        covers: Arc<dyn CoverGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            sessions,
            scenes,
            blobs,
            books,
            covers,
            clock,
            locks: Arc::new(SessionLocks::disabled()),
            config: PipelineConfig::default(),
        }
    }

    /// Replaces the settings.
    #[must_use]
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Shares the session locks used by the game handlers.
    #[must_use]
    pub fn with_locks(mut self, locks: Arc<SessionLocks>) -> Self {
        self.locks = locks;
        self
    }

    /// Finalizes a game.
    ///
    /// With `forced`, the game is discarded: its scenes and session are
    /// deleted and no book is produced. Otherwise the accepted scenes are
    /// compiled into a book, which is persisted and returned.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::UnknownGame` if the session is missing or
    /// expired, `DomainError::NotFound` if there is nothing to compile,
    /// `DomainError::GenerationUnavailable` if the title or cover could not be
    /// produced, `DomainError::StorageUnavailable` if the cover or every scene
    /// failed to upload, or the book repository's error. On any of these the
    /// game's state is left as it was.
    #[instrument(skip(self))]
    pub async fn finalize(&self, game_id: Uuid, forced: bool) -> Result<Option<Book>, DomainError> {
        let _guard = self.locks.acquire(game_id).await;
        let session = session_gateway::load_session(&*self.sessions, game_id).await?;

        if forced {
            let removed = self.scenes.delete_all(game_id).await?;
            self.sessions.delete(game_id).await?;
            self.locks.forget(game_id);
            info!(removed, "game discarded");
            return Ok(None);
        }

        let scenes: Vec<SceneRecord> = self
            .scenes
            .list_by_game(game_id)
            .await?
            .into_iter()
            .filter(|s| s.order > 0)
            .collect();
        if scenes.is_empty() {
            return Err(DomainError::NotFound(format!(
                "no scenes to compile for game {game_id}"
            )));
        }

        let request = CoverRequest {
            story_summary: summarize_prompts(
                scenes.iter().map(|s| s.prompt.as_str()),
                self.config.summary_char_budget,
            ),
            style: session.drawing_style.prompt_fragment().to_owned(),
        };
        let cover = self.request_cover(&request).await?;

        let book_id = Uuid::new_v4();
        let cover_url = self.publish_cover(book_id, cover.cover).await?;
        let pages = self.upload_scenes(book_id, scenes).await?;

        let book = Book {
            book_id,
            title: cover.title.trim().to_owned(),
            cover_url,
            scenes: pages,
            created_at: self.clock.now(),
        };
        self.books.save_book(&book).await?;

        let removed = self.scenes.delete_all(game_id).await?;
        self.sessions.delete(game_id).await?;
        self.locks.forget(game_id);

        info!(%book_id, pages = book.scenes.len(), removed, "book compiled");
        Ok(Some(book))
    }

    async fn request_cover(&self, request: &CoverRequest) -> Result<GeneratedCover, DomainError> {
        let generated = self.covers.generate_cover(request).await.map_err(|e| {
            warn!(error = %e, "cover request failed");
            match e {
                DomainError::GenerationUnavailable(_) => e,
                other => DomainError::GenerationUnavailable(other.to_string()),
            }
        })?;
        if generated.title.trim().is_empty() {
            return Err(DomainError::GenerationUnavailable(
                "cover service returned a blank title".to_owned(),
            ));
        }
        if generated.cover.is_empty() {
            return Err(DomainError::GenerationUnavailable(
                "cover service returned an empty cover".to_owned(),
            ));
        }
        Ok(generated)
    }

    async fn publish_cover(&self, book_id: Uuid, cover: ImageAsset) -> Result<String, DomainError> {
        match cover {
            ImageAsset::Url(url) => Ok(url),
            ImageAsset::Bytes(bytes) => {
                let key = cover_key(book_id);
                self.blobs.put(&key, bytes).await.map_err(|e| {
                    warn!(error = %e, %key, "cover upload failed");
                    DomainError::StorageUnavailable(format!("cover upload failed: {e}"))
                })?;
                Ok(self.blobs.public_url(&key))
            }
        }
    }

    async fn upload_scenes(
        &self,
        book_id: Uuid,
        scenes: Vec<SceneRecord>,
    ) -> Result<Vec<BookScene>, DomainError> {
        let total = scenes.len();
        let permits = Arc::new(Semaphore::new(self.config.upload_concurrency.max(1)));
        let mut workers = JoinSet::new();

        for scene in scenes {
            let permits = Arc::clone(&permits);
            let blobs = Arc::clone(&self.blobs);
            workers.spawn(async move {
                let order = scene.order;
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|e| (order, DomainError::StorageUnavailable(e.to_string())))?;
                let key = scene_key(book_id, order);
                blobs.put(&key, scene.image).await.map_err(|e| (order, e))?;
                Ok::<_, (u32, DomainError)>(BookScene {
                    order,
                    prompt: scene.prompt,
                    image_url: blobs.public_url(&key),
                })
            });
        }

        let mut pages = Vec::with_capacity(total);
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(Ok(page)) => pages.push(page),
                Ok(Err((order, e))) => warn!(order, error = %e, "scene upload failed"),
                Err(e) => warn!(error = %e, "scene upload task did not complete"),
            }
        }

        if pages.is_empty() {
            return Err(DomainError::StorageUnavailable(format!(
                "all {total} scene uploads failed"
            )));
        }
        if pages.len() < total {
            warn!(uploaded = pages.len(), total, "compiling book without failed scenes");
        }
        pages.sort_by_key(|p| p.order);
        Ok(pages)
    }
}
