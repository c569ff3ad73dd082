//! Storyloom API server entry point.

use std::error::Error;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use storyloom_api::config::AppConfig;
use storyloom_api::error::AppError;
use storyloom_api::state::AppState;
use storyloom_book::{FinalizationPipeline, PipelineConfig};
use storyloom_core::clock::{Clock, SystemClock};
use storyloom_core::rng::{DeterministicRng, StdRandom};
use storyloom_game::application::config::EngineConfig;
use storyloom_game::application::session_gateway::SessionLocks;
use storyloom_game::domain::cards::CardPool;
use storyloom_game::domain::tokenizer::SimpleTokenizer;
use storyloom_game::domain::validation::{Denylist, PromptValidator};
use storyloom_illustrator::{DEFAULT_TIMEOUT, HttpIllustrator};
use storyloom_store::blob_store::FsBlobStore;
use storyloom_store::pg_book_repository::PgBookRepository;
use storyloom_store::scene_store::MemorySceneRepository;
use storyloom_store::session_cache::MemorySessionRepository;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

async fn read_data_file(path: &std::path::Path) -> Result<String, AppError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();

    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting Storyloom API server");

    let config = AppConfig::from_env()?;

    // Book store.
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .map_err(AppError::Database)?;
    let books = PgBookRepository::new(pool);
    books.ensure_schema().await.map_err(AppError::Startup)?;

    // Card catalog and prompt validation.
    let card_pool = CardPool::from_json(&read_data_file(&config.card_catalog_path).await?)
        .map_err(AppError::Startup)?;
    let denylist = Denylist::from_text(&read_data_file(&config.denylist_path).await?);
    tracing::info!(banned_terms = denylist.len(), "denylist loaded");
    let validator = PromptValidator::new(denylist, Box::new(SimpleTokenizer), config.keyword_match);

    // Adapters.
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let rng: Arc<Mutex<dyn DeterministicRng + Send>> = Arc::new(Mutex::new(StdRandom::from_os()));
    let sessions = Arc::new(MemorySessionRepository::new(clock.clone()));
    let scenes = Arc::new(MemorySceneRepository::new(clock.clone(), config.session_ttl));
    let blobs = Arc::new(FsBlobStore::new(&config.blob_root, &config.public_base_url));
    let illustrator = Arc::new(
        HttpIllustrator::new(&config.illustrator_url, DEFAULT_TIMEOUT).map_err(AppError::Startup)?,
    );
    let locks = Arc::new(if config.serialize_session_writes {
        SessionLocks::per_game()
    } else {
        SessionLocks::disabled()
    });

    let finalizer = FinalizationPipeline::new(
        sessions.clone(),
        scenes.clone(),
        blobs.clone(),
        Arc::new(books),
        illustrator.clone(),
        clock.clone(),
    )
    .with_config(PipelineConfig {
        upload_concurrency: config.upload_concurrency,
        summary_char_budget: config.summary_char_budget,
    })
    .with_locks(locks.clone());

    // Expired records are invisible to readers; this only reclaims memory.
    let session_sweeper = sessions.clone();
    let scene_sweeper = scenes.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let removed = session_sweeper.cleanup_expired().await;
            if removed > 0 {
                tracing::info!(removed, "expired sessions swept");
            }
            let removed = scene_sweeper.cleanup_expired().await;
            if removed > 0 {
                tracing::info!(removed, "expired scenes swept");
            }
        }
    });

    let app_state = AppState {
        clock,
        rng,
        card_pool: Arc::new(card_pool),
        validator: Arc::new(validator),
        engine: EngineConfig {
            session_ttl: config.session_ttl,
            summary_char_budget: config.summary_char_budget,
        },
        locks,
        sessions,
        scenes,
        images: illustrator,
        blobs,
        finalizer: Arc::new(finalizer),
    };

    // TODO: Replace CorsLayer::permissive() with the web client's origin once it has a fixed host.
    let app = storyloom_api::app(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}
