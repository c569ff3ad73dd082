//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode};
use http_body_util::BodyExt;
use storyloom_api::state::AppState;
use storyloom_book::FinalizationPipeline;
use storyloom_core::clock::Clock;
use storyloom_core::ports::{CoverGenerator, ImageAsset, ImageGenerator};
use storyloom_core::rng::DeterministicRng;
use storyloom_game::application::config::EngineConfig;
use storyloom_game::application::session_gateway::SessionLocks;
use storyloom_game::domain::cards::CardPool;
use storyloom_game::domain::tokenizer::SimpleTokenizer;
use storyloom_game::domain::validation::{Denylist, KeywordMatch, PromptValidator};
use storyloom_store::blob_store::MemoryBlobStore;
use storyloom_store::scene_store::MemorySceneRepository;
use storyloom_store::session_cache::MemorySessionRepository;
use storyloom_test_support::{
    FixedClock, RecordingBookRepository, SequenceRng, StubCoverGenerator, StubImageGenerator,
};
use tower::ServiceExt;

/// Two cards per category. With the identity shuffle used here the first
/// player ("ana") is dealt wizard, sword, castle, storm, asleep and ending 11;
/// the second ("ben") pirate, lantern, forest, wedding, hungry and ending 12.
/// Ending 13 is left for rerolls.
pub const CATALOG: &str = r#"{
  "story_cards": [
    { "id": 1, "category": "person", "keyword": "wizard", "variant_keywords": ["wizards"] },
    { "id": 2, "category": "person", "keyword": "pirate" },
    { "id": 3, "category": "object", "keyword": "sword" },
    { "id": 4, "category": "object", "keyword": "lantern" },
    { "id": 5, "category": "place", "keyword": "castle" },
    { "id": 6, "category": "place", "keyword": "forest" },
    { "id": 7, "category": "event", "keyword": "storm" },
    { "id": 8, "category": "event", "keyword": "wedding" },
    { "id": 9, "category": "state", "keyword": "asleep" },
    { "id": 10, "category": "state", "keyword": "hungry" }
  ],
  "ending_cards": [
    { "id": 11, "content": "And the kingdom was saved." },
    { "id": 12, "content": "Nobody ever spoke of it again." },
    { "id": 13, "content": "They sailed home at dawn." }
  ]
}"#;

/// PNG magic, returned by the stub illustrator.
pub const SCENE_BYTES: [u8; 4] = [0x89, 0x50, 0x4e, 0x47];

/// Handles to the in-memory adapters behind a test app.
pub struct TestApp {
    pub router: Router,
    pub books: Arc<RecordingBookRepository>,
    pub blobs: Arc<MemoryBlobStore>,
}

fn fixed_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock(
        chrono::TimeZone::with_ymd_and_hms(&chrono::Utc, 2026, 1, 15, 10, 0, 0).unwrap(),
    ))
}

/// Builds the full app over in-memory adapters and a working illustrator.
pub fn build_test_app() -> TestApp {
    build_test_app_with(
        Arc::new(StubImageGenerator::new(SCENE_BYTES.to_vec())),
        Arc::new(StubCoverGenerator::new(
            "The Wizard's Storm",
            ImageAsset::Bytes(vec![7, 7, 7]),
        )),
    )
}

/// Builds the full app with the given illustration collaborators.
pub fn build_test_app_with(
    images: Arc<dyn ImageGenerator>,
    covers: Arc<dyn CoverGenerator>,
) -> TestApp {
    let clock = fixed_clock();
    let rng: Arc<Mutex<dyn DeterministicRng + Send>> =
        Arc::new(Mutex::new(SequenceRng::new(vec![])));
    let sessions = Arc::new(MemorySessionRepository::new(clock.clone()));
    let scenes = Arc::new(MemorySceneRepository::new(
        clock.clone(),
        EngineConfig::default().session_ttl,
    ));
    let blobs = Arc::new(MemoryBlobStore::new("http://localhost:3000"));
    let books = Arc::new(RecordingBookRepository::new());
    let locks = Arc::new(SessionLocks::per_game());

    let finalizer = FinalizationPipeline::new(
        sessions.clone(),
        scenes.clone(),
        blobs.clone(),
        books.clone(),
        covers,
        clock.clone(),
    )
    .with_locks(locks.clone());

    let validator = PromptValidator::new(
        Denylist::new(["darn"]),
        Box::new(SimpleTokenizer),
        KeywordMatch::Exact,
    );

    let state = AppState {
        clock,
        rng,
        card_pool: Arc::new(CardPool::from_json(CATALOG).unwrap()),
        validator: Arc::new(validator),
        engine: EngineConfig::default(),
        locks,
        sessions,
        scenes,
        images,
        blobs: blobs.clone(),
        finalizer: Arc::new(finalizer),
    };

    TestApp {
        router: storyloom_api::app(state),
        books,
        blobs,
    }
}

/// Send a request and return status, headers and raw body.
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<&serde_json::Value>,
) -> (StatusCode, HeaderMap, Bytes) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, bytes)
}

/// Send a POST request with a JSON body and return the JSON response.
pub async fn post_json(
    app: &Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let (status, _, bytes) = send(app, "POST", uri, Some(body)).await;
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// Send a GET request and return the JSON response.
pub async fn get_json(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let (status, _, bytes) = send(app, "GET", uri, None).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

/// Starts a two-player game for "ana" and "ben" and returns its id.
pub async fn start_game(app: &Router) -> uuid::Uuid {
    let (status, json) = post_json(
        app,
        "/api/v1/games",
        &serde_json::json!({ "player_ids": ["ana", "ben"], "drawing_style": 7 }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json["game_id"].as_str().unwrap().parse().unwrap()
}
