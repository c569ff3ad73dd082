//! Integration tests for finalization and image downloads.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::json;
use storyloom_test_support::{FailingCoverGenerator, StubImageGenerator};
use uuid::Uuid;

/// Plays two accepted turns.
async fn play_two_turns(app: &axum::Router, game_id: Uuid) {
    for (turn, user, prompt, card) in [
        (1, "ana", "The wizard laughed", 1),
        (2, "ben", "A pirate sang", 2),
    ] {
        let (status, _, _) = common::send(
            app,
            "POST",
            &format!("/api/v1/games/{game_id}/scenes"),
            Some(&json!({ "user_id": user, "prompt": prompt, "turn_index": turn })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = common::post_json(
            app,
            &format!("/api/v1/games/{game_id}/votes"),
            &json!({ "user_id": user, "card_id": card, "accepted": true }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
}

#[tokio::test]
async fn test_finalize_compiles_book_and_purges_game() {
    // Arrange
    let app = common::build_test_app();
    let game_id = common::start_game(&app.router).await;
    play_two_turns(&app.router, game_id).await;

    // Act
    let (status, book) = common::post_json(
        &app.router,
        &format!("/api/v1/games/{game_id}/finalize"),
        &json!({}),
    )
    .await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    assert_eq!(book["title"], "The Wizard's Storm");
    let book_id = book["book_id"].as_str().unwrap();
    assert_eq!(
        book["cover_url"],
        format!("http://localhost:3000/api/v1/images/{book_id}/0.png")
    );
    let pages = book["scenes"].as_array().unwrap();
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0]["order"], 1);
    assert_eq!(pages[0]["prompt"], "The wizard laughed");
    assert_eq!(pages[1]["order"], 2);
    assert_eq!(app.books.saved().len(), 1);

    let (status, _) = common::get_json(&app.router, &format!("/api/v1/games/{game_id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_published_pages_are_downloadable() {
    // Arrange
    let app = common::build_test_app();
    let game_id = common::start_game(&app.router).await;
    play_two_turns(&app.router, game_id).await;
    let (_, book) = common::post_json(
        &app.router,
        &format!("/api/v1/games/{game_id}/finalize"),
        &json!({ "forced": false }),
    )
    .await;
    let book_id = book["book_id"].as_str().unwrap();

    // Act
    let (page_status, headers, page) = common::send(
        &app.router,
        "GET",
        &format!("/api/v1/images/{book_id}/2.png"),
        None,
    )
    .await;
    let (cover_status, _, cover) = common::send(
        &app.router,
        "GET",
        &format!("/api/v1/images/{book_id}/0.png"),
        None,
    )
    .await;
    let (missing_status, _, _) = common::send(
        &app.router,
        "GET",
        &format!("/api/v1/images/{book_id}/9.png"),
        None,
    )
    .await;

    // Assert
    assert_eq!(page_status, StatusCode::OK);
    assert_eq!(headers["content-type"], "image/png");
    assert_eq!(page.as_ref(), common::SCENE_BYTES);
    assert_eq!(cover_status, StatusCode::OK);
    assert_eq!(cover.to_vec(), vec![7, 7, 7]);
    assert_eq!(missing_status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_forced_finalize_discards_game_without_book() {
    // Arrange
    let app = common::build_test_app();
    let game_id = common::start_game(&app.router).await;
    play_two_turns(&app.router, game_id).await;

    // Act
    let (status, body) = common::post_json(
        &app.router,
        &format!("/api/v1/games/{game_id}/finalize"),
        &json!({ "forced": true }),
    )
    .await;

    // Assert
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());
    assert!(app.books.saved().is_empty());
    let (status, _) = common::get_json(&app.router, &format!("/api/v1/games/{game_id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_finalize_without_scenes_is_not_found() {
    let app = common::build_test_app();
    let game_id = common::start_game(&app.router).await;

    let (status, json) = common::post_json(
        &app.router,
        &format!("/api/v1/games/{game_id}/finalize"),
        &json!({}),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "not_found");
}

#[tokio::test]
async fn test_finalize_unknown_game_is_not_found() {
    let app = common::build_test_app();

    let (status, json) = common::post_json(
        &app.router,
        &format!("/api/v1/games/{}/finalize", Uuid::new_v4()),
        &json!({}),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "unknown_game");
}

#[tokio::test]
async fn test_cover_failure_keeps_game_for_retry() {
    // Arrange
    let app = common::build_test_app_with(
        Arc::new(StubImageGenerator::new(common::SCENE_BYTES.to_vec())),
        Arc::new(FailingCoverGenerator),
    );
    let game_id = common::start_game(&app.router).await;
    play_two_turns(&app.router, game_id).await;

    // Act
    let (status, json) = common::post_json(
        &app.router,
        &format!("/api/v1/games/{game_id}/finalize"),
        &json!({}),
    )
    .await;

    // Assert
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["error"], "generation_unavailable");
    assert!(app.books.saved().is_empty());
    let (status, _) =
        common::get_json(&app.router, &format!("/api/v1/games/{game_id}/scenes")).await;
    assert_eq!(status, StatusCode::OK);
}
