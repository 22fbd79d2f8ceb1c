//! Integration tests for session lifecycle endpoints.

mod common;

use axum::http::StatusCode;
use loreweaver_test_support::ScriptedProvider;
use uuid::Uuid;

#[tokio::test]
async fn test_create_session_round_trip() {
    let (app, _store) = common::build_test_app(ScriptedProvider::new());

    // POST /api/v1/sessions
    let (status, json) = common::post_json(
        app.clone(),
        "/api/v1/sessions",
        &serde_json::json!({ "name": "The Lost Mine", "start_prompt": "A dwarf hires you" }),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["name"], "The Lost Mine");
    assert_eq!(json["start_prompt"], "A dwarf hires you");
    assert!(json["summary"].is_null());
    let id = json["id"].as_str().unwrap();

    // GET /api/v1/sessions/{id} — verify persisted state
    let (status, json) = common::get_json(app, &format!("/api/v1/sessions/{id}")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], id);
    assert_eq!(json["name"], "The Lost Mine");
}

#[tokio::test]
async fn test_create_session_with_blank_name_returns_400() {
    let (app, _store) = common::build_test_app(ScriptedProvider::new());

    let (status, json) = common::post_json(
        app,
        "/api/v1/sessions",
        &serde_json::json!({ "name": "   ", "start_prompt": "anything" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "validation_error");
}

#[tokio::test]
async fn test_list_sessions_returns_created_sessions() {
    let (app, _store) = common::build_test_app(ScriptedProvider::new());
    common::create_session(app.clone(), "First").await;
    common::create_session(app.clone(), "Second").await;

    let (status, json) = common::get_json(app, "/api/v1/sessions").await;

    assert_eq!(status, StatusCode::OK);
    let sessions = json.as_array().unwrap();
    assert_eq!(sessions.len(), 2);
    // Newest first.
    assert_eq!(sessions[0]["name"], "Second");
    assert_eq!(sessions[1]["name"], "First");
}

#[tokio::test]
async fn test_list_sessions_honors_pagination() {
    let (app, _store) = common::build_test_app(ScriptedProvider::new());
    for name in ["a", "b", "c"] {
        common::create_session(app.clone(), name).await;
    }

    let (status, json) = common::get_json(app, "/api/v1/sessions?offset=1&limit=1").await;

    assert_eq!(status, StatusCode::OK);
    let sessions = json.as_array().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["name"], "b");
}

#[tokio::test]
async fn test_get_unknown_session_returns_404() {
    let (app, _store) = common::build_test_app(ScriptedProvider::new());

    let (status, json) =
        common::get_json(app, &format!("/api/v1/sessions/{}", Uuid::new_v4())).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "session_not_found");
}

#[tokio::test]
async fn test_delete_session_removes_it() {
    let (app, _store) = common::build_test_app(ScriptedProvider::new());
    let id = common::create_session(app.clone(), "Doomed").await;

    let (status, json) = common::delete_json(app.clone(), &format!("/api/v1/sessions/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["deleted"], true);

    let (status, _) = common::get_json(app, &format!("/api/v1/sessions/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_unknown_session_returns_404() {
    let (app, _store) = common::build_test_app(ScriptedProvider::new());

    let (status, json) =
        common::delete_json(app, &format!("/api/v1/sessions/{}", Uuid::new_v4())).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "session_not_found");
}
