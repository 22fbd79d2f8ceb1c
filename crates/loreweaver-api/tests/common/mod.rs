//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use loreweaver_core::clock::Clock;
use loreweaver_core::provider::NarrativeProvider;
use loreweaver_engine::turn::{EngineConfig, TurnEngine};
use loreweaver_test_support::{FixedClock, MemoryStore, ScriptedProvider};

use loreweaver_api::routes;
use loreweaver_api::state::AppState;

/// Deterministic advancing clock starting at a fixed timestamp.
fn fixed_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock::new(
        chrono::TimeZone::with_ymd_and_hms(&chrono::Utc, 2026, 1, 15, 10, 0, 0).unwrap(),
    ))
}

/// Build the full app router over an in-memory store and a scripted
/// provider. Uses the same route structure as `main.rs`. The store is
/// returned alongside so tests can assert on persisted state.
pub fn build_test_app(provider: ScriptedProvider) -> (Router, Arc<MemoryStore>) {
    build_test_app_with_provider(Arc::new(provider))
}

/// Same as [`build_test_app`] but accepts any provider implementation,
/// for failure-injection tests.
pub fn build_test_app_with_provider(
    provider: Arc<dyn NarrativeProvider>,
) -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let clock = fixed_clock();
    let engine = Arc::new(TurnEngine::new(
        store.clone() as Arc<dyn loreweaver_core::store::GameStore>,
        provider,
        clock.clone(),
        EngineConfig::default(),
    ));
    let app_state = AppState::new(store.clone(), engine, clock);

    let app = Router::new()
        .merge(routes::health::router())
        .nest(
            "/api/v1/sessions",
            routes::session::router().merge(routes::game::router()),
        )
        .with_state(app_state);

    (app, store)
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    send(app, request).await
}

/// Send a POST request with no body and return the response.
pub async fn post_empty(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    send(app, request).await
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    send(app, request).await
}

/// Send a DELETE request and return the response.
pub async fn delete_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    send(app, request).await
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

/// Create a session through the API and return its id.
pub async fn create_session(app: Router, name: &str) -> uuid::Uuid {
    let (status, json) = post_json(
        app,
        "/api/v1/sessions",
        &serde_json::json!({ "name": name, "start_prompt": "A dark tavern" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json["id"].as_str().unwrap().parse().unwrap()
}
