//! Integration test for the health endpoint.

mod common;

use axum::http::StatusCode;
use loreweaver_test_support::ScriptedProvider;

#[tokio::test]
async fn test_health_returns_ok_with_version() {
    let (app, _store) = common::build_test_app(ScriptedProvider::new());

    let (status, json) = common::get_json(app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(!json["version"].as_str().unwrap().is_empty());
}
