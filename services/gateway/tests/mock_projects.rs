mod common;

use axum::http::StatusCode;
use common::{app, app_with_state, read_json, test_state};
use http_helpers::get;
use tower::ServiceExt;

#[tokio::test]
async fn mock_route_is_hidden_unless_enabled() {
    let response = app()
        .oneshot(get("/v1/mock/projects?constituency_id=156"))
        .await
        .expect("mock");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(read_json(response).await["code"], "not_enabled");
}

#[tokio::test]
async fn fixture_constituency_returns_bare_array() {
    let app = app_with_state(test_state(true));

    let response = app
        .clone()
        .oneshot(get("/v1/mock/projects?constituency_id=156"))
        .await
        .expect("mock");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json(response).await;
    let projects = payload.as_array().expect("bare array");
    assert_eq!(projects.len(), 3);
    assert_eq!(projects[0]["project_id"], "MSW-001");
    assert_eq!(projects[0]["constituency_id"], 156);

    let response = app
        .clone()
        .oneshot(get("/v1/mock/projects?constituency_id=157"))
        .await
        .expect("other");
    assert_eq!(read_json(response).await, serde_json::json!([]));

    let response = app.oneshot(get("/v1/mock/projects")).await.expect("none");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await, serde_json::json!([]));
}
