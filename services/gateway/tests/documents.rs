mod common;

use axum::http::StatusCode;
use cdf_authz::Role;
use common::{TestApp, app, read_json, token};
use http_helpers::{authed, authed_json, get};
use tower::ServiceExt;

const HASH: &str = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08";

async fn register(app: &TestApp, token: &str, hash: &str, kind: &str) -> (StatusCode, serde_json::Value) {
    let create = authed_json(
        "POST",
        "/v1/documents",
        token,
        serde_json::json!({
            "file_url": format!("https://files.cdf.test/{hash}"),
            "file_name": "site-photo.jpg",
            "file_size": 2048,
            "mime_type": "image/jpeg",
            "file_hash": hash,
            "document_type": kind,
            "constituency_id": "156"
        }),
    );
    let response = app.clone().oneshot(create).await.expect("create");
    let status = response.status();
    (status, read_json(response).await)
}

#[tokio::test]
async fn duplicate_hash_is_a_conflict() {
    let app = app();
    let member = token("member-1", &[Role::CdfcMember]);

    let (status, payload) = register(&app, &member, HASH, "photo").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(payload["data"]["is_immutable"], false);
    assert_eq!(payload["data"]["uploader_id"], "member-1");
    assert_eq!(payload["data"]["metadata"], serde_json::json!({}));

    let (status, payload) = register(&app, &member, HASH, "photo").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(payload["code"], "duplicate_hash");
}

#[tokio::test]
async fn sealed_documents_refuse_update_and_delete() {
    let app = app();
    let member = token("member-1", &[Role::CdfcMember]);
    let chair = token("chair-1", &[Role::CdfcChair]);
    let (_, payload) = register(&app, &member, HASH, "invoice").await;
    let id = payload["data"]["id"].as_str().expect("id").to_string();

    let patch = authed_json(
        "PATCH",
        &format!("/v1/documents/{id}"),
        &member,
        serde_json::json!({ "description": "Invoice for slab casting" }),
    );
    let response = app.clone().oneshot(patch).await.expect("patch");
    assert_eq!(response.status(), StatusCode::OK);

    // Members may not seal.
    let response = app
        .clone()
        .oneshot(authed("POST", &format!("/v1/documents/{id}/immutable"), &member))
        .await
        .expect("seal member");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(authed("POST", &format!("/v1/documents/{id}/immutable"), &chair))
        .await
        .expect("seal");
    assert_eq!(response.status(), StatusCode::OK);
    let sealed = read_json(response).await["data"].clone();
    assert_eq!(sealed["is_immutable"], true);
    assert_eq!(sealed["immutable_by"], "chair-1");
    assert!(sealed["immutable_at"].is_string());

    let response = app
        .clone()
        .oneshot(authed("POST", &format!("/v1/documents/{id}/immutable"), &chair))
        .await
        .expect("reseal");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let patch = authed_json(
        "PATCH",
        &format!("/v1/documents/{id}"),
        &chair,
        serde_json::json!({ "description": "edited" }),
    );
    let response = app.clone().oneshot(patch).await.expect("patch sealed");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        read_json(response).await["message"],
        "Cannot modify an immutable document"
    );

    let response = app
        .clone()
        .oneshot(authed("DELETE", &format!("/v1/documents/{id}"), &chair))
        .await
        .expect("delete sealed");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        read_json(response).await["message"],
        "Cannot delete an immutable document"
    );

    let response = app
        .oneshot(authed("GET", &format!("/v1/documents/{id}/audit"), &member))
        .await
        .expect("audit");
    assert_eq!(response.status(), StatusCode::OK);
    let actions: Vec<String> = read_json(response).await["data"]
        .as_array()
        .expect("entries")
        .iter()
        .filter_map(|entry| entry["action"].as_str().map(str::to_string))
        .collect();
    assert_eq!(actions, ["created", "updated", "made_immutable"]);
}

#[tokio::test]
async fn delete_requires_a_deleter_role() {
    let app = app();
    let member = token("member-1", &[Role::CdfcMember]);
    let plgo = token("plgo-1", &[Role::Plgo]);
    let (_, payload) = register(&app, &member, "abc123", "report").await;
    let id = payload["data"]["id"].as_str().expect("id").to_string();

    let response = app
        .clone()
        .oneshot(authed("DELETE", &format!("/v1/documents/{id}"), &member))
        .await
        .expect("member delete");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(authed("DELETE", &format!("/v1/documents/{id}"), &plgo))
        .await
        .expect("plgo delete");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(authed("GET", &format!("/v1/documents/{id}"), &plgo))
        .await
        .expect("get");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn hash_verification_is_public() {
    let app = app();
    let member = token("member-1", &[Role::CdfcMember]);
    register(&app, &member, HASH, "photo").await;

    let response = app
        .clone()
        .oneshot(get(&format!("/v1/documents/verify/{HASH}")))
        .await
        .expect("verify");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json(response).await["data"].clone();
    assert_eq!(payload["verified"], true);
    assert_eq!(payload["document"]["file_hash"], HASH);

    let response = app
        .oneshot(get("/v1/documents/verify/unknown-hash"))
        .await
        .expect("verify unknown");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json(response).await["data"].clone();
    assert_eq!(payload["verified"], false);
    assert!(payload["document"].is_null());
}

#[tokio::test]
async fn statistics_count_types_and_seals() {
    let app = app();
    let member = token("member-1", &[Role::CdfcMember]);
    let admin = token("admin-1", &[Role::SuperAdmin]);
    let (_, first) = register(&app, &member, "h1", "photo").await;
    register(&app, &member, "h2", "photo").await;
    register(&app, &member, "h3", "invoice").await;
    let id = first["data"]["id"].as_str().expect("id").to_string();
    app.clone()
        .oneshot(authed("POST", &format!("/v1/documents/{id}/immutable"), &admin))
        .await
        .expect("seal");

    let response = app
        .clone()
        .oneshot(authed("GET", "/v1/documents/statistics?constituency_id=156", &member))
        .await
        .expect("stats");
    assert_eq!(response.status(), StatusCode::OK);
    let stats = read_json(response).await["data"].clone();
    assert_eq!(stats["total"], 3);
    assert_eq!(stats["by_type"]["photo"], 2);
    assert_eq!(stats["by_type"]["invoice"], 1);
    assert_eq!(stats["immutable_count"], 1);
    assert_eq!(stats["total_size"], 6144);

    let response = app
        .oneshot(authed("GET", "/v1/documents?document_type=photo", &member))
        .await
        .expect("list");
    let payload = read_json(response).await;
    assert_eq!(payload["pagination"]["total"], 2);
    assert_eq!(payload["pagination"]["limit"], 50);
}
