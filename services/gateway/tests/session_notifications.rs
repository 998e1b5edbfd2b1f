mod common;

use axum::http::StatusCode;
use cdf_authz::{Role, RoleSet, TokenIssuer};
use common::{AUDIENCE, ISSUER, SECRET, TestApp, app, read_json, token};
use http_helpers::{authed, authed_json};
use std::time::Duration;
use tower::ServiceExt;

fn notice(title: &str) -> serde_json::Value {
    serde_json::json!({
        "title": title,
        "message": "Quarterly CDF returns are due",
        "type": "action_required",
        "category": "system"
    })
}

async fn inbox(app: &TestApp, token: &str) -> Vec<serde_json::Value> {
    let response = app
        .clone()
        .oneshot(authed("GET", "/v1/notifications", token))
        .await
        .expect("inbox");
    assert_eq!(response.status(), StatusCode::OK);
    read_json(response).await["data"]
        .as_array()
        .cloned()
        .expect("notifications")
}

async fn unread(app: &TestApp, token: &str) -> u64 {
    let response = app
        .clone()
        .oneshot(authed("GET", "/v1/notifications/unread-count", token))
        .await
        .expect("count");
    read_json(response).await["data"]["count"]
        .as_u64()
        .expect("count")
}

#[tokio::test]
async fn logout_revokes_the_presented_token() {
    let app = app();
    let chair = token("chair-logout", &[Role::CdfcChair]);

    let response = app
        .clone()
        .oneshot(authed("GET", "/v1/auth/me", &chair))
        .await
        .expect("me");
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(authed("POST", "/v1/auth/logout", &chair))
        .await
        .expect("logout");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .clone()
        .oneshot(authed("GET", "/v1/projects", &chair))
        .await
        .expect("after logout");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(read_json(response).await["message"], "token has been revoked");

    // A fresh token for the same user is unaffected.
    let fresh = token("chair-logout-2", &[Role::CdfcChair]);
    let response = app
        .oneshot(authed("GET", "/v1/projects", &fresh))
        .await
        .expect("fresh");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn logout_revokes_a_token_whose_expiry_is_past_the_calendar() {
    let app = app();
    // `exp` lands beyond the last representable timestamp.
    let issuer = TokenIssuer::new(
        SECRET,
        ISSUER,
        AUDIENCE,
        Duration::from_secs(9_000_000_000_000),
    )
    .expect("issuer");
    let roles: RoleSet = [Role::SuperAdmin].into_iter().collect();
    let admin = issuer
        .mint("admin-far", Some("admin-far@cdf.test"), &roles)
        .expect("mint");

    let response = app
        .clone()
        .oneshot(authed("GET", "/v1/auth/me", &admin))
        .await
        .expect("me");
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(authed("POST", "/v1/auth/logout", &admin))
        .await
        .expect("logout");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(authed("GET", "/v1/auth/me", &admin))
        .await
        .expect("me after logout");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(read_json(response).await["message"], "token has been revoked");
}

#[tokio::test]
async fn users_see_and_mark_only_their_own_notifications() {
    let app = app();
    let admin = token("admin-1", &[Role::SuperAdmin]);
    let alice = token("alice", &[Role::CdfcMember]);
    let bob = token("bob", &[Role::CdfcMember]);

    for title in ["Returns due", "Meeting moved"] {
        let response = app
            .clone()
            .oneshot(authed_json(
                "POST",
                "/v1/notifications",
                &admin,
                serde_json::json!({ "user_id": "alice", "notification": notice(title) }),
            ))
            .await
            .expect("send");
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(read_json(response).await["data"]["recipients"], 1);
    }

    let alice_inbox = inbox(&app, &alice).await;
    assert_eq!(alice_inbox.len(), 2);
    assert!(alice_inbox.iter().all(|n| n["user_id"] == "alice"));
    assert!(inbox(&app, &bob).await.is_empty());
    assert_eq!(unread(&app, &alice).await, 2);

    let id = alice_inbox[0]["id"].as_str().expect("id").to_string();
    let response = app
        .clone()
        .oneshot(authed("POST", &format!("/v1/notifications/{id}/read"), &bob))
        .await
        .expect("bob marks");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(unread(&app, &alice).await, 2);

    let response = app
        .clone()
        .oneshot(authed("POST", &format!("/v1/notifications/{id}/read"), &alice))
        .await
        .expect("alice marks");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(unread(&app, &alice).await, 1);

    let response = app
        .clone()
        .oneshot(authed("POST", "/v1/notifications/mark-all-read", &alice))
        .await
        .expect("mark all");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["data"]["updated"], 1);
    assert_eq!(unread(&app, &alice).await, 0);

    let response = app
        .oneshot(authed("GET", "/v1/notifications?limit=1", &alice))
        .await
        .expect("limited list");
    assert_eq!(response.status(), StatusCode::OK);
    let limited = read_json(response).await["data"].clone();
    let limited = limited.as_array().expect("notifications");
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0]["is_read"], true);
}

#[tokio::test]
async fn sending_and_broadcasting_is_admin_only() {
    let app = app();
    let member = token("member-send", &[Role::CdfcMember]);

    let response = app
        .clone()
        .oneshot(authed_json(
            "POST",
            "/v1/notifications",
            &member,
            serde_json::json!({ "user_id": "someone", "notification": notice("hi") }),
        ))
        .await
        .expect("send");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .oneshot(authed_json(
            "POST",
            "/v1/notifications/broadcast",
            &member,
            serde_json::json!({ "roles": ["plgo"], "notification": notice("hi") }),
        ))
        .await
        .expect("broadcast");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn broadcast_reaches_users_holding_any_requested_role() {
    let app = app();
    let admin = token("admin-2", &[Role::MinistryOfficial]);

    for (id, roles) in [
        ("finance-a", vec!["finance_officer"]),
        ("plgo-a", vec!["plgo", "auditor"]),
        ("citizen-a", vec!["citizen"]),
    ] {
        let response = app
            .clone()
            .oneshot(authed_json(
                "POST",
                "/v1/users",
                &admin,
                serde_json::json!({ "id": id, "email": format!("{id}@cdf.test"), "roles": roles }),
            ))
            .await
            .expect("upsert");
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(authed_json(
            "POST",
            "/v1/notifications/broadcast",
            &admin,
            serde_json::json!({
                "roles": ["finance_officer", "auditor", "not_a_role"],
                "notification": notice("Audit window opens")
            }),
        ))
        .await
        .expect("broadcast");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["data"]["recipients"], 2);

    let plgo = token("plgo-a", &[Role::Plgo]);
    let citizen = token("citizen-a", &[Role::Citizen]);
    assert_eq!(unread(&app, &plgo).await, 1);
    assert_eq!(unread(&app, &citizen).await, 0);

    let response = app
        .oneshot(authed_json(
            "POST",
            "/v1/notifications/broadcast",
            &admin,
            serde_json::json!({ "roles": ["wizard"], "notification": notice("nobody") }),
        ))
        .await
        .expect("unknown roles");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
