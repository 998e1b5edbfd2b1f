mod common;

use axum::http::StatusCode;
use cdf_authz::Role;
use common::{TestApp, app, read_json, token};
use http_helpers::{authed, authed_json};
use tower::ServiceExt;

async fn seed_project(app: &TestApp, chair: &str) -> String {
    let create = authed_json(
        "POST",
        "/v1/projects",
        chair,
        serde_json::json!({
            "name": "Lusaka Central Borehole",
            "sector": "water",
            "constituency_id": "156",
            "budget": 750000.0
        }),
    );
    let response = app.clone().oneshot(create).await.expect("project");
    assert_eq!(response.status(), StatusCode::CREATED);
    read_json(response).await["data"]["id"]
        .as_str()
        .expect("id")
        .to_string()
}

async fn seed_payment(app: &TestApp, creator: &str, project_id: &str) -> String {
    let create = authed_json(
        "POST",
        "/v1/payments",
        creator,
        serde_json::json!({
            "project_id": project_id,
            "amount": 150000.0,
            "payment_type": "milestone",
            "recipient_name": "Kafue Drilling Ltd",
            "recipient_account": "0012345678",
            "recipient_bank": "Zanaco",
            "description": "Drilling milestone 1"
        }),
    );
    let response = app.clone().oneshot(create).await.expect("payment");
    assert_eq!(response.status(), StatusCode::CREATED);
    let payment = read_json(response).await["data"].clone();
    assert_eq!(payment["status"], "pending");
    assert!(
        payment["payment_number"]
            .as_str()
            .expect("number")
            .starts_with("PAY-")
    );
    payment["id"].as_str().expect("id").to_string()
}

#[tokio::test]
async fn payment_creation_validates_amount_and_project() {
    let app = app();
    let officer = token("finance-1", &[Role::FinanceOfficer]);
    let body = |project_id: &str, amount: f64| {
        serde_json::json!({
            "project_id": project_id,
            "amount": amount,
            "payment_type": "advance",
            "recipient_name": "r",
            "recipient_account": "a",
            "recipient_bank": "b",
            "description": "d"
        })
    };

    let response = app
        .clone()
        .oneshot(authed_json(
            "POST",
            "/v1/payments",
            &officer,
            body("00000000-0000-0000-0000-000000000001", 10.0),
        ))
        .await
        .expect("missing project");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let chair = token("chair-1", &[Role::CdfcChair]);
    let project_id = seed_project(&app, &chair).await;
    let response = app
        .oneshot(authed_json(
            "POST",
            "/v1/payments",
            &officer,
            body(&project_id, 0.5),
        ))
        .await
        .expect("small amount");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn one_user_cannot_sign_both_panels() {
    let app = app();
    let chair = token("chair-1", &[Role::CdfcChair]);
    let project_id = seed_project(&app, &chair).await;
    let payment_id = seed_payment(&app, &chair, &project_id).await;

    // A super admin sits on both panels.
    let admin = token("admin-1", &[Role::SuperAdmin]);
    let response = app
        .clone()
        .oneshot(authed(
            "POST",
            &format!("/v1/payments/{payment_id}/approve-panel-a"),
            &admin,
        ))
        .await
        .expect("panel a");
    assert_eq!(response.status(), StatusCode::OK);
    let payment = read_json(response).await["data"].clone();
    assert_eq!(payment["status"], "panel_a_approved");
    assert_eq!(payment["panel_a_approved_by"], "admin-1");

    let response = app
        .clone()
        .oneshot(authed(
            "POST",
            &format!("/v1/payments/{payment_id}/approve-panel-b"),
            &admin,
        ))
        .await
        .expect("panel b same user");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let plgo = token("plgo-1", &[Role::Plgo]);
    let response = app
        .clone()
        .oneshot(authed_json(
            "POST",
            &format!("/v1/payments/{payment_id}/approve-panel-b"),
            &plgo,
            serde_json::json!({ "comment": "verified against BoQ" }),
        ))
        .await
        .expect("panel b");
    assert_eq!(response.status(), StatusCode::OK);
    let payment = read_json(response).await["data"].clone();
    assert_eq!(payment["status"], "approved");
    assert_eq!(payment["panel_a_approved_by"], "admin-1");
    assert_eq!(payment["panel_b_approved_by"], "plgo-1");
}

#[tokio::test]
async fn panel_actions_check_panel_membership() {
    let app = app();
    let chair = token("chair-1", &[Role::CdfcChair]);
    let project_id = seed_project(&app, &chair).await;
    let payment_id = seed_payment(&app, &chair, &project_id).await;

    // PLGO passes the /payments entry but is not on Panel A.
    let plgo = token("plgo-1", &[Role::Plgo]);
    let response = app
        .clone()
        .oneshot(authed(
            "POST",
            &format!("/v1/payments/{payment_id}/approve-panel-a"),
            &plgo,
        ))
        .await
        .expect("panel a");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // CDFC chair is on Panel A only.
    let response = app
        .clone()
        .oneshot(authed(
            "POST",
            &format!("/v1/payments/{payment_id}/approve-panel-b"),
            &chair,
        ))
        .await
        .expect("panel b");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .oneshot(authed(
            "POST",
            &format!("/v1/payments/{payment_id}/disburse"),
            &chair,
        ))
        .await
        .expect("disburse");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn malformed_panel_comments_are_rejected() {
    let app = app();
    let chair = token("chair-1", &[Role::CdfcChair]);
    let project_id = seed_project(&app, &chair).await;
    let payment_id = seed_payment(&app, &chair, &project_id).await;
    let uri = format!("/v1/payments/{payment_id}/approve-panel-a");

    let response = app
        .clone()
        .oneshot(authed_json(
            "POST",
            &uri,
            &chair,
            serde_json::json!({ "comment": 5 }),
        ))
        .await
        .expect("wrong comment type");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(response).await["code"], "validation_error");

    let truncated = axum::http::Request::builder()
        .method("POST")
        .uri(&uri)
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {chair}"))
        .body(axum::body::Body::from("{\"comment\": \"ok"))
        .expect("request");
    let response = app.clone().oneshot(truncated).await.expect("truncated");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Neither rejected request touched the payment.
    let response = app
        .clone()
        .oneshot(authed("GET", &format!("/v1/payments/{payment_id}"), &chair))
        .await
        .expect("fetch");
    assert_eq!(read_json(response).await["data"]["status"], "pending");

    // Leaving the body out is still accepted.
    let response = app
        .oneshot(authed("POST", &uri, &chair))
        .await
        .expect("no body");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["data"]["status"], "panel_a_approved");
}

#[tokio::test]
async fn status_writes_do_not_consult_the_current_status() {
    let app = app();
    let chair = token("chair-1", &[Role::CdfcChair]);
    let officer = token("finance-1", &[Role::FinanceOfficer]);
    let project_id = seed_project(&app, &chair).await;
    let payment_id = seed_payment(&app, &chair, &project_id).await;

    // Straight from pending to disbursed, skipping both panels.
    let response = app
        .clone()
        .oneshot(authed(
            "POST",
            &format!("/v1/payments/{payment_id}/disburse"),
            &officer,
        ))
        .await
        .expect("disburse");
    assert_eq!(response.status(), StatusCode::OK);
    let payment = read_json(response).await["data"].clone();
    assert_eq!(payment["status"], "disbursed");
    assert!(payment["disbursed_at"].is_string());

    // And back again.
    let response = app
        .clone()
        .oneshot(authed_json(
            "POST",
            &format!("/v1/payments/{payment_id}/status"),
            &officer,
            serde_json::json!({ "status": "pending" }),
        ))
        .await
        .expect("status");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["data"]["status"], "pending");

    let response = app
        .clone()
        .oneshot(authed(
            "GET",
            &format!("/v1/payments/{payment_id}/workflow"),
            &officer,
        ))
        .await
        .expect("workflow");
    let view = read_json(response).await["data"].clone();
    let history = view["history"].as_array().expect("history");
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["to_status"], "disbursed");
    assert_eq!(history[1]["from_status"], "disbursed");
    assert_eq!(history[1]["to_status"], "pending");
    // Finance officers may act on pending payments through Panel A or cancel.
    let actions: Vec<&str> = view["available_transitions"]
        .as_array()
        .expect("actions")
        .iter()
        .filter_map(|t| t["to"].as_str())
        .collect();
    assert!(actions.contains(&"panel_a_approved"));
    assert!(actions.contains(&"cancelled"));
    assert!(!actions.contains(&"approved"));
}

#[tokio::test]
async fn status_changes_notify_the_creator() {
    let app = app();
    let chair = token("chair-1", &[Role::CdfcChair]);
    let officer = token("finance-1", &[Role::FinanceOfficer]);
    let project_id = seed_project(&app, &chair).await;
    let payment_id = seed_payment(&app, &chair, &project_id).await;

    let response = app
        .clone()
        .oneshot(authed_json(
            "POST",
            &format!("/v1/payments/{payment_id}/status"),
            &officer,
            serde_json::json!({ "status": "cancelled", "comment": "duplicate voucher" }),
        ))
        .await
        .expect("cancel");
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(authed("GET", "/v1/notifications", &chair))
        .await
        .expect("inbox");
    let inbox = read_json(response).await["data"].clone();
    let inbox = inbox.as_array().expect("inbox");
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0]["category"], "payment");
    assert_eq!(inbox[0]["type"], "info");
    assert_eq!(inbox[0]["is_read"], false);

    // The officer who made the change gets nothing.
    let response = app
        .oneshot(authed("GET", "/v1/notifications/unread-count", &officer))
        .await
        .expect("count");
    assert_eq!(read_json(response).await["data"]["count"], 0);
}
