//! Payment API handlers.
//!
//! # Purpose
//! Payment requests against projects and their sign-off by the two review
//! panels, plus disbursement and free status writes.
//!
//! # Key invariants
//! - Every handler is behind the `/payments` registry entry; the panel and
//!   disburse actions add their own role lists.
//! - No handler consults the current status. The only record-level rule is
//!   that one user cannot sign both panels, which the store enforces.
use crate::api::error::{
    ApiError, api_forbidden, api_internal, api_not_found, api_validation_error,
};
use crate::api::extract::{ApiJson, OptionalApiJson};
use crate::api::types::{ActionRequest, Envelope, ListEnvelope, PageParams, WorkflowView};
use crate::api::{DEFAULT_PAGE_LIMIT, next_number, notify_user, page_request};
use crate::app::AppState;
use crate::auth::{Caller, authorize_route, require_roles};
use crate::model::{
    EntityKind, NewNotification, NotificationCategory, NotificationKind, Panel, Payment,
    PaymentCreateRequest, PaymentFilter, PaymentStatus, PaymentStatusUpdateRequest,
    StatusChange,
};
use crate::store::{StoreError, StoreResult};
use crate::workflow::{
    PAYMENT_TRANSITIONS, StatusLabel, StatusView, Transition, available, is_catalogued,
};
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use cdf_authz::{Role, groups};
use chrono::Utc;
use uuid::Uuid;

const ROUTE: &str = "/payments";

const PAYMENT_CREATORS: &[Role] = &[
    Role::Mp,
    Role::CdfcChair,
    Role::FinanceOfficer,
    Role::SuperAdmin,
];

const DISBURSERS: &[Role] = &[Role::FinanceOfficer, Role::SuperAdmin];

#[utoipa::path(
    get,
    path = "/v1/payments",
    tag = "payments",
    params(PaymentFilter, PageParams),
    responses(
        (status = 200, description = "Payments, newest first", body = crate::api::types::PaymentList),
        (status = 403, description = "Role not permitted", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn list_payments(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(filter): Query<PaymentFilter>,
    Query(paging): Query<PageParams>,
) -> Result<Json<ListEnvelope<Payment>>, ApiError> {
    authorize_route(&state, &headers, ROUTE).await?;
    let page = page_request(&paging, DEFAULT_PAGE_LIMIT);
    let result = state
        .store
        .list_payments(&filter, page)
        .await
        .map_err(|err| api_internal("failed to list payments", &err))?;
    Ok(Json(ListEnvelope::paged(result.items, page, result.total)))
}

#[utoipa::path(
    get,
    path = "/v1/payments/{id}",
    tag = "payments",
    params(("id" = Uuid, Path, description = "Payment identifier")),
    responses(
        (status = 200, description = "Fetch payment", body = crate::api::types::PaymentData),
        (status = 404, description = "Payment not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn get_payment(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Envelope<Payment>>, ApiError> {
    authorize_route(&state, &headers, ROUTE).await?;
    match state.store.get_payment(id).await {
        Ok(payment) => Ok(Json(Envelope::new(payment))),
        Err(StoreError::NotFound(_)) => Err(api_not_found("payment not found")),
        Err(err) => Err(api_internal("failed to fetch payment", &err)),
    }
}

#[utoipa::path(
    post,
    path = "/v1/payments",
    tag = "payments",
    request_body = PaymentCreateRequest,
    responses(
        (status = 201, description = "Payment created as pending", body = crate::api::types::PaymentData),
        (status = 400, description = "Invalid payment", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Project not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn create_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(body): ApiJson<PaymentCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = authorize_route(&state, &headers, ROUTE).await?;
    require_roles(&caller, PAYMENT_CREATORS)?;
    if !(body.amount.is_finite() && body.amount >= 1.0) {
        return Err(api_validation_error("amount must be at least 1"));
    }
    if body.recipient_name.trim().is_empty() || body.recipient_account.trim().is_empty() {
        return Err(api_validation_error("recipient details are required"));
    }
    let (year, seq) = next_number(&state, "payment").await?;
    let now = Utc::now();
    let payment = Payment {
        id: Uuid::new_v4(),
        payment_number: format!("PAY-{year}-{seq:05}"),
        project_id: body.project_id,
        milestone_id: body.milestone_id,
        amount: body.amount,
        payment_type: body.payment_type,
        recipient_name: body.recipient_name,
        recipient_account: body.recipient_account,
        recipient_bank: body.recipient_bank,
        description: body.description,
        supporting_documents: body.supporting_documents,
        status: PaymentStatus::Pending,
        created_by: caller.user_id,
        panel_a_approved_by: None,
        panel_a_approved_at: None,
        panel_b_approved_by: None,
        panel_b_approved_at: None,
        disbursed_at: None,
        created_at: now,
        updated_at: now,
    };
    match state.store.create_payment(payment).await {
        Ok(created) => {
            tracing::info!(payment_id = %created.id, number = %created.payment_number, "payment created");
            Ok((StatusCode::CREATED, Json(Envelope::new(created))))
        }
        Err(StoreError::NotFound(_)) => Err(api_not_found("project not found")),
        Err(err) => Err(api_internal("failed to create payment", &err)),
    }
}

#[utoipa::path(
    post,
    path = "/v1/payments/{id}/status",
    tag = "payments",
    params(("id" = Uuid, Path, description = "Payment identifier")),
    request_body = PaymentStatusUpdateRequest,
    responses(
        (status = 200, description = "Status recorded", body = crate::api::types::PaymentData),
        (status = 400, description = "Unknown status value", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Payment not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn update_payment_status(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(body): ApiJson<PaymentStatusUpdateRequest>,
) -> Result<Json<Envelope<Payment>>, ApiError> {
    let caller = authorize_route(&state, &headers, ROUTE).await?;
    let result = state
        .store
        .set_payment_status(id, body.status, &caller.user_id, body.comment)
        .await;
    finish_status_write(&state, result).await
}

#[utoipa::path(
    post,
    path = "/v1/payments/{id}/approve-panel-a",
    tag = "payments",
    params(("id" = Uuid, Path, description = "Payment identifier")),
    request_body = ActionRequest,
    responses(
        (status = 200, description = "Panel A approval recorded", body = crate::api::types::PaymentData),
        (status = 403, description = "Not a Panel A reviewer", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Payment not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn approve_panel_a(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    headers: HeaderMap,
    OptionalApiJson(body): OptionalApiJson<ActionRequest>,
) -> Result<Json<Envelope<Payment>>, ApiError> {
    let caller = authorize_route(&state, &headers, ROUTE).await?;
    require_roles(&caller, groups::PANEL_A)?;
    approve(&state, &caller, id, Panel::A, body).await
}

#[utoipa::path(
    post,
    path = "/v1/payments/{id}/approve-panel-b",
    tag = "payments",
    params(("id" = Uuid, Path, description = "Payment identifier")),
    request_body = ActionRequest,
    responses(
        (status = 200, description = "Panel B approval recorded", body = crate::api::types::PaymentData),
        (status = 403, description = "Not a Panel B reviewer, or the caller signed Panel A", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Payment not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn approve_panel_b(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    headers: HeaderMap,
    OptionalApiJson(body): OptionalApiJson<ActionRequest>,
) -> Result<Json<Envelope<Payment>>, ApiError> {
    let caller = authorize_route(&state, &headers, ROUTE).await?;
    require_roles(&caller, groups::PANEL_B)?;
    approve(&state, &caller, id, Panel::B, body).await
}

#[utoipa::path(
    post,
    path = "/v1/payments/{id}/disburse",
    tag = "payments",
    params(("id" = Uuid, Path, description = "Payment identifier")),
    request_body = ActionRequest,
    responses(
        (status = 200, description = "Payment marked disbursed", body = crate::api::types::PaymentData),
        (status = 403, description = "Role not permitted", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Payment not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn disburse_payment(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    headers: HeaderMap,
    OptionalApiJson(body): OptionalApiJson<ActionRequest>,
) -> Result<Json<Envelope<Payment>>, ApiError> {
    let caller = authorize_route(&state, &headers, ROUTE).await?;
    require_roles(&caller, DISBURSERS)?;
    let comment = body.and_then(|body| body.comment);
    let result = state
        .store
        .set_payment_status(id, PaymentStatus::Disbursed, &caller.user_id, comment)
        .await;
    finish_status_write(&state, result).await
}

#[utoipa::path(
    get,
    path = "/v1/payments/{id}/workflow",
    tag = "payments",
    params(("id" = Uuid, Path, description = "Payment identifier")),
    responses(
        (status = 200, description = "Current status, caller's available actions, and history", body = crate::api::types::WorkflowViewData),
        (status = 404, description = "Payment not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn payment_workflow(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Envelope<WorkflowView>>, ApiError> {
    let caller = authorize_route(&state, &headers, ROUTE).await?;
    let payment = match state.store.get_payment(id).await {
        Ok(payment) => payment,
        Err(StoreError::NotFound(_)) => return Err(api_not_found("payment not found")),
        Err(err) => return Err(api_internal("failed to fetch payment", &err)),
    };
    let history = state
        .store
        .status_history(EntityKind::Payment, id)
        .await
        .map_err(|err| api_internal("failed to load status history", &err))?;
    Ok(Json(Envelope::new(WorkflowView {
        entity_id: id,
        current: StatusView::of(payment.status),
        available_transitions: available(PAYMENT_TRANSITIONS, payment.status, &caller.roles)
            .into_iter()
            .map(Transition::view)
            .collect(),
        history,
    })))
}

async fn approve(
    state: &AppState,
    caller: &Caller,
    id: Uuid,
    panel: Panel,
    body: Option<ActionRequest>,
) -> Result<Json<Envelope<Payment>>, ApiError> {
    let comment = body.and_then(|body| body.comment);
    let result = state
        .store
        .approve_payment_panel(id, panel, &caller.user_id, comment)
        .await;
    if let Err(StoreError::Forbidden(_)) = &result {
        tracing::info!(payment_id = %id, user_id = %caller.user_id, "panel approval refused for dual sign-off");
        return Err(api_forbidden(
            "the same user cannot approve both Panel A and Panel B",
        ));
    }
    finish_status_write(state, result).await
}

/// Map the store outcome of any payment status write and notify the payment's
/// creator.
async fn finish_status_write(
    state: &AppState,
    result: StoreResult<(Payment, StatusChange)>,
) -> Result<Json<Envelope<Payment>>, ApiError> {
    let (payment, change) = match result {
        Ok(result) => result,
        Err(StoreError::NotFound(_)) => return Err(api_not_found("payment not found")),
        Err(StoreError::Forbidden(message)) => return Err(api_forbidden(&message)),
        Err(err) => return Err(api_internal("failed to update payment status", &err)),
    };
    if let Ok(from) = change.from_status.parse::<PaymentStatus>()
        && !is_catalogued(PAYMENT_TRANSITIONS, from, payment.status)
    {
        tracing::debug!(payment_id = %payment.id, from = %from, to = %payment.status, "uncatalogued payment status write");
    }
    metrics::counter!("cdf_status_changes_total", "entity" => "payment").increment(1);
    notify_user(
        state,
        &payment.created_by,
        NewNotification {
            title: "Payment status updated".to_string(),
            message: format!(
                "{} is now {}",
                payment.payment_number,
                payment.status.label()
            ),
            kind: NotificationKind::Info,
            category: NotificationCategory::Payment,
            action_url: Some(format!("/payments/{}", payment.id)),
            metadata: Some(serde_json::json!({
                "payment_id": payment.id,
                "from": change.from_status,
                "to": change.to_status,
            })),
        },
    )
    .await;
    Ok(Json(Envelope::new(payment)))
}
