//! Notification handlers.
//!
//! # Purpose
//! Per-user inbox reads and read markers, plus the administrative send and
//! role broadcast operations.
//!
//! # Key invariants
//! - Inbox operations only ever touch the caller's own notifications.
//! - `/notifications` has no registry entry; send and broadcast require an
//!   ADMIN role on top of authentication.
use crate::api::error::{ApiError, api_internal, api_not_found, api_validation_error};
use crate::api::extract::ApiJson;
use crate::api::types::{
    BroadcastRequest, BroadcastResult, Envelope, ListEnvelope, NotificationListParams,
    SendNotificationRequest, UnreadCount, UpdatedCount,
};
use crate::app::AppState;
use crate::auth::{authorize_route, require_roles};
use crate::model::Notification;
use crate::store::StoreError;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use cdf_authz::{RoleSet, groups};
use uuid::Uuid;

const ROUTE: &str = "/notifications";
const DEFAULT_LIMIT: u32 = 50;
const MAX_LIMIT: u32 = 200;

#[utoipa::path(
    get,
    path = "/v1/notifications",
    tag = "notifications",
    params(NotificationListParams),
    responses(
        (status = 200, description = "Caller's notifications, newest first", body = crate::api::types::NotificationList),
        (status = 401, description = "Missing or invalid token", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn list_notifications(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<NotificationListParams>,
) -> Result<Json<ListEnvelope<Notification>>, ApiError> {
    let caller = authorize_route(&state, &headers, ROUTE).await?;
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let items = state
        .store
        .list_notifications(&caller.user_id, limit)
        .await
        .map_err(|err| api_internal("failed to list notifications", &err))?;
    Ok(Json(ListEnvelope::unpaged(items)))
}

#[utoipa::path(
    get,
    path = "/v1/notifications/unread-count",
    tag = "notifications",
    responses(
        (status = 200, description = "Unread notifications for the caller", body = crate::api::types::UnreadCountData)
    )
)]
pub(crate) async fn unread_count(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Envelope<UnreadCount>>, ApiError> {
    let caller = authorize_route(&state, &headers, ROUTE).await?;
    let count = state
        .store
        .unread_notification_count(&caller.user_id)
        .await
        .map_err(|err| api_internal("failed to count notifications", &err))?;
    Ok(Json(Envelope::new(UnreadCount { count })))
}

#[utoipa::path(
    post,
    path = "/v1/notifications/{id}/read",
    tag = "notifications",
    params(("id" = Uuid, Path, description = "Notification identifier")),
    responses(
        (status = 204, description = "Marked as read"),
        (status = 404, description = "No such notification for the caller", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn mark_read(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let caller = authorize_route(&state, &headers, ROUTE).await?;
    match state.store.mark_notification_read(&caller.user_id, id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(StoreError::NotFound(_)) => Err(api_not_found("notification not found")),
        Err(err) => Err(api_internal("failed to mark notification read", &err)),
    }
}

#[utoipa::path(
    post,
    path = "/v1/notifications/mark-all-read",
    tag = "notifications",
    responses(
        (status = 200, description = "Number of notifications marked", body = crate::api::types::UpdatedCountData)
    )
)]
pub(crate) async fn mark_all_read(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Envelope<UpdatedCount>>, ApiError> {
    let caller = authorize_route(&state, &headers, ROUTE).await?;
    let updated = state
        .store
        .mark_all_notifications_read(&caller.user_id)
        .await
        .map_err(|err| api_internal("failed to mark notifications read", &err))?;
    Ok(Json(Envelope::new(UpdatedCount { updated })))
}

#[utoipa::path(
    post,
    path = "/v1/notifications",
    tag = "notifications",
    request_body = SendNotificationRequest,
    responses(
        (status = 201, description = "Notification recorded", body = crate::api::types::BroadcastData),
        (status = 403, description = "Role not permitted", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn send_notification(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(body): ApiJson<SendNotificationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = authorize_route(&state, &headers, ROUTE).await?;
    require_roles(&caller, groups::ADMIN)?;
    if body.user_id.trim().is_empty() {
        return Err(api_validation_error("user_id is required"));
    }
    let recipients = state
        .store
        .insert_notifications(vec![body.notification.for_user(&body.user_id)])
        .await
        .map_err(|err| api_internal("failed to send notification", &err))?;
    Ok((
        StatusCode::CREATED,
        Json(Envelope::new(BroadcastResult { recipients })),
    ))
}

#[utoipa::path(
    post,
    path = "/v1/notifications/broadcast",
    tag = "notifications",
    request_body = BroadcastRequest,
    responses(
        (status = 200, description = "Notifications fanned out", body = crate::api::types::BroadcastData),
        (status = 400, description = "No known role in the request", body = crate::api::types::ErrorResponse),
        (status = 403, description = "Role not permitted", body = crate::api::types::ErrorResponse)
    )
)]
/// Notify every user holding at least one of the requested roles.
///
/// # Errors
/// - 400 when none of the role tags parse.
pub(crate) async fn broadcast_notification(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(body): ApiJson<BroadcastRequest>,
) -> Result<Json<Envelope<BroadcastResult>>, ApiError> {
    let caller = authorize_route(&state, &headers, ROUTE).await?;
    require_roles(&caller, groups::ADMIN)?;
    let roles = RoleSet::from_tags(&body.roles);
    if roles.is_empty() {
        return Err(api_validation_error("roles must name at least one known role"));
    }
    let users = state
        .store
        .users_with_any_role(&roles)
        .await
        .map_err(|err| api_internal("failed to resolve broadcast recipients", &err))?;
    let batch: Vec<Notification> = users
        .iter()
        .map(|user| body.notification.for_user(&user.id))
        .collect();
    let recipients = if batch.is_empty() {
        0
    } else {
        state
            .store
            .insert_notifications(batch)
            .await
            .map_err(|err| api_internal("failed to broadcast notification", &err))?
    };
    tracing::info!(recipients, sender = %caller.user_id, "notification broadcast");
    Ok(Json(Envelope::new(BroadcastResult { recipients })))
}
