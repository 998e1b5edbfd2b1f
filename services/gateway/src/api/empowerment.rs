//! Empowerment grant handlers.
use crate::api::error::{ApiError, api_internal, api_not_found, api_validation_error};
use crate::api::extract::ApiJson;
use crate::api::types::{Envelope, ListEnvelope, PageParams};
use crate::api::{DEFAULT_PAGE_LIMIT, is_non_negative, next_number, page_request};
use crate::app::AppState;
use crate::auth::authorize_route;
use crate::model::{
    EmpowermentGrant, GrantCreateRequest, GrantFilter, GrantStatus, GrantStatusUpdateRequest,
};
use crate::store::StoreError;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use chrono::Utc;
use uuid::Uuid;

const ROUTE: &str = "/empowerment";

#[utoipa::path(
    get,
    path = "/v1/empowerment",
    tag = "empowerment",
    params(GrantFilter, PageParams),
    responses(
        (status = 200, description = "Grant applications, newest first", body = crate::api::types::GrantList),
        (status = 403, description = "Role not permitted", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn list_grants(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(filter): Query<GrantFilter>,
    Query(paging): Query<PageParams>,
) -> Result<Json<ListEnvelope<EmpowermentGrant>>, ApiError> {
    authorize_route(&state, &headers, ROUTE).await?;
    let page = page_request(&paging, DEFAULT_PAGE_LIMIT);
    let result = state
        .store
        .list_grants(&filter, page)
        .await
        .map_err(|err| api_internal("failed to list empowerment grants", &err))?;
    Ok(Json(ListEnvelope::paged(result.items, page, result.total)))
}

#[utoipa::path(
    get,
    path = "/v1/empowerment/{id}",
    tag = "empowerment",
    params(("id" = Uuid, Path, description = "Grant identifier")),
    responses(
        (status = 200, description = "Fetch grant application", body = crate::api::types::GrantData),
        (status = 404, description = "Grant not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn get_grant(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Envelope<EmpowermentGrant>>, ApiError> {
    authorize_route(&state, &headers, ROUTE).await?;
    match state.store.get_grant(id).await {
        Ok(grant) => Ok(Json(Envelope::new(grant))),
        Err(StoreError::NotFound(_)) => Err(api_not_found("empowerment grant not found")),
        Err(err) => Err(api_internal("failed to fetch empowerment grant", &err)),
    }
}

#[utoipa::path(
    post,
    path = "/v1/empowerment",
    tag = "empowerment",
    request_body = GrantCreateRequest,
    responses(
        (status = 201, description = "Grant application submitted", body = crate::api::types::GrantData),
        (status = 400, description = "Invalid application", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn create_grant(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(body): ApiJson<GrantCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = authorize_route(&state, &headers, ROUTE).await?;
    if body.applicant_name.trim().is_empty() || body.purpose.trim().is_empty() {
        return Err(api_validation_error("applicant_name and purpose are required"));
    }
    if !is_non_negative(body.requested_amount) {
        return Err(api_validation_error("requested_amount must be zero or more"));
    }
    let (year, seq) = next_number(&state, "grant").await?;
    let now = Utc::now();
    let grant = EmpowermentGrant {
        id: Uuid::new_v4(),
        application_number: format!("EMP-{year}-{seq:05}"),
        applicant_name: body.applicant_name,
        grant_type: body.grant_type,
        purpose: body.purpose,
        requested_amount: body.requested_amount,
        constituency_id: body.constituency_id,
        ward_id: body.ward_id,
        status: GrantStatus::Submitted,
        submitted_by: caller.user_id,
        created_at: now,
        updated_at: now,
    };
    state
        .store
        .create_grant(grant)
        .await
        .map(|created| (StatusCode::CREATED, Json(Envelope::new(created))))
        .map_err(|err| api_internal("failed to create empowerment grant", &err))
}

#[utoipa::path(
    post,
    path = "/v1/empowerment/{id}/status",
    tag = "empowerment",
    params(("id" = Uuid, Path, description = "Grant identifier")),
    request_body = GrantStatusUpdateRequest,
    responses(
        (status = 200, description = "Status recorded", body = crate::api::types::GrantData),
        (status = 404, description = "Grant not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn update_grant_status(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(body): ApiJson<GrantStatusUpdateRequest>,
) -> Result<Json<Envelope<EmpowermentGrant>>, ApiError> {
    let caller = authorize_route(&state, &headers, ROUTE).await?;
    match state
        .store
        .set_grant_status(id, body.status, &caller.user_id, body.comment)
        .await
    {
        Ok((grant, _)) => {
            metrics::counter!("cdf_status_changes_total", "entity" => "grant").increment(1);
            Ok(Json(Envelope::new(grant)))
        }
        Err(StoreError::NotFound(_)) => Err(api_not_found("empowerment grant not found")),
        Err(err) => Err(api_internal("failed to update grant status", &err)),
    }
}
