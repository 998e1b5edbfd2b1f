//! Bursary application handlers.
use crate::api::error::{ApiError, api_internal, api_not_found, api_validation_error};
use crate::api::extract::ApiJson;
use crate::api::types::{Envelope, ListEnvelope, PageParams};
use crate::api::{DEFAULT_PAGE_LIMIT, is_non_negative, next_number, page_request};
use crate::app::AppState;
use crate::auth::authorize_route;
use crate::model::{
    BursaryApplication, BursaryCreateRequest, BursaryFilter, BursaryStatus,
    BursaryStatusUpdateRequest,
};
use crate::store::StoreError;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use chrono::Utc;
use uuid::Uuid;

const ROUTE: &str = "/bursaries";

#[utoipa::path(
    get,
    path = "/v1/bursaries",
    tag = "bursaries",
    params(BursaryFilter, PageParams),
    responses(
        (status = 200, description = "Bursary applications, newest first", body = crate::api::types::BursaryList),
        (status = 403, description = "Role not permitted", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn list_bursaries(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(filter): Query<BursaryFilter>,
    Query(paging): Query<PageParams>,
) -> Result<Json<ListEnvelope<BursaryApplication>>, ApiError> {
    authorize_route(&state, &headers, ROUTE).await?;
    let page = page_request(&paging, DEFAULT_PAGE_LIMIT);
    let result = state
        .store
        .list_bursaries(&filter, page)
        .await
        .map_err(|err| api_internal("failed to list bursary applications", &err))?;
    Ok(Json(ListEnvelope::paged(result.items, page, result.total)))
}

#[utoipa::path(
    get,
    path = "/v1/bursaries/{id}",
    tag = "bursaries",
    params(("id" = Uuid, Path, description = "Application identifier")),
    responses(
        (status = 200, description = "Fetch bursary application", body = crate::api::types::BursaryData),
        (status = 404, description = "Application not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn get_bursary(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Envelope<BursaryApplication>>, ApiError> {
    authorize_route(&state, &headers, ROUTE).await?;
    match state.store.get_bursary(id).await {
        Ok(application) => Ok(Json(Envelope::new(application))),
        Err(StoreError::NotFound(_)) => Err(api_not_found("bursary application not found")),
        Err(err) => Err(api_internal("failed to fetch bursary application", &err)),
    }
}

#[utoipa::path(
    post,
    path = "/v1/bursaries",
    tag = "bursaries",
    request_body = BursaryCreateRequest,
    responses(
        (status = 201, description = "Application submitted", body = crate::api::types::BursaryData),
        (status = 400, description = "Invalid application", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn create_bursary(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(body): ApiJson<BursaryCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = authorize_route(&state, &headers, ROUTE).await?;
    if body.student_name.trim().is_empty() || body.institution_name.trim().is_empty() {
        return Err(api_validation_error("student and institution names are required"));
    }
    if !is_non_negative(body.tuition_fees) {
        return Err(api_validation_error("tuition_fees must be zero or more"));
    }
    let (year, seq) = next_number(&state, "bursary").await?;
    let now = Utc::now();
    let application = BursaryApplication {
        id: Uuid::new_v4(),
        application_number: format!("BUR-{year}-{seq:05}"),
        student_name: body.student_name,
        institution_name: body.institution_name,
        institution_type: body.institution_type,
        tuition_fees: body.tuition_fees,
        academic_year: body.academic_year,
        constituency_id: body.constituency_id,
        ward_id: body.ward_id,
        status: BursaryStatus::Submitted,
        submitted_by: caller.user_id,
        created_at: now,
        updated_at: now,
    };
    state
        .store
        .create_bursary(application)
        .await
        .map(|created| (StatusCode::CREATED, Json(Envelope::new(created))))
        .map_err(|err| api_internal("failed to create bursary application", &err))
}

#[utoipa::path(
    post,
    path = "/v1/bursaries/{id}/status",
    tag = "bursaries",
    params(("id" = Uuid, Path, description = "Application identifier")),
    request_body = BursaryStatusUpdateRequest,
    responses(
        (status = 200, description = "Status recorded", body = crate::api::types::BursaryData),
        (status = 404, description = "Application not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn update_bursary_status(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(body): ApiJson<BursaryStatusUpdateRequest>,
) -> Result<Json<Envelope<BursaryApplication>>, ApiError> {
    let caller = authorize_route(&state, &headers, ROUTE).await?;
    match state
        .store
        .set_bursary_status(id, body.status, &caller.user_id, body.comment)
        .await
    {
        Ok((application, _)) => {
            metrics::counter!("cdf_status_changes_total", "entity" => "bursary").increment(1);
            Ok(Json(Envelope::new(application)))
        }
        Err(StoreError::NotFound(_)) => Err(api_not_found("bursary application not found")),
        Err(err) => Err(api_internal("failed to update bursary status", &err)),
    }
}
