//! Project API handlers.
//!
//! # Purpose
//! Project listing, intake, partial updates, status writes, constituency
//! statistics, and the per-project workflow view.
//!
//! # Key invariants
//! - Every handler is behind the `/projects` registry entry.
//! - Status writes accept any [`ProjectStatus`]; the workflow catalogue is
//!   only used to describe available actions.
use crate::api::error::{
    ApiError, api_conflict, api_internal, api_not_found, api_validation_error,
};
use crate::api::extract::ApiJson;
use crate::api::types::{Envelope, ListEnvelope, PageParams, WorkflowView};
use crate::api::{DEFAULT_PAGE_LIMIT, is_non_negative, next_number, notify_user, page_request};
use crate::app::AppState;
use crate::auth::{authorize_route, require_roles};
use crate::model::{
    ConstituencyStats, EntityKind, NewNotification, NotificationCategory, NotificationKind,
    Project, ProjectCreateRequest, ProjectFilter, ProjectPatchRequest, ProjectStatus,
    ProjectStatusUpdateRequest,
};
use crate::store::StoreError;
use crate::workflow::{PROJECT_TRANSITIONS, StatusLabel, StatusView, Transition, available};
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use cdf_authz::Role;
use chrono::Utc;
use uuid::Uuid;

const ROUTE: &str = "/projects";

const PROJECT_CREATORS: &[Role] = &[
    Role::CdfcChair,
    Role::CdfcMember,
    Role::WdcMember,
    Role::Citizen,
    Role::SuperAdmin,
];

#[utoipa::path(
    get,
    path = "/v1/projects",
    tag = "projects",
    params(ProjectFilter, PageParams),
    responses(
        (status = 200, description = "Projects, newest first", body = crate::api::types::ProjectList),
        (status = 401, description = "Missing or invalid token", body = crate::api::types::ErrorResponse),
        (status = 403, description = "Role not permitted", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn list_projects(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(filter): Query<ProjectFilter>,
    Query(paging): Query<PageParams>,
) -> Result<Json<ListEnvelope<Project>>, ApiError> {
    authorize_route(&state, &headers, ROUTE).await?;
    let page = page_request(&paging, DEFAULT_PAGE_LIMIT);
    let result = state
        .store
        .list_projects(&filter, page)
        .await
        .map_err(|err| api_internal("failed to list projects", &err))?;
    Ok(Json(ListEnvelope::paged(result.items, page, result.total)))
}

#[utoipa::path(
    get,
    path = "/v1/projects/{id}",
    tag = "projects",
    params(("id" = Uuid, Path, description = "Project identifier")),
    responses(
        (status = 200, description = "Fetch project", body = crate::api::types::ProjectData),
        (status = 404, description = "Project not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn get_project(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Envelope<Project>>, ApiError> {
    authorize_route(&state, &headers, ROUTE).await?;
    match state.store.get_project(id).await {
        Ok(project) => Ok(Json(Envelope::new(project))),
        Err(StoreError::NotFound(_)) => Err(api_not_found("project not found")),
        Err(err) => Err(api_internal("failed to fetch project", &err)),
    }
}

#[utoipa::path(
    post,
    path = "/v1/projects",
    tag = "projects",
    request_body = ProjectCreateRequest,
    responses(
        (status = 201, description = "Project created as draft", body = crate::api::types::ProjectData),
        (status = 400, description = "Invalid project", body = crate::api::types::ErrorResponse),
        (status = 403, description = "Role not permitted", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn create_project(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(body): ApiJson<ProjectCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = authorize_route(&state, &headers, ROUTE).await?;
    require_roles(&caller, PROJECT_CREATORS)?;
    if body.name.trim().is_empty() {
        return Err(api_validation_error("name is required"));
    }
    if body.constituency_id.trim().is_empty() {
        return Err(api_validation_error("constituency_id is required"));
    }
    if !is_non_negative(body.budget) {
        return Err(api_validation_error("budget must be zero or more"));
    }
    let scope = format!("project:{}", body.constituency_id);
    let (year, seq) = next_number(&state, &scope).await?;
    let now = Utc::now();
    let project = Project {
        id: Uuid::new_v4(),
        project_number: format!("{}-{year}-{seq:04}", body.constituency_id),
        name: body.name,
        description: body.description,
        sector: body.sector,
        constituency_id: body.constituency_id,
        ward_id: body.ward_id,
        budget: body.budget,
        spent: 0.0,
        beneficiaries: body.beneficiaries,
        progress: 0,
        status: ProjectStatus::Draft,
        submitted_by: caller.user_id,
        created_at: now,
        updated_at: now,
    };
    match state.store.create_project(project).await {
        Ok(created) => {
            tracing::info!(project_id = %created.id, number = %created.project_number, "project created");
            Ok((StatusCode::CREATED, Json(Envelope::new(created))))
        }
        Err(StoreError::Conflict(_)) => Err(api_conflict("conflict", "project number already exists")),
        Err(err) => Err(api_internal("failed to create project", &err)),
    }
}

#[utoipa::path(
    patch,
    path = "/v1/projects/{id}",
    tag = "projects",
    params(("id" = Uuid, Path, description = "Project identifier")),
    request_body = ProjectPatchRequest,
    responses(
        (status = 200, description = "Project updated", body = crate::api::types::ProjectData),
        (status = 400, description = "Invalid update", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Project not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn update_project(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(body): ApiJson<ProjectPatchRequest>,
) -> Result<Json<Envelope<Project>>, ApiError> {
    authorize_route(&state, &headers, ROUTE).await?;
    if body.progress.is_some_and(|progress| !(0..=100).contains(&progress)) {
        return Err(api_validation_error("progress must be between 0 and 100"));
    }
    if body.budget.is_some_and(|budget| !is_non_negative(budget)) {
        return Err(api_validation_error("budget must be zero or more"));
    }
    if body.spent.is_some_and(|spent| !is_non_negative(spent)) {
        return Err(api_validation_error("spent must be zero or more"));
    }
    match state.store.update_project(id, body).await {
        Ok(project) => Ok(Json(Envelope::new(project))),
        Err(StoreError::NotFound(_)) => Err(api_not_found("project not found")),
        Err(err) => Err(api_internal("failed to update project", &err)),
    }
}

#[utoipa::path(
    post,
    path = "/v1/projects/{id}/status",
    tag = "projects",
    params(("id" = Uuid, Path, description = "Project identifier")),
    request_body = ProjectStatusUpdateRequest,
    responses(
        (status = 200, description = "Status recorded", body = crate::api::types::ProjectData),
        (status = 400, description = "Unknown status value", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Project not found", body = crate::api::types::ErrorResponse)
    )
)]
/// Set a project's status.
///
/// Any value of the enumeration is accepted from any current status. A step
/// outside the catalogue is logged at debug level and otherwise treated like
/// any other write.
pub(crate) async fn update_project_status(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(body): ApiJson<ProjectStatusUpdateRequest>,
) -> Result<Json<Envelope<Project>>, ApiError> {
    let caller = authorize_route(&state, &headers, ROUTE).await?;
    let (project, change) = match state
        .store
        .set_project_status(id, body.status, &caller.user_id, body.comment)
        .await
    {
        Ok(result) => result,
        Err(StoreError::NotFound(_)) => return Err(api_not_found("project not found")),
        Err(err) => return Err(api_internal("failed to update project status", &err)),
    };
    if let Ok(from) = change.from_status.parse::<ProjectStatus>()
        && !crate::workflow::is_catalogued(PROJECT_TRANSITIONS, from, project.status)
    {
        tracing::debug!(project_id = %id, from = %from, to = %project.status, "uncatalogued project status write");
    }
    metrics::counter!("cdf_status_changes_total", "entity" => "project").increment(1);
    notify_user(
        &state,
        &project.submitted_by,
        NewNotification {
            title: "Project status updated".to_string(),
            message: format!(
                "{} is now {}",
                project.project_number,
                project.status.label()
            ),
            kind: NotificationKind::Info,
            category: NotificationCategory::Project,
            action_url: Some(format!("/projects/{}", project.id)),
            metadata: Some(serde_json::json!({
                "project_id": project.id,
                "from": change.from_status,
                "to": change.to_status,
            })),
        },
    )
    .await;
    Ok(Json(Envelope::new(project)))
}

#[utoipa::path(
    get,
    path = "/v1/projects/stats/{constituency_id}",
    tag = "projects",
    params(("constituency_id" = String, Path, description = "Constituency identifier")),
    responses(
        (status = 200, description = "Project statistics for a constituency", body = crate::api::types::ConstituencyStatsData)
    )
)]
pub(crate) async fn constituency_stats(
    Path(constituency_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Envelope<ConstituencyStats>>, ApiError> {
    authorize_route(&state, &headers, ROUTE).await?;
    let stats = state
        .store
        .constituency_stats(&constituency_id)
        .await
        .map_err(|err| api_internal("failed to load constituency statistics", &err))?;
    Ok(Json(Envelope::new(stats)))
}

#[utoipa::path(
    get,
    path = "/v1/projects/{id}/workflow",
    tag = "projects",
    params(("id" = Uuid, Path, description = "Project identifier")),
    responses(
        (status = 200, description = "Current status, caller's available actions, and history", body = crate::api::types::WorkflowViewData),
        (status = 404, description = "Project not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn project_workflow(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Envelope<WorkflowView>>, ApiError> {
    let caller = authorize_route(&state, &headers, "/project-workflow").await?;
    let project = match state.store.get_project(id).await {
        Ok(project) => project,
        Err(StoreError::NotFound(_)) => return Err(api_not_found("project not found")),
        Err(err) => return Err(api_internal("failed to fetch project", &err)),
    };
    let history = state
        .store
        .status_history(EntityKind::Project, id)
        .await
        .map_err(|err| api_internal("failed to load status history", &err))?;
    Ok(Json(Envelope::new(WorkflowView {
        entity_id: id,
        current: StatusView::of(project.status),
        available_transitions: available(PROJECT_TRANSITIONS, project.status, &caller.roles)
            .into_iter()
            .map(Transition::view)
            .collect(),
        history,
    })))
}
