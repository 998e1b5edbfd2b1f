//! User directory handlers.
use crate::api::error::{ApiError, api_internal, api_not_found, api_validation_error};
use crate::api::extract::ApiJson;
use crate::api::types::{Envelope, ListEnvelope};
use crate::app::AppState;
use crate::auth::authorize_route;
use crate::model::{User, UserUpsertRequest};
use crate::store::StoreError;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use chrono::Utc;

const ROUTE: &str = "/users";

#[utoipa::path(
    get,
    path = "/v1/users",
    tag = "users",
    responses(
        (status = 200, description = "Known users", body = crate::api::types::UserList),
        (status = 403, description = "Role not permitted", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn list_users(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ListEnvelope<User>>, ApiError> {
    authorize_route(&state, &headers, ROUTE).await?;
    let users = state
        .store
        .list_users()
        .await
        .map_err(|err| api_internal("failed to list users", &err))?;
    Ok(Json(ListEnvelope::unpaged(users)))
}

#[utoipa::path(
    get,
    path = "/v1/users/{id}",
    tag = "users",
    params(("id" = String, Path, description = "User identifier (token subject)")),
    responses(
        (status = 200, description = "Fetch user", body = crate::api::types::UserData),
        (status = 404, description = "User not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn get_user(
    Path(id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Envelope<User>>, ApiError> {
    authorize_route(&state, &headers, ROUTE).await?;
    match state.store.get_user(&id).await {
        Ok(user) => Ok(Json(Envelope::new(user))),
        Err(StoreError::NotFound(_)) => Err(api_not_found("user not found")),
        Err(err) => Err(api_internal("failed to fetch user", &err)),
    }
}

#[utoipa::path(
    post,
    path = "/v1/users",
    tag = "users",
    request_body = UserUpsertRequest,
    responses(
        (status = 200, description = "User created or replaced", body = crate::api::types::UserData),
        (status = 400, description = "Invalid user", body = crate::api::types::ErrorResponse)
    )
)]
/// Create or replace a directory entry. `created_at` survives replacement.
pub(crate) async fn upsert_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(body): ApiJson<UserUpsertRequest>,
) -> Result<Json<Envelope<User>>, ApiError> {
    let caller = authorize_route(&state, &headers, ROUTE).await?;
    if body.id.trim().is_empty() || body.email.trim().is_empty() {
        return Err(api_validation_error("id and email are required"));
    }
    let now = Utc::now();
    let user = User {
        id: body.id,
        email: body.email,
        roles: body.roles,
        created_at: now,
        updated_at: now,
    };
    let saved = state
        .store
        .upsert_user(user)
        .await
        .map_err(|err| api_internal("failed to save user", &err))?;
    tracing::info!(user_id = %saved.id, by = %caller.user_id, "user saved");
    Ok(Json(Envelope::new(saved)))
}
