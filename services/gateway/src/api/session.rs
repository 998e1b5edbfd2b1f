//! Session handlers: who am I, and logout.
use crate::api::error::{ApiError, api_internal};
use crate::api::types::{Envelope, RouteView, SessionInfo};
use crate::app::AppState;
use crate::auth::authenticate;
use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};

#[utoipa::path(
    get,
    path = "/v1/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Caller identity and reachable routes", body = crate::api::types::SessionData),
        (status = 401, description = "Missing, invalid or revoked token", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Envelope<SessionInfo>>, ApiError> {
    let caller = authenticate(&state, &headers).await?;
    let routes = state
        .registry
        .accessible(&caller.roles)
        .map(RouteView::from)
        .collect();
    Ok(Json(Envelope::new(SessionInfo {
        roles: caller.roles.tags(),
        user_id: caller.user_id,
        email: caller.email,
        routes,
    })))
}

#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    tag = "auth",
    responses(
        (status = 204, description = "Token revoked"),
        (status = 401, description = "Missing, invalid or revoked token", body = crate::api::types::ErrorResponse)
    )
)]
/// Revoke the presented token.
///
/// # What it does
/// Writes the token hash to the blacklist until the token's own expiry, after
/// which the entry is eligible for cleanup.
///
/// # Errors
/// - 401 when the token is already revoked.
pub(crate) async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let caller = authenticate(&state, &headers).await?;
    state
        .blacklist
        .blacklist(&caller.token, &caller.user_id, caller.expires_at)
        .await
        .map_err(|err| api_internal("failed to revoke token", &err))?;
    tracing::info!(user_id = %caller.user_id, "session logged out");
    Ok(StatusCode::NO_CONTENT)
}
