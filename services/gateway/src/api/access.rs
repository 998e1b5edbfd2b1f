//! Route registry handlers.
//!
//! # Purpose
//! Lets clients render navigation from the same table the gateway enforces,
//! and ask for a single guard decision without attempting the request.
use crate::api::error::ApiError;
use crate::api::types::{AccessCheck, AccessCheckParams, Envelope, ListEnvelope, RouteView};
use crate::app::AppState;
use crate::auth::authenticate;
use axum::Json;
use axum::extract::{Query, State};
use axum::http::HeaderMap;

#[utoipa::path(
    get,
    path = "/v1/access/routes",
    tag = "access",
    responses(
        (status = 200, description = "Every registered route with its required roles", body = crate::api::types::RouteList),
        (status = 401, description = "Missing or invalid token", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn list_routes(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ListEnvelope<RouteView>>, ApiError> {
    authenticate(&state, &headers).await?;
    let routes = state.registry.entries().map(RouteView::from).collect();
    Ok(Json(ListEnvelope::unpaged(routes)))
}

#[utoipa::path(
    get,
    path = "/v1/access/check",
    tag = "access",
    params(AccessCheckParams),
    responses(
        (status = 200, description = "Guard decision for the caller", body = crate::api::types::AccessCheckData),
        (status = 401, description = "Missing or invalid token", body = crate::api::types::ErrorResponse)
    )
)]
/// Always 200; a denial is reported as `allowed: false`.
pub(crate) async fn check_access(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<AccessCheckParams>,
) -> Result<Json<Envelope<AccessCheck>>, ApiError> {
    let caller = authenticate(&state, &headers).await?;
    let decision = state.registry.decide(&caller.roles, &params.path);
    Ok(Json(Envelope::new(AccessCheck::from(decision))))
}
