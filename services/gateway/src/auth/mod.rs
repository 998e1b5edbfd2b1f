//! Request authentication and role checks.
//!
//! # Purpose
//! Turns an `Authorization: Bearer` header into a [`Caller`] and applies the
//! two kinds of role requirement handlers use: the route registry entry for
//! the resource family, and operation-level role lists.
//!
//! # Key invariants
//! - A token must verify and must not be blacklisted; both failures are 401.
//! - Role checks use the shared predicate from `cdf_authz`, so a route with
//!   no requirement admits every authenticated caller.
//! - Unregistered paths are admitted; this is logged at debug level.
pub mod blacklist;

use crate::api::error::{ApiError, api_forbidden, api_internal, api_unauthorized};
use crate::app::AppState;
use axum::http::HeaderMap;
use cdf_authz::{AccessDecision, Role, RoleSet, is_allowed};
use chrono::{DateTime, TimeZone, Utc};

/// Authenticated principal for one request.
#[derive(Debug, Clone)]
pub struct Caller {
    pub user_id: String,
    pub email: Option<String>,
    pub roles: RoleSet,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(axum::http::header::AUTHORIZATION)?;
    let value = value.to_str().ok()?;
    value.strip_prefix("Bearer ")
}

/// Verify the bearer token on `headers` and build the caller.
///
/// # Errors
/// - 401 when the header is missing, the token fails verification, or the
///   token was logged out.
/// - 500 when the blacklist lookup fails.
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Caller, ApiError> {
    let bearer = extract_bearer(headers).ok_or_else(|| api_unauthorized("missing bearer token"))?;
    let claims = state.verifier.verify(bearer).map_err(|err| {
        tracing::debug!(error = %err, "bearer token rejected");
        api_unauthorized("invalid token")
    })?;
    let revoked = state
        .blacklist
        .is_blacklisted(bearer)
        .await
        .map_err(|err| api_internal("failed to check token status", &err))?;
    if revoked {
        return Err(api_unauthorized("token has been revoked"));
    }
    // An `exp` past chrono's range still has to outlive any logout.
    let expires_at = Utc
        .timestamp_opt(claims.exp, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    Ok(Caller {
        roles: claims.role_set(),
        user_id: claims.sub,
        email: claims.email,
        token: bearer.to_string(),
        expires_at,
    })
}

/// Apply the registry entry for `path` to the caller.
pub fn require_route(
    state: &AppState,
    caller: &Caller,
    path: &str,
) -> Result<AccessDecision, ApiError> {
    let decision = state.registry.decide(&caller.roles, path);
    if !decision.registered {
        tracing::debug!(path = %decision.path, "route not registered; open by default");
    }
    if !decision.allowed {
        metrics::counter!("cdf_access_denied_total").increment(1);
        return Err(api_forbidden("insufficient role for this route"));
    }
    Ok(decision)
}

/// Require at least one of `roles` for an individual operation.
pub fn require_roles(caller: &Caller, roles: &[Role]) -> Result<(), ApiError> {
    let required: RoleSet = roles.iter().copied().collect();
    if is_allowed(&caller.roles, &required) {
        return Ok(());
    }
    metrics::counter!("cdf_access_denied_total").increment(1);
    Err(api_forbidden("insufficient role for this operation"))
}

/// Authenticate and apply the registry entry in one step.
pub async fn authorize_route(
    state: &AppState,
    headers: &HeaderMap,
    path: &str,
) -> Result<Caller, ApiError> {
    let caller = authenticate(state, headers).await?;
    require_route(state, &caller, path)?;
    Ok(caller)
}
