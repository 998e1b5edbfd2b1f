//! Gateway HTTP application wiring.
//!
//! # Purpose
//! Builds the Axum router, configures middleware, and defines the shared
//! application state injected into handlers.
//!
//! # Notes
//! Route composition lives here so `main` stays small and integration tests
//! can drive the router directly.
use crate::api;
use crate::api::openapi::ApiDoc;
use crate::auth::blacklist::TokenBlacklist;
use crate::config::{GatewayConfig, StorageBackend};
use crate::observability;
use crate::store::memory::InMemoryStore;
use crate::store::postgres::PostgresStore;
use crate::store::{GatewayStore, StoreConfig};
use anyhow::Context;
use axum::Router;
use cdf_authz::{RouteRegistry, TokenVerifier};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_opentelemetry::OpenTelemetrySpanExt;
use utoipa::OpenApi;

pub const SERVICE_NAME: &str = "cdf-gateway";
pub const API_VERSION: &str = "v1";

#[derive(Clone)]
pub struct AppState {
    pub service_name: String,
    pub api_version: String,
    pub store: Arc<dyn GatewayStore + Send + Sync>,
    pub registry: Arc<RouteRegistry>,
    pub verifier: Arc<TokenVerifier>,
    pub blacklist: TokenBlacklist,
    pub mock_api_enabled: bool,
}

impl AppState {
    /// State over an existing store with the default route registry.
    pub fn new(
        store: Arc<dyn GatewayStore + Send + Sync>,
        verifier: TokenVerifier,
        mock_api_enabled: bool,
    ) -> Self {
        Self {
            service_name: SERVICE_NAME.to_string(),
            api_version: API_VERSION.to_string(),
            blacklist: TokenBlacklist::new(store.clone()),
            store,
            registry: Arc::new(RouteRegistry::default()),
            verifier: Arc::new(verifier),
            mock_api_enabled,
        }
    }
}

/// Open the configured store and assemble the application state.
///
/// # Errors
/// - Postgres selected without a `postgres` section.
/// - Postgres connection or migration failure.
/// - An empty JWT secret.
pub async fn build_state(config: &GatewayConfig) -> anyhow::Result<AppState> {
    let store_config = StoreConfig {
        audit_retention: config.audit_retention,
    };
    let store: Arc<dyn GatewayStore + Send + Sync> = match config.storage {
        StorageBackend::Memory => Arc::new(InMemoryStore::new(store_config)),
        StorageBackend::Postgres => {
            let pg = config
                .postgres
                .as_ref()
                .context("postgres configuration missing")?;
            Arc::new(PostgresStore::connect(pg, store_config).await?)
        }
    };
    let verifier = TokenVerifier::new(
        config.auth.jwt_secret.as_bytes(),
        config.auth.issuer.clone(),
        config.auth.audience.clone(),
        config.auth.leeway_secs,
    )
    .context("token verifier")?;
    Ok(AppState::new(store, verifier, config.mock_api_enabled))
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer =
        TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
            let parent = observability::trace_context_from_headers(request.headers());
            let span = tracing::info_span!(
                "http.request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version()
            );
            span.set_parent(parent);
            span
        });

    Router::new()
        .route(
            "/v1/system/info",
            axum::routing::get(api::system::system_info),
        )
        .route(
            "/v1/system/health",
            axum::routing::get(api::system::system_health),
        )
        .route("/v1/auth/me", axum::routing::get(api::session::me))
        .route(
            "/v1/auth/logout",
            axum::routing::post(api::session::logout),
        )
        .route(
            "/v1/access/routes",
            axum::routing::get(api::access::list_routes),
        )
        .route(
            "/v1/access/check",
            axum::routing::get(api::access::check_access),
        )
        .route(
            "/v1/workflow/:entity",
            axum::routing::get(api::workflow::workflow_catalogue),
        )
        .route(
            "/v1/projects",
            axum::routing::get(api::projects::list_projects).post(api::projects::create_project),
        )
        .route(
            "/v1/projects/stats/:constituency_id",
            axum::routing::get(api::projects::constituency_stats),
        )
        .route(
            "/v1/projects/:id",
            axum::routing::get(api::projects::get_project).patch(api::projects::update_project),
        )
        .route(
            "/v1/projects/:id/status",
            axum::routing::post(api::projects::update_project_status),
        )
        .route(
            "/v1/projects/:id/workflow",
            axum::routing::get(api::projects::project_workflow),
        )
        .route(
            "/v1/payments",
            axum::routing::get(api::payments::list_payments).post(api::payments::create_payment),
        )
        .route(
            "/v1/payments/:id",
            axum::routing::get(api::payments::get_payment),
        )
        .route(
            "/v1/payments/:id/status",
            axum::routing::post(api::payments::update_payment_status),
        )
        .route(
            "/v1/payments/:id/approve-panel-a",
            axum::routing::post(api::payments::approve_panel_a),
        )
        .route(
            "/v1/payments/:id/approve-panel-b",
            axum::routing::post(api::payments::approve_panel_b),
        )
        .route(
            "/v1/payments/:id/disburse",
            axum::routing::post(api::payments::disburse_payment),
        )
        .route(
            "/v1/payments/:id/workflow",
            axum::routing::get(api::payments::payment_workflow),
        )
        .route(
            "/v1/bursaries",
            axum::routing::get(api::bursaries::list_bursaries)
                .post(api::bursaries::create_bursary),
        )
        .route(
            "/v1/bursaries/:id",
            axum::routing::get(api::bursaries::get_bursary),
        )
        .route(
            "/v1/bursaries/:id/status",
            axum::routing::post(api::bursaries::update_bursary_status),
        )
        .route(
            "/v1/empowerment",
            axum::routing::get(api::empowerment::list_grants)
                .post(api::empowerment::create_grant),
        )
        .route(
            "/v1/empowerment/:id",
            axum::routing::get(api::empowerment::get_grant),
        )
        .route(
            "/v1/empowerment/:id/status",
            axum::routing::post(api::empowerment::update_grant_status),
        )
        .route(
            "/v1/documents",
            axum::routing::get(api::documents::list_documents)
                .post(api::documents::create_document),
        )
        .route(
            "/v1/documents/statistics",
            axum::routing::get(api::documents::document_statistics),
        )
        .route(
            "/v1/documents/verify/:hash",
            axum::routing::get(api::documents::verify_document),
        )
        .route(
            "/v1/documents/:id",
            axum::routing::get(api::documents::get_document)
                .patch(api::documents::update_document)
                .delete(api::documents::delete_document),
        )
        .route(
            "/v1/documents/:id/immutable",
            axum::routing::post(api::documents::make_document_immutable),
        )
        .route(
            "/v1/documents/:id/audit",
            axum::routing::get(api::documents::document_audit_log),
        )
        .route(
            "/v1/users",
            axum::routing::get(api::users::list_users).post(api::users::upsert_user),
        )
        .route("/v1/users/:id", axum::routing::get(api::users::get_user))
        .route(
            "/v1/notifications",
            axum::routing::get(api::notifications::list_notifications)
                .post(api::notifications::send_notification),
        )
        .route(
            "/v1/notifications/unread-count",
            axum::routing::get(api::notifications::unread_count),
        )
        .route(
            "/v1/notifications/mark-all-read",
            axum::routing::post(api::notifications::mark_all_read),
        )
        .route(
            "/v1/notifications/broadcast",
            axum::routing::post(api::notifications::broadcast_notification),
        )
        .route(
            "/v1/notifications/:id/read",
            axum::routing::post(api::notifications::mark_read),
        )
        .route(
            "/v1/mock/projects",
            axum::routing::get(api::mock::list_mock_projects),
        )
        .merge(
            utoipa_swagger_ui::SwaggerUi::new("/docs").url("/v1/openapi.json", ApiDoc::openapi()),
        )
        .layer(trace_layer)
        .with_state(state)
}
