//! Workflow catalogue handler.
use crate::api::error::{ApiError, api_not_found, api_validation_error};
use crate::api::types::Envelope;
use crate::app::AppState;
use crate::auth::authenticate;
use crate::model::EntityKind;
use crate::workflow::{WorkflowCatalogue, catalogue};
use axum::Json;
use axum::extract::{Path, State};
use axum::http::HeaderMap;

#[utoipa::path(
    get,
    path = "/v1/workflow/{entity}",
    tag = "workflow",
    params(("entity" = String, Path, description = "Record family: project or payment")),
    responses(
        (status = 200, description = "Statuses and transition table", body = crate::api::types::CatalogueData),
        (status = 400, description = "Unknown record family", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Family has no transition table", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn workflow_catalogue(
    Path(entity): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Envelope<WorkflowCatalogue>>, ApiError> {
    authenticate(&state, &headers).await?;
    let kind: EntityKind = entity
        .parse()
        .map_err(|_| api_validation_error("unknown entity"))?;
    // Bursaries and grants have statuses but no catalogued transitions.
    catalogue(kind)
        .map(|table| Json(Envelope::new(table)))
        .ok_or_else(|| api_not_found("no workflow catalogue for this entity"))
}
