//! Document API handlers.
//!
//! # Purpose
//! Evidence documents addressed by content hash: registration, metadata
//! edits, deletion, sealing, public hash verification, statistics, and the
//! per-document audit log.
//!
//! # Key invariants
//! - Once sealed, a document refuses update and delete with 403.
//! - Sealing twice is a 400; the first seal's actor and time are kept.
//! - `/documents` has no registry entry, so any authenticated caller passes
//!   the route check. Delete and seal carry their own role lists.
use crate::api::error::{
    ApiError, api_conflict, api_forbidden, api_internal, api_not_found, api_validation_error,
};
use crate::api::extract::ApiJson;
use crate::api::types::{
    ConstituencyParams, DocumentVerification, Envelope, ListEnvelope, PageParams,
};
use crate::api::page_request;
use crate::app::AppState;
use crate::auth::{authorize_route, require_roles};
use crate::model::{
    Document, DocumentAuditEntry, DocumentCreateRequest, DocumentFilter, DocumentPatchRequest,
    DocumentStatistics,
};
use crate::store::StoreError;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use cdf_authz::Role;
use chrono::Utc;
use uuid::Uuid;

const ROUTE: &str = "/documents";
const DEFAULT_LIMIT: u32 = 50;

const DELETERS: &[Role] = &[Role::SuperAdmin, Role::CdfcChair, Role::Plgo];
const SEALERS: &[Role] = &[Role::CdfcChair, Role::Plgo, Role::SuperAdmin];

#[utoipa::path(
    get,
    path = "/v1/documents",
    tag = "documents",
    params(DocumentFilter, PageParams),
    responses(
        (status = 200, description = "Documents, newest first", body = crate::api::types::DocumentList),
        (status = 401, description = "Missing or invalid token", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn list_documents(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(filter): Query<DocumentFilter>,
    Query(paging): Query<PageParams>,
) -> Result<Json<ListEnvelope<Document>>, ApiError> {
    authorize_route(&state, &headers, ROUTE).await?;
    let page = page_request(&paging, DEFAULT_LIMIT);
    let result = state
        .store
        .list_documents(&filter, page)
        .await
        .map_err(|err| api_internal("failed to list documents", &err))?;
    Ok(Json(ListEnvelope::paged(result.items, page, result.total)))
}

#[utoipa::path(
    get,
    path = "/v1/documents/{id}",
    tag = "documents",
    params(("id" = Uuid, Path, description = "Document identifier")),
    responses(
        (status = 200, description = "Fetch document", body = crate::api::types::DocumentData),
        (status = 404, description = "Document not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn get_document(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Envelope<Document>>, ApiError> {
    authorize_route(&state, &headers, ROUTE).await?;
    match state.store.get_document(id).await {
        Ok(document) => Ok(Json(Envelope::new(document))),
        Err(StoreError::NotFound(_)) => Err(api_not_found("document not found")),
        Err(err) => Err(api_internal("failed to fetch document", &err)),
    }
}

#[utoipa::path(
    post,
    path = "/v1/documents",
    tag = "documents",
    request_body = DocumentCreateRequest,
    responses(
        (status = 201, description = "Document registered", body = crate::api::types::DocumentData),
        (status = 400, description = "Invalid document", body = crate::api::types::ErrorResponse),
        (status = 409, description = "A document with this hash exists", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn create_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(body): ApiJson<DocumentCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = authorize_route(&state, &headers, ROUTE).await?;
    if body.file_hash.trim().is_empty() {
        return Err(api_validation_error("file_hash is required"));
    }
    if body.file_name.trim().is_empty() || body.file_url.trim().is_empty() {
        return Err(api_validation_error("file_name and file_url are required"));
    }
    if body.file_size.is_some_and(|size| size < 0) {
        return Err(api_validation_error("file_size must be zero or more"));
    }
    let now = Utc::now();
    let document = Document {
        id: Uuid::new_v4(),
        project_id: body.project_id,
        uploader_id: caller.user_id,
        file_url: body.file_url,
        file_name: body.file_name,
        file_size: body.file_size,
        mime_type: body.mime_type,
        file_hash: body.file_hash,
        document_type: body.document_type,
        description: body.description,
        is_immutable: false,
        immutable_at: None,
        immutable_by: None,
        constituency_id: body.constituency_id,
        ward_id: body.ward_id,
        metadata: body
            .metadata
            .unwrap_or_else(|| serde_json::Value::Object(Default::default())),
        created_at: now,
        updated_at: now,
    };
    match state.store.create_document(document).await {
        Ok(created) => Ok((StatusCode::CREATED, Json(Envelope::new(created)))),
        Err(StoreError::Conflict(_)) => Err(api_conflict(
            "duplicate_hash",
            "a document with this hash already exists",
        )),
        Err(err) => Err(api_internal("failed to create document", &err)),
    }
}

#[utoipa::path(
    patch,
    path = "/v1/documents/{id}",
    tag = "documents",
    params(("id" = Uuid, Path, description = "Document identifier")),
    request_body = DocumentPatchRequest,
    responses(
        (status = 200, description = "Document updated", body = crate::api::types::DocumentData),
        (status = 403, description = "Document is immutable", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Document not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn update_document(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(body): ApiJson<DocumentPatchRequest>,
) -> Result<Json<Envelope<Document>>, ApiError> {
    let caller = authorize_route(&state, &headers, ROUTE).await?;
    match state.store.update_document(id, body, &caller.user_id).await {
        Ok(document) => Ok(Json(Envelope::new(document))),
        Err(StoreError::Forbidden(message)) => Err(api_forbidden(&message)),
        Err(StoreError::NotFound(_)) => Err(api_not_found("document not found")),
        Err(err) => Err(api_internal("failed to update document", &err)),
    }
}

#[utoipa::path(
    delete,
    path = "/v1/documents/{id}",
    tag = "documents",
    params(("id" = Uuid, Path, description = "Document identifier")),
    responses(
        (status = 204, description = "Document deleted"),
        (status = 403, description = "Role not permitted or document is immutable", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Document not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn delete_document(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let caller = authorize_route(&state, &headers, ROUTE).await?;
    require_roles(&caller, DELETERS)?;
    match state.store.delete_document(id, &caller.user_id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(StoreError::Forbidden(message)) => Err(api_forbidden(&message)),
        Err(StoreError::NotFound(_)) => Err(api_not_found("document not found")),
        Err(err) => Err(api_internal("failed to delete document", &err)),
    }
}

#[utoipa::path(
    post,
    path = "/v1/documents/{id}/immutable",
    tag = "documents",
    params(("id" = Uuid, Path, description = "Document identifier")),
    responses(
        (status = 200, description = "Document sealed", body = crate::api::types::DocumentData),
        (status = 400, description = "Document is already immutable", body = crate::api::types::ErrorResponse),
        (status = 403, description = "Role not permitted", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Document not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn make_document_immutable(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Envelope<Document>>, ApiError> {
    let caller = authorize_route(&state, &headers, ROUTE).await?;
    require_roles(&caller, SEALERS)?;
    match state.store.make_document_immutable(id, &caller.user_id).await {
        Ok(document) => {
            tracing::info!(document_id = %id, user_id = %caller.user_id, "document sealed");
            Ok(Json(Envelope::new(document)))
        }
        Err(StoreError::Conflict(_)) => Err(api_validation_error("document is already immutable")),
        Err(StoreError::NotFound(_)) => Err(api_not_found("document not found")),
        Err(err) => Err(api_internal("failed to seal document", &err)),
    }
}

#[utoipa::path(
    get,
    path = "/v1/documents/verify/{hash}",
    tag = "documents",
    params(("hash" = String, Path, description = "Content hash to look up")),
    responses(
        (status = 200, description = "Verification result", body = crate::api::types::VerificationData)
    )
)]
/// Public hash lookup. Answers `verified: false` rather than 404 for unknown
/// hashes.
pub(crate) async fn verify_document(
    Path(hash): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Envelope<DocumentVerification>>, ApiError> {
    let document = state
        .store
        .find_document_by_hash(&hash)
        .await
        .map_err(|err| api_internal("failed to verify document", &err))?;
    Ok(Json(Envelope::new(DocumentVerification {
        verified: document.is_some(),
        document,
    })))
}

#[utoipa::path(
    get,
    path = "/v1/documents/statistics",
    tag = "documents",
    params(ConstituencyParams),
    responses(
        (status = 200, description = "Document counts and sizes", body = crate::api::types::DocumentStatisticsData)
    )
)]
pub(crate) async fn document_statistics(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ConstituencyParams>,
) -> Result<Json<Envelope<DocumentStatistics>>, ApiError> {
    authorize_route(&state, &headers, ROUTE).await?;
    let stats = state
        .store
        .document_statistics(params.constituency_id.as_deref())
        .await
        .map_err(|err| api_internal("failed to load document statistics", &err))?;
    Ok(Json(Envelope::new(stats)))
}

#[utoipa::path(
    get,
    path = "/v1/documents/{id}/audit",
    tag = "documents",
    params(("id" = Uuid, Path, description = "Document identifier")),
    responses(
        (status = 200, description = "Audit entries, oldest first", body = crate::api::types::AuditEntryList),
        (status = 404, description = "Document not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn document_audit_log(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ListEnvelope<DocumentAuditEntry>>, ApiError> {
    authorize_route(&state, &headers, ROUTE).await?;
    match state.store.document_audit_log(id).await {
        Ok(entries) => Ok(Json(ListEnvelope::unpaged(entries))),
        Err(StoreError::NotFound(_)) => Err(api_not_found("document not found")),
        Err(err) => Err(api_internal("failed to load document audit log", &err)),
    }
}
