//! HTTP API request/response types.
//!
//! # Purpose
//! Defines the response envelopes and the payload shapes that are specific to
//! the HTTP surface. Domain records live in `crate::model`.
use crate::model::{
    BursaryApplication, ConstituencyStats, Document, DocumentAuditEntry, DocumentStatistics,
    EmpowermentGrant, NewNotification, Notification, Payment, Project, StatusChange, User,
};
use crate::workflow::{StatusView, TransitionView, WorkflowCatalogue};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Single-record response: `{ "data": ... }`.
#[derive(Debug, Serialize, ToSchema, Clone)]
#[aliases(
    ProjectData = Envelope<Project>,
    PaymentData = Envelope<Payment>,
    BursaryData = Envelope<BursaryApplication>,
    GrantData = Envelope<EmpowermentGrant>,
    DocumentData = Envelope<Document>,
    UserData = Envelope<User>,
    ConstituencyStatsData = Envelope<ConstituencyStats>,
    DocumentStatisticsData = Envelope<DocumentStatistics>,
    WorkflowViewData = Envelope<WorkflowView>,
    CatalogueData = Envelope<WorkflowCatalogue>,
    SessionData = Envelope<SessionInfo>,
    AccessCheckData = Envelope<AccessCheck>,
    UnreadCountData = Envelope<UnreadCount>,
    UpdatedCountData = Envelope<UpdatedCount>,
    BroadcastData = Envelope<BroadcastResult>,
    VerificationData = Envelope<DocumentVerification>
)]
pub struct Envelope<T> {
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// List response: `{ "data": [...], "pagination": {...} }`. Unpaged lists omit
/// `pagination`.
#[derive(Debug, Serialize, ToSchema, Clone)]
#[aliases(
    ProjectList = ListEnvelope<Project>,
    PaymentList = ListEnvelope<Payment>,
    BursaryList = ListEnvelope<BursaryApplication>,
    GrantList = ListEnvelope<EmpowermentGrant>,
    DocumentList = ListEnvelope<Document>,
    AuditEntryList = ListEnvelope<DocumentAuditEntry>,
    StatusChangeList = ListEnvelope<StatusChange>,
    UserList = ListEnvelope<User>,
    NotificationList = ListEnvelope<Notification>,
    RouteList = ListEnvelope<RouteView>
)]
pub struct ListEnvelope<T> {
    pub data: Vec<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl<T> ListEnvelope<T> {
    pub fn unpaged(data: Vec<T>) -> Self {
        Self {
            data,
            pagination: None,
        }
    }

    pub fn paged(data: Vec<T>, page: crate::store::PageRequest, total: u64) -> Self {
        Self {
            data,
            pagination: Some(Pagination::new(page, total)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u64,
}

impl Pagination {
    pub fn new(page: crate::store::PageRequest, total: u64) -> Self {
        Self {
            page: page.page,
            limit: page.limit,
            total,
            pages: total.div_ceil(u64::from(page.limit.max(1))),
        }
    }
}

#[derive(Debug, Deserialize, IntoParams, Clone, Default)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    /// 1-based page number.
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    pub request_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct SystemInfo {
    pub service: String,
    pub api_version: String,
    pub storage_backend: String,
    pub durable_storage: bool,
    pub mock_api_enabled: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct HealthStatus {
    pub status: String,
}

/// Registry entry as exposed over HTTP.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub struct RouteView {
    pub path: String,
    pub roles: Vec<String>,
    pub description: String,
}

impl From<&cdf_authz::RouteEntry> for RouteView {
    fn from(entry: &cdf_authz::RouteEntry) -> Self {
        Self {
            path: entry.path.clone(),
            roles: entry.roles.tags(),
            description: entry.description.clone(),
        }
    }
}

#[derive(Debug, Deserialize, IntoParams, Clone)]
#[into_params(parameter_in = Query)]
pub struct AccessCheckParams {
    /// Application route path to check, e.g. `/payments`.
    pub path: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub struct AccessCheck {
    pub path: String,
    pub allowed: bool,
    pub registered: bool,
    pub required_roles: Vec<String>,
}

impl From<cdf_authz::AccessDecision> for AccessCheck {
    fn from(decision: cdf_authz::AccessDecision) -> Self {
        Self {
            required_roles: decision.required_roles.tags(),
            path: decision.path,
            allowed: decision.allowed,
            registered: decision.registered,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct SessionInfo {
    pub user_id: String,
    pub email: Option<String>,
    pub roles: Vec<String>,
    /// Registered routes this caller may open.
    pub routes: Vec<RouteView>,
}

/// Current status, the catalogued actions open to the caller, and the
/// recorded status history of one record.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct WorkflowView {
    pub entity_id: Uuid,
    pub current: StatusView,
    pub available_transitions: Vec<TransitionView>,
    pub history: Vec<StatusChange>,
}

/// Optional reviewer comment for approval-style actions.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Default)]
pub struct ActionRequest {
    pub comment: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct DocumentVerification {
    pub verified: bool,
    pub document: Option<Document>,
}

#[derive(Debug, Deserialize, IntoParams, Clone, Default)]
#[into_params(parameter_in = Query)]
pub struct ConstituencyParams {
    pub constituency_id: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams, Clone, Default)]
#[into_params(parameter_in = Query)]
pub struct NotificationListParams {
    /// Maximum entries, default 50.
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct UnreadCount {
    pub count: u64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct UpdatedCount {
    pub updated: u64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct SendNotificationRequest {
    pub user_id: String,
    pub notification: NewNotification,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct BroadcastRequest {
    /// Role tags; every user holding at least one of them is notified.
    pub roles: Vec<String>,
    pub notification: NewNotification,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct BroadcastResult {
    pub recipients: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::PageRequest;

    #[test]
    fn pagination_rounds_pages_up() {
        let page = PageRequest::new(Some(2), Some(20), 20);
        assert_eq!(
            Pagination::new(page, 41),
            Pagination {
                page: 2,
                limit: 20,
                total: 41,
                pages: 3
            }
        );
        assert_eq!(Pagination::new(page, 0).pages, 0);
    }

    #[test]
    fn unpaged_lists_omit_pagination() {
        let json = serde_json::to_value(ListEnvelope::unpaged(vec![1, 2])).expect("serialize");
        assert_eq!(json, serde_json::json!({ "data": [1, 2] }));
        let json = serde_json::to_value(ListEnvelope::paged(
            vec![1],
            PageRequest::new(None, Some(1), 20),
            3,
        ))
        .expect("serialize");
        assert_eq!(json["pagination"]["pages"], 3);
    }

    #[test]
    fn access_check_lists_required_tags() {
        let registry = cdf_authz::RouteRegistry::default();
        let caller = cdf_authz::RoleSet::from_iter([cdf_authz::Role::Auditor]);
        let check = AccessCheck::from(registry.decide(&caller, "/users/"));
        assert_eq!(check.path, "/users");
        assert!(!check.allowed);
        assert!(check.registered);
        assert_eq!(check.required_roles, vec!["super_admin", "ministry_official"]);
    }
}
