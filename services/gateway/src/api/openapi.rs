//! OpenAPI schema aggregation for the gateway API.
//!
//! # Purpose
//! Collects all routes and schema types into a single OpenAPI document for docs
//! and client generation.
use crate::api::mock::MockProject;
use crate::api::{
    access, bursaries, documents, empowerment, mock, notifications, payments, projects, session,
    system, users, workflow,
    types::{
        AccessCheck, AccessCheckData, ActionRequest, AuditEntryList, BroadcastData,
        BroadcastRequest, BroadcastResult, BursaryData, BursaryList, CatalogueData,
        ConstituencyStatsData, DocumentData, DocumentList, DocumentStatisticsData,
        DocumentVerification, ErrorResponse, GrantData, GrantList, HealthStatus,
        NotificationList, Pagination, PaymentData, PaymentList, ProjectData, ProjectList,
        RouteList, RouteView, SendNotificationRequest, SessionData, SessionInfo,
        StatusChangeList, SystemInfo, UnreadCount, UnreadCountData, UpdatedCount,
        UpdatedCountData, UserData, UserList, VerificationData, WorkflowView, WorkflowViewData,
    },
};
use crate::model::{
    BursaryApplication, BursaryCreateRequest, BursaryStatus, BursaryStatusUpdateRequest,
    ConstituencyStats, Document, DocumentAuditAction, DocumentAuditEntry, DocumentCreateRequest,
    DocumentPatchRequest, DocumentStatistics, EmpowermentGrant, EntityKind, GrantCreateRequest,
    GrantStatus, GrantStatusUpdateRequest, GrantType, InstitutionType, NewNotification,
    Notification, NotificationCategory, NotificationKind, Payment, PaymentCreateRequest,
    PaymentStatus, PaymentStatusUpdateRequest, PaymentType, Project, ProjectCreateRequest,
    ProjectPatchRequest, ProjectSector, ProjectStatus, ProjectStatusUpdateRequest, StatusChange,
    User, UserUpsertRequest,
};
use crate::workflow::{StatusView, TransitionView, WorkflowCatalogue};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "cdf-gateway",
        version = "v1",
        description = "CDF management platform HTTP API"
    ),
    paths(
        system::system_info,
        system::system_health,
        session::me,
        session::logout,
        access::list_routes,
        access::check_access,
        workflow::workflow_catalogue,
        projects::list_projects,
        projects::get_project,
        projects::create_project,
        projects::update_project,
        projects::update_project_status,
        projects::constituency_stats,
        projects::project_workflow,
        payments::list_payments,
        payments::get_payment,
        payments::create_payment,
        payments::update_payment_status,
        payments::approve_panel_a,
        payments::approve_panel_b,
        payments::disburse_payment,
        payments::payment_workflow,
        bursaries::list_bursaries,
        bursaries::get_bursary,
        bursaries::create_bursary,
        bursaries::update_bursary_status,
        empowerment::list_grants,
        empowerment::get_grant,
        empowerment::create_grant,
        empowerment::update_grant_status,
        documents::list_documents,
        documents::get_document,
        documents::create_document,
        documents::update_document,
        documents::delete_document,
        documents::make_document_immutable,
        documents::verify_document,
        documents::document_statistics,
        documents::document_audit_log,
        users::list_users,
        users::get_user,
        users::upsert_user,
        notifications::list_notifications,
        notifications::unread_count,
        notifications::mark_read,
        notifications::mark_all_read,
        notifications::send_notification,
        notifications::broadcast_notification,
        mock::list_mock_projects
    ),
    components(
        schemas(
            ErrorResponse,
            Pagination,
            SystemInfo,
            HealthStatus,
            SessionInfo,
            SessionData,
            RouteView,
            RouteList,
            AccessCheck,
            AccessCheckData,
            EntityKind,
            StatusChange,
            StatusChangeList,
            StatusView,
            TransitionView,
            WorkflowCatalogue,
            CatalogueData,
            WorkflowView,
            WorkflowViewData,
            ActionRequest,
            Project,
            ProjectStatus,
            ProjectSector,
            ProjectCreateRequest,
            ProjectPatchRequest,
            ProjectStatusUpdateRequest,
            ProjectData,
            ProjectList,
            ConstituencyStats,
            ConstituencyStatsData,
            Payment,
            PaymentStatus,
            PaymentType,
            PaymentCreateRequest,
            PaymentStatusUpdateRequest,
            PaymentData,
            PaymentList,
            BursaryApplication,
            BursaryStatus,
            InstitutionType,
            BursaryCreateRequest,
            BursaryStatusUpdateRequest,
            BursaryData,
            BursaryList,
            EmpowermentGrant,
            GrantStatus,
            GrantType,
            GrantCreateRequest,
            GrantStatusUpdateRequest,
            GrantData,
            GrantList,
            Document,
            DocumentCreateRequest,
            DocumentPatchRequest,
            DocumentStatistics,
            DocumentStatisticsData,
            DocumentAuditAction,
            DocumentAuditEntry,
            AuditEntryList,
            DocumentVerification,
            VerificationData,
            DocumentData,
            DocumentList,
            User,
            UserUpsertRequest,
            UserData,
            UserList,
            Notification,
            NotificationKind,
            NotificationCategory,
            NewNotification,
            NotificationList,
            SendNotificationRequest,
            BroadcastRequest,
            BroadcastResult,
            BroadcastData,
            UnreadCount,
            UnreadCountData,
            UpdatedCount,
            UpdatedCountData,
            MockProject
        )
    ),
    tags(
        (name = "system", description = "Service metadata and health"),
        (name = "auth", description = "Session identity and logout"),
        (name = "access", description = "Route registry and guard decisions"),
        (name = "workflow", description = "Advisory status transition catalogues"),
        (name = "projects", description = "Constituency development projects"),
        (name = "payments", description = "Payment vouchers and two-panel approval"),
        (name = "bursaries", description = "Bursary applications"),
        (name = "empowerment", description = "Empowerment grant applications"),
        (name = "documents", description = "Hash-addressed evidence documents"),
        (name = "users", description = "User directory"),
        (name = "notifications", description = "In-app notifications"),
        (name = "mock", description = "Fixture data for front-end development")
    )
)]
pub struct ApiDoc;
