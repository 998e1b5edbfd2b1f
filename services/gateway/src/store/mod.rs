//! Gateway storage traits and shared types.
//!
//! # Purpose
//! Declares one async trait per record family plus the [`GatewayStore`]
//! supertrait handlers depend on. Backends live in [`memory`] and
//! [`postgres`].
//!
//! # Key invariants
//! - Status writes never check the current status; they record a
//!   [`StatusChange`] and return it alongside the updated record.
//! - Immutable documents refuse update and delete with
//!   [`StoreError::Forbidden`].
//! - A payment's two panels must be signed by different users; the check and
//!   the write happen under one lock or transaction.
use crate::model::{
    BursaryApplication, BursaryFilter, BursaryStatus, ConstituencyStats, Document,
    DocumentAuditEntry, DocumentFilter, DocumentPatchRequest, DocumentStatistics,
    EmpowermentGrant, EntityKind, GrantFilter, GrantStatus, Notification, Panel, Payment,
    PaymentFilter, PaymentStatus, Project, ProjectFilter, ProjectPatchRequest, ProjectStatus,
    StatusChange, User,
};
use async_trait::async_trait;
use cdf_authz::RoleSet;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

pub mod memory;
pub mod postgres;

#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Entries kept per in-memory audit or history log.
    pub audit_retention: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            audit_retention: 1000,
        }
    }
}

/// Page window for list queries. `page` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub const MAX_LIMIT: u32 = 100;

    /// Clamp caller input: page at least 1, limit within `1..=MAX_LIMIT`.
    pub fn new(page: Option<u32>, limit: Option<u32>, default_limit: u32) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit
                .unwrap_or(default_limit)
                .clamp(1, Self::MAX_LIMIT),
        }
    }

    pub fn offset(&self) -> usize {
        (self.page as usize - 1) * self.limit as usize
    }

    /// Slice an already ordered result set.
    pub fn apply<T>(&self, items: Vec<T>) -> Page<T> {
        let total = items.len() as u64;
        let items = items
            .into_iter()
            .skip(self.offset())
            .take(self.limit as usize)
            .collect();
        Page { items, total }
    }
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Unexpected(err.into())
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StoreError::Unexpected(err.into())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn list_projects(
        &self,
        filter: &ProjectFilter,
        page: PageRequest,
    ) -> StoreResult<Page<Project>>;
    async fn get_project(&self, id: Uuid) -> StoreResult<Project>;
    async fn project_exists(&self, id: Uuid) -> StoreResult<bool>;
    async fn create_project(&self, project: Project) -> StoreResult<Project>;
    async fn update_project(&self, id: Uuid, patch: ProjectPatchRequest) -> StoreResult<Project>;
    async fn set_project_status(
        &self,
        id: Uuid,
        status: ProjectStatus,
        actor: &str,
        comment: Option<String>,
    ) -> StoreResult<(Project, StatusChange)>;
    async fn constituency_stats(&self, constituency_id: &str) -> StoreResult<ConstituencyStats>;
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn list_payments(
        &self,
        filter: &PaymentFilter,
        page: PageRequest,
    ) -> StoreResult<Page<Payment>>;
    async fn get_payment(&self, id: Uuid) -> StoreResult<Payment>;
    async fn create_payment(&self, payment: Payment) -> StoreResult<Payment>;
    async fn set_payment_status(
        &self,
        id: Uuid,
        status: PaymentStatus,
        actor: &str,
        comment: Option<String>,
    ) -> StoreResult<(Payment, StatusChange)>;
    /// Record a panel sign-off. Fails with [`StoreError::Forbidden`] when
    /// `approver` already signed the other panel.
    async fn approve_payment_panel(
        &self,
        id: Uuid,
        panel: Panel,
        approver: &str,
        comment: Option<String>,
    ) -> StoreResult<(Payment, StatusChange)>;
}

#[async_trait]
pub trait BursaryStore: Send + Sync {
    async fn list_bursaries(
        &self,
        filter: &BursaryFilter,
        page: PageRequest,
    ) -> StoreResult<Page<BursaryApplication>>;
    async fn get_bursary(&self, id: Uuid) -> StoreResult<BursaryApplication>;
    async fn create_bursary(&self, application: BursaryApplication)
    -> StoreResult<BursaryApplication>;
    async fn set_bursary_status(
        &self,
        id: Uuid,
        status: BursaryStatus,
        actor: &str,
        comment: Option<String>,
    ) -> StoreResult<(BursaryApplication, StatusChange)>;
}

#[async_trait]
pub trait GrantStore: Send + Sync {
    async fn list_grants(
        &self,
        filter: &GrantFilter,
        page: PageRequest,
    ) -> StoreResult<Page<EmpowermentGrant>>;
    async fn get_grant(&self, id: Uuid) -> StoreResult<EmpowermentGrant>;
    async fn create_grant(&self, grant: EmpowermentGrant) -> StoreResult<EmpowermentGrant>;
    async fn set_grant_status(
        &self,
        id: Uuid,
        status: GrantStatus,
        actor: &str,
        comment: Option<String>,
    ) -> StoreResult<(EmpowermentGrant, StatusChange)>;
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn list_documents(
        &self,
        filter: &DocumentFilter,
        page: PageRequest,
    ) -> StoreResult<Page<Document>>;
    async fn get_document(&self, id: Uuid) -> StoreResult<Document>;
    async fn find_document_by_hash(&self, file_hash: &str) -> StoreResult<Option<Document>>;
    /// Insert a document. A second document with the same `file_hash` is a
    /// [`StoreError::Conflict`].
    async fn create_document(&self, document: Document) -> StoreResult<Document>;
    async fn update_document(
        &self,
        id: Uuid,
        patch: DocumentPatchRequest,
        actor: &str,
    ) -> StoreResult<Document>;
    async fn delete_document(&self, id: Uuid, actor: &str) -> StoreResult<()>;
    /// Seal a document. Sealing an already sealed document is a
    /// [`StoreError::Conflict`].
    async fn make_document_immutable(&self, id: Uuid, actor: &str) -> StoreResult<Document>;
    async fn document_statistics(
        &self,
        constituency_id: Option<&str>,
    ) -> StoreResult<DocumentStatistics>;
    async fn document_audit_log(&self, id: Uuid) -> StoreResult<Vec<DocumentAuditEntry>>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn list_users(&self) -> StoreResult<Vec<User>>;
    async fn get_user(&self, id: &str) -> StoreResult<User>;
    async fn upsert_user(&self, user: User) -> StoreResult<User>;
    /// Users holding at least one of `roles`.
    async fn users_with_any_role(&self, roles: &RoleSet) -> StoreResult<Vec<User>>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Newest first, at most `limit` entries.
    async fn list_notifications(&self, user_id: &str, limit: u32)
    -> StoreResult<Vec<Notification>>;
    async fn unread_notification_count(&self, user_id: &str) -> StoreResult<u64>;
    async fn insert_notifications(&self, notifications: Vec<Notification>) -> StoreResult<usize>;
    /// Fails with [`StoreError::NotFound`] unless `id` belongs to `user_id`.
    async fn mark_notification_read(&self, user_id: &str, id: Uuid) -> StoreResult<()>;
    async fn mark_all_notifications_read(&self, user_id: &str) -> StoreResult<u64>;
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn blacklist_token(
        &self,
        token_hash: &str,
        user_id: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()>;
    /// Expiry of a live blacklist entry for `token_hash`, if any.
    async fn blacklisted_until(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<DateTime<Utc>>>;
    async fn delete_expired_tokens(&self, now: DateTime<Utc>) -> StoreResult<u64>;
}

#[async_trait]
pub trait GatewayStore:
    ProjectStore
    + PaymentStore
    + BursaryStore
    + GrantStore
    + DocumentStore
    + UserStore
    + NotificationStore
    + TokenStore
    + Send
    + Sync
{
    /// Next value of a named counter, starting at 1.
    async fn next_sequence(&self, scope: &str) -> StoreResult<u64>;
    /// Recorded status writes for one entity, oldest first.
    async fn status_history(&self, entity: EntityKind, id: Uuid)
    -> StoreResult<Vec<StatusChange>>;
    async fn health_check(&self) -> StoreResult<()>;
    fn is_durable(&self) -> bool;
    fn backend_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_request_clamps_inputs() {
        let page = PageRequest::new(None, None, 20);
        assert_eq!(page, PageRequest { page: 1, limit: 20 });
        let page = PageRequest::new(Some(0), Some(1000), 20);
        assert_eq!(page, PageRequest { page: 1, limit: 100 });
        let page = PageRequest::new(Some(3), Some(0), 20);
        assert_eq!(page.limit, 1);
        assert_eq!(page.offset(), 2);
    }

    #[test]
    fn page_request_slices_and_counts() {
        let page = PageRequest::new(Some(2), Some(2), 20).apply((0..5).collect::<Vec<_>>());
        assert_eq!(page.items, vec![2, 3]);
        assert_eq!(page.total, 5);
        let past_end = PageRequest::new(Some(9), Some(2), 20).apply(vec![1, 2]);
        assert!(past_end.items.is_empty());
        assert_eq!(past_end.total, 2);
    }

    #[test]
    fn store_error_display_is_prefixed() {
        assert_eq!(
            StoreError::Forbidden("immutable".into()).to_string(),
            "forbidden: immutable"
        );
        assert_eq!(StoreError::NotFound("project".into()).to_string(), "not found: project");
    }
}
