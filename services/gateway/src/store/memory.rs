//! In-memory implementation of the gateway store.
//!
//! # Purpose
//! Implements every store trait with `HashMap`s guarded by
//! `tokio::sync::RwLock`. Used for local development, tests, and deployments
//! that do not need durability.
//!
//! # Durability and consistency
//! - **Not durable**: all state is lost on process restart.
//! - Operations are consistent within one process. Checks that guard a write
//!   (document immutability, the two-panel rule) run under the same write lock
//!   as the write itself.
//!
//! # Audit and history logs
//! Document audit entries and status writes are appended to bounded logs
//! (`StoreConfig::audit_retention`). Once a log is full the oldest entries are
//! evicted.
use super::{
    BursaryStore, DocumentStore, GatewayStore, GrantStore, NotificationStore, Page, PageRequest,
    PaymentStore, ProjectStore, StoreConfig, StoreError, StoreResult, TokenStore, UserStore,
};
use crate::model::{
    BursaryApplication, BursaryFilter, BursaryStatus, ConstituencyStats, Document,
    DocumentAuditAction, DocumentAuditEntry, DocumentFilter, DocumentPatchRequest,
    DocumentStatistics, EmpowermentGrant, EntityKind, GrantFilter, GrantStatus, Notification,
    Panel, Payment, PaymentFilter, PaymentStatus, Project, ProjectFilter, ProjectPatchRequest,
    ProjectStatus, StatusChange, User,
};
use async_trait::async_trait;
use cdf_authz::RoleSet;
use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Bounded, append-only log with locally assigned sequence numbers.
///
/// `record()` assigns the next sequence number, appends the entry, and evicts
/// the oldest entries once `capacity` is exceeded.
#[derive(Debug)]
struct BoundedLog<T> {
    next_seq: u64,
    capacity: usize,
    items: VecDeque<T>,
}

impl<T: Clone> BoundedLog<T> {
    fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            next_seq: 1,
            capacity,
            items: VecDeque::with_capacity(capacity),
        }
    }

    fn record(&mut self, item: impl FnOnce(u64) -> T) -> T {
        let seq = self.next_seq;
        self.next_seq += 1;
        let entry = item(seq);
        self.items.push_back(entry.clone());
        while self.items.len() > self.capacity {
            self.items.pop_front();
        }
        entry
    }

    fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}

#[derive(Debug, Clone)]
struct BlacklistEntry {
    #[allow(dead_code)] // kept for parity with the durable table
    user_id: String,
    expires_at: DateTime<Utc>,
}

/// In-memory gateway store.
///
/// All maps and logs are wrapped in `Arc<RwLock<...>>` so reads proceed
/// concurrently while writes are serialized per structure.
pub struct InMemoryStore {
    projects: Arc<RwLock<HashMap<Uuid, Project>>>,
    payments: Arc<RwLock<HashMap<Uuid, Payment>>>,
    bursaries: Arc<RwLock<HashMap<Uuid, BursaryApplication>>>,
    grants: Arc<RwLock<HashMap<Uuid, EmpowermentGrant>>>,
    documents: Arc<RwLock<HashMap<Uuid, Document>>>,
    /// Audit trail for documents, kept after a document is deleted.
    document_audit: Arc<RwLock<BoundedLog<DocumentAuditEntry>>>,
    /// Every status write across all entity families.
    status_changes: Arc<RwLock<BoundedLog<StatusChange>>>,
    users: Arc<RwLock<HashMap<String, User>>>,
    notifications: Arc<RwLock<Vec<Notification>>>,
    /// Revoked tokens keyed by token hash.
    token_blacklist: Arc<RwLock<HashMap<String, BlacklistEntry>>>,
    sequences: Arc<RwLock<HashMap<String, u64>>>,
}

impl InMemoryStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            projects: Arc::new(RwLock::new(HashMap::new())),
            payments: Arc::new(RwLock::new(HashMap::new())),
            bursaries: Arc::new(RwLock::new(HashMap::new())),
            grants: Arc::new(RwLock::new(HashMap::new())),
            documents: Arc::new(RwLock::new(HashMap::new())),
            document_audit: Arc::new(RwLock::new(BoundedLog::new(config.audit_retention))),
            status_changes: Arc::new(RwLock::new(BoundedLog::new(config.audit_retention))),
            users: Arc::new(RwLock::new(HashMap::new())),
            notifications: Arc::new(RwLock::new(Vec::new())),
            token_blacklist: Arc::new(RwLock::new(HashMap::new())),
            sequences: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn record_status(
        &self,
        entity: EntityKind,
        entity_id: Uuid,
        from: &str,
        to: &str,
        actor: &str,
        comment: Option<String>,
        at: DateTime<Utc>,
    ) -> StatusChange {
        self.status_changes.write().await.record(|seq| StatusChange {
            seq,
            entity,
            entity_id,
            from_status: from.to_string(),
            to_status: to.to_string(),
            changed_by: actor.to_string(),
            comment,
            changed_at: at,
        })
    }

    async fn audit_document(
        &self,
        document_id: Uuid,
        action: DocumentAuditAction,
        actor: &str,
        details: Value,
    ) {
        self.document_audit
            .write()
            .await
            .record(|seq| DocumentAuditEntry {
                seq,
                document_id,
                action,
                actor: actor.to_string(),
                details,
                at: Utc::now(),
            });
    }
}

/// Filter, order newest first, and page a snapshot of a map.
fn select<T: Clone>(
    items: impl Iterator<Item = T>,
    keep: impl Fn(&T) -> bool,
    created_at: impl Fn(&T) -> DateTime<Utc>,
    page: PageRequest,
) -> Page<T> {
    let mut items: Vec<T> = items.filter(|item| keep(item)).collect();
    items.sort_by_key(|item| std::cmp::Reverse(created_at(item)));
    page.apply(items)
}

#[async_trait]
impl ProjectStore for InMemoryStore {
    async fn list_projects(
        &self,
        filter: &ProjectFilter,
        page: PageRequest,
    ) -> StoreResult<Page<Project>> {
        let projects = self.projects.read().await;
        Ok(select(
            projects.values().cloned(),
            |p| filter.matches(p),
            |p| p.created_at,
            page,
        ))
    }

    async fn get_project(&self, id: Uuid) -> StoreResult<Project> {
        self.projects
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("project".into()))
    }

    async fn project_exists(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.projects.read().await.contains_key(&id))
    }

    async fn create_project(&self, project: Project) -> StoreResult<Project> {
        let mut projects = self.projects.write().await;
        if projects.values().any(|p| p.project_number == project.project_number) {
            return Err(StoreError::Conflict("project number exists".into()));
        }
        projects.insert(project.id, project.clone());
        metrics::gauge!("cdf_projects_total").set(projects.len() as f64);
        Ok(project)
    }

    async fn update_project(&self, id: Uuid, patch: ProjectPatchRequest) -> StoreResult<Project> {
        let mut projects = self.projects.write().await;
        let project = projects
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound("project".into()))?;
        patch.apply(project);
        project.updated_at = Utc::now();
        Ok(project.clone())
    }

    async fn set_project_status(
        &self,
        id: Uuid,
        status: ProjectStatus,
        actor: &str,
        comment: Option<String>,
    ) -> StoreResult<(Project, StatusChange)> {
        let mut projects = self.projects.write().await;
        let project = projects
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound("project".into()))?;
        let from = project.status;
        let now = Utc::now();
        project.status = status;
        project.updated_at = now;
        let project = project.clone();
        drop(projects);
        let change = self
            .record_status(
                EntityKind::Project,
                id,
                from.as_str(),
                status.as_str(),
                actor,
                comment,
                now,
            )
            .await;
        Ok((project, change))
    }

    async fn constituency_stats(&self, constituency_id: &str) -> StoreResult<ConstituencyStats> {
        let projects = self.projects.read().await;
        Ok(ConstituencyStats::from_projects(
            constituency_id,
            projects
                .values()
                .filter(|p| p.constituency_id == constituency_id),
        ))
    }
}

#[async_trait]
impl PaymentStore for InMemoryStore {
    async fn list_payments(
        &self,
        filter: &PaymentFilter,
        page: PageRequest,
    ) -> StoreResult<Page<Payment>> {
        let payments = self.payments.read().await;
        Ok(select(
            payments.values().cloned(),
            |p| filter.matches(p),
            |p| p.created_at,
            page,
        ))
    }

    async fn get_payment(&self, id: Uuid) -> StoreResult<Payment> {
        self.payments
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("payment".into()))
    }

    async fn create_payment(&self, payment: Payment) -> StoreResult<Payment> {
        if !self.projects.read().await.contains_key(&payment.project_id) {
            return Err(StoreError::NotFound("project".into()));
        }
        let mut payments = self.payments.write().await;
        if payments.contains_key(&payment.id) {
            return Err(StoreError::Conflict("payment exists".into()));
        }
        payments.insert(payment.id, payment.clone());
        Ok(payment)
    }

    async fn set_payment_status(
        &self,
        id: Uuid,
        status: PaymentStatus,
        actor: &str,
        comment: Option<String>,
    ) -> StoreResult<(Payment, StatusChange)> {
        let mut payments = self.payments.write().await;
        let payment = payments
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound("payment".into()))?;
        let from = payment.status;
        let now = Utc::now();
        payment.set_status(status, now);
        let payment = payment.clone();
        drop(payments);
        let change = self
            .record_status(
                EntityKind::Payment,
                id,
                from.as_str(),
                status.as_str(),
                actor,
                comment,
                now,
            )
            .await;
        Ok((payment, change))
    }

    async fn approve_payment_panel(
        &self,
        id: Uuid,
        panel: Panel,
        approver: &str,
        comment: Option<String>,
    ) -> StoreResult<(Payment, StatusChange)> {
        let mut payments = self.payments.write().await;
        let payment = payments
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound("payment".into()))?;
        let from = payment.status;
        let now = Utc::now();
        if !payment.record_panel_approval(panel, approver, now) {
            return Err(StoreError::Forbidden(
                "same user cannot approve both Panel A and Panel B".into(),
            ));
        }
        let payment = payment.clone();
        drop(payments);
        let change = self
            .record_status(
                EntityKind::Payment,
                id,
                from.as_str(),
                payment.status.as_str(),
                approver,
                comment,
                now,
            )
            .await;
        Ok((payment, change))
    }
}

#[async_trait]
impl BursaryStore for InMemoryStore {
    async fn list_bursaries(
        &self,
        filter: &BursaryFilter,
        page: PageRequest,
    ) -> StoreResult<Page<BursaryApplication>> {
        let bursaries = self.bursaries.read().await;
        Ok(select(
            bursaries.values().cloned(),
            |b| filter.matches(b),
            |b| b.created_at,
            page,
        ))
    }

    async fn get_bursary(&self, id: Uuid) -> StoreResult<BursaryApplication> {
        self.bursaries
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("bursary application".into()))
    }

    async fn create_bursary(
        &self,
        application: BursaryApplication,
    ) -> StoreResult<BursaryApplication> {
        let mut bursaries = self.bursaries.write().await;
        if bursaries.contains_key(&application.id) {
            return Err(StoreError::Conflict("bursary application exists".into()));
        }
        bursaries.insert(application.id, application.clone());
        Ok(application)
    }

    async fn set_bursary_status(
        &self,
        id: Uuid,
        status: BursaryStatus,
        actor: &str,
        comment: Option<String>,
    ) -> StoreResult<(BursaryApplication, StatusChange)> {
        let mut bursaries = self.bursaries.write().await;
        let application = bursaries
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound("bursary application".into()))?;
        let from = application.status;
        let now = Utc::now();
        application.status = status;
        application.updated_at = now;
        let application = application.clone();
        drop(bursaries);
        let change = self
            .record_status(
                EntityKind::Bursary,
                id,
                from.as_str(),
                status.as_str(),
                actor,
                comment,
                now,
            )
            .await;
        Ok((application, change))
    }
}

#[async_trait]
impl GrantStore for InMemoryStore {
    async fn list_grants(
        &self,
        filter: &GrantFilter,
        page: PageRequest,
    ) -> StoreResult<Page<EmpowermentGrant>> {
        let grants = self.grants.read().await;
        Ok(select(
            grants.values().cloned(),
            |g| filter.matches(g),
            |g| g.created_at,
            page,
        ))
    }

    async fn get_grant(&self, id: Uuid) -> StoreResult<EmpowermentGrant> {
        self.grants
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("empowerment grant".into()))
    }

    async fn create_grant(&self, grant: EmpowermentGrant) -> StoreResult<EmpowermentGrant> {
        let mut grants = self.grants.write().await;
        if grants.contains_key(&grant.id) {
            return Err(StoreError::Conflict("empowerment grant exists".into()));
        }
        grants.insert(grant.id, grant.clone());
        Ok(grant)
    }

    async fn set_grant_status(
        &self,
        id: Uuid,
        status: GrantStatus,
        actor: &str,
        comment: Option<String>,
    ) -> StoreResult<(EmpowermentGrant, StatusChange)> {
        let mut grants = self.grants.write().await;
        let grant = grants
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound("empowerment grant".into()))?;
        let from = grant.status;
        let now = Utc::now();
        grant.status = status;
        grant.updated_at = now;
        let grant = grant.clone();
        drop(grants);
        let change = self
            .record_status(
                EntityKind::Grant,
                id,
                from.as_str(),
                status.as_str(),
                actor,
                comment,
                now,
            )
            .await;
        Ok((grant, change))
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn list_documents(
        &self,
        filter: &DocumentFilter,
        page: PageRequest,
    ) -> StoreResult<Page<Document>> {
        let documents = self.documents.read().await;
        Ok(select(
            documents.values().cloned(),
            |d| filter.matches(d),
            |d| d.created_at,
            page,
        ))
    }

    async fn get_document(&self, id: Uuid) -> StoreResult<Document> {
        self.documents
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("document".into()))
    }

    async fn find_document_by_hash(&self, file_hash: &str) -> StoreResult<Option<Document>> {
        Ok(self
            .documents
            .read()
            .await
            .values()
            .find(|d| d.file_hash == file_hash)
            .cloned())
    }

    async fn create_document(&self, document: Document) -> StoreResult<Document> {
        let mut documents = self.documents.write().await;
        if documents.values().any(|d| d.file_hash == document.file_hash) {
            return Err(StoreError::Conflict(
                "document with this hash already exists".into(),
            ));
        }
        documents.insert(document.id, document.clone());
        drop(documents);
        self.audit_document(
            document.id,
            DocumentAuditAction::Created,
            &document.uploader_id,
            json!({ "file_name": document.file_name, "file_hash": document.file_hash }),
        )
        .await;
        Ok(document)
    }

    async fn update_document(
        &self,
        id: Uuid,
        patch: DocumentPatchRequest,
        actor: &str,
    ) -> StoreResult<Document> {
        let mut documents = self.documents.write().await;
        let document = documents
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound("document".into()))?;
        if document.is_immutable {
            return Err(StoreError::Forbidden(
                "Cannot modify an immutable document".into(),
            ));
        }
        let details = serde_json::to_value(&patch).unwrap_or(Value::Null);
        patch.apply(document);
        document.updated_at = Utc::now();
        let document = document.clone();
        drop(documents);
        self.audit_document(id, DocumentAuditAction::Updated, actor, details)
            .await;
        Ok(document)
    }

    async fn delete_document(&self, id: Uuid, actor: &str) -> StoreResult<()> {
        let mut documents = self.documents.write().await;
        let document = documents
            .get(&id)
            .ok_or_else(|| StoreError::NotFound("document".into()))?;
        if document.is_immutable {
            return Err(StoreError::Forbidden(
                "Cannot delete an immutable document".into(),
            ));
        }
        if let Some(removed) = documents.remove(&id) {
            drop(documents);
            self.audit_document(
                id,
                DocumentAuditAction::Deleted,
                actor,
                json!({ "file_name": removed.file_name }),
            )
            .await;
        }
        Ok(())
    }

    async fn make_document_immutable(&self, id: Uuid, actor: &str) -> StoreResult<Document> {
        let mut documents = self.documents.write().await;
        let document = documents
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound("document".into()))?;
        if !document.seal(actor, Utc::now()) {
            return Err(StoreError::Conflict("document is already immutable".into()));
        }
        let document = document.clone();
        drop(documents);
        self.audit_document(
            id,
            DocumentAuditAction::MadeImmutable,
            actor,
            json!({ "file_hash": document.file_hash }),
        )
        .await;
        Ok(document)
    }

    async fn document_statistics(
        &self,
        constituency_id: Option<&str>,
    ) -> StoreResult<DocumentStatistics> {
        let documents = self.documents.read().await;
        Ok(DocumentStatistics::from_documents(documents.values().filter(
            |d| constituency_id.is_none_or(|id| d.constituency_id == id),
        )))
    }

    async fn document_audit_log(&self, id: Uuid) -> StoreResult<Vec<DocumentAuditEntry>> {
        let entries: Vec<_> = self
            .document_audit
            .read()
            .await
            .iter()
            .filter(|entry| entry.document_id == id)
            .cloned()
            .collect();
        if entries.is_empty() && !self.documents.read().await.contains_key(&id) {
            return Err(StoreError::NotFound("document".into()));
        }
        Ok(entries)
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let mut users: Vec<_> = self.users.read().await.values().cloned().collect();
        users.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(users)
    }

    async fn get_user(&self, id: &str) -> StoreResult<User> {
        self.users
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("user".into()))
    }

    async fn upsert_user(&self, mut user: User) -> StoreResult<User> {
        let mut users = self.users.write().await;
        if let Some(existing) = users.get(&user.id) {
            user.created_at = existing.created_at;
        }
        users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn users_with_any_role(&self, roles: &RoleSet) -> StoreResult<Vec<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .filter(|user| user.holds_any(roles))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl NotificationStore for InMemoryStore {
    async fn list_notifications(
        &self,
        user_id: &str,
        limit: u32,
    ) -> StoreResult<Vec<Notification>> {
        let notifications = self.notifications.read().await;
        let mut own: Vec<_> = notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        own.sort_by_key(|n| std::cmp::Reverse(n.created_at));
        own.truncate(limit as usize);
        Ok(own)
    }

    async fn unread_notification_count(&self, user_id: &str) -> StoreResult<u64> {
        Ok(self
            .notifications
            .read()
            .await
            .iter()
            .filter(|n| n.user_id == user_id && !n.is_read)
            .count() as u64)
    }

    async fn insert_notifications(&self, notifications: Vec<Notification>) -> StoreResult<usize> {
        let count = notifications.len();
        self.notifications.write().await.extend(notifications);
        metrics::counter!("cdf_notifications_created_total").increment(count as u64);
        Ok(count)
    }

    async fn mark_notification_read(&self, user_id: &str, id: Uuid) -> StoreResult<()> {
        let mut notifications = self.notifications.write().await;
        let notification = notifications
            .iter_mut()
            .find(|n| n.id == id && n.user_id == user_id)
            .ok_or_else(|| StoreError::NotFound("notification".into()))?;
        notification.is_read = true;
        Ok(())
    }

    async fn mark_all_notifications_read(&self, user_id: &str) -> StoreResult<u64> {
        let mut updated = 0;
        for notification in self
            .notifications
            .write()
            .await
            .iter_mut()
            .filter(|n| n.user_id == user_id && !n.is_read)
        {
            notification.is_read = true;
            updated += 1;
        }
        Ok(updated)
    }
}

#[async_trait]
impl TokenStore for InMemoryStore {
    async fn blacklist_token(
        &self,
        token_hash: &str,
        user_id: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.token_blacklist.write().await.insert(
            token_hash.to_string(),
            BlacklistEntry {
                user_id: user_id.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn blacklisted_until(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<DateTime<Utc>>> {
        Ok(self
            .token_blacklist
            .read()
            .await
            .get(token_hash)
            .map(|entry| entry.expires_at)
            .filter(|expires_at| *expires_at > now))
    }

    async fn delete_expired_tokens(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let mut blacklist = self.token_blacklist.write().await;
        let before = blacklist.len();
        blacklist.retain(|_, entry| entry.expires_at > now);
        Ok((before - blacklist.len()) as u64)
    }
}

#[async_trait]
impl GatewayStore for InMemoryStore {
    async fn next_sequence(&self, scope: &str) -> StoreResult<u64> {
        let mut sequences = self.sequences.write().await;
        let value = sequences.entry(scope.to_string()).or_insert(0);
        *value += 1;
        Ok(*value)
    }

    async fn status_history(
        &self,
        entity: EntityKind,
        id: Uuid,
    ) -> StoreResult<Vec<StatusChange>> {
        Ok(self
            .status_changes
            .read()
            .await
            .iter()
            .filter(|change| change.entity == entity && change.entity_id == id)
            .cloned()
            .collect())
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    fn is_durable(&self) -> bool {
        false
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
