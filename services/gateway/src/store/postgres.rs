//! Postgres-backed implementation of the gateway store.
//!
//! # Purpose
//! Implements every store trait on top of `sqlx` and a `PgPool`. This is the
//! durable backend for deployments; the schema lives in `migrations/` and is
//! applied at connect time.
//!
//! # Key invariants
//! - Row structs (`Db*`) stay separate from domain types; enum columns are
//!   stored as their wire tags and parsed on the way out.
//! - Status writes update the record and append to `status_changes` in one
//!   transaction.
//! - Guarded writes (document immutability, the two-panel rule) lock the row
//!   with `SELECT ... FOR UPDATE`, evaluate the rule in Rust, then write in
//!   the same transaction.
//!
//! # Security notes
//! - Database URLs may contain credentials; never log them.
//! - All SQL is static; filters use `($n::text IS NULL OR col = $n)` binds.
use super::{
    BursaryStore, DocumentStore, GatewayStore, GrantStore, NotificationStore, Page, PageRequest,
    PaymentStore, ProjectStore, StoreConfig, StoreError, StoreResult, TokenStore, UserStore,
};
use crate::config::PostgresConfig;
use crate::model::{
    BursaryApplication, BursaryFilter, BursaryStatus, ConstituencyStats, Document,
    DocumentAuditAction, DocumentAuditEntry, DocumentFilter, DocumentPatchRequest,
    DocumentStatistics, EmpowermentGrant, EntityKind, GrantFilter, GrantStatus, Notification,
    Panel, Payment, PaymentFilter, PaymentStatus, Project, ProjectFilter, ProjectPatchRequest,
    ProjectStatus, StatusChange, UnknownVariant, User,
};
use anyhow::anyhow;
use async_trait::async_trait;
use cdf_authz::RoleSet;
use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

macro_rules! project_columns {
    () => {
        "id, project_number, name, description, sector, constituency_id, ward_id, budget, spent, \
         beneficiaries, progress, status, submitted_by, created_at, updated_at"
    };
}

macro_rules! payment_columns {
    () => {
        "id, payment_number, project_id, milestone_id, amount, payment_type, recipient_name, \
         recipient_account, recipient_bank, description, supporting_documents, status, created_by, \
         panel_a_approved_by, panel_a_approved_at, panel_b_approved_by, panel_b_approved_at, \
         disbursed_at, created_at, updated_at"
    };
}

macro_rules! bursary_columns {
    () => {
        "id, application_number, student_name, institution_name, institution_type, tuition_fees, \
         academic_year, constituency_id, ward_id, status, submitted_by, created_at, updated_at"
    };
}

macro_rules! grant_columns {
    () => {
        "id, application_number, applicant_name, grant_type, purpose, requested_amount, \
         constituency_id, ward_id, status, submitted_by, created_at, updated_at"
    };
}

macro_rules! document_columns {
    () => {
        "id, project_id, uploader_id, file_url, file_name, file_size, mime_type, file_hash, \
         document_type, description, is_immutable, immutable_at, immutable_by, constituency_id, \
         ward_id, metadata, created_at, updated_at"
    };
}

macro_rules! notification_columns {
    () => {
        "id, user_id, title, message, kind, category, action_url, metadata, is_read, created_at"
    };
}

/// Durable gateway store backed by Postgres.
///
/// # Example
/// ```rust,no_run
/// use gateway::config::PostgresConfig;
/// use gateway::store::{StoreConfig, postgres::PostgresStore};
///
/// async fn open(pg: PostgresConfig) {
///     let _ = PostgresStore::connect(&pg, StoreConfig::default()).await;
/// }
/// ```
pub struct PostgresStore {
    pool: PgPool,
    #[allow(dead_code)]
    config: StoreConfig,
}

#[derive(Debug, Clone, FromRow)]
struct DbProject {
    id: Uuid,
    project_number: String,
    name: String,
    description: Option<String>,
    sector: String,
    constituency_id: String,
    ward_id: Option<String>,
    budget: f64,
    spent: f64,
    beneficiaries: Option<i64>,
    progress: i32,
    status: String,
    submitted_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
struct DbPayment {
    id: Uuid,
    payment_number: String,
    project_id: Uuid,
    milestone_id: Option<Uuid>,
    amount: f64,
    payment_type: String,
    recipient_name: String,
    recipient_account: String,
    recipient_bank: String,
    description: String,
    supporting_documents: Value,
    status: String,
    created_by: String,
    panel_a_approved_by: Option<String>,
    panel_a_approved_at: Option<DateTime<Utc>>,
    panel_b_approved_by: Option<String>,
    panel_b_approved_at: Option<DateTime<Utc>>,
    disbursed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
struct DbBursary {
    id: Uuid,
    application_number: String,
    student_name: String,
    institution_name: String,
    institution_type: String,
    tuition_fees: f64,
    academic_year: i32,
    constituency_id: String,
    ward_id: Option<String>,
    status: String,
    submitted_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
struct DbGrant {
    id: Uuid,
    application_number: String,
    applicant_name: String,
    grant_type: String,
    purpose: String,
    requested_amount: f64,
    constituency_id: String,
    ward_id: Option<String>,
    status: String,
    submitted_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
struct DbDocument {
    id: Uuid,
    project_id: Option<Uuid>,
    uploader_id: String,
    file_url: String,
    file_name: String,
    file_size: Option<i64>,
    mime_type: Option<String>,
    file_hash: String,
    document_type: String,
    description: Option<String>,
    is_immutable: bool,
    immutable_at: Option<DateTime<Utc>>,
    immutable_by: Option<String>,
    constituency_id: String,
    ward_id: Option<String>,
    metadata: Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
struct DbAuditEntry {
    seq: i64,
    document_id: Uuid,
    action: String,
    actor: String,
    details: Value,
    at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
struct DbStatusChange {
    seq: i64,
    entity: String,
    entity_id: Uuid,
    from_status: String,
    to_status: String,
    changed_by: String,
    comment: Option<String>,
    changed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
struct DbUser {
    id: String,
    email: String,
    roles: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
struct DbNotification {
    id: Uuid,
    user_id: String,
    title: String,
    message: String,
    kind: String,
    category: String,
    action_url: Option<String>,
    metadata: Option<Value>,
    is_read: bool,
    created_at: DateTime<Utc>,
}

impl PostgresStore {
    /// Connect to Postgres and apply embedded migrations.
    ///
    /// # Errors
    /// - Invalid URL, connection timeout, pool setup, or migration failures.
    ///
    /// # Security notes
    /// - Avoid logging `pg.url` as it may contain credentials.
    pub async fn connect(pg: &PostgresConfig, config: StoreConfig) -> StoreResult<Self> {
        let connect_options = PgConnectOptions::from_str(&pg.url)?;
        let connecting = PgPoolOptions::new()
            .max_connections(pg.max_connections)
            .acquire_timeout(Duration::from_millis(pg.acquire_timeout_ms))
            .connect_with(connect_options);
        let pool = tokio::time::timeout(Duration::from_millis(pg.connect_timeout_ms), connecting)
            .await
            .map_err(|_| StoreError::Unexpected(anyhow!("timed out connecting to postgres")))??;

        // Handlers assume the schema exists, so a failed migration fails startup.
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool, config })
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        return db_err.code().map(|code| code == "23505").unwrap_or(false);
    }
    false
}

fn parse_tag<T>(value: &str) -> StoreResult<T>
where
    T: FromStr<Err = UnknownVariant>,
{
    value
        .parse()
        .map_err(|err: UnknownVariant| StoreError::Unexpected(err.into()))
}

fn to_u64(value: i64) -> u64 {
    value.max(0) as u64
}

fn project_from_db(row: DbProject) -> StoreResult<Project> {
    Ok(Project {
        id: row.id,
        project_number: row.project_number,
        name: row.name,
        description: row.description,
        sector: parse_tag(&row.sector)?,
        constituency_id: row.constituency_id,
        ward_id: row.ward_id,
        budget: row.budget,
        spent: row.spent,
        beneficiaries: row.beneficiaries,
        progress: row.progress,
        status: parse_tag(&row.status)?,
        submitted_by: row.submitted_by,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn payment_from_db(row: DbPayment) -> StoreResult<Payment> {
    let supporting_documents = serde_json::from_value(row.supporting_documents).map_err(|err| {
        StoreError::Unexpected(anyhow!("invalid supporting_documents json: {err}"))
    })?;
    Ok(Payment {
        id: row.id,
        payment_number: row.payment_number,
        project_id: row.project_id,
        milestone_id: row.milestone_id,
        amount: row.amount,
        payment_type: parse_tag(&row.payment_type)?,
        recipient_name: row.recipient_name,
        recipient_account: row.recipient_account,
        recipient_bank: row.recipient_bank,
        description: row.description,
        supporting_documents,
        status: parse_tag(&row.status)?,
        created_by: row.created_by,
        panel_a_approved_by: row.panel_a_approved_by,
        panel_a_approved_at: row.panel_a_approved_at,
        panel_b_approved_by: row.panel_b_approved_by,
        panel_b_approved_at: row.panel_b_approved_at,
        disbursed_at: row.disbursed_at,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn bursary_from_db(row: DbBursary) -> StoreResult<BursaryApplication> {
    Ok(BursaryApplication {
        id: row.id,
        application_number: row.application_number,
        student_name: row.student_name,
        institution_name: row.institution_name,
        institution_type: parse_tag(&row.institution_type)?,
        tuition_fees: row.tuition_fees,
        academic_year: row.academic_year,
        constituency_id: row.constituency_id,
        ward_id: row.ward_id,
        status: parse_tag(&row.status)?,
        submitted_by: row.submitted_by,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn grant_from_db(row: DbGrant) -> StoreResult<EmpowermentGrant> {
    Ok(EmpowermentGrant {
        id: row.id,
        application_number: row.application_number,
        applicant_name: row.applicant_name,
        grant_type: parse_tag(&row.grant_type)?,
        purpose: row.purpose,
        requested_amount: row.requested_amount,
        constituency_id: row.constituency_id,
        ward_id: row.ward_id,
        status: parse_tag(&row.status)?,
        submitted_by: row.submitted_by,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn document_from_db(row: DbDocument) -> Document {
    Document {
        id: row.id,
        project_id: row.project_id,
        uploader_id: row.uploader_id,
        file_url: row.file_url,
        file_name: row.file_name,
        file_size: row.file_size,
        mime_type: row.mime_type,
        file_hash: row.file_hash,
        document_type: row.document_type,
        description: row.description,
        is_immutable: row.is_immutable,
        immutable_at: row.immutable_at,
        immutable_by: row.immutable_by,
        constituency_id: row.constituency_id,
        ward_id: row.ward_id,
        metadata: row.metadata,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

fn audit_from_db(row: DbAuditEntry) -> StoreResult<DocumentAuditEntry> {
    Ok(DocumentAuditEntry {
        seq: to_u64(row.seq),
        document_id: row.document_id,
        action: parse_tag(&row.action)?,
        actor: row.actor,
        details: row.details,
        at: row.at,
    })
}

fn status_change_from_db(row: DbStatusChange) -> StoreResult<StatusChange> {
    Ok(StatusChange {
        seq: to_u64(row.seq),
        entity: parse_tag(&row.entity)?,
        entity_id: row.entity_id,
        from_status: row.from_status,
        to_status: row.to_status,
        changed_by: row.changed_by,
        comment: row.comment,
        changed_at: row.changed_at,
    })
}

fn user_from_db(row: DbUser) -> User {
    User {
        id: row.id,
        email: row.email,
        roles: RoleSet::from_tags(&row.roles).iter().collect(),
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

fn notification_from_db(row: DbNotification) -> StoreResult<Notification> {
    Ok(Notification {
        id: row.id,
        user_id: row.user_id,
        title: row.title,
        message: row.message,
        kind: parse_tag(&row.kind)?,
        category: parse_tag(&row.category)?,
        action_url: row.action_url,
        metadata: row.metadata,
        is_read: row.is_read,
        created_at: row.created_at,
    })
}

#[allow(clippy::too_many_arguments)]
async fn insert_status_change(
    tx: &mut Transaction<'_, Postgres>,
    entity: EntityKind,
    entity_id: Uuid,
    from: &str,
    to: &str,
    actor: &str,
    comment: Option<String>,
    at: DateTime<Utc>,
) -> StoreResult<StatusChange> {
    let seq: i64 = sqlx::query_scalar(
        r#"INSERT INTO status_changes (entity, entity_id, from_status, to_status, changed_by, comment, changed_at)
           VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING seq"#,
    )
    .bind(entity.as_str())
    .bind(entity_id)
    .bind(from)
    .bind(to)
    .bind(actor)
    .bind(&comment)
    .bind(at)
    .fetch_one(&mut **tx)
    .await?;
    Ok(StatusChange {
        seq: to_u64(seq),
        entity,
        entity_id,
        from_status: from.to_string(),
        to_status: to.to_string(),
        changed_by: actor.to_string(),
        comment,
        changed_at: at,
    })
}

async fn insert_audit(
    tx: &mut Transaction<'_, Postgres>,
    document_id: Uuid,
    action: DocumentAuditAction,
    actor: &str,
    details: Value,
) -> StoreResult<()> {
    sqlx::query(
        r#"INSERT INTO document_audit_log (document_id, action, actor, details, at)
           VALUES ($1, $2, $3, $4, $5)"#,
    )
    .bind(document_id)
    .bind(action.as_str())
    .bind(actor)
    .bind(details)
    .bind(Utc::now())
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn lock_status(
    tx: &mut Transaction<'_, Postgres>,
    query: &'static str,
    id: Uuid,
    what: &str,
) -> StoreResult<String> {
    sqlx::query_scalar::<_, String>(query)
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| StoreError::NotFound(what.to_string()))
}

#[async_trait]
impl ProjectStore for PostgresStore {
    async fn list_projects(
        &self,
        filter: &ProjectFilter,
        page: PageRequest,
    ) -> StoreResult<Page<Project>> {
        let status = filter.status.map(|s| s.as_str());
        let sector = filter.sector.map(|s| s.as_str());
        let total: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM projects
               WHERE ($1::text IS NULL OR status = $1)
                 AND ($2::text IS NULL OR constituency_id = $2)
                 AND ($3::text IS NULL OR ward_id = $3)
                 AND ($4::text IS NULL OR sector = $4)"#,
        )
        .bind(status)
        .bind(filter.constituency_id.as_deref())
        .bind(filter.ward_id.as_deref())
        .bind(sector)
        .fetch_one(&self.pool)
        .await?;
        let rows = sqlx::query_as::<_, DbProject>(concat!(
            "SELECT ",
            project_columns!(),
            " FROM projects
               WHERE ($1::text IS NULL OR status = $1)
                 AND ($2::text IS NULL OR constituency_id = $2)
                 AND ($3::text IS NULL OR ward_id = $3)
                 AND ($4::text IS NULL OR sector = $4)
               ORDER BY created_at DESC LIMIT $5 OFFSET $6"
        ))
        .bind(status)
        .bind(filter.constituency_id.as_deref())
        .bind(filter.ward_id.as_deref())
        .bind(sector)
        .bind(page.limit as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(Page {
            items: rows
                .into_iter()
                .map(project_from_db)
                .collect::<StoreResult<_>>()?,
            total: to_u64(total),
        })
    }

    async fn get_project(&self, id: Uuid) -> StoreResult<Project> {
        let row = sqlx::query_as::<_, DbProject>(concat!(
            "SELECT ",
            project_columns!(),
            " FROM projects WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound("project".into()))?;
        project_from_db(row)
    }

    async fn project_exists(&self, id: Uuid) -> StoreResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM projects WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn create_project(&self, project: Project) -> StoreResult<Project> {
        let insert = sqlx::query(
            r#"INSERT INTO projects (id, project_number, name, description, sector, constituency_id,
                   ward_id, budget, spent, beneficiaries, progress, status, submitted_by, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)"#,
        )
        .bind(project.id)
        .bind(&project.project_number)
        .bind(&project.name)
        .bind(&project.description)
        .bind(project.sector.as_str())
        .bind(&project.constituency_id)
        .bind(&project.ward_id)
        .bind(project.budget)
        .bind(project.spent)
        .bind(project.beneficiaries)
        .bind(project.progress)
        .bind(project.status.as_str())
        .bind(&project.submitted_by)
        .bind(project.created_at)
        .bind(project.updated_at)
        .execute(&self.pool)
        .await;
        if let Err(err) = insert {
            if is_unique_violation(&err) {
                return Err(StoreError::Conflict("project number exists".into()));
            }
            return Err(err.into());
        }
        Ok(project)
    }

    async fn update_project(&self, id: Uuid, patch: ProjectPatchRequest) -> StoreResult<Project> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, DbProject>(concat!(
            "SELECT ",
            project_columns!(),
            " FROM projects WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::NotFound("project".into()))?;
        let mut project = project_from_db(row)?;
        patch.apply(&mut project);
        project.updated_at = Utc::now();
        sqlx::query(
            r#"UPDATE projects SET name = $2, description = $3, sector = $4, ward_id = $5, budget = $6,
                   spent = $7, beneficiaries = $8, progress = $9, updated_at = $10
               WHERE id = $1"#,
        )
        .bind(id)
        .bind(&project.name)
        .bind(&project.description)
        .bind(project.sector.as_str())
        .bind(&project.ward_id)
        .bind(project.budget)
        .bind(project.spent)
        .bind(project.beneficiaries)
        .bind(project.progress)
        .bind(project.updated_at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(project)
    }

    async fn set_project_status(
        &self,
        id: Uuid,
        status: ProjectStatus,
        actor: &str,
        comment: Option<String>,
    ) -> StoreResult<(Project, StatusChange)> {
        let mut tx = self.pool.begin().await?;
        let from = lock_status(
            &mut tx,
            "SELECT status FROM projects WHERE id = $1 FOR UPDATE",
            id,
            "project",
        )
        .await?;
        let now = Utc::now();
        let row = sqlx::query_as::<_, DbProject>(concat!(
            "UPDATE projects SET status = $2, updated_at = $3 WHERE id = $1 RETURNING ",
            project_columns!()
        ))
        .bind(id)
        .bind(status.as_str())
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;
        let change = insert_status_change(
            &mut tx,
            EntityKind::Project,
            id,
            &from,
            status.as_str(),
            actor,
            comment,
            now,
        )
        .await?;
        tx.commit().await?;
        Ok((project_from_db(row)?, change))
    }

    async fn constituency_stats(&self, constituency_id: &str) -> StoreResult<ConstituencyStats> {
        let rows: Vec<(String, i64, f64, f64)> = sqlx::query_as(
            r#"SELECT status, COUNT(*), COALESCE(SUM(budget), 0), COALESCE(SUM(spent), 0)
               FROM projects WHERE constituency_id = $1 GROUP BY status"#,
        )
        .bind(constituency_id)
        .fetch_all(&self.pool)
        .await?;
        let mut stats = ConstituencyStats {
            constituency_id: constituency_id.to_string(),
            total_projects: 0,
            by_status: BTreeMap::new(),
            total_budget: 0.0,
            total_spent: 0.0,
            ongoing_projects: 0,
            completed_projects: 0,
        };
        for (status, count, budget, spent) in rows {
            let count = to_u64(count);
            let parsed: ProjectStatus = parse_tag(&status)?;
            stats.total_projects += count;
            stats.total_budget += budget;
            stats.total_spent += spent;
            match parsed {
                ProjectStatus::Approved | ProjectStatus::Implementation => {
                    stats.ongoing_projects += count
                }
                ProjectStatus::Completed => stats.completed_projects += count,
                _ => {}
            }
            stats.by_status.insert(status, count);
        }
        Ok(stats)
    }
}

async fn write_payment(tx: &mut Transaction<'_, Postgres>, payment: &Payment) -> StoreResult<()> {
    sqlx::query(
        r#"UPDATE payments SET status = $2, panel_a_approved_by = $3, panel_a_approved_at = $4,
               panel_b_approved_by = $5, panel_b_approved_at = $6, disbursed_at = $7, updated_at = $8
           WHERE id = $1"#,
    )
    .bind(payment.id)
    .bind(payment.status.as_str())
    .bind(&payment.panel_a_approved_by)
    .bind(payment.panel_a_approved_at)
    .bind(&payment.panel_b_approved_by)
    .bind(payment.panel_b_approved_at)
    .bind(payment.disbursed_at)
    .bind(payment.updated_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn lock_payment(tx: &mut Transaction<'_, Postgres>, id: Uuid) -> StoreResult<Payment> {
    let row = sqlx::query_as::<_, DbPayment>(concat!(
        "SELECT ",
        payment_columns!(),
        " FROM payments WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| StoreError::NotFound("payment".into()))?;
    payment_from_db(row)
}

#[async_trait]
impl PaymentStore for PostgresStore {
    async fn list_payments(
        &self,
        filter: &PaymentFilter,
        page: PageRequest,
    ) -> StoreResult<Page<Payment>> {
        let status = filter.status.map(|s| s.as_str());
        let total: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM payments
               WHERE ($1::text IS NULL OR status = $1) AND ($2::uuid IS NULL OR project_id = $2)"#,
        )
        .bind(status)
        .bind(filter.project_id)
        .fetch_one(&self.pool)
        .await?;
        let rows = sqlx::query_as::<_, DbPayment>(concat!(
            "SELECT ",
            payment_columns!(),
            " FROM payments
               WHERE ($1::text IS NULL OR status = $1) AND ($2::uuid IS NULL OR project_id = $2)
               ORDER BY created_at DESC LIMIT $3 OFFSET $4"
        ))
        .bind(status)
        .bind(filter.project_id)
        .bind(page.limit as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(Page {
            items: rows
                .into_iter()
                .map(payment_from_db)
                .collect::<StoreResult<_>>()?,
            total: to_u64(total),
        })
    }

    async fn get_payment(&self, id: Uuid) -> StoreResult<Payment> {
        let row = sqlx::query_as::<_, DbPayment>(concat!(
            "SELECT ",
            payment_columns!(),
            " FROM payments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound("payment".into()))?;
        payment_from_db(row)
    }

    async fn create_payment(&self, payment: Payment) -> StoreResult<Payment> {
        if !self.project_exists(payment.project_id).await? {
            return Err(StoreError::NotFound("project".into()));
        }
        let insert = sqlx::query(
            r#"INSERT INTO payments (id, payment_number, project_id, milestone_id, amount, payment_type,
                   recipient_name, recipient_account, recipient_bank, description, supporting_documents,
                   status, created_by, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)"#,
        )
        .bind(payment.id)
        .bind(&payment.payment_number)
        .bind(payment.project_id)
        .bind(payment.milestone_id)
        .bind(payment.amount)
        .bind(payment.payment_type.as_str())
        .bind(&payment.recipient_name)
        .bind(&payment.recipient_account)
        .bind(&payment.recipient_bank)
        .bind(&payment.description)
        .bind(json!(payment.supporting_documents))
        .bind(payment.status.as_str())
        .bind(&payment.created_by)
        .bind(payment.created_at)
        .bind(payment.updated_at)
        .execute(&self.pool)
        .await;
        if let Err(err) = insert {
            if is_unique_violation(&err) {
                return Err(StoreError::Conflict("payment exists".into()));
            }
            return Err(err.into());
        }
        Ok(payment)
    }

    async fn set_payment_status(
        &self,
        id: Uuid,
        status: PaymentStatus,
        actor: &str,
        comment: Option<String>,
    ) -> StoreResult<(Payment, StatusChange)> {
        let mut tx = self.pool.begin().await?;
        let mut payment = lock_payment(&mut tx, id).await?;
        let from = payment.status;
        let now = Utc::now();
        payment.set_status(status, now);
        write_payment(&mut tx, &payment).await?;
        let change = insert_status_change(
            &mut tx,
            EntityKind::Payment,
            id,
            from.as_str(),
            status.as_str(),
            actor,
            comment,
            now,
        )
        .await?;
        tx.commit().await?;
        Ok((payment, change))
    }

    async fn approve_payment_panel(
        &self,
        id: Uuid,
        panel: Panel,
        approver: &str,
        comment: Option<String>,
    ) -> StoreResult<(Payment, StatusChange)> {
        let mut tx = self.pool.begin().await?;
        let mut payment = lock_payment(&mut tx, id).await?;
        let from = payment.status;
        let now = Utc::now();
        if !payment.record_panel_approval(panel, approver, now) {
            // Dropping `tx` rolls back and releases the row lock.
            return Err(StoreError::Forbidden(
                "same user cannot approve both Panel A and Panel B".into(),
            ));
        }
        write_payment(&mut tx, &payment).await?;
        let change = insert_status_change(
            &mut tx,
            EntityKind::Payment,
            id,
            from.as_str(),
            payment.status.as_str(),
            approver,
            comment,
            now,
        )
        .await?;
        tx.commit().await?;
        Ok((payment, change))
    }
}

#[async_trait]
impl BursaryStore for PostgresStore {
    async fn list_bursaries(
        &self,
        filter: &BursaryFilter,
        page: PageRequest,
    ) -> StoreResult<Page<BursaryApplication>> {
        let status = filter.status.map(|s| s.as_str());
        let institution_type = filter.institution_type.map(|t| t.as_str());
        let total: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM bursary_applications
               WHERE ($1::text IS NULL OR status = $1)
                 AND ($2::text IS NULL OR constituency_id = $2)
                 AND ($3::int IS NULL OR academic_year = $3)
                 AND ($4::text IS NULL OR institution_type = $4)"#,
        )
        .bind(status)
        .bind(filter.constituency_id.as_deref())
        .bind(filter.academic_year)
        .bind(institution_type)
        .fetch_one(&self.pool)
        .await?;
        let rows = sqlx::query_as::<_, DbBursary>(concat!(
            "SELECT ",
            bursary_columns!(),
            " FROM bursary_applications
               WHERE ($1::text IS NULL OR status = $1)
                 AND ($2::text IS NULL OR constituency_id = $2)
                 AND ($3::int IS NULL OR academic_year = $3)
                 AND ($4::text IS NULL OR institution_type = $4)
               ORDER BY created_at DESC LIMIT $5 OFFSET $6"
        ))
        .bind(status)
        .bind(filter.constituency_id.as_deref())
        .bind(filter.academic_year)
        .bind(institution_type)
        .bind(page.limit as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(Page {
            items: rows
                .into_iter()
                .map(bursary_from_db)
                .collect::<StoreResult<_>>()?,
            total: to_u64(total),
        })
    }

    async fn get_bursary(&self, id: Uuid) -> StoreResult<BursaryApplication> {
        let row = sqlx::query_as::<_, DbBursary>(concat!(
            "SELECT ",
            bursary_columns!(),
            " FROM bursary_applications WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound("bursary application".into()))?;
        bursary_from_db(row)
    }

    async fn create_bursary(
        &self,
        application: BursaryApplication,
    ) -> StoreResult<BursaryApplication> {
        let insert = sqlx::query(
            r#"INSERT INTO bursary_applications (id, application_number, student_name, institution_name,
                   institution_type, tuition_fees, academic_year, constituency_id, ward_id, status,
                   submitted_by, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)"#,
        )
        .bind(application.id)
        .bind(&application.application_number)
        .bind(&application.student_name)
        .bind(&application.institution_name)
        .bind(application.institution_type.as_str())
        .bind(application.tuition_fees)
        .bind(application.academic_year)
        .bind(&application.constituency_id)
        .bind(&application.ward_id)
        .bind(application.status.as_str())
        .bind(&application.submitted_by)
        .bind(application.created_at)
        .bind(application.updated_at)
        .execute(&self.pool)
        .await;
        if let Err(err) = insert {
            if is_unique_violation(&err) {
                return Err(StoreError::Conflict("bursary application exists".into()));
            }
            return Err(err.into());
        }
        Ok(application)
    }

    async fn set_bursary_status(
        &self,
        id: Uuid,
        status: BursaryStatus,
        actor: &str,
        comment: Option<String>,
    ) -> StoreResult<(BursaryApplication, StatusChange)> {
        let mut tx = self.pool.begin().await?;
        let from = lock_status(
            &mut tx,
            "SELECT status FROM bursary_applications WHERE id = $1 FOR UPDATE",
            id,
            "bursary application",
        )
        .await?;
        let now = Utc::now();
        let row = sqlx::query_as::<_, DbBursary>(concat!(
            "UPDATE bursary_applications SET status = $2, updated_at = $3 WHERE id = $1 RETURNING ",
            bursary_columns!()
        ))
        .bind(id)
        .bind(status.as_str())
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;
        let change = insert_status_change(
            &mut tx,
            EntityKind::Bursary,
            id,
            &from,
            status.as_str(),
            actor,
            comment,
            now,
        )
        .await?;
        tx.commit().await?;
        Ok((bursary_from_db(row)?, change))
    }
}

#[async_trait]
impl GrantStore for PostgresStore {
    async fn list_grants(
        &self,
        filter: &GrantFilter,
        page: PageRequest,
    ) -> StoreResult<Page<EmpowermentGrant>> {
        let status = filter.status.map(|s| s.as_str());
        let grant_type = filter.grant_type.map(|t| t.as_str());
        let total: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM empowerment_grants
               WHERE ($1::text IS NULL OR status = $1)
                 AND ($2::text IS NULL OR constituency_id = $2)
                 AND ($3::text IS NULL OR grant_type = $3)"#,
        )
        .bind(status)
        .bind(filter.constituency_id.as_deref())
        .bind(grant_type)
        .fetch_one(&self.pool)
        .await?;
        let rows = sqlx::query_as::<_, DbGrant>(concat!(
            "SELECT ",
            grant_columns!(),
            " FROM empowerment_grants
               WHERE ($1::text IS NULL OR status = $1)
                 AND ($2::text IS NULL OR constituency_id = $2)
                 AND ($3::text IS NULL OR grant_type = $3)
               ORDER BY created_at DESC LIMIT $4 OFFSET $5"
        ))
        .bind(status)
        .bind(filter.constituency_id.as_deref())
        .bind(grant_type)
        .bind(page.limit as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(Page {
            items: rows
                .into_iter()
                .map(grant_from_db)
                .collect::<StoreResult<_>>()?,
            total: to_u64(total),
        })
    }

    async fn get_grant(&self, id: Uuid) -> StoreResult<EmpowermentGrant> {
        let row = sqlx::query_as::<_, DbGrant>(concat!(
            "SELECT ",
            grant_columns!(),
            " FROM empowerment_grants WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound("empowerment grant".into()))?;
        grant_from_db(row)
    }

    async fn create_grant(&self, grant: EmpowermentGrant) -> StoreResult<EmpowermentGrant> {
        let insert = sqlx::query(
            r#"INSERT INTO empowerment_grants (id, application_number, applicant_name, grant_type,
                   purpose, requested_amount, constituency_id, ward_id, status, submitted_by,
                   created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"#,
        )
        .bind(grant.id)
        .bind(&grant.application_number)
        .bind(&grant.applicant_name)
        .bind(grant.grant_type.as_str())
        .bind(&grant.purpose)
        .bind(grant.requested_amount)
        .bind(&grant.constituency_id)
        .bind(&grant.ward_id)
        .bind(grant.status.as_str())
        .bind(&grant.submitted_by)
        .bind(grant.created_at)
        .bind(grant.updated_at)
        .execute(&self.pool)
        .await;
        if let Err(err) = insert {
            if is_unique_violation(&err) {
                return Err(StoreError::Conflict("empowerment grant exists".into()));
            }
            return Err(err.into());
        }
        Ok(grant)
    }

    async fn set_grant_status(
        &self,
        id: Uuid,
        status: GrantStatus,
        actor: &str,
        comment: Option<String>,
    ) -> StoreResult<(EmpowermentGrant, StatusChange)> {
        let mut tx = self.pool.begin().await?;
        let from = lock_status(
            &mut tx,
            "SELECT status FROM empowerment_grants WHERE id = $1 FOR UPDATE",
            id,
            "empowerment grant",
        )
        .await?;
        let now = Utc::now();
        let row = sqlx::query_as::<_, DbGrant>(concat!(
            "UPDATE empowerment_grants SET status = $2, updated_at = $3 WHERE id = $1 RETURNING ",
            grant_columns!()
        ))
        .bind(id)
        .bind(status.as_str())
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;
        let change = insert_status_change(
            &mut tx,
            EntityKind::Grant,
            id,
            &from,
            status.as_str(),
            actor,
            comment,
            now,
        )
        .await?;
        tx.commit().await?;
        Ok((grant_from_db(row)?, change))
    }
}

async fn lock_document(tx: &mut Transaction<'_, Postgres>, id: Uuid) -> StoreResult<Document> {
    let row = sqlx::query_as::<_, DbDocument>(concat!(
        "SELECT ",
        document_columns!(),
        " FROM documents WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| StoreError::NotFound("document".into()))?;
    Ok(document_from_db(row))
}

#[async_trait]
impl DocumentStore for PostgresStore {
    async fn list_documents(
        &self,
        filter: &DocumentFilter,
        page: PageRequest,
    ) -> StoreResult<Page<Document>> {
        let total: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM documents
               WHERE ($1::uuid IS NULL OR project_id = $1)
                 AND ($2::text IS NULL OR constituency_id = $2)
                 AND ($3::text IS NULL OR document_type = $3)"#,
        )
        .bind(filter.project_id)
        .bind(filter.constituency_id.as_deref())
        .bind(filter.document_type.as_deref())
        .fetch_one(&self.pool)
        .await?;
        let rows = sqlx::query_as::<_, DbDocument>(concat!(
            "SELECT ",
            document_columns!(),
            " FROM documents
               WHERE ($1::uuid IS NULL OR project_id = $1)
                 AND ($2::text IS NULL OR constituency_id = $2)
                 AND ($3::text IS NULL OR document_type = $3)
               ORDER BY created_at DESC LIMIT $4 OFFSET $5"
        ))
        .bind(filter.project_id)
        .bind(filter.constituency_id.as_deref())
        .bind(filter.document_type.as_deref())
        .bind(page.limit as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(Page {
            items: rows.into_iter().map(document_from_db).collect(),
            total: to_u64(total),
        })
    }

    async fn get_document(&self, id: Uuid) -> StoreResult<Document> {
        let row = sqlx::query_as::<_, DbDocument>(concat!(
            "SELECT ",
            document_columns!(),
            " FROM documents WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound("document".into()))?;
        Ok(document_from_db(row))
    }

    async fn find_document_by_hash(&self, file_hash: &str) -> StoreResult<Option<Document>> {
        let row = sqlx::query_as::<_, DbDocument>(concat!(
            "SELECT ",
            document_columns!(),
            " FROM documents WHERE file_hash = $1"
        ))
        .bind(file_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(document_from_db))
    }

    async fn create_document(&self, document: Document) -> StoreResult<Document> {
        let mut tx = self.pool.begin().await?;
        let insert = sqlx::query(
            r#"INSERT INTO documents (id, project_id, uploader_id, file_url, file_name, file_size,
                   mime_type, file_hash, document_type, description, is_immutable, immutable_at,
                   immutable_by, constituency_id, ward_id, metadata, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)"#,
        )
        .bind(document.id)
        .bind(document.project_id)
        .bind(&document.uploader_id)
        .bind(&document.file_url)
        .bind(&document.file_name)
        .bind(document.file_size)
        .bind(&document.mime_type)
        .bind(&document.file_hash)
        .bind(&document.document_type)
        .bind(&document.description)
        .bind(document.is_immutable)
        .bind(document.immutable_at)
        .bind(&document.immutable_by)
        .bind(&document.constituency_id)
        .bind(&document.ward_id)
        .bind(&document.metadata)
        .bind(document.created_at)
        .bind(document.updated_at)
        .execute(&mut *tx)
        .await;
        if let Err(err) = insert {
            if is_unique_violation(&err) {
                return Err(StoreError::Conflict(
                    "document with this hash already exists".into(),
                ));
            }
            return Err(err.into());
        }
        insert_audit(
            &mut tx,
            document.id,
            DocumentAuditAction::Created,
            &document.uploader_id,
            json!({ "file_name": document.file_name, "file_hash": document.file_hash }),
        )
        .await?;
        tx.commit().await?;
        Ok(document)
    }

    async fn update_document(
        &self,
        id: Uuid,
        patch: DocumentPatchRequest,
        actor: &str,
    ) -> StoreResult<Document> {
        let mut tx = self.pool.begin().await?;
        let mut document = lock_document(&mut tx, id).await?;
        if document.is_immutable {
            return Err(StoreError::Forbidden(
                "Cannot modify an immutable document".into(),
            ));
        }
        let details = serde_json::to_value(&patch).unwrap_or(Value::Null);
        patch.apply(&mut document);
        document.updated_at = Utc::now();
        sqlx::query(
            r#"UPDATE documents SET document_type = $2, description = $3, metadata = $4, updated_at = $5
               WHERE id = $1"#,
        )
        .bind(id)
        .bind(&document.document_type)
        .bind(&document.description)
        .bind(&document.metadata)
        .bind(document.updated_at)
        .execute(&mut *tx)
        .await?;
        insert_audit(&mut tx, id, DocumentAuditAction::Updated, actor, details).await?;
        tx.commit().await?;
        Ok(document)
    }

    async fn delete_document(&self, id: Uuid, actor: &str) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        let document = lock_document(&mut tx, id).await?;
        if document.is_immutable {
            return Err(StoreError::Forbidden(
                "Cannot delete an immutable document".into(),
            ));
        }
        sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        insert_audit(
            &mut tx,
            id,
            DocumentAuditAction::Deleted,
            actor,
            json!({ "file_name": document.file_name }),
        )
        .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn make_document_immutable(&self, id: Uuid, actor: &str) -> StoreResult<Document> {
        let mut tx = self.pool.begin().await?;
        let mut document = lock_document(&mut tx, id).await?;
        if !document.seal(actor, Utc::now()) {
            return Err(StoreError::Conflict("document is already immutable".into()));
        }
        sqlx::query(
            r#"UPDATE documents SET is_immutable = TRUE, immutable_at = $2, immutable_by = $3, updated_at = $4
               WHERE id = $1"#,
        )
        .bind(id)
        .bind(document.immutable_at)
        .bind(&document.immutable_by)
        .bind(document.updated_at)
        .execute(&mut *tx)
        .await?;
        insert_audit(
            &mut tx,
            id,
            DocumentAuditAction::MadeImmutable,
            actor,
            json!({ "file_hash": document.file_hash }),
        )
        .await?;
        tx.commit().await?;
        Ok(document)
    }

    async fn document_statistics(
        &self,
        constituency_id: Option<&str>,
    ) -> StoreResult<DocumentStatistics> {
        let rows: Vec<(String, i64, i64, i64)> = sqlx::query_as(
            r#"SELECT document_type, COUNT(*),
                      COUNT(*) FILTER (WHERE is_immutable),
                      COALESCE(SUM(file_size), 0)::bigint
               FROM documents WHERE ($1::text IS NULL OR constituency_id = $1)
               GROUP BY document_type"#,
        )
        .bind(constituency_id)
        .fetch_all(&self.pool)
        .await?;
        let mut stats = DocumentStatistics::default();
        for (document_type, count, immutable, size) in rows {
            stats.total += to_u64(count);
            stats.immutable_count += to_u64(immutable);
            stats.total_size += size;
            stats.by_type.insert(document_type, to_u64(count));
        }
        Ok(stats)
    }

    async fn document_audit_log(&self, id: Uuid) -> StoreResult<Vec<DocumentAuditEntry>> {
        let rows = sqlx::query_as::<_, DbAuditEntry>(
            r#"SELECT seq, document_id, action, actor, details, at
               FROM document_audit_log WHERE document_id = $1 ORDER BY seq"#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        if rows.is_empty() {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM documents WHERE id = $1)")
                    .bind(id)
                    .fetch_one(&self.pool)
                    .await?;
            if !exists {
                return Err(StoreError::NotFound("document".into()));
            }
        }
        rows.into_iter().map(audit_from_db).collect()
    }
}

#[async_trait]
impl UserStore for PostgresStore {
    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let rows = sqlx::query_as::<_, DbUser>(
            "SELECT id, email, roles, created_at, updated_at FROM users ORDER BY email",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(user_from_db).collect())
    }

    async fn get_user(&self, id: &str) -> StoreResult<User> {
        let row = sqlx::query_as::<_, DbUser>(
            "SELECT id, email, roles, created_at, updated_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound("user".into()))?;
        Ok(user_from_db(row))
    }

    async fn upsert_user(&self, user: User) -> StoreResult<User> {
        let roles: Vec<String> = user.roles.iter().map(|r| r.as_str().to_string()).collect();
        let row = sqlx::query_as::<_, DbUser>(
            r#"INSERT INTO users (id, email, roles, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5)
               ON CONFLICT (id) DO UPDATE
                 SET email = EXCLUDED.email, roles = EXCLUDED.roles, updated_at = EXCLUDED.updated_at
               RETURNING id, email, roles, created_at, updated_at"#,
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&roles)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(user_from_db(row))
    }

    async fn users_with_any_role(&self, roles: &RoleSet) -> StoreResult<Vec<User>> {
        let rows = sqlx::query_as::<_, DbUser>(
            "SELECT id, email, roles, created_at, updated_at FROM users WHERE roles && $1 ORDER BY email",
        )
        .bind(roles.tags())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(user_from_db).collect())
    }
}

#[async_trait]
impl NotificationStore for PostgresStore {
    async fn list_notifications(
        &self,
        user_id: &str,
        limit: u32,
    ) -> StoreResult<Vec<Notification>> {
        let rows = sqlx::query_as::<_, DbNotification>(concat!(
            "SELECT ",
            notification_columns!(),
            " FROM notifications WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2"
        ))
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(notification_from_db).collect()
    }

    async fn unread_notification_count(&self, user_id: &str) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND NOT is_read",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(to_u64(count))
    }

    async fn insert_notifications(&self, notifications: Vec<Notification>) -> StoreResult<usize> {
        let mut tx = self.pool.begin().await?;
        for notification in &notifications {
            sqlx::query(concat!(
                "INSERT INTO notifications (",
                notification_columns!(),
                ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"
            ))
            .bind(notification.id)
            .bind(&notification.user_id)
            .bind(&notification.title)
            .bind(&notification.message)
            .bind(notification.kind.as_str())
            .bind(notification.category.as_str())
            .bind(&notification.action_url)
            .bind(&notification.metadata)
            .bind(notification.is_read)
            .bind(notification.created_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        metrics::counter!("cdf_notifications_created_total").increment(notifications.len() as u64);
        Ok(notifications.len())
    }

    async fn mark_notification_read(&self, user_id: &str, id: Uuid) -> StoreResult<()> {
        let result =
            sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $1 AND user_id = $2")
                .bind(id)
                .bind(user_id)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("notification".into()));
        }
        Ok(())
    }

    async fn mark_all_notifications_read(&self, user_id: &str) -> StoreResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND NOT is_read",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl TokenStore for PostgresStore {
    async fn blacklist_token(
        &self,
        token_hash: &str,
        user_id: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        sqlx::query(
            r#"INSERT INTO token_blacklist (token_hash, user_id, expires_at) VALUES ($1, $2, $3)
               ON CONFLICT (token_hash) DO UPDATE SET expires_at = EXCLUDED.expires_at"#,
        )
        .bind(token_hash)
        .bind(user_id)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn blacklisted_until(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<DateTime<Utc>>> {
        let expires_at = sqlx::query_scalar::<_, DateTime<Utc>>(
            "SELECT expires_at FROM token_blacklist WHERE token_hash = $1 AND expires_at > $2",
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(expires_at)
    }

    async fn delete_expired_tokens(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM token_blacklist WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl GatewayStore for PostgresStore {
    async fn next_sequence(&self, scope: &str) -> StoreResult<u64> {
        let value: i64 = sqlx::query_scalar(
            r#"INSERT INTO sequences (scope, value) VALUES ($1, 1)
               ON CONFLICT (scope) DO UPDATE SET value = sequences.value + 1
               RETURNING value"#,
        )
        .bind(scope)
        .fetch_one(&self.pool)
        .await?;
        Ok(to_u64(value))
    }

    async fn status_history(
        &self,
        entity: EntityKind,
        id: Uuid,
    ) -> StoreResult<Vec<StatusChange>> {
        let rows = sqlx::query_as::<_, DbStatusChange>(
            r#"SELECT seq, entity, entity_id, from_status, to_status, changed_by, comment, changed_at
               FROM status_changes WHERE entity = $1 AND entity_id = $2 ORDER BY seq"#,
        )
        .bind(entity.as_str())
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(status_change_from_db).collect()
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn is_durable(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_tag_maps_unknown_values_to_unexpected() {
        let ok: ProjectStatus = parse_tag("tac_appraisal").expect("known tag");
        assert_eq!(ok, ProjectStatus::TacAppraisal);
        let err = parse_tag::<PaymentStatus>("paid").expect_err("unknown tag");
        assert!(matches!(err, StoreError::Unexpected(_)));
        assert!(err.to_string().contains("paid"));
    }

    #[test]
    fn user_rows_drop_unknown_roles() {
        let now = Utc::now();
        let user = user_from_db(DbUser {
            id: "u1".to_string(),
            email: "u1@cdf.test".to_string(),
            roles: vec!["mp".to_string(), "janitor".to_string()],
            created_at: now,
            updated_at: now,
        });
        assert_eq!(user.roles, vec![cdf_authz::Role::Mp]);
    }

    #[test]
    fn negative_counts_clamp_to_zero() {
        assert_eq!(to_u64(-3), 0);
        assert_eq!(to_u64(7), 7);
    }

    #[tokio::test]
    async fn connect_rejects_invalid_url() {
        let pg = PostgresConfig {
            url: "not a url".to_string(),
            max_connections: 1,
            connect_timeout_ms: 100,
            acquire_timeout_ms: 100,
        };
        assert!(PostgresStore::connect(&pg, StoreConfig::default()).await.is_err());
    }
}
