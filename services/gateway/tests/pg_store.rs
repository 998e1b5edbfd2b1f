#![cfg(feature = "pg-tests")]

use chrono::{Duration as ChronoDuration, Utc};
use gateway::config::PostgresConfig;
use gateway::model::{
    Document, EntityKind, NewNotification, NotificationCategory, NotificationKind, Panel,
    Payment, PaymentStatus, PaymentType, Project, ProjectSector, ProjectStatus,
};
use gateway::store::postgres::PostgresStore;
use gateway::store::{
    DocumentStore, GatewayStore, NotificationStore, PaymentStore, ProjectStore, StoreConfig,
    StoreError, TokenStore,
};
use serial_test::serial;
use std::sync::Arc;
use uuid::Uuid;

static PG_STORE: tokio::sync::OnceCell<Arc<PostgresStore>> = tokio::sync::OnceCell::const_new();

async fn reset_postgres(url: &str) -> Result<(), sqlx::Error> {
    let pool = match tokio::time::timeout(
        std::time::Duration::from_secs(2),
        sqlx::postgres::PgPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(std::time::Duration::from_secs(2))
            .connect(url),
    )
    .await
    {
        Ok(result) => result?,
        Err(_) => return Err(sqlx::Error::PoolTimedOut),
    };
    sqlx::query(
        "TRUNCATE payments, projects, bursary_applications, empowerment_grants, document_audit_log, documents, status_changes, users, notifications, token_blacklist, sequences",
    )
    .execute(&pool)
    .await
    .map(|_| ())
}

async fn pg_store() -> Option<Arc<PostgresStore>> {
    let url = match std::env::var("CDF_TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!("skipping pg-tests: set CDF_TEST_DATABASE_URL or DATABASE_URL");
            return None;
        }
    };
    let pg_cfg = PostgresConfig {
        url: url.clone(),
        max_connections: 5,
        connect_timeout_ms: 5_000,
        acquire_timeout_ms: 5_000,
    };
    // Connecting applies migrations, so it has to precede the truncate.
    let store = match PG_STORE
        .get_or_try_init(|| async {
            let store = PostgresStore::connect(&pg_cfg, StoreConfig::default()).await?;
            Ok::<_, StoreError>(Arc::new(store))
        })
        .await
    {
        Ok(store) => Arc::clone(store),
        Err(err) => {
            eprintln!("skipping pg-tests: connect postgres store failed: {err}");
            return None;
        }
    };
    if let Err(err) = reset_postgres(&url).await {
        eprintln!("skipping pg-tests: cannot reset postgres: {err}");
        return None;
    }
    Some(store)
}

fn project(number: &str) -> Project {
    let now = Utc::now();
    Project {
        id: Uuid::new_v4(),
        project_number: number.to_string(),
        name: "Matero Market Roofing".to_string(),
        description: None,
        sector: ProjectSector::Community,
        constituency_id: "156".to_string(),
        ward_id: Some("4".to_string()),
        budget: 300_000.0,
        spent: 0.0,
        beneficiaries: Some(800),
        progress: 0,
        status: ProjectStatus::Draft,
        submitted_by: "chair-1".to_string(),
        created_at: now,
        updated_at: now,
    }
}

fn payment(project_id: Uuid) -> Payment {
    let now = Utc::now();
    Payment {
        id: Uuid::new_v4(),
        payment_number: "PAY-2026-00001".to_string(),
        project_id,
        milestone_id: None,
        amount: 75_000.0,
        payment_type: PaymentType::Advance,
        recipient_name: "Matero Builders".to_string(),
        recipient_account: "000111222".to_string(),
        recipient_bank: "Zanaco".to_string(),
        description: "Mobilisation advance".to_string(),
        supporting_documents: vec![],
        status: PaymentStatus::Pending,
        created_by: "chair-1".to_string(),
        panel_a_approved_by: None,
        panel_a_approved_at: None,
        panel_b_approved_by: None,
        panel_b_approved_at: None,
        disbursed_at: None,
        created_at: now,
        updated_at: now,
    }
}

fn document(hash: &str) -> Document {
    let now = Utc::now();
    Document {
        id: Uuid::new_v4(),
        project_id: None,
        uploader_id: "member-1".to_string(),
        file_url: format!("https://files.cdf.test/{hash}"),
        file_name: "boq.pdf".to_string(),
        file_size: Some(4096),
        mime_type: Some("application/pdf".to_string()),
        file_hash: hash.to_string(),
        document_type: "boq".to_string(),
        description: None,
        is_immutable: false,
        immutable_at: None,
        immutable_by: None,
        constituency_id: "156".to_string(),
        ward_id: None,
        metadata: serde_json::json!({}),
        created_at: now,
        updated_at: now,
    }
}

#[tokio::test]
#[serial]
async fn pg_project_status_and_stats() {
    let Some(store) = pg_store().await else {
        return;
    };
    let created = store
        .create_project(project("156-2026-0001"))
        .await
        .expect("create");
    let (updated, change) = store
        .set_project_status(
            created.id,
            ProjectStatus::Completed,
            "plgo-1",
            Some("handover done".to_string()),
        )
        .await
        .expect("status");
    assert_eq!(updated.status, ProjectStatus::Completed);
    assert_eq!(change.from_status, "draft");
    assert_eq!(change.to_status, "completed");

    let history = store
        .status_history(EntityKind::Project, created.id)
        .await
        .expect("history");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].changed_by, "plgo-1");

    let stats = store.constituency_stats("156").await.expect("stats");
    assert_eq!(stats.total_projects, 1);
    assert_eq!(stats.completed_projects, 1);
    assert_eq!(stats.by_status.get("completed"), Some(&1));

    assert!(matches!(
        store.get_project(Uuid::new_v4()).await,
        Err(StoreError::NotFound(_))
    ));
}

#[tokio::test]
#[serial]
async fn pg_payment_panels_exclude_the_same_approver() {
    let Some(store) = pg_store().await else {
        return;
    };
    let project = store
        .create_project(project("156-2026-0002"))
        .await
        .expect("project");
    let created = store.create_payment(payment(project.id)).await.expect("payment");

    let (after_a, _) = store
        .approve_payment_panel(created.id, Panel::A, "admin-1", None)
        .await
        .expect("panel a");
    assert_eq!(after_a.status, PaymentStatus::PanelAApproved);

    let same = store
        .approve_payment_panel(created.id, Panel::B, "admin-1", None)
        .await;
    assert!(matches!(same, Err(StoreError::Forbidden(_))));

    let (after_b, change) = store
        .approve_payment_panel(created.id, Panel::B, "plgo-1", None)
        .await
        .expect("panel b");
    assert_eq!(after_b.status, PaymentStatus::Approved);
    assert_eq!(after_b.panel_a_approved_by.as_deref(), Some("admin-1"));
    assert_eq!(after_b.panel_b_approved_by.as_deref(), Some("plgo-1"));
    assert_eq!(change.from_status, "panel_a_approved");

    let (disbursed, _) = store
        .set_payment_status(created.id, PaymentStatus::Disbursed, "finance-1", None)
        .await
        .expect("disburse");
    assert!(disbursed.disbursed_at.is_some());
}

#[tokio::test]
#[serial]
async fn pg_documents_hash_unique_and_seal() {
    let Some(store) = pg_store().await else {
        return;
    };
    let created = store.create_document(document("pg-hash-1")).await.expect("create");
    assert!(matches!(
        store.create_document(document("pg-hash-1")).await,
        Err(StoreError::Conflict(_))
    ));

    let sealed = store
        .make_document_immutable(created.id, "chair-1")
        .await
        .expect("seal");
    assert!(sealed.is_immutable);
    assert!(matches!(
        store.make_document_immutable(created.id, "chair-1").await,
        Err(StoreError::Conflict(_))
    ));
    assert!(matches!(
        store.delete_document(created.id, "chair-1").await,
        Err(StoreError::Forbidden(_))
    ));

    let found = store
        .find_document_by_hash("pg-hash-1")
        .await
        .expect("lookup");
    assert_eq!(found.map(|d| d.id), Some(created.id));

    let audit = store.document_audit_log(created.id).await.expect("audit");
    assert_eq!(audit.len(), 2);
}

#[tokio::test]
#[serial]
async fn pg_notifications_tokens_and_sequences() {
    let Some(store) = pg_store().await else {
        return;
    };
    let notice = NewNotification {
        title: "Payment approved".to_string(),
        message: "PAY-2026-00001 cleared both panels".to_string(),
        kind: NotificationKind::Success,
        category: NotificationCategory::Payment,
        action_url: None,
        metadata: None,
    };
    let inserted = store
        .insert_notifications(vec![notice.for_user("alice"), notice.for_user("bob")])
        .await
        .expect("insert");
    assert_eq!(inserted, 2);
    let inbox = store.list_notifications("alice", 10).await.expect("inbox");
    assert_eq!(inbox.len(), 1);
    assert!(matches!(
        store.mark_notification_read("bob", inbox[0].id).await,
        Err(StoreError::NotFound(_))
    ));
    store
        .mark_notification_read("alice", inbox[0].id)
        .await
        .expect("mark");
    assert_eq!(store.unread_notification_count("alice").await.expect("count"), 0);
    assert_eq!(store.unread_notification_count("bob").await.expect("count"), 1);

    let now = Utc::now();
    store
        .blacklist_token("live-hash", "alice", now + ChronoDuration::hours(1))
        .await
        .expect("live");
    store
        .blacklist_token("stale-hash", "alice", now - ChronoDuration::hours(1))
        .await
        .expect("stale");
    assert!(store.blacklisted_until("live-hash", now).await.expect("live").is_some());
    assert!(store.blacklisted_until("stale-hash", now).await.expect("stale").is_none());
    assert_eq!(store.delete_expired_tokens(now).await.expect("cleanup"), 1);

    assert_eq!(store.next_sequence("project:156:2026").await.expect("seq"), 1);
    assert_eq!(store.next_sequence("project:156:2026").await.expect("seq"), 2);
    assert_eq!(store.next_sequence("payment:2026").await.expect("seq"), 1);
    store.health_check().await.expect("health");
    assert!(store.is_durable());
}
