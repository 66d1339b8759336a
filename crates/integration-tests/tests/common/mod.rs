// Shared test harness: full stack against a throwaway SQLite database

#![allow(dead_code)]

use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use waitline_core::application::queue_service::{
    CreateQueueRequest, JoinRequest, Joiner, QueueService,
};
use waitline_core::application::{
    Broadcaster, NotificationService, QueueRouter, WaitEstimator,
};
use waitline_core::domain::{NotificationPreference, Queue, QueueEntry};
use waitline_core::error::Result;
use waitline_core::port::code_provider::RandomCodeProvider;
use waitline_core::port::id_provider::UuidProvider;
use waitline_core::port::notifier::mocks::MockNotifier;
use waitline_core::port::time_provider::SystemTimeProvider;
use waitline_core::port::{QueueStore, TransactionalQueueStore};
use waitline_infra_sqlite::{create_pool, run_migrations, SqliteQueueStore};

pub struct TestApp {
    pub pool: SqlitePool,
    pub service: Arc<QueueService>,
    pub store: Arc<dyn QueueStore>,
    pub notifier: Arc<MockNotifier>,
}

/// Wire the full stack against a fresh on-disk database (in-memory SQLite
/// gives every pooled connection its own database, which breaks
/// multi-connection tests).
pub async fn setup() -> TestApp {
    let db_path = std::env::temp_dir().join(format!("waitline_test_{}.db", uuid::Uuid::new_v4()));
    let pool = create_pool(db_path.to_str().unwrap()).await.unwrap();
    run_migrations(&pool).await.unwrap();

    let sqlite_store = Arc::new(SqliteQueueStore::new(pool.clone()));
    let store: Arc<dyn QueueStore> = sqlite_store.clone();
    let tx_store: Arc<dyn TransactionalQueueStore> = sqlite_store;

    let time_provider = Arc::new(SystemTimeProvider);
    let id_provider = Arc::new(UuidProvider);
    let notifier = Arc::new(MockNotifier::accepting());

    let notifications = Arc::new(NotificationService::new(
        store.clone(),
        notifier.clone(),
        id_provider.clone(),
        time_provider.clone(),
    ));

    let service = Arc::new(QueueService::new(
        store.clone(),
        tx_store,
        Arc::new(QueueRouter::default()),
        Arc::new(WaitEstimator::new(store.clone())),
        Arc::new(Broadcaster::default()),
        notifications,
        id_provider,
        Arc::new(RandomCodeProvider::default()),
        time_provider,
    ));

    TestApp {
        pool,
        service,
        store,
        notifier,
    }
}

/// Insert a registered (non-guest) person directly
pub async fn insert_person(app: &TestApp, id: &str, phone: Option<&str>) {
    sqlx::query(
        r#"
        INSERT INTO persons (id, email, phone, first_name, last_name, is_guest, created_at)
        VALUES (?, ?, ?, ?, ?, 0, 0)
        "#,
    )
    .bind(id)
    .bind(format!("{}@example.com", id))
    .bind(phone)
    .bind(id)
    .bind("Tester")
    .execute(&app.pool)
    .await
    .unwrap();
}

pub async fn make_queue(app: &TestApp, owner_id: &str, capacity: i64, max_party: i64) -> Queue {
    insert_person(app, owner_id, None).await;
    app.service
        .create_queue(CreateQueueRequest {
            owner_id: owner_id.to_string(),
            name: format!("{}'s line", owner_id),
            description: None,
            max_capacity: Some(capacity),
            max_party_size: Some(max_party),
            est_service_minutes: Some(5),
        })
        .await
        .unwrap()
}

pub fn guest_join(queue_id: &str, name: &str) -> JoinRequest {
    JoinRequest {
        queue_id: queue_id.to_string(),
        party_size: 1,
        notification_preference: NotificationPreference::Sms,
        joiner: Joiner::Guest {
            first_name: name.to_string(),
            last_name: "Guest".to_string(),
            email: None,
            phone: Some(format!("+1555{:07}", name.len())),
        },
    }
}

pub async fn join_guest(app: &TestApp, queue_id: &str, name: &str) -> Result<QueueEntry> {
    app.service.join(guest_join(queue_id, name)).await
}

/// Count of Waiting/Notified entries straight from the database
pub async fn active_count(app: &TestApp, queue_id: &str) -> i64 {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM entries WHERE queue_id = ? AND status IN ('WAITING', 'NOTIFIED')",
    )
    .bind(queue_id)
    .fetch_one(&app.pool)
    .await
    .unwrap()
}

pub async fn queue_row(app: &TestApp, queue_id: &str) -> Queue {
    app.store
        .find_queue(&queue_id.to_string())
        .await
        .unwrap()
        .unwrap()
}

/// Append a Completed history row (for estimator seeding)
pub async fn seed_completion(app: &TestApp, queue_id: &str, served_at: i64) {
    sqlx::query(
        r#"
        INSERT INTO history (id, queue_id, person_id, entry_id,
                             joined_at, served_at, wait_minutes, status, recorded_at)
        VALUES (?, ?, 'seed-person', 'seed-entry', 0, ?, 0, 'COMPLETED', ?)
        "#,
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(queue_id)
    .bind(served_at)
    .bind(served_at)
    .execute(&app.pool)
    .await
    .unwrap();
}

/// Let spawned follow-up tasks (notifier fan-out, estimate refresh) land
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(250)).await;
}
