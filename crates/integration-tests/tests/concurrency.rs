// Concurrency and race condition tests
//
// Position assignment and the capacity gate must hold under parallel load:
// no duplicate or skipped positions, no overshooting capacity, counters
// always equal to the live active count.

mod common;

use common::*;
use std::collections::HashSet;
use tokio::task::JoinSet;
use waitline_core::domain::{DomainError, EntryStatus};
use waitline_core::error::AppError;

#[tokio::test]
async fn concurrent_joins_get_gap_free_positions() {
    let app = setup().await;
    let queue = make_queue(&app, "owner-conc-a", 100, 1).await;

    let mut tasks = JoinSet::new();
    for i in 0..20 {
        let service = app.service.clone();
        let req = guest_join(&queue.id, &format!("joiner{}", i));
        tasks.spawn(async move { service.join(req).await });
    }

    let mut positions = Vec::new();
    while let Some(result) = tasks.join_next().await {
        positions.push(result.unwrap().unwrap().position_number);
    }

    // Exactly {1..20}, no duplicates, no gaps
    let unique: HashSet<i64> = positions.iter().copied().collect();
    assert_eq!(unique.len(), 20);
    assert_eq!(*unique.iter().min().unwrap(), 1);
    assert_eq!(*unique.iter().max().unwrap(), 20);

    let q = queue_row(&app, &queue.id).await;
    assert_eq!(q.current_size, 20);
    assert_eq!(q.current_size, active_count(&app, &queue.id).await);
}

#[tokio::test]
async fn capacity_holds_under_concurrent_joins() {
    let app = setup().await;
    let queue = make_queue(&app, "owner-conc-b", 5, 1).await;

    let mut tasks = JoinSet::new();
    for i in 0..20 {
        let service = app.service.clone();
        let req = guest_join(&queue.id, &format!("rush{}", i));
        tasks.spawn(async move { service.join(req).await });
    }

    let mut accepted = 0;
    let mut rejected = 0;
    while let Some(result) = tasks.join_next().await {
        match result.unwrap() {
            Ok(_) => accepted += 1,
            Err(AppError::Domain(DomainError::QueueAtCapacity { .. })) => rejected += 1,
            Err(other) => panic!("unexpected error: {:?}", other),
        }
    }

    assert_eq!(accepted, 5);
    assert_eq!(rejected, 15);

    let q = queue_row(&app, &queue.id).await;
    assert_eq!(q.current_size, 5);
}

#[tokio::test]
async fn concurrent_serve_counts_once() {
    let app = setup().await;
    let queue = make_queue(&app, "owner-conc-c", 10, 1).await;

    let entry = join_guest(&app, &queue.id, "target").await.unwrap();
    app.service.call_next(&queue.id).await.unwrap();

    let mut tasks = JoinSet::new();
    for _ in 0..4 {
        let service = app.service.clone();
        let queue_id = queue.id.clone();
        let entry_id = entry.id.clone();
        tasks.spawn(async move { service.mark_served(&queue_id, &entry_id).await });
    }

    let mut successes = 0;
    while let Some(result) = tasks.join_next().await {
        if result.unwrap().is_ok() {
            successes += 1;
        }
    }

    assert_eq!(successes, 1);
    let q = queue_row(&app, &queue.id).await;
    assert_eq!(q.total_served_today, 1);
    assert_eq!(q.current_size, 0);
}

#[tokio::test]
async fn mixed_churn_keeps_counters_consistent() {
    let app = setup().await;
    let queue = make_queue(&app, "owner-conc-d", 100, 1).await;

    // Seed a batch, then churn: half leave while new joiners pile in
    let mut seeded = Vec::new();
    for i in 0..10 {
        seeded.push(join_guest(&app, &queue.id, &format!("seed{}", i)).await.unwrap());
    }

    let mut tasks = JoinSet::new();
    for entry in seeded.into_iter().take(5) {
        let service = app.service.clone();
        tasks.spawn(async move { service.leave(&entry.id).await.map(|_| None) });
    }
    for i in 0..5 {
        let service = app.service.clone();
        let req = guest_join(&queue.id, &format!("churn{}", i));
        tasks.spawn(async move { service.join(req).await.map(Some) });
    }
    while let Some(result) = tasks.join_next().await {
        result.unwrap().unwrap();
    }

    let q = queue_row(&app, &queue.id).await;
    assert_eq!(q.current_size, active_count(&app, &queue.id).await);
    assert_eq!(q.current_size, 10);
}

#[tokio::test]
async fn positions_stay_unique_across_leave_join_races() {
    let app = setup().await;
    let queue = make_queue(&app, "owner-conc-e", 100, 1).await;

    let first = join_guest(&app, &queue.id, "early").await.unwrap();

    let mut tasks = JoinSet::new();
    {
        let service = app.service.clone();
        let entry_id = first.id.clone();
        tasks.spawn(async move {
            service.leave(&entry_id).await.unwrap();
        });
    }
    for i in 0..10 {
        let service = app.service.clone();
        let req = guest_join(&queue.id, &format!("racer{}", i));
        tasks.spawn(async move {
            service.join(req).await.unwrap();
        });
    }
    while let Some(result) = tasks.join_next().await {
        result.unwrap();
    }

    // Whatever interleaving happened, active positions are unique and the
    // leaver's slot was never handed out again
    let rows: Vec<(i64, String)> =
        sqlx::query_as("SELECT position_number, status FROM entries WHERE queue_id = ?")
            .bind(&queue.id)
            .fetch_all(&app.pool)
            .await
            .unwrap();

    let active: Vec<i64> = rows
        .iter()
        .filter(|(_, s)| s.parse::<EntryStatus>().unwrap().is_active())
        .map(|(p, _)| *p)
        .collect();
    let unique: HashSet<i64> = active.iter().copied().collect();
    assert_eq!(unique.len(), active.len());
    assert!(!active.contains(&first.position_number));
}
