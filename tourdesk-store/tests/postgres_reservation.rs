//! Runs against a real PostgreSQL. Set `DATABASE_URL` and run with
//! `cargo test -p tourdesk-store -- --ignored`.

use chrono::Utc;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tourdesk_catalog::{NewTour, ScheduleStatus, TourSchedule};
use tourdesk_core::{CatalogRepository, ReservationStore};
use tourdesk_store::app_config::DatabaseConfig;
use tourdesk_store::{DbClient, PgCatalogRepository, PgReservationStore};
use uuid::Uuid;

async fn setup(capacity: i32) -> (DbClient, TourSchedule) {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let db = DbClient::new(&DatabaseConfig {
        url,
        max_connections: 20,
        acquire_timeout_seconds: 10,
        statement_timeout_ms: 5000,
    })
    .await
    .unwrap();
    db.migrate().await.unwrap();

    let operator_id = Uuid::new_v4();
    sqlx::query("INSERT INTO operators (id, company_name) VALUES ($1, $2)")
        .bind(operator_id)
        .bind("Najd Expeditions")
        .execute(&db.pool)
        .await
        .unwrap();

    let catalog = PgCatalogRepository::new(db.pool.clone());
    let tour = NewTour {
        title_en: Some("Riyadh Night Walk".to_string()),
        duration_hours: Some(3),
        max_capacity: Some(capacity),
        base_price_sar: Some(dec!(99.50)),
        ..Default::default()
    }
    .into_tour(operator_id)
    .unwrap();
    catalog.create_tour(&tour).await.unwrap();

    let schedule = TourSchedule::open(&tour, Utc::now(), None);
    catalog.create_schedule(&schedule).await.unwrap();
    (db, schedule)
}

async fn spots(db: &DbClient, schedule_id: Uuid) -> i32 {
    sqlx::query_scalar("SELECT available_spots FROM tour_schedules WHERE id = $1")
        .bind(schedule_id)
        .fetch_one(&db.pool)
        .await
        .unwrap()
}

#[tokio::test]
#[ignore]
async fn test_conditional_decrement_never_goes_negative() {
    let (db, schedule) = setup(5).await;
    let store = Arc::new(PgReservationStore::new(db.pool.clone(), 5000));

    let mut handles = Vec::new();
    for _ in 0..12 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            let mut tx = store.begin().await.unwrap();
            tx.lock_schedule(schedule.id).await.unwrap().unwrap();
            let taken = tx.take_spots(schedule.id, 1).await.unwrap();
            tx.commit().await.unwrap();
            taken.is_some()
        }));
    }

    let mut granted = 0;
    for handle in handles {
        if handle.await.unwrap() {
            granted += 1;
        }
    }

    assert_eq!(granted, 5);
    assert_eq!(spots(&db, schedule.id).await, 0);
}

#[tokio::test]
#[ignore]
async fn test_uncommitted_transaction_rolls_back() {
    let (db, schedule) = setup(4).await;
    let store = PgReservationStore::new(db.pool.clone(), 5000);

    let mut tx = store.begin().await.unwrap();
    assert_eq!(tx.take_spots(schedule.id, 3).await.unwrap(), Some(1));
    tx.set_schedule_status(schedule.id, ScheduleStatus::Full).await.unwrap();
    drop(tx);

    assert_eq!(spots(&db, schedule.id).await, 4);
}

#[tokio::test]
#[ignore]
async fn test_release_caps_at_max_capacity() {
    let (db, schedule) = setup(4).await;
    let store = PgReservationStore::new(db.pool.clone(), 5000);

    let mut tx = store.begin().await.unwrap();
    tx.take_spots(schedule.id, 2).await.unwrap();
    assert_eq!(tx.release_spots(schedule.id, 10).await.unwrap(), Some(4));
    tx.commit().await.unwrap();

    assert_eq!(spots(&db, schedule.id).await, 4);
}
