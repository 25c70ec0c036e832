//! Stock ledger tests against PostgreSQL
//!
//! Exercise the row locks, transactions and constraint mapping of `PgStore`.
//! Each test returns early when `DATABASE_URL` is not set, so the suite
//! still runs without a database.

use std::time::Duration;

use inventory_server::error::AppError;
use inventory_server::services::{SkuRegistry, StockLedger};
use inventory_server::store::{InventoryStore, MovementStore, PgStore, SkuStore, UnitOfWork};
use rust_decimal::Decimal;
use shared::models::{AmendMovementInput, CreateMovementInput, CreateSkuInput, MovementDirection};
use shared::types::Patch;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use MovementDirection::{In, Out};

async fn test_pool() -> Option<PgPool> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let pool = PgPoolOptions::new()
        .max_connections(16)
        .acquire_timeout(Duration::from_secs(10))
        .connect(&url)
        .await
        .expect("DATABASE_URL is set but the database is unreachable");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations failed");
    Some(pool)
}

struct Fixture {
    store: PgStore,
    registry: SkuRegistry<PgStore>,
    ledger: StockLedger<PgStore>,
}

impl Fixture {
    async fn new() -> Option<Self> {
        let store = PgStore::new(test_pool().await?);
        Some(Self {
            registry: SkuRegistry::new(store.clone()),
            ledger: StockLedger::new(store.clone()),
            store,
        })
    }

    /// SKU with a code no other test run uses
    async fn sku(&self, initial_stock: i32) -> Uuid {
        self.registry
            .create(sku_input(&unique_code(), None, initial_stock))
            .await
            .unwrap()
            .id
    }

    async fn stock(&self, sku_id: Uuid) -> i32 {
        self.registry.get(sku_id).await.unwrap().stock
    }

    async fn movement_count(&self, sku_id: Uuid) -> i64 {
        let mut unit = self.store.begin().await.unwrap();
        unit.count_movements_for_sku(sku_id).await.unwrap()
    }
}

fn unique_code() -> String {
    format!("PG-{}", Uuid::new_v4().simple()).to_uppercase()
}

fn sku_input(code: &str, category_id: Option<Uuid>, initial_stock: i32) -> CreateSkuInput {
    CreateSkuInput {
        sku_code: code.to_string(),
        name: format!("Item {}", code),
        category_id,
        supplier_id: None,
        cost_price: Some(Decimal::new(1250, 2)),
        initial_stock: Some(initial_stock),
    }
}

fn movement(sku_id: Uuid, quantity: i32) -> CreateMovementInput {
    CreateMovementInput {
        sku_id,
        quantity,
        unit_price: Some(Decimal::from(4)),
        document_number: Some("DOC-PG".to_string()),
        notes: None,
    }
}

fn amend_quantity(quantity: i32) -> AmendMovementInput {
    AmendMovementInput {
        quantity: Patch::Set(quantity),
        ..Default::default()
    }
}

// ============================================================================
// Movement lifecycle
// ============================================================================

#[tokio::test]
async fn test_full_ledger_scenario_on_postgres() {
    let Some(fx) = Fixture::new().await else { return };
    let sku = fx.sku(0).await;

    let stock_in = fx.ledger.create_movement(In, None, movement(sku, 100)).await.unwrap();
    assert_eq!(fx.stock(sku).await, 100);

    let stock_out = fx.ledger.create_movement(Out, None, movement(sku, 30)).await.unwrap();
    assert_eq!(fx.stock(sku).await, 70);

    let amended = fx
        .ledger
        .amend_movement(Out, stock_out.id, amend_quantity(50))
        .await
        .unwrap();
    assert_eq!(amended.total_price, Decimal::from(200));
    assert_eq!(fx.stock(sku).await, 50);

    fx.ledger.delete_movement(In, stock_in.id).await.unwrap();
    assert_eq!(fx.stock(sku).await, -50);
    assert_eq!(fx.movement_count(sku).await, 1);
    assert!(matches!(
        fx.ledger.get_movement(In, stock_in.id).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_refused_amend_leaves_row_untouched_on_postgres() {
    let Some(fx) = Fixture::new().await else { return };
    let sku = fx.sku(7).await;
    let m = fx.ledger.create_movement(Out, None, movement(sku, 2)).await.unwrap();

    let refused = AmendMovementInput {
        quantity: Patch::Set(10),
        unit_price: Patch::Set(Decimal::from(9)),
        ..Default::default()
    };
    assert!(matches!(
        fx.ledger.amend_movement(Out, m.id, refused).await,
        Err(AppError::InsufficientStock { available: 5, requested: 8 })
    ));

    let stored = fx.ledger.get_movement(Out, m.id).await.unwrap();
    assert_eq!(stored.quantity, 2);
    assert_eq!(stored.unit_price, Decimal::from(4));
    assert_eq!(stored.total_price, Decimal::from(8));
    assert_eq!(fx.stock(sku).await, 5);
}

// ============================================================================
// Row locks
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_stock_lock_blocks_second_unit_until_commit() {
    let Some(fx) = Fixture::new().await else { return };
    let sku = fx.sku(10).await;

    let mut first = fx.store.begin().await.unwrap();
    assert_eq!(first.lock_sku_stock(sku).await.unwrap(), Some(10));

    let store = fx.store.clone();
    let waiter = tokio::spawn(async move {
        let mut second = store.begin().await?;
        let stock = second.lock_sku_stock(sku).await?;
        second.commit().await?;
        Ok::<_, AppError>(stock)
    });

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!waiter.is_finished(), "second unit read stock through the lock");

    first.apply_stock_delta(sku, -3).await.unwrap();
    first.commit().await.unwrap();

    let seen = tokio::time::timeout(Duration::from_secs(5), waiter)
        .await
        .expect("second unit never acquired the lock")
        .unwrap()
        .unwrap();
    assert_eq!(seen, Some(7));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_movement_lock_blocks_second_unit_until_commit() {
    let Some(fx) = Fixture::new().await else { return };
    let sku = fx.sku(0).await;
    let m = fx.ledger.create_movement(In, None, movement(sku, 4)).await.unwrap();

    let mut first = fx.store.begin().await.unwrap();
    assert!(first.lock_movement(m.id).await.unwrap().is_some());

    let store = fx.store.clone();
    let movement_id = m.id;
    let waiter = tokio::spawn(async move {
        let mut second = store.begin().await?;
        let found = second.lock_movement(movement_id).await?;
        second.commit().await?;
        Ok::<_, AppError>(found)
    });

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!waiter.is_finished(), "second unit read the movement through the lock");

    first.delete_movement(m.id).await.unwrap();
    first.apply_stock_delta(sku, -4).await.unwrap();
    first.commit().await.unwrap();

    let seen = tokio::time::timeout(Duration::from_secs(5), waiter)
        .await
        .expect("second unit never acquired the lock")
        .unwrap()
        .unwrap();
    assert!(seen.is_none());
    assert_eq!(fx.stock(sku).await, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_stock_outs_never_overdraw_on_postgres() {
    let Some(fx) = Fixture::new().await else { return };
    let sku = fx.sku(50).await;

    let handles: Vec<_> = (0..12)
        .map(|_| {
            let ledger = fx.ledger.clone();
            tokio::spawn(async move { ledger.create_movement(Out, None, movement(sku, 10)).await })
        })
        .collect();

    let mut accepted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => accepted += 1,
            Err(AppError::InsufficientStock { .. }) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(accepted, 5);
    assert_eq!(fx.stock(sku).await, 0);
    assert_eq!(fx.movement_count(sku).await, 5);
}

// ============================================================================
// Atomicity
// ============================================================================

#[tokio::test]
async fn test_rejected_stock_update_rolls_back_movement_insert() {
    let Some(fx) = Fixture::new().await else { return };
    let sku = fx.sku(i32::MAX - 1).await;

    // The movement row is inserted before the stock update overflows
    let err = fx
        .ledger
        .create_movement(In, None, movement(sku, 5))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::DatabaseError(_)));

    assert_eq!(fx.movement_count(sku).await, 0);
    assert_eq!(fx.stock(sku).await, i32::MAX - 1);
}

#[tokio::test]
async fn test_uncommitted_unit_is_discarded() {
    let Some(fx) = Fixture::new().await else { return };
    let sku = fx.sku(3).await;

    {
        let mut unit = fx.store.begin().await.unwrap();
        unit.apply_stock_delta(sku, 40).await.unwrap();
    }

    assert_eq!(fx.stock(sku).await, 3);
}

// ============================================================================
// Constraint mapping
// ============================================================================

#[tokio::test]
async fn test_duplicate_sku_code_reports_field() {
    let Some(fx) = Fixture::new().await else { return };
    let code = unique_code();
    fx.registry.create(sku_input(&code, None, 0)).await.unwrap();

    let err = fx.registry.create(sku_input(&code, None, 0)).await.unwrap_err();
    assert!(matches!(err, AppError::DuplicateEntry(ref field) if field == "sku_code"));
}

#[tokio::test]
async fn test_unknown_category_reports_missing_resource() {
    let Some(fx) = Fixture::new().await else { return };

    let err = fx
        .registry
        .create(sku_input(&unique_code(), Some(Uuid::new_v4()), 0))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(ref resource) if resource == "Category"));
}
