//! Persistence boundary for the SKU registry and the stock ledger
//!
//! Every write goes through a [`UnitOfWork`]: a single database transaction
//! that is committed explicitly and rolled back when dropped. The registry
//! side ([`SkuStore`]) and the ledger side ([`MovementStore`]) share the same
//! unit so a movement row and its stock adjustment succeed or fail together.

use async_trait::async_trait;
use uuid::Uuid;

use shared::models::{MovementChanges, NewMovement, NewSku, Sku, SkuChanges, StockMovement};

use crate::error::AppResult;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// A handle that can open units of work
#[async_trait]
pub trait InventoryStore: Send + Sync {
    type Unit: UnitOfWork;

    /// Start a new unit of work
    async fn begin(&self) -> AppResult<Self::Unit>;
}

/// SKU rows as seen from inside a unit of work
#[async_trait]
pub trait SkuStore: Send {
    async fn find_sku(&mut self, id: Uuid) -> AppResult<Option<Sku>>;

    /// Current stock, holding a row lock until the unit ends
    async fn lock_sku_stock(&mut self, id: Uuid) -> AppResult<Option<i32>>;

    /// `stock = stock + delta`, evaluated by the store in one statement.
    /// Returns `None` when the SKU does not exist.
    async fn apply_stock_delta(&mut self, id: Uuid, delta: i32) -> AppResult<Option<Sku>>;

    async fn insert_sku(&mut self, sku: NewSku) -> AppResult<Sku>;

    async fn update_sku(&mut self, id: Uuid, changes: SkuChanges) -> AppResult<Option<Sku>>;

    async fn delete_sku(&mut self, id: Uuid) -> AppResult<Option<Sku>>;
}

/// Stock movement rows as seen from inside a unit of work
#[async_trait]
pub trait MovementStore: Send {
    async fn find_movement(&mut self, id: Uuid) -> AppResult<Option<StockMovement>>;

    /// Like `find_movement`, but holds a row lock until the unit ends
    async fn lock_movement(&mut self, id: Uuid) -> AppResult<Option<StockMovement>>;

    async fn insert_movement(&mut self, movement: NewMovement) -> AppResult<StockMovement>;

    async fn update_movement(
        &mut self,
        id: Uuid,
        changes: MovementChanges,
    ) -> AppResult<Option<StockMovement>>;

    async fn delete_movement(&mut self, id: Uuid) -> AppResult<Option<StockMovement>>;

    async fn count_movements_for_sku(&mut self, sku_id: Uuid) -> AppResult<i64>;
}

/// One atomic transaction over both SKU and movement rows
#[async_trait]
pub trait UnitOfWork: SkuStore + MovementStore + Sized {
    /// Make every write of this unit durable. Dropping the unit instead
    /// discards all of them.
    async fn commit(self) -> AppResult<()>;
}
