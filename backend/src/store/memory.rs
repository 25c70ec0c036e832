//! In-memory inventory store.
//!
//! Units of work are serialized behind one async mutex and operate on a
//! private copy of the data, which replaces the shared state only on commit.
//! Intended for tests and local experiments.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use shared::models::{MovementChanges, NewMovement, NewSku, Sku, SkuChanges, StockMovement};

use super::{InventoryStore, MovementStore, SkuStore, UnitOfWork};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    skus: HashMap<Uuid, Sku>,
    movements: HashMap<Uuid, StockMovement>,
}

/// Shared in-memory store handle. Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    fail_stock_adjustments: Arc<AtomicBool>,
    transient_failures: Arc<AtomicU32>,
}

/// A unit of work over a snapshot of the in-memory state
pub struct MemoryUnit {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    fail_stock_adjustments: bool,
    fail_commit: bool,
}

/// Database error raised by the in-memory store in place of a server one
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct SimulatedDbError {
    code: String,
    constraint: Option<String>,
    message: String,
}

impl SimulatedDbError {
    pub fn new(code: &str, constraint: Option<&str>) -> Self {
        Self {
            code: code.to_string(),
            constraint: constraint.map(str::to_string),
            message: format!("simulated database error {}", code),
        }
    }
}

impl sqlx::error::DatabaseError for SimulatedDbError {
    fn message(&self) -> &str {
        &self.message
    }

    fn code(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed(&self.code))
    }

    fn constraint(&self) -> Option<&str> {
        self.constraint.as_deref()
    }

    fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self
    }

    fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
        self
    }

    fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
        self
    }

    fn kind(&self) -> sqlx::error::ErrorKind {
        match self.code.as_str() {
            "23505" => sqlx::error::ErrorKind::UniqueViolation,
            "23503" => sqlx::error::ErrorKind::ForeignKeyViolation,
            _ => sqlx::error::ErrorKind::Other,
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent stock adjustment fail, as if the store rejected it
    pub fn fail_stock_adjustments(&self, fail: bool) {
        self.fail_stock_adjustments.store(fail, Ordering::SeqCst);
    }

    /// Abort the commit of the next `count` units with a serialization
    /// failure (SQLSTATE 40001), as a contended database would
    pub fn fail_next_units_transiently(&self, count: u32) {
        self.transient_failures.store(count, Ordering::SeqCst);
    }

    /// Committed state of a SKU
    pub async fn sku(&self, id: Uuid) -> Option<Sku> {
        self.state.lock().await.skus.get(&id).cloned()
    }

    /// Committed state of a movement
    pub async fn movement(&self, id: Uuid) -> Option<StockMovement> {
        self.state.lock().await.movements.get(&id).cloned()
    }

    /// All committed movements for a SKU
    pub async fn movements_for(&self, sku_id: Uuid) -> Vec<StockMovement> {
        self.state
            .lock()
            .await
            .movements
            .values()
            .filter(|m| m.sku_id == sku_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl InventoryStore for MemoryStore {
    type Unit = MemoryUnit;

    async fn begin(&self) -> AppResult<MemoryUnit> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        let fail_commit = self
            .transient_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        Ok(MemoryUnit {
            guard,
            working,
            fail_stock_adjustments: self.fail_stock_adjustments.load(Ordering::SeqCst),
            fail_commit,
        })
    }
}

impl MemoryUnit {
    fn ensure_unique_code(&self, code: &str, except: Option<Uuid>) -> AppResult<()> {
        let taken = self
            .working
            .skus
            .values()
            .any(|s| s.sku_code == code && Some(s.id) != except);
        if taken {
            return Err(AppError::DuplicateEntry("sku_code".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl SkuStore for MemoryUnit {
    async fn find_sku(&mut self, id: Uuid) -> AppResult<Option<Sku>> {
        Ok(self.working.skus.get(&id).cloned())
    }

    async fn lock_sku_stock(&mut self, id: Uuid) -> AppResult<Option<i32>> {
        Ok(self.working.skus.get(&id).map(|s| s.stock))
    }

    async fn apply_stock_delta(&mut self, id: Uuid, delta: i32) -> AppResult<Option<Sku>> {
        if self.fail_stock_adjustments {
            return Err(AppError::Internal("stock adjustment rejected".to_string()));
        }

        let Some(sku) = self.working.skus.get_mut(&id) else {
            return Ok(None);
        };
        sku.stock = sku
            .stock
            .checked_add(delta)
            .ok_or_else(|| AppError::Internal("integer out of range".to_string()))?;
        sku.updated_at = Utc::now();
        Ok(Some(sku.clone()))
    }

    async fn insert_sku(&mut self, sku: NewSku) -> AppResult<Sku> {
        self.ensure_unique_code(&sku.sku_code, None)?;

        let now = Utc::now();
        let row = Sku {
            id: Uuid::new_v4(),
            sku_code: sku.sku_code,
            name: sku.name,
            category_id: sku.category_id,
            supplier_id: sku.supplier_id,
            cost_price: sku.cost_price,
            stock: sku.stock,
            created_at: now,
            updated_at: now,
        };
        self.working.skus.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_sku(&mut self, id: Uuid, changes: SkuChanges) -> AppResult<Option<Sku>> {
        self.ensure_unique_code(&changes.sku_code, Some(id))?;

        let Some(sku) = self.working.skus.get_mut(&id) else {
            return Ok(None);
        };
        sku.sku_code = changes.sku_code;
        sku.name = changes.name;
        sku.category_id = changes.category_id;
        sku.supplier_id = changes.supplier_id;
        sku.cost_price = changes.cost_price;
        sku.updated_at = Utc::now();
        Ok(Some(sku.clone()))
    }

    async fn delete_sku(&mut self, id: Uuid) -> AppResult<Option<Sku>> {
        if self.working.movements.values().any(|m| m.sku_id == id) {
            return Err(AppError::Conflict {
                resource: "sku".to_string(),
                message: "SKU has recorded stock movements and cannot be deleted".to_string(),
            });
        }
        Ok(self.working.skus.remove(&id))
    }
}

#[async_trait]
impl MovementStore for MemoryUnit {
    async fn find_movement(&mut self, id: Uuid) -> AppResult<Option<StockMovement>> {
        Ok(self.working.movements.get(&id).cloned())
    }

    async fn lock_movement(&mut self, id: Uuid) -> AppResult<Option<StockMovement>> {
        Ok(self.working.movements.get(&id).cloned())
    }

    async fn insert_movement(&mut self, movement: NewMovement) -> AppResult<StockMovement> {
        if !self.working.skus.contains_key(&movement.sku_id) {
            return Err(AppError::NotFound("SKU".to_string()));
        }

        let now = Utc::now();
        let row = StockMovement {
            id: Uuid::new_v4(),
            sku_id: movement.sku_id,
            direction: movement.direction,
            quantity: movement.quantity,
            unit_price: movement.unit_price,
            total_price: movement.total_price,
            document_number: movement.document_number,
            notes: movement.notes,
            created_by: movement.created_by,
            created_at: now,
            updated_at: now,
        };
        self.working.movements.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_movement(
        &mut self,
        id: Uuid,
        changes: MovementChanges,
    ) -> AppResult<Option<StockMovement>> {
        let Some(movement) = self.working.movements.get_mut(&id) else {
            return Ok(None);
        };
        movement.quantity = changes.quantity;
        movement.unit_price = changes.unit_price;
        movement.total_price = changes.total_price;
        movement.document_number = changes.document_number;
        movement.notes = changes.notes;
        movement.updated_at = Utc::now();
        Ok(Some(movement.clone()))
    }

    async fn delete_movement(&mut self, id: Uuid) -> AppResult<Option<StockMovement>> {
        Ok(self.working.movements.remove(&id))
    }

    async fn count_movements_for_sku(&mut self, sku_id: Uuid) -> AppResult<i64> {
        let count = self
            .working
            .movements
            .values()
            .filter(|m| m.sku_id == sku_id)
            .count();
        Ok(count as i64)
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnit {
    async fn commit(mut self) -> AppResult<()> {
        if self.fail_commit {
            return Err(AppError::DatabaseError(
                SimulatedDbError::new("40001", None).into(),
            ));
        }
        *self.guard = self.working;
        Ok(())
    }
}
