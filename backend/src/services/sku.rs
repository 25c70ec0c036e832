//! SKU registry: canonical SKU records and their on-hand quantity
//!
//! The registry never decides *why* stock changes. The stock ledger drives
//! every adjustment through [`adjust_stock`] inside its own unit of work.

use rust_decimal::Decimal;
use uuid::Uuid;
use validator::Validate;

use shared::models::{CreateSkuInput, NewSku, Sku, SkuChanges, UpdateSkuInput};
use shared::types::Patch;
use shared::validation::{validate_money, validate_name, validate_sku_code};

use crate::error::{AppError, AppResult};
use crate::store::{InventoryStore, MovementStore, SkuStore, UnitOfWork};

/// SKU registry service
#[derive(Clone)]
pub struct SkuRegistry<S> {
    store: S,
}

impl<S: InventoryStore> SkuRegistry<S> {
    /// Create a new SkuRegistry instance
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Get a SKU by id
    pub async fn get(&self, sku_id: Uuid) -> AppResult<Sku> {
        let mut unit = self.store.begin().await?;
        let sku = unit
            .find_sku(sku_id)
            .await?
            .ok_or_else(|| AppError::NotFound("SKU".to_string()))?;
        unit.commit().await?;
        Ok(sku)
    }

    /// Register a new SKU with an optional opening balance
    pub async fn create(&self, input: CreateSkuInput) -> AppResult<Sku> {
        input.validate()?;
        validate_sku_code(&input.sku_code).map_err(|msg| AppError::validation("sku_code", msg))?;
        validate_name(&input.name, 255).map_err(|msg| AppError::validation("name", msg))?;

        let cost_price = input.cost_price.unwrap_or(Decimal::ZERO);
        validate_money(cost_price).map_err(|msg| AppError::validation("cost_price", msg))?;

        let mut unit = self.store.begin().await?;
        let sku = unit
            .insert_sku(NewSku {
                sku_code: input.sku_code,
                name: input.name,
                category_id: input.category_id,
                supplier_id: input.supplier_id,
                cost_price,
                stock: input.initial_stock.unwrap_or(0),
            })
            .await?;
        unit.commit().await?;

        tracing::info!(sku_id = %sku.id, sku_code = %sku.sku_code, stock = sku.stock, "SKU registered");
        Ok(sku)
    }

    /// Update SKU master data. Stock can only change through the ledger.
    pub async fn update(&self, sku_id: Uuid, input: UpdateSkuInput) -> AppResult<Sku> {
        let mut unit = self.store.begin().await?;
        let existing = unit
            .find_sku(sku_id)
            .await?
            .ok_or_else(|| AppError::NotFound("SKU".to_string()))?;

        let changes = resolve_sku_changes(&existing, input)?;
        let sku = unit
            .update_sku(sku_id, changes)
            .await?
            .ok_or_else(|| AppError::NotFound("SKU".to_string()))?;
        unit.commit().await?;

        Ok(sku)
    }

    /// Delete a SKU.
    ///
    /// Blocked with `Conflict` while any stock movement references it; the
    /// movement history must be removed through the ledger first.
    pub async fn delete(&self, sku_id: Uuid) -> AppResult<Sku> {
        let mut unit = self.store.begin().await?;

        // Creating a movement locks the same row, so the count below is stable
        lock_stock(&mut unit, sku_id).await?;

        let movements = unit.count_movements_for_sku(sku_id).await?;
        if movements > 0 {
            tracing::warn!(sku_id = %sku_id, movements, "Refusing to delete SKU with movements");
            return Err(AppError::Conflict {
                resource: "sku".to_string(),
                message: format!(
                    "SKU has {} recorded stock movement(s) and cannot be deleted",
                    movements
                ),
            });
        }

        let sku = unit
            .delete_sku(sku_id)
            .await?
            .ok_or_else(|| AppError::NotFound("SKU".to_string()))?;
        unit.commit().await?;

        tracing::info!(sku_id = %sku.id, sku_code = %sku.sku_code, "SKU deleted");
        Ok(sku)
    }
}

/// Add `delta` (possibly negative) to a SKU's on-hand stock within `unit`.
///
/// No floor is enforced here; callers that must not overdraw check
/// [`lock_stock`] first.
pub async fn adjust_stock<U>(unit: &mut U, sku_id: Uuid, delta: i32) -> AppResult<Sku>
where
    U: SkuStore,
{
    let sku = unit
        .apply_stock_delta(sku_id, delta)
        .await?
        .ok_or_else(|| AppError::NotFound("SKU".to_string()))?;

    tracing::debug!(sku_id = %sku_id, delta, stock = sku.stock, "Stock adjusted");
    Ok(sku)
}

/// Current stock of a SKU, locked against concurrent adjustment for the rest of `unit`
pub async fn lock_stock<U>(unit: &mut U, sku_id: Uuid) -> AppResult<i32>
where
    U: SkuStore,
{
    unit.lock_sku_stock(sku_id)
        .await?
        .ok_or_else(|| AppError::NotFound("SKU".to_string()))
}

fn required<T>(patch: Patch<T>, current: T, field: &str) -> AppResult<T> {
    match patch {
        Patch::Unset => Ok(current),
        Patch::Set(value) => Ok(value),
        Patch::Clear => Err(AppError::validation(field, format!("{} cannot be cleared", field))),
    }
}

fn resolve_sku_changes(existing: &Sku, input: UpdateSkuInput) -> AppResult<SkuChanges> {
    let sku_code = required(input.sku_code, existing.sku_code.clone(), "sku_code")?;
    let name = required(input.name, existing.name.clone(), "name")?;
    let cost_price = required(input.cost_price, existing.cost_price, "cost_price")?;

    validate_sku_code(&sku_code).map_err(|msg| AppError::validation("sku_code", msg))?;
    validate_name(&name, 255).map_err(|msg| AppError::validation("name", msg))?;
    validate_money(cost_price).map_err(|msg| AppError::validation("cost_price", msg))?;

    Ok(SkuChanges {
        sku_code,
        name,
        category_id: input.category_id.apply_to(existing.category_id),
        supplier_id: input.supplier_id.apply_to(existing.supplier_id),
        cost_price,
    })
}
