//! Stock ledger: the only writer of stock movements and the only caller of
//! SKU stock adjustments
//!
//! Each operation runs as one unit of work: the movement row and the matching
//! stock delta are committed together or not at all. Row locks taken through
//! the store keep concurrent operations on the same SKU or movement from
//! interleaving, and transient conflicts are retried as whole units.

use std::future::Future;

use rust_decimal::Decimal;
use uuid::Uuid;

use shared::models::{
    compute_total_price, AmendMovementInput, CreateMovementInput, MovementChanges,
    MovementDirection, NewMovement, StockMovement,
};
use shared::types::Patch;
use shared::validation::{max_money, validate_document_number, validate_money, validate_quantity};

use super::sku::{adjust_stock, lock_stock};
use crate::error::{AppError, AppResult};
use crate::store::{InventoryStore, MovementStore, UnitOfWork};

/// Default number of extra attempts for a unit aborted by a transient conflict
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Stock ledger service
#[derive(Clone)]
pub struct StockLedger<S> {
    store: S,
    max_retries: u32,
}

impl<S: InventoryStore> StockLedger<S> {
    /// Create a new StockLedger instance
    pub fn new(store: S) -> Self {
        Self {
            store,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Record a stock-in or stock-out movement and apply it to the SKU's stock.
    ///
    /// Stock-out movements are refused with `InsufficientStock` when they would
    /// take more than is on hand.
    pub async fn create_movement(
        &self,
        direction: MovementDirection,
        actor_id: Option<Uuid>,
        input: CreateMovementInput,
    ) -> AppResult<StockMovement> {
        let movement = prepare_new_movement(direction, actor_id, input)?;

        let created = self
            .with_retry("create_movement", || self.try_create(movement.clone()))
            .await?;

        tracing::info!(
            movement_id = %created.id,
            sku_id = %created.sku_id,
            direction = %direction,
            delta = created.stock_delta(),
            "Stock movement recorded"
        );
        Ok(created)
    }

    /// Amend quantity, prices, document number or notes of an existing movement
    /// and re-balance the SKU's stock by the quantity difference.
    pub async fn amend_movement(
        &self,
        direction: MovementDirection,
        movement_id: Uuid,
        input: AmendMovementInput,
    ) -> AppResult<StockMovement> {
        validate_amendment(&input)?;

        let (before, after) = self
            .with_retry("amend_movement", || {
                self.try_amend(direction, movement_id, input.clone())
            })
            .await?;

        tracing::info!(
            movement_id = %after.id,
            sku_id = %after.sku_id,
            direction = %direction,
            delta = direction.amend_delta(before.quantity, after.quantity),
            "Stock movement amended"
        );
        Ok(after)
    }

    /// Remove a movement and reverse its effect on the SKU's stock.
    ///
    /// Returns the movement as it was before deletion. The reversal is applied
    /// even when it leaves stock negative.
    pub async fn delete_movement(
        &self,
        direction: MovementDirection,
        movement_id: Uuid,
    ) -> AppResult<StockMovement> {
        let deleted = self
            .with_retry("delete_movement", || self.try_delete(direction, movement_id))
            .await?;

        tracing::info!(
            movement_id = %deleted.id,
            sku_id = %deleted.sku_id,
            direction = %direction,
            delta = direction.reversal_delta(deleted.quantity),
            "Stock movement deleted"
        );
        Ok(deleted)
    }

    /// Get a movement of the given direction
    pub async fn get_movement(
        &self,
        direction: MovementDirection,
        movement_id: Uuid,
    ) -> AppResult<StockMovement> {
        let mut unit = self.store.begin().await?;
        let movement = unit
            .find_movement(movement_id)
            .await?
            .filter(|m| m.direction == direction)
            .ok_or_else(|| not_found(direction))?;
        unit.commit().await?;
        Ok(movement)
    }

    async fn try_create(&self, movement: NewMovement) -> AppResult<StockMovement> {
        let mut unit = self.store.begin().await?;

        let available = lock_stock(&mut unit, movement.sku_id).await?;
        if movement.direction == MovementDirection::Out && movement.quantity > available {
            tracing::warn!(
                sku_id = %movement.sku_id,
                available,
                requested = movement.quantity,
                "Stock-out refused: insufficient stock"
            );
            return Err(AppError::InsufficientStock {
                available,
                requested: movement.quantity,
            });
        }

        let delta = movement.direction.stock_delta(movement.quantity);
        let created = unit.insert_movement(movement).await?;
        adjust_stock(&mut unit, created.sku_id, delta).await?;

        unit.commit().await?;
        Ok(created)
    }

    async fn try_amend(
        &self,
        direction: MovementDirection,
        movement_id: Uuid,
        input: AmendMovementInput,
    ) -> AppResult<(StockMovement, StockMovement)> {
        let mut unit = self.store.begin().await?;

        let existing = unit
            .lock_movement(movement_id)
            .await?
            .ok_or_else(|| not_found(direction))?;
        ensure_direction(&existing, direction)?;

        let changes = resolve_amendment(&existing, input)?;
        let quantity_difference = changes.quantity - existing.quantity;

        if direction == MovementDirection::Out && quantity_difference > 0 {
            let available = lock_stock(&mut unit, existing.sku_id).await?;
            if quantity_difference > available {
                tracing::warn!(
                    movement_id = %movement_id,
                    available,
                    additional = quantity_difference,
                    "Stock-out amendment refused: insufficient stock"
                );
                return Err(AppError::InsufficientStock {
                    available,
                    requested: quantity_difference,
                });
            }
        }

        let updated = unit
            .update_movement(movement_id, changes)
            .await?
            .ok_or_else(|| not_found(direction))?;

        if quantity_difference != 0 {
            let delta = direction.amend_delta(existing.quantity, updated.quantity);
            adjust_stock(&mut unit, existing.sku_id, delta).await?;
        }

        unit.commit().await?;
        Ok((existing, updated))
    }

    async fn try_delete(
        &self,
        direction: MovementDirection,
        movement_id: Uuid,
    ) -> AppResult<StockMovement> {
        let mut unit = self.store.begin().await?;

        let existing = unit
            .lock_movement(movement_id)
            .await?
            .ok_or_else(|| not_found(direction))?;
        ensure_direction(&existing, direction)?;

        let deleted = unit
            .delete_movement(movement_id)
            .await?
            .ok_or_else(|| not_found(direction))?;
        adjust_stock(
            &mut unit,
            deleted.sku_id,
            direction.reversal_delta(deleted.quantity),
        )
        .await?;

        unit.commit().await?;
        Ok(deleted)
    }

    /// Run `attempt` until it succeeds, fails permanently, or the retry budget
    /// for transient conflicts is spent
    async fn with_retry<T, F, Fut>(&self, operation: &'static str, mut attempt: F) -> AppResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let mut retries = 0;
        loop {
            match attempt().await {
                Err(err) if err.is_transient() && retries < self.max_retries => {
                    retries += 1;
                    tracing::warn!(operation, retries, "Retrying unit of work: {}", err);
                }
                result => return result,
            }
        }
    }
}

fn not_found(direction: MovementDirection) -> AppError {
    match direction {
        MovementDirection::In => AppError::NotFound("Stock-in transaction".to_string()),
        MovementDirection::Out => AppError::NotFound("Stock-out transaction".to_string()),
    }
}

fn ensure_direction(movement: &StockMovement, expected: MovementDirection) -> AppResult<()> {
    if movement.direction != expected {
        return Err(AppError::InvalidRequest(format!(
            "Transaction {} is a {} movement and cannot be changed as {}",
            movement.id,
            movement.direction.label(),
            expected.label()
        )));
    }
    Ok(())
}

fn checked_total(quantity: i32, unit_price: Decimal) -> AppResult<Decimal> {
    compute_total_price(quantity, unit_price)
        .filter(|total| *total <= max_money())
        .ok_or_else(|| AppError::validation("total_price", "Total price is too large"))
}

/// Validate a create request and resolve it into row values
fn prepare_new_movement(
    direction: MovementDirection,
    actor_id: Option<Uuid>,
    input: CreateMovementInput,
) -> AppResult<NewMovement> {
    validate_quantity(input.quantity).map_err(|msg| AppError::validation("quantity", msg))?;

    let unit_price = input.unit_price.unwrap_or(Decimal::ZERO);
    validate_money(unit_price).map_err(|msg| AppError::validation("unit_price", msg))?;

    if let Some(doc) = &input.document_number {
        validate_document_number(doc)
            .map_err(|msg| AppError::validation("document_number", msg))?;
    }

    let total_price = checked_total(input.quantity, unit_price)?;

    Ok(NewMovement {
        sku_id: input.sku_id,
        direction,
        quantity: input.quantity,
        unit_price,
        total_price,
        document_number: input.document_number,
        notes: input.notes,
        created_by: actor_id,
    })
}

/// Field checks that do not depend on the stored movement
fn validate_amendment(input: &AmendMovementInput) -> AppResult<()> {
    for (field, cleared) in [
        ("quantity", input.quantity.is_clear()),
        ("unit_price", input.unit_price.is_clear()),
        ("total_price", input.total_price.is_clear()),
    ] {
        if cleared {
            return Err(AppError::validation(field, format!("{} cannot be cleared", field)));
        }
    }

    if let Some(quantity) = input.quantity.as_set() {
        validate_quantity(*quantity).map_err(|msg| AppError::validation("quantity", msg))?;
    }
    if let Some(price) = input.unit_price.as_set() {
        validate_money(*price).map_err(|msg| AppError::validation("unit_price", msg))?;
    }
    if let Some(total) = input.total_price.as_set() {
        validate_money(*total).map_err(|msg| AppError::validation("total_price", msg))?;
    }
    if let Some(doc) = input.document_number.as_set() {
        validate_document_number(doc)
            .map_err(|msg| AppError::validation("document_number", msg))?;
    }
    Ok(())
}

/// Merge an amendment onto the stored movement.
///
/// Total price follows an explicit value when one is given, is recomputed when
/// quantity or unit price changes, and is otherwise kept.
fn resolve_amendment(
    existing: &StockMovement,
    input: AmendMovementInput,
) -> AppResult<MovementChanges> {
    let quantity = input.quantity.as_set().copied().unwrap_or(existing.quantity);
    let unit_price = input
        .unit_price
        .as_set()
        .copied()
        .unwrap_or(existing.unit_price);

    let total_price = match input.total_price {
        Patch::Set(total) => total,
        Patch::Unset | Patch::Clear
            if quantity != existing.quantity || unit_price != existing.unit_price =>
        {
            checked_total(quantity, unit_price)?
        }
        Patch::Unset | Patch::Clear => existing.total_price,
    };

    Ok(MovementChanges {
        quantity,
        unit_price,
        total_price,
        document_number: input.document_number.apply_to(existing.document_number.clone()),
        notes: input.notes.apply_to(existing.notes.clone()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn movement(direction: MovementDirection, quantity: i32, unit_price: i64) -> StockMovement {
        let unit_price = Decimal::from(unit_price);
        StockMovement {
            id: Uuid::new_v4(),
            sku_id: Uuid::new_v4(),
            direction,
            quantity,
            unit_price,
            total_price: unit_price * Decimal::from(quantity),
            document_number: Some("PO-001".to_string()),
            notes: Some("first delivery".to_string()),
            created_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn create_input(quantity: i32) -> CreateMovementInput {
        CreateMovementInput {
            sku_id: Uuid::new_v4(),
            quantity,
            unit_price: None,
            document_number: None,
            notes: None,
        }
    }

    #[test]
    fn test_prepare_defaults_unit_price_to_zero() {
        let prepared = prepare_new_movement(MovementDirection::In, None, create_input(7)).unwrap();
        assert_eq!(prepared.unit_price, Decimal::ZERO);
        assert_eq!(prepared.total_price, Decimal::ZERO);
    }

    #[test]
    fn test_prepare_computes_total_price() {
        let input = CreateMovementInput {
            unit_price: Some(Decimal::new(1999, 2)),
            ..create_input(3)
        };
        let prepared = prepare_new_movement(MovementDirection::Out, None, input).unwrap();
        assert_eq!(prepared.total_price, Decimal::new(5997, 2));
        assert_eq!(prepared.direction, MovementDirection::Out);
    }

    #[test]
    fn test_prepare_rejects_non_positive_quantity() {
        for quantity in [0, -3] {
            let err = prepare_new_movement(MovementDirection::In, None, create_input(quantity))
                .unwrap_err();
            assert!(matches!(err, AppError::Validation { ref field, .. } if field == "quantity"));
        }
    }

    #[test]
    fn test_prepare_rejects_total_beyond_column_range() {
        let input = CreateMovementInput {
            unit_price: Some(Decimal::new(999_999_999_999, 2)),
            ..create_input(2)
        };
        let err = prepare_new_movement(MovementDirection::In, None, input).unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "total_price"));
    }

    #[test]
    fn test_validate_amendment_rejects_cleared_quantity() {
        let input = AmendMovementInput {
            quantity: Patch::Clear,
            ..Default::default()
        };
        assert!(validate_amendment(&input).is_err());
    }

    #[test]
    fn test_resolve_amendment_recomputes_total_on_quantity_change() {
        let existing = movement(MovementDirection::In, 5, 10);
        let input = AmendMovementInput {
            quantity: Patch::Set(8),
            ..Default::default()
        };
        let changes = resolve_amendment(&existing, input).unwrap();
        assert_eq!(changes.quantity, 8);
        assert_eq!(changes.total_price, Decimal::from(80));
    }

    #[test]
    fn test_resolve_amendment_keeps_explicit_total() {
        let existing = movement(MovementDirection::In, 5, 10);
        let input = AmendMovementInput {
            quantity: Patch::Set(8),
            total_price: Patch::Set(Decimal::from(75)),
            ..Default::default()
        };
        let changes = resolve_amendment(&existing, input).unwrap();
        assert_eq!(changes.total_price, Decimal::from(75));
    }

    #[test]
    fn test_resolve_amendment_keeps_total_when_pricing_untouched() {
        let mut existing = movement(MovementDirection::Out, 5, 10);
        existing.total_price = Decimal::from(45); // negotiated discount
        let input = AmendMovementInput {
            notes: Patch::Set("re-counted".to_string()),
            ..Default::default()
        };
        let changes = resolve_amendment(&existing, input).unwrap();
        assert_eq!(changes.total_price, Decimal::from(45));
        assert_eq!(changes.notes.as_deref(), Some("re-counted"));
    }

    #[test]
    fn test_resolve_amendment_clears_document_number() {
        let existing = movement(MovementDirection::In, 5, 10);
        let input = AmendMovementInput {
            document_number: Patch::Clear,
            ..Default::default()
        };
        let changes = resolve_amendment(&existing, input).unwrap();
        assert_eq!(changes.document_number, None);
        assert_eq!(changes.notes, existing.notes);
    }

    #[test]
    fn test_ensure_direction_rejects_mismatch() {
        let existing = movement(MovementDirection::In, 5, 10);
        assert!(ensure_direction(&existing, MovementDirection::In).is_ok());
        assert!(matches!(
            ensure_direction(&existing, MovementDirection::Out),
            Err(AppError::InvalidRequest(_))
        ));
    }
}
