//! Stock movement models and the signed-delta arithmetic behind them

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::types::Patch;

/// Whether a movement receives stock into the warehouse or issues it out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MovementDirection {
    In,
    Out,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown movement direction: {0}")]
pub struct ParseDirectionError(pub String);

impl MovementDirection {
    /// Value stored in the `stock_transaction_type` enum column
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementDirection::In => "IN",
            MovementDirection::Out => "OUT",
        }
    }

    /// Human readable label used in error messages
    pub fn label(&self) -> &'static str {
        match self {
            MovementDirection::In => "stock-in",
            MovementDirection::Out => "stock-out",
        }
    }

    /// Effect on on-hand stock of a movement of `quantity` units.
    pub fn stock_delta(&self, quantity: i32) -> i32 {
        match self {
            MovementDirection::In => quantity,
            MovementDirection::Out => -quantity,
        }
    }

    /// Stock adjustment needed when a movement's quantity changes from
    /// `old_quantity` to `new_quantity`. Both quantities are positive, so the
    /// difference cannot overflow.
    pub fn amend_delta(&self, old_quantity: i32, new_quantity: i32) -> i32 {
        self.stock_delta(new_quantity - old_quantity)
    }

    /// Stock adjustment that undoes a movement of `quantity` units.
    pub fn reversal_delta(&self, quantity: i32) -> i32 {
        -self.stock_delta(quantity)
    }
}

impl fmt::Display for MovementDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementDirection {
    type Err = ParseDirectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IN" => Ok(MovementDirection::In),
            "OUT" => Ok(MovementDirection::Out),
            other => Err(ParseDirectionError(other.to_string())),
        }
    }
}

/// A recorded inbound or outbound stock event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: Uuid,
    pub sku_id: Uuid,
    #[serde(rename = "type")]
    pub direction: MovementDirection,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub document_number: Option<String>,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StockMovement {
    /// Signed effect this movement currently has on its SKU's stock
    pub fn stock_delta(&self) -> i32 {
        self.direction.stock_delta(self.quantity)
    }
}

/// Input for recording a stock-in or stock-out movement.
/// The direction comes from the endpoint, never from the body.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMovementInput {
    pub sku_id: Uuid,
    pub quantity: i32,
    pub unit_price: Option<Decimal>,
    pub document_number: Option<String>,
    pub notes: Option<String>,
}

/// Partial update for an existing movement. Direction is not amendable.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AmendMovementInput {
    #[serde(default, skip_serializing_if = "Patch::is_unset")]
    pub quantity: Patch<i32>,
    #[serde(default, skip_serializing_if = "Patch::is_unset")]
    pub unit_price: Patch<Decimal>,
    #[serde(default, skip_serializing_if = "Patch::is_unset")]
    pub total_price: Patch<Decimal>,
    #[serde(default, skip_serializing_if = "Patch::is_unset")]
    pub document_number: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_unset")]
    pub notes: Patch<String>,
}

/// Fully resolved row values for inserting a movement
#[derive(Debug, Clone)]
pub struct NewMovement {
    pub sku_id: Uuid,
    pub direction: MovementDirection,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub document_number: Option<String>,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
}

/// Fully resolved row values for an amended movement
#[derive(Debug, Clone, PartialEq)]
pub struct MovementChanges {
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub document_number: Option<String>,
    pub notes: Option<String>,
}

/// `quantity × unit_price`, or `None` when the product overflows
pub fn compute_total_price(quantity: i32, unit_price: Decimal) -> Option<Decimal> {
    unit_price.checked_mul(Decimal::from(quantity))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_delta_sign() {
        assert_eq!(MovementDirection::In.stock_delta(100), 100);
        assert_eq!(MovementDirection::Out.stock_delta(30), -30);
    }

    #[test]
    fn test_amend_delta_in() {
        // IN 5 -> 8 adds three more units
        assert_eq!(MovementDirection::In.amend_delta(5, 8), 3);
        assert_eq!(MovementDirection::In.amend_delta(8, 5), -3);
    }

    #[test]
    fn test_amend_delta_out() {
        // OUT 5 -> 3 gives two units back
        assert_eq!(MovementDirection::Out.amend_delta(5, 3), 2);
        assert_eq!(MovementDirection::Out.amend_delta(30, 50), -20);
    }

    #[test]
    fn test_amend_delta_extremes_do_not_overflow() {
        assert_eq!(MovementDirection::In.amend_delta(1, i32::MAX), i32::MAX - 1);
        assert_eq!(MovementDirection::Out.amend_delta(i32::MAX, 1), i32::MAX - 1);
    }

    #[test]
    fn test_reversal_cancels_delta() {
        for direction in [MovementDirection::In, MovementDirection::Out] {
            let q = 42;
            assert_eq!(direction.stock_delta(q) + direction.reversal_delta(q), 0);
        }
    }

    #[test]
    fn test_direction_round_trips_through_column_value() {
        assert_eq!("IN".parse::<MovementDirection>(), Ok(MovementDirection::In));
        assert_eq!("OUT".parse::<MovementDirection>(), Ok(MovementDirection::Out));
        assert!("in".parse::<MovementDirection>().is_err());
    }

    #[test]
    fn test_direction_serializes_uppercase() {
        assert_eq!(
            serde_json::to_string(&MovementDirection::Out).unwrap(),
            "\"OUT\""
        );
    }

    #[test]
    fn test_compute_total_price() {
        let unit = Decimal::new(1250, 2); // 12.50
        assert_eq!(compute_total_price(4, unit), Some(Decimal::new(5000, 2)));
        assert_eq!(compute_total_price(3, Decimal::ZERO), Some(Decimal::ZERO));
        assert_eq!(compute_total_price(2, Decimal::MAX), None);
    }

    #[test]
    fn test_amend_input_distinguishes_clear_from_missing() {
        let input: AmendMovementInput =
            serde_json::from_str(r#"{"quantity": 8, "notes": null}"#).unwrap();
        assert_eq!(input.quantity, Patch::Set(8));
        assert_eq!(input.notes, Patch::Clear);
        assert!(input.document_number.is_unset());
        assert!(input.unit_price.is_unset());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn direction() -> impl Strategy<Value = MovementDirection> {
            prop_oneof![Just(MovementDirection::In), Just(MovementDirection::Out)]
        }

        proptest! {
            /// Amending is the same as reversing the old movement and applying the new one
            #[test]
            fn prop_amend_equals_reverse_then_apply(
                direction in direction(),
                old in 1..=i32::MAX,
                new in 1..=i32::MAX,
            ) {
                let composed = i64::from(direction.reversal_delta(old))
                    + i64::from(direction.stock_delta(new));
                prop_assert_eq!(i64::from(direction.amend_delta(old, new)), composed);
            }

            #[test]
            fn prop_reversal_cancels_any_quantity(
                direction in direction(),
                quantity in 1..=i32::MAX,
            ) {
                prop_assert_eq!(direction.stock_delta(quantity) + direction.reversal_delta(quantity), 0);
            }

            #[test]
            fn prop_total_price_is_exact_for_cent_prices(
                quantity in 1..100_000i32,
                cents in 0..10_000_000i64,
            ) {
                let unit = Decimal::new(cents, 2);
                let total = compute_total_price(quantity, unit).unwrap();
                prop_assert_eq!(total, Decimal::new(cents * i64::from(quantity), 2));
            }
        }
    }
}
