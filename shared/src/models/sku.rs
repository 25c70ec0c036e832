//! SKU (stock-keeping unit) models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::types::Patch;

/// A stocked item and its on-hand quantity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sku {
    pub id: Uuid,
    pub sku_code: String,
    pub name: String,
    pub category_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    pub cost_price: Decimal,
    /// On-hand quantity. Only the stock ledger changes this after creation.
    pub stock: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for registering a new SKU
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateSkuInput {
    #[validate(length(min = 1, max = 50))]
    pub sku_code: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub category_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    pub cost_price: Option<Decimal>,
    /// Opening balance, defaults to zero
    #[validate(range(min = 0))]
    pub initial_stock: Option<i32>,
}

/// Partial update of SKU master data. Stock is deliberately absent.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UpdateSkuInput {
    #[serde(default, skip_serializing_if = "Patch::is_unset")]
    pub sku_code: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_unset")]
    pub name: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_unset")]
    pub category_id: Patch<Uuid>,
    #[serde(default, skip_serializing_if = "Patch::is_unset")]
    pub supplier_id: Patch<Uuid>,
    #[serde(default, skip_serializing_if = "Patch::is_unset")]
    pub cost_price: Patch<Decimal>,
}

/// Resolved values for inserting a SKU row
#[derive(Debug, Clone)]
pub struct NewSku {
    pub sku_code: String,
    pub name: String,
    pub category_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    pub cost_price: Decimal,
    pub stock: i32,
}

/// Resolved values for an updated SKU row
#[derive(Debug, Clone, PartialEq)]
pub struct SkuChanges {
    pub sku_code: String,
    pub name: String,
    pub category_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    pub cost_price: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_input_rejects_negative_opening_stock() {
        let input = CreateSkuInput {
            sku_code: "BOLT-M8".to_string(),
            name: "Hex bolt M8".to_string(),
            category_id: None,
            supplier_id: None,
            cost_price: None,
            initial_stock: Some(-1),
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_update_input_has_no_stock_field() {
        let input: UpdateSkuInput = serde_json::from_str(r#"{"name": "Renamed"}"#).unwrap();
        assert_eq!(input.name, Patch::Set("Renamed".to_string()));
        let echoed = serde_json::to_value(&input).unwrap();
        assert!(echoed.get("stock").is_none());
    }
}
