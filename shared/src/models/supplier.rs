//! Supplier models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::types::Patch;

/// A vendor that SKUs are sourced from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Supplier {
    pub id: Uuid,
    pub name: String,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a supplier
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateSupplierInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(max = 100))]
    pub contact_person: Option<String>,
    #[validate(email, length(max = 255))]
    pub email: Option<String>,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
}

/// Partial update of a supplier
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSupplierInput {
    #[serde(default)]
    pub name: Patch<String>,
    #[serde(default)]
    pub contact_person: Patch<String>,
    #[serde(default)]
    pub email: Patch<String>,
    #[serde(default)]
    pub phone: Patch<String>,
    #[serde(default)]
    pub address: Patch<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supplier_email_is_validated() {
        let input = CreateSupplierInput {
            name: "Acme Fasteners".to_string(),
            contact_person: None,
            email: Some("not-an-email".to_string()),
            phone: None,
            address: None,
        };
        assert!(input.validate().is_err());

        let ok = CreateSupplierInput {
            email: Some("sales@acme.example".to_string()),
            ..input
        };
        assert!(ok.validate().is_ok());
    }
}
