//! Supplier management service

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use shared::models::{CreateSupplierInput, Supplier, UpdateSupplierInput};
use shared::types::{PaginatedResponse, Pagination, Patch};
use shared::validation::{validate_max_len, validate_name, validate_phone};

use super::keyword_pattern;
use crate::error::{AppError, AppResult};

const SUPPLIER_COLUMNS: &str =
    "id, name, contact_person, email, phone, address, created_at, updated_at";

/// Supplier service
#[derive(Clone)]
pub struct SupplierService {
    db: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct SupplierRow {
    id: Uuid,
    name: String,
    contact_person: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<SupplierRow> for Supplier {
    fn from(row: SupplierRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            contact_person: row.contact_person,
            email: row.email,
            phone: row.phone,
            address: row.address,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Resolved column values for an update
#[derive(Debug, PartialEq)]
struct SupplierValues {
    name: String,
    contact_person: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    address: Option<String>,
}

fn resolve_supplier_update(
    existing: Supplier,
    input: UpdateSupplierInput,
) -> AppResult<SupplierValues> {
    let name = match input.name {
        Patch::Unset => existing.name,
        Patch::Set(name) => name.trim().to_string(),
        Patch::Clear => return Err(AppError::validation("name", "name cannot be cleared")),
    };
    validate_name(&name, 255).map_err(|msg| AppError::validation("name", msg))?;

    let values = SupplierValues {
        name,
        contact_person: input.contact_person.apply_to(existing.contact_person),
        email: input.email.apply_to(existing.email),
        phone: input.phone.apply_to(existing.phone),
        address: input.address.apply_to(existing.address),
    };

    if let Some(contact) = &values.contact_person {
        validate_max_len(contact, 100)
            .map_err(|msg| AppError::validation("contact_person", msg))?;
    }
    if let Some(email) = &values.email {
        if !validator::validate_email(email.as_str()) {
            return Err(AppError::validation("email", "Invalid email format"));
        }
    }
    if let Some(phone) = &values.phone {
        validate_phone(phone).map_err(|msg| AppError::validation("phone", msg))?;
    }
    if let Some(address) = &values.address {
        validate_max_len(address, 500).map_err(|msg| AppError::validation("address", msg))?;
    }

    Ok(values)
}

impl SupplierService {
    /// Create a new SupplierService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List suppliers ordered by name, optionally filtered by a name keyword
    pub async fn list(
        &self,
        keyword: Option<&str>,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<Supplier>> {
        let pattern = keyword_pattern(keyword);

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM supplier WHERE ($1::text IS NULL OR name ILIKE $1)",
        )
        .bind(&pattern)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, SupplierRow>(&format!(
            r#"
            SELECT {SUPPLIER_COLUMNS}
            FROM supplier
            WHERE ($1::text IS NULL OR name ILIKE $1)
            ORDER BY name ASC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(&pattern)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(
            rows.into_iter().map(Supplier::from).collect(),
            pagination,
            total.max(0) as u64,
        ))
    }

    /// Get a supplier by ID
    pub async fn get(&self, supplier_id: Uuid) -> AppResult<Supplier> {
        let row = sqlx::query_as::<_, SupplierRow>(&format!(
            "SELECT {SUPPLIER_COLUMNS} FROM supplier WHERE id = $1"
        ))
        .bind(supplier_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Supplier".to_string()))?;

        Ok(row.into())
    }

    /// Create a new supplier
    pub async fn create(&self, input: CreateSupplierInput) -> AppResult<Supplier> {
        input.validate()?;
        validate_name(&input.name, 255).map_err(|msg| AppError::validation("name", msg))?;
        if let Some(phone) = &input.phone {
            validate_phone(phone).map_err(|msg| AppError::validation("phone", msg))?;
        }

        let row = sqlx::query_as::<_, SupplierRow>(&format!(
            r#"
            INSERT INTO supplier (name, contact_person, email, phone, address)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {SUPPLIER_COLUMNS}
            "#
        ))
        .bind(input.name.trim())
        .bind(&input.contact_person)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(&input.address)
        .fetch_one(&self.db)
        .await
        .map_err(|e| AppError::from_write(e, "name"))?;

        tracing::info!(supplier_id = %row.id, "Supplier created");
        Ok(row.into())
    }

    /// Update a supplier
    pub async fn update(
        &self,
        supplier_id: Uuid,
        input: UpdateSupplierInput,
    ) -> AppResult<Supplier> {
        let existing = self.get(supplier_id).await?;
        let values = resolve_supplier_update(existing, input)?;

        let row = sqlx::query_as::<_, SupplierRow>(&format!(
            r#"
            UPDATE supplier
            SET name = $1, contact_person = $2, email = $3, phone = $4, address = $5,
                updated_at = NOW()
            WHERE id = $6
            RETURNING {SUPPLIER_COLUMNS}
            "#
        ))
        .bind(&values.name)
        .bind(&values.contact_person)
        .bind(&values.email)
        .bind(&values.phone)
        .bind(&values.address)
        .bind(supplier_id)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| AppError::from_write(e, "name"))?
        .ok_or_else(|| AppError::NotFound("Supplier".to_string()))?;

        Ok(row.into())
    }

    /// Delete a supplier. SKUs sourced from it keep existing without a supplier.
    pub async fn delete(&self, supplier_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM supplier WHERE id = $1")
            .bind(supplier_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Supplier".to_string()));
        }

        tracing::info!(supplier_id = %supplier_id, "Supplier deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn supplier() -> Supplier {
        Supplier {
            id: Uuid::new_v4(),
            name: "Acme Fasteners".to_string(),
            contact_person: Some("J. Doe".to_string()),
            email: Some("sales@acme.example".to_string()),
            phone: Some("+66 2 123 4567".to_string()),
            address: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_update_keeps_unset_and_clears_cleared() {
        let input = UpdateSupplierInput {
            email: Patch::Clear,
            address: Patch::Set("12 Dock Road".to_string()),
            ..Default::default()
        };
        let values = resolve_supplier_update(supplier(), input).unwrap();
        assert_eq!(values.name, "Acme Fasteners");
        assert_eq!(values.email, None);
        assert_eq!(values.contact_person.as_deref(), Some("J. Doe"));
        assert_eq!(values.address.as_deref(), Some("12 Dock Road"));
    }

    #[test]
    fn test_update_rejects_bad_email() {
        let input = UpdateSupplierInput {
            email: Patch::Set("nobody".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            resolve_supplier_update(supplier(), input),
            Err(AppError::Validation { ref field, .. }) if field == "email"
        ));
    }

    #[test]
    fn test_update_rejects_clearing_name() {
        let input = UpdateSupplierInput {
            name: Patch::Clear,
            ..Default::default()
        };
        assert!(resolve_supplier_update(supplier(), input).is_err());
    }
}
