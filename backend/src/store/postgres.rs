//! PostgreSQL implementation of the inventory store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use shared::models::{
    MovementChanges, MovementDirection, NewMovement, NewSku, Sku, SkuChanges, StockMovement,
};

use super::{InventoryStore, MovementStore, SkuStore, UnitOfWork};
use crate::error::{AppError, AppResult};

const SKU_COLUMNS: &str = "id, sku_code, name, category_id, supplier_id, cost_price, stock, created_at, updated_at";

const MOVEMENT_COLUMNS: &str = "id, sku_id, type::text AS direction, quantity, unit_price, total_price, \
     document_number, notes, created_by, created_at, updated_at";

/// Store handle backed by a connection pool
#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

/// A unit of work backed by one PostgreSQL transaction.
/// sqlx rolls the transaction back when this is dropped without commit.
pub struct PgUnit {
    tx: Transaction<'static, Postgres>,
}

#[derive(Debug, FromRow)]
pub(crate) struct SkuRow {
    pub id: Uuid,
    pub sku_code: String,
    pub name: String,
    pub category_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    pub cost_price: Decimal,
    pub stock: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<SkuRow> for Sku {
    fn from(row: SkuRow) -> Self {
        Self {
            id: row.id,
            sku_code: row.sku_code,
            name: row.name,
            category_id: row.category_id,
            supplier_id: row.supplier_id,
            cost_price: row.cost_price,
            stock: row.stock,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct MovementRow {
    pub id: Uuid,
    pub sku_id: Uuid,
    pub direction: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub document_number: Option<String>,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<MovementRow> for StockMovement {
    type Error = AppError;

    fn try_from(row: MovementRow) -> Result<Self, Self::Error> {
        let direction = row
            .direction
            .parse::<MovementDirection>()
            .map_err(|e| AppError::Internal(e.to_string()))?;

        Ok(Self {
            id: row.id,
            sku_id: row.sku_id,
            direction,
            quantity: row.quantity,
            unit_price: row.unit_price,
            total_price: row.total_price,
            document_number: row.document_number,
            notes: row.notes,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_movement(row: Option<MovementRow>) -> AppResult<Option<StockMovement>> {
    row.map(StockMovement::try_from).transpose()
}

#[async_trait]
impl InventoryStore for PgStore {
    type Unit = PgUnit;

    async fn begin(&self) -> AppResult<PgUnit> {
        let tx = self.db.begin().await?;
        Ok(PgUnit { tx })
    }
}

#[async_trait]
impl SkuStore for PgUnit {
    async fn find_sku(&mut self, id: Uuid) -> AppResult<Option<Sku>> {
        let row = sqlx::query_as::<_, SkuRow>(&format!(
            "SELECT {SKU_COLUMNS} FROM sku WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Sku::from))
    }

    async fn lock_sku_stock(&mut self, id: Uuid) -> AppResult<Option<i32>> {
        let stock = sqlx::query_scalar::<_, i32>("SELECT stock FROM sku WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(stock)
    }

    async fn apply_stock_delta(&mut self, id: Uuid, delta: i32) -> AppResult<Option<Sku>> {
        let row = sqlx::query_as::<_, SkuRow>(&format!(
            r#"
            UPDATE sku
            SET stock = stock + $1, updated_at = NOW()
            WHERE id = $2
            RETURNING {SKU_COLUMNS}
            "#
        ))
        .bind(delta)
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Sku::from))
    }

    async fn insert_sku(&mut self, sku: NewSku) -> AppResult<Sku> {
        let row = sqlx::query_as::<_, SkuRow>(&format!(
            r#"
            INSERT INTO sku (sku_code, name, category_id, supplier_id, cost_price, stock)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {SKU_COLUMNS}
            "#
        ))
        .bind(&sku.sku_code)
        .bind(&sku.name)
        .bind(sku.category_id)
        .bind(sku.supplier_id)
        .bind(sku.cost_price)
        .bind(sku.stock)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| AppError::from_write(e, "sku_code"))?;

        Ok(row.into())
    }

    async fn update_sku(&mut self, id: Uuid, changes: SkuChanges) -> AppResult<Option<Sku>> {
        let row = sqlx::query_as::<_, SkuRow>(&format!(
            r#"
            UPDATE sku
            SET sku_code = $1, name = $2, category_id = $3, supplier_id = $4,
                cost_price = $5, updated_at = NOW()
            WHERE id = $6
            RETURNING {SKU_COLUMNS}
            "#
        ))
        .bind(&changes.sku_code)
        .bind(&changes.name)
        .bind(changes.category_id)
        .bind(changes.supplier_id)
        .bind(changes.cost_price)
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| AppError::from_write(e, "sku_code"))?;

        Ok(row.map(Sku::from))
    }

    async fn delete_sku(&mut self, id: Uuid) -> AppResult<Option<Sku>> {
        let result = sqlx::query_as::<_, SkuRow>(&format!(
            "DELETE FROM sku WHERE id = $1 RETURNING {SKU_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await;

        match result {
            Ok(row) => Ok(row.map(Sku::from)),
            // ON DELETE RESTRICT from stock_transaction
            Err(sqlx::Error::Database(db)) if db.code().as_deref() == Some("23503") => {
                Err(AppError::Conflict {
                    resource: "sku".to_string(),
                    message: "SKU has recorded stock movements and cannot be deleted".to_string(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl MovementStore for PgUnit {
    async fn find_movement(&mut self, id: Uuid) -> AppResult<Option<StockMovement>> {
        let row = sqlx::query_as::<_, MovementRow>(&format!(
            "SELECT {MOVEMENT_COLUMNS} FROM stock_transaction WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        into_movement(row)
    }

    async fn lock_movement(&mut self, id: Uuid) -> AppResult<Option<StockMovement>> {
        let row = sqlx::query_as::<_, MovementRow>(&format!(
            "SELECT {MOVEMENT_COLUMNS} FROM stock_transaction WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        into_movement(row)
    }

    async fn insert_movement(&mut self, movement: NewMovement) -> AppResult<StockMovement> {
        let row = sqlx::query_as::<_, MovementRow>(&format!(
            r#"
            INSERT INTO stock_transaction (
                sku_id, type, quantity, unit_price, total_price,
                document_number, notes, created_by
            )
            VALUES ($1, $2::stock_transaction_type, $3, $4, $5, $6, $7, $8)
            RETURNING {MOVEMENT_COLUMNS}
            "#
        ))
        .bind(movement.sku_id)
        .bind(movement.direction.as_str())
        .bind(movement.quantity)
        .bind(movement.unit_price)
        .bind(movement.total_price)
        .bind(&movement.document_number)
        .bind(&movement.notes)
        .bind(movement.created_by)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| AppError::from_write(e, "stock_transaction"))?;

        row.try_into()
    }

    async fn update_movement(
        &mut self,
        id: Uuid,
        changes: MovementChanges,
    ) -> AppResult<Option<StockMovement>> {
        let row = sqlx::query_as::<_, MovementRow>(&format!(
            r#"
            UPDATE stock_transaction
            SET quantity = $1, unit_price = $2, total_price = $3,
                document_number = $4, notes = $5, updated_at = NOW()
            WHERE id = $6
            RETURNING {MOVEMENT_COLUMNS}
            "#
        ))
        .bind(changes.quantity)
        .bind(changes.unit_price)
        .bind(changes.total_price)
        .bind(&changes.document_number)
        .bind(&changes.notes)
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        into_movement(row)
    }

    async fn delete_movement(&mut self, id: Uuid) -> AppResult<Option<StockMovement>> {
        let row = sqlx::query_as::<_, MovementRow>(&format!(
            "DELETE FROM stock_transaction WHERE id = $1 RETURNING {MOVEMENT_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        into_movement(row)
    }

    async fn count_movements_for_sku(&mut self, sku_id: Uuid) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM stock_transaction WHERE sku_id = $1",
        )
        .bind(sku_id)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(count)
    }
}

#[async_trait]
impl UnitOfWork for PgUnit {
    async fn commit(self) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
