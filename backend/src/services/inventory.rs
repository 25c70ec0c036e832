//! Inventory read side: SKU and movement listings, low-stock alerts and reports
//!
//! Everything here reads committed rows straight from the pool. Writes go
//! through the SKU registry and the stock ledger.

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use shared::models::{MovementDirection, StockMovement};
use shared::types::{DateRange, PaginatedResponse, Pagination, SortOrder};

use super::keyword_pattern;
use crate::error::{AppError, AppResult};
use crate::store::postgres::MovementRow;

/// Inventory query service
#[derive(Clone)]
pub struct InventoryService {
    db: PgPool,
}

/// Columns a SKU listing may be ordered by
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkuSortField {
    Name,
    #[default]
    CreatedAt,
    Stock,
}

impl SkuSortField {
    fn column(&self) -> &'static str {
        match self {
            SkuSortField::Name => "s.name",
            SkuSortField::CreatedAt => "s.created_at",
            SkuSortField::Stock => "s.stock",
        }
    }
}

/// Query string for `GET /skus`
#[derive(Debug, Default, Deserialize)]
pub struct SkuListQuery {
    pub keyword: Option<String>,
    pub category_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    #[serde(default)]
    pub sort_by: SkuSortField,
    #[serde(default)]
    pub sort_order: SortOrder,
}

/// Columns a movement listing may be ordered by
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementSortField {
    #[default]
    CreatedAt,
    UpdatedAt,
}

impl MovementSortField {
    fn column(&self) -> &'static str {
        match self {
            MovementSortField::CreatedAt => "t.created_at",
            MovementSortField::UpdatedAt => "t.updated_at",
        }
    }
}

/// Query string for `GET /stock-in` and `GET /stock-out`
#[derive(Debug, Default, Deserialize)]
pub struct MovementListQuery {
    /// Matched against the SKU name and code
    pub keyword: Option<String>,
    pub sku_id: Option<Uuid>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    #[serde(default)]
    pub sort_by: MovementSortField,
    #[serde(default)]
    pub sort_order: SortOrder,
}

/// SKU with the names of its category and supplier
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SkuListItem {
    pub id: Uuid,
    pub sku_code: String,
    pub name: String,
    pub category_id: Option<Uuid>,
    pub category_name: Option<String>,
    pub supplier_id: Option<Uuid>,
    pub supplier_name: Option<String>,
    pub cost_price: Decimal,
    pub stock: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Movement with the SKU it applies to
#[derive(Debug, Clone, Serialize)]
pub struct MovementListItem {
    #[serde(flatten)]
    pub movement: StockMovement,
    pub sku_code: String,
    pub sku_name: String,
}

#[derive(Debug, FromRow)]
struct MovementListRow {
    #[sqlx(flatten)]
    movement: MovementRow,
    sku_code: String,
    sku_name: String,
}

impl TryFrom<MovementListRow> for MovementListItem {
    type Error = AppError;

    fn try_from(row: MovementListRow) -> Result<Self, Self::Error> {
        Ok(Self {
            movement: row.movement.try_into()?,
            sku_code: row.sku_code,
            sku_name: row.sku_name,
        })
    }
}

/// One line of the stock report
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StockReportItem {
    pub sku_id: Uuid,
    pub sku_code: String,
    pub name: String,
    pub category_name: Option<String>,
    pub stock: i32,
    pub cost_price: Decimal,
    pub inventory_value: Decimal,
}

/// Current stock and its value at cost
#[derive(Debug, Clone, Serialize)]
pub struct StockReport {
    pub items: Vec<StockReportItem>,
    pub total_skus: usize,
    pub total_stock: i64,
    pub total_inventory_value: Decimal,
}

impl StockReport {
    fn from_items(items: Vec<StockReportItem>) -> Self {
        let total_stock = items.iter().map(|i| i64::from(i.stock)).sum();
        let total_inventory_value = items.iter().map(|i| i.inventory_value).sum();
        Self {
            total_skus: items.len(),
            total_stock,
            total_inventory_value,
            items,
        }
    }
}

/// Movement totals for one SKU over a date range
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TransactionReportItem {
    pub sku_id: Uuid,
    pub sku_code: String,
    pub name: String,
    pub total_in: i64,
    pub total_out: i64,
    pub net_change: i64,
    pub transaction_count: i64,
}

/// Movement totals per SKU over a date range
#[derive(Debug, Clone, Serialize)]
pub struct TransactionReport {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub items: Vec<TransactionReportItem>,
    pub total_in: i64,
    pub total_out: i64,
}

/// Half-open UTC bounds covering every day of `range`
fn day_bounds(range: &DateRange) -> AppResult<(DateTime<Utc>, DateTime<Utc>)> {
    if range.start > range.end {
        return Err(AppError::validation(
            "start_date",
            "start_date must not be after end_date",
        ));
    }
    let end = range
        .end
        .checked_add_days(Days::new(1))
        .ok_or_else(|| AppError::validation("end_date", "end_date is out of range"))?;

    Ok((
        range.start.and_time(NaiveTime::MIN).and_utc(),
        end.and_time(NaiveTime::MIN).and_utc(),
    ))
}

impl InventoryService {
    /// Create a new InventoryService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List SKUs with keyword search over name and code
    pub async fn list_skus(&self, query: SkuListQuery) -> AppResult<PaginatedResponse<SkuListItem>> {
        let pagination = Pagination::new(query.page, query.per_page);
        let pattern = keyword_pattern(query.keyword.as_deref());

        let filter = r#"
            WHERE ($1::text IS NULL OR s.name ILIKE $1 OR s.sku_code ILIKE $1)
              AND ($2::uuid IS NULL OR s.category_id = $2)
              AND ($3::uuid IS NULL OR s.supplier_id = $3)
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM sku s {filter}"))
            .bind(&pattern)
            .bind(query.category_id)
            .bind(query.supplier_id)
            .fetch_one(&self.db)
            .await?;

        let items = sqlx::query_as::<_, SkuListItem>(&format!(
            r#"
            SELECT s.id, s.sku_code, s.name, s.category_id, c.name AS category_name,
                   s.supplier_id, sp.name AS supplier_name, s.cost_price, s.stock,
                   s.created_at, s.updated_at
            FROM sku s
            LEFT JOIN category c ON c.id = s.category_id
            LEFT JOIN supplier sp ON sp.id = s.supplier_id
            {filter}
            ORDER BY {} {}, s.id
            LIMIT $4 OFFSET $5
            "#,
            query.sort_by.column(),
            query.sort_order.as_sql(),
        ))
        .bind(&pattern)
        .bind(query.category_id)
        .bind(query.supplier_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(items, &pagination, total.max(0) as u64))
    }

    /// List movements of one direction with keyword search over the SKU
    pub async fn list_movements(
        &self,
        direction: MovementDirection,
        query: MovementListQuery,
    ) -> AppResult<PaginatedResponse<MovementListItem>> {
        let pagination = Pagination::new(query.page, query.per_page);
        let pattern = keyword_pattern(query.keyword.as_deref());

        let filter = r#"
            WHERE t.type = $1::stock_transaction_type
              AND ($2::text IS NULL OR s.name ILIKE $2 OR s.sku_code ILIKE $2)
              AND ($3::uuid IS NULL OR t.sku_id = $3)
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM stock_transaction t JOIN sku s ON s.id = t.sku_id {filter}"
        ))
        .bind(direction.as_str())
        .bind(&pattern)
        .bind(query.sku_id)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, MovementListRow>(&format!(
            r#"
            SELECT t.id, t.sku_id, t.type::text AS direction, t.quantity, t.unit_price,
                   t.total_price, t.document_number, t.notes, t.created_by,
                   t.created_at, t.updated_at,
                   s.sku_code, s.name AS sku_name
            FROM stock_transaction t
            JOIN sku s ON s.id = t.sku_id
            {filter}
            ORDER BY {} {}, t.id
            LIMIT $4 OFFSET $5
            "#,
            query.sort_by.column(),
            query.sort_order.as_sql(),
        ))
        .bind(direction.as_str())
        .bind(&pattern)
        .bind(query.sku_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let items = rows
            .into_iter()
            .map(MovementListItem::try_from)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(PaginatedResponse::new(items, &pagination, total.max(0) as u64))
    }

    /// SKUs whose stock is at or below `threshold`, lowest first
    pub async fn low_stock(
        &self,
        threshold: i32,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<SkuListItem>> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM sku WHERE stock <= $1")
            .bind(threshold)
            .fetch_one(&self.db)
            .await?;

        let items = sqlx::query_as::<_, SkuListItem>(
            r#"
            SELECT s.id, s.sku_code, s.name, s.category_id, c.name AS category_name,
                   s.supplier_id, sp.name AS supplier_name, s.cost_price, s.stock,
                   s.created_at, s.updated_at
            FROM sku s
            LEFT JOIN category c ON c.id = s.category_id
            LEFT JOIN supplier sp ON sp.id = s.supplier_id
            WHERE s.stock <= $1
            ORDER BY s.stock ASC, s.name ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(threshold)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        if total > 0 {
            tracing::debug!(threshold, total, "Low-stock SKUs found");
        }

        Ok(PaginatedResponse::new(items, pagination, total.max(0) as u64))
    }

    /// Stock on hand and inventory value at cost for every SKU
    pub async fn stock_report(&self) -> AppResult<StockReport> {
        let items = sqlx::query_as::<_, StockReportItem>(
            r#"
            SELECT s.id AS sku_id, s.sku_code, s.name, c.name AS category_name,
                   s.stock, s.cost_price, s.cost_price * s.stock AS inventory_value
            FROM sku s
            LEFT JOIN category c ON c.id = s.category_id
            ORDER BY s.name ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(StockReport::from_items(items))
    }

    /// Quantities moved in and out per SKU between two dates, inclusive
    pub async fn transaction_report(&self, range: DateRange) -> AppResult<TransactionReport> {
        let (from, until) = day_bounds(&range)?;

        let items = sqlx::query_as::<_, TransactionReportItem>(
            r#"
            SELECT s.id AS sku_id, s.sku_code, s.name,
                   COALESCE(SUM(CASE WHEN t.type = 'IN' THEN t.quantity ELSE 0 END), 0)::bigint AS total_in,
                   COALESCE(SUM(CASE WHEN t.type = 'OUT' THEN t.quantity ELSE 0 END), 0)::bigint AS total_out,
                   COALESCE(SUM(CASE WHEN t.type = 'IN' THEN t.quantity ELSE -t.quantity END), 0)::bigint AS net_change,
                   COUNT(t.id) AS transaction_count
            FROM stock_transaction t
            JOIN sku s ON s.id = t.sku_id
            WHERE t.created_at >= $1 AND t.created_at < $2
            GROUP BY s.id, s.sku_code, s.name
            ORDER BY s.name ASC
            "#,
        )
        .bind(from)
        .bind(until)
        .fetch_all(&self.db)
        .await?;

        let total_in = items.iter().map(|i| i.total_in).sum();
        let total_out = items.iter().map(|i| i.total_out).sum();

        Ok(TransactionReport {
            start_date: range.start,
            end_date: range.end,
            items,
            total_in,
            total_out,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_day_bounds_include_whole_end_day() {
        let range = DateRange {
            start: date(2024, 3, 1),
            end: date(2024, 3, 31),
        };
        let (from, until) = day_bounds(&range).unwrap();
        assert_eq!(from.to_rfc3339(), "2024-03-01T00:00:00+00:00");
        assert_eq!(until.to_rfc3339(), "2024-04-01T00:00:00+00:00");
    }

    #[test]
    fn test_day_bounds_reject_inverted_range() {
        let range = DateRange {
            start: date(2024, 4, 2),
            end: date(2024, 4, 1),
        };
        assert!(matches!(day_bounds(&range), Err(AppError::Validation { .. })));
    }

    #[test]
    fn test_sort_fields_map_to_whitelisted_columns() {
        assert_eq!(SkuSortField::default().column(), "s.created_at");
        assert_eq!(SkuSortField::Stock.column(), "s.stock");
        assert_eq!(MovementSortField::UpdatedAt.column(), "t.updated_at");
    }

    #[test]
    fn test_sku_query_deserializes_sort_options() {
        let query: SkuListQuery =
            serde_json::from_str(r#"{"sort_by": "stock", "sort_order": "asc"}"#).unwrap();
        assert_eq!(query.sort_by, SkuSortField::Stock);
        assert_eq!(query.sort_order, SortOrder::Asc);
    }

    #[test]
    fn test_stock_report_totals() {
        let item = |stock: i32, cost: i64| StockReportItem {
            sku_id: Uuid::new_v4(),
            sku_code: "X".to_string(),
            name: "x".to_string(),
            category_name: None,
            stock,
            cost_price: Decimal::from(cost),
            inventory_value: Decimal::from(cost) * Decimal::from(stock),
        };
        let report = StockReport::from_items(vec![item(10, 3), item(-2, 5), item(4, 0)]);
        assert_eq!(report.total_skus, 3);
        assert_eq!(report.total_stock, 12);
        assert_eq!(report.total_inventory_value, Decimal::from(20));
    }
}
