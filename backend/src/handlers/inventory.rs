//! HTTP handlers for low-stock alerts and inventory reports

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;

use shared::types::{DateRange, PaginatedResponse, Pagination};

use crate::error::AppResult;
use crate::services::inventory::{InventoryService, SkuListItem, StockReport, TransactionReport};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LowStockQuery {
    pub threshold: Option<i32>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct TransactionReportQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// SKUs at or below the stock threshold
pub async fn low_stock_alerts(
    State(state): State<AppState>,
    Query(query): Query<LowStockQuery>,
) -> AppResult<Json<PaginatedResponse<SkuListItem>>> {
    let threshold = query
        .threshold
        .unwrap_or(state.config.ledger.low_stock_threshold);
    let pagination = Pagination::new(query.page, query.per_page);

    let service = InventoryService::new(state.db);
    let items = service.low_stock(threshold, &pagination).await?;
    Ok(Json(items))
}

/// Stock on hand and its value at cost
pub async fn stock_report(State(state): State<AppState>) -> AppResult<Json<StockReport>> {
    let service = InventoryService::new(state.db);
    Ok(Json(service.stock_report().await?))
}

/// Quantities moved in and out per SKU over a date range
pub async fn transaction_report(
    State(state): State<AppState>,
    Query(query): Query<TransactionReportQuery>,
) -> AppResult<Json<TransactionReport>> {
    let service = InventoryService::new(state.db);
    let report = service
        .transaction_report(DateRange {
            start: query.start_date,
            end: query.end_date,
        })
        .await?;
    Ok(Json(report))
}
