//! SKU HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use shared::models::{CreateSkuInput, Sku, UpdateSkuInput};
use shared::types::PaginatedResponse;

use crate::error::AppResult;
use crate::services::inventory::{InventoryService, SkuListQuery, SkuListItem};
use crate::AppState;

/// List SKUs
pub async fn list_skus(
    State(state): State<AppState>,
    Query(query): Query<SkuListQuery>,
) -> AppResult<Json<PaginatedResponse<SkuListItem>>> {
    let service = InventoryService::new(state.db);
    let skus = service.list_skus(query).await?;
    Ok(Json(skus))
}

/// Get a SKU by ID
pub async fn get_sku(
    State(state): State<AppState>,
    Path(sku_id): Path<Uuid>,
) -> AppResult<Json<Sku>> {
    let sku = state.sku_registry().get(sku_id).await?;
    Ok(Json(sku))
}

/// Register a new SKU
pub async fn create_sku(
    State(state): State<AppState>,
    Json(input): Json<CreateSkuInput>,
) -> AppResult<(StatusCode, Json<Sku>)> {
    let sku = state.sku_registry().create(input).await?;
    Ok((StatusCode::CREATED, Json(sku)))
}

/// Update SKU master data
pub async fn update_sku(
    State(state): State<AppState>,
    Path(sku_id): Path<Uuid>,
    Json(input): Json<UpdateSkuInput>,
) -> AppResult<Json<Sku>> {
    let sku = state.sku_registry().update(sku_id, input).await?;
    Ok(Json(sku))
}

/// Delete a SKU that has no recorded movements
pub async fn delete_sku(
    State(state): State<AppState>,
    Path(sku_id): Path<Uuid>,
) -> AppResult<Json<Sku>> {
    let sku = state.sku_registry().delete(sku_id).await?;
    Ok(Json(sku))
}
