//! Stock-in and stock-out HTTP handlers
//!
//! The route decides the direction; clients never send it and cannot change it.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use shared::models::{AmendMovementInput, CreateMovementInput, MovementDirection, StockMovement};
use shared::types::PaginatedResponse;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::inventory::{InventoryService, MovementListItem, MovementListQuery};
use crate::AppState;

async fn list(
    state: AppState,
    direction: MovementDirection,
    query: MovementListQuery,
) -> AppResult<Json<PaginatedResponse<MovementListItem>>> {
    let service = InventoryService::new(state.db);
    let movements = service.list_movements(direction, query).await?;
    Ok(Json(movements))
}

async fn create(
    state: AppState,
    direction: MovementDirection,
    current_user: CurrentUser,
    input: CreateMovementInput,
) -> AppResult<(StatusCode, Json<StockMovement>)> {
    let movement = state
        .stock_ledger()
        .create_movement(direction, Some(current_user.0.user_id), input)
        .await?;
    Ok((StatusCode::CREATED, Json(movement)))
}

// ============================================================================
// Stock-in
// ============================================================================

/// List stock-in transactions
pub async fn list_stock_in(
    State(state): State<AppState>,
    Query(query): Query<MovementListQuery>,
) -> AppResult<Json<PaginatedResponse<MovementListItem>>> {
    list(state, MovementDirection::In, query).await
}

/// Record goods received
pub async fn create_stock_in(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateMovementInput>,
) -> AppResult<(StatusCode, Json<StockMovement>)> {
    create(state, MovementDirection::In, current_user, input).await
}

/// Get a stock-in transaction
pub async fn get_stock_in(
    State(state): State<AppState>,
    Path(movement_id): Path<Uuid>,
) -> AppResult<Json<StockMovement>> {
    let movement = state
        .stock_ledger()
        .get_movement(MovementDirection::In, movement_id)
        .await?;
    Ok(Json(movement))
}

/// Amend a stock-in transaction
pub async fn amend_stock_in(
    State(state): State<AppState>,
    Path(movement_id): Path<Uuid>,
    Json(input): Json<AmendMovementInput>,
) -> AppResult<Json<StockMovement>> {
    let movement = state
        .stock_ledger()
        .amend_movement(MovementDirection::In, movement_id, input)
        .await?;
    Ok(Json(movement))
}

/// Delete a stock-in transaction and take its quantity back out of stock
pub async fn delete_stock_in(
    State(state): State<AppState>,
    Path(movement_id): Path<Uuid>,
) -> AppResult<Json<StockMovement>> {
    let movement = state
        .stock_ledger()
        .delete_movement(MovementDirection::In, movement_id)
        .await?;
    Ok(Json(movement))
}

// ============================================================================
// Stock-out
// ============================================================================

/// List stock-out transactions
pub async fn list_stock_out(
    State(state): State<AppState>,
    Query(query): Query<MovementListQuery>,
) -> AppResult<Json<PaginatedResponse<MovementListItem>>> {
    list(state, MovementDirection::Out, query).await
}

/// Record goods issued
pub async fn create_stock_out(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateMovementInput>,
) -> AppResult<(StatusCode, Json<StockMovement>)> {
    create(state, MovementDirection::Out, current_user, input).await
}

/// Get a stock-out transaction
pub async fn get_stock_out(
    State(state): State<AppState>,
    Path(movement_id): Path<Uuid>,
) -> AppResult<Json<StockMovement>> {
    let movement = state
        .stock_ledger()
        .get_movement(MovementDirection::Out, movement_id)
        .await?;
    Ok(Json(movement))
}

/// Amend a stock-out transaction
pub async fn amend_stock_out(
    State(state): State<AppState>,
    Path(movement_id): Path<Uuid>,
    Json(input): Json<AmendMovementInput>,
) -> AppResult<Json<StockMovement>> {
    let movement = state
        .stock_ledger()
        .amend_movement(MovementDirection::Out, movement_id, input)
        .await?;
    Ok(Json(movement))
}

/// Delete a stock-out transaction and return its quantity to stock
pub async fn delete_stock_out(
    State(state): State<AppState>,
    Path(movement_id): Path<Uuid>,
) -> AppResult<Json<StockMovement>> {
    let movement = state
        .stock_ledger()
        .delete_movement(MovementDirection::Out, movement_id)
        .await?;
    Ok(Json(movement))
}
