//! Category and supplier HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use shared::models::{
    Category, CreateCategoryInput, CreateSupplierInput, Supplier, UpdateCategoryInput,
    UpdateSupplierInput,
};
use shared::types::{PaginatedResponse, Pagination};

use crate::error::AppResult;
use crate::services::{CategoryService, SupplierService};
use crate::AppState;

/// Query parameters for catalog listings
#[derive(Debug, Deserialize)]
pub struct CatalogListQuery {
    pub keyword: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl CatalogListQuery {
    fn pagination(&self) -> Pagination {
        Pagination::new(self.page, self.per_page)
    }
}

// ============================================================================
// Categories
// ============================================================================

/// List categories
pub async fn list_categories(
    State(state): State<AppState>,
    Query(query): Query<CatalogListQuery>,
) -> AppResult<Json<PaginatedResponse<Category>>> {
    let service = CategoryService::new(state.db);
    let categories = service
        .list(query.keyword.as_deref(), &query.pagination())
        .await?;
    Ok(Json(categories))
}

/// Get a category
pub async fn get_category(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
) -> AppResult<Json<Category>> {
    let service = CategoryService::new(state.db);
    Ok(Json(service.get(category_id).await?))
}

/// Create a category
pub async fn create_category(
    State(state): State<AppState>,
    Json(input): Json<CreateCategoryInput>,
) -> AppResult<(StatusCode, Json<Category>)> {
    let service = CategoryService::new(state.db);
    let category = service.create(input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// Update a category
pub async fn update_category(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
    Json(input): Json<UpdateCategoryInput>,
) -> AppResult<Json<Category>> {
    let service = CategoryService::new(state.db);
    Ok(Json(service.update(category_id, input).await?))
}

/// Delete a category
pub async fn delete_category(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = CategoryService::new(state.db);
    service.delete(category_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Suppliers
// ============================================================================

/// List suppliers
pub async fn list_suppliers(
    State(state): State<AppState>,
    Query(query): Query<CatalogListQuery>,
) -> AppResult<Json<PaginatedResponse<Supplier>>> {
    let service = SupplierService::new(state.db);
    let suppliers = service
        .list(query.keyword.as_deref(), &query.pagination())
        .await?;
    Ok(Json(suppliers))
}

/// Get a supplier
pub async fn get_supplier(
    State(state): State<AppState>,
    Path(supplier_id): Path<Uuid>,
) -> AppResult<Json<Supplier>> {
    let service = SupplierService::new(state.db);
    Ok(Json(service.get(supplier_id).await?))
}

/// Create a supplier
pub async fn create_supplier(
    State(state): State<AppState>,
    Json(input): Json<CreateSupplierInput>,
) -> AppResult<(StatusCode, Json<Supplier>)> {
    let service = SupplierService::new(state.db);
    let supplier = service.create(input).await?;
    Ok((StatusCode::CREATED, Json(supplier)))
}

/// Update a supplier
pub async fn update_supplier(
    State(state): State<AppState>,
    Path(supplier_id): Path<Uuid>,
    Json(input): Json<UpdateSupplierInput>,
) -> AppResult<Json<Supplier>> {
    let service = SupplierService::new(state.db);
    Ok(Json(service.update(supplier_id, input).await?))
}

/// Delete a supplier
pub async fn delete_supplier(
    State(state): State<AppState>,
    Path(supplier_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = SupplierService::new(state.db);
    service.delete(supplier_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
