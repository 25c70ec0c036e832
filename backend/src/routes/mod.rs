//! Route definitions for the warehouse inventory service

use axum::{
    middleware,
    routing::get,
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .nest("/skus", sku_routes())
        .nest("/categories", category_routes())
        .nest("/suppliers", supplier_routes())
        .nest("/stock-in", stock_in_routes())
        .nest("/stock-out", stock_out_routes())
        .nest("/alerts", alert_routes())
        .nest("/reports", report_routes())
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        .merge(protected)
}

/// SKU registry routes
fn sku_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_skus).post(handlers::create_sku))
        .route(
            "/:sku_id",
            get(handlers::get_sku)
                .patch(handlers::update_sku)
                .delete(handlers::delete_sku),
        )
}

/// Category routes
fn category_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_categories).post(handlers::create_category),
        )
        .route(
            "/:category_id",
            get(handlers::get_category)
                .patch(handlers::update_category)
                .delete(handlers::delete_category),
        )
}

/// Supplier routes
fn supplier_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_suppliers).post(handlers::create_supplier),
        )
        .route(
            "/:supplier_id",
            get(handlers::get_supplier)
                .patch(handlers::update_supplier)
                .delete(handlers::delete_supplier),
        )
}

/// Stock-in ledger routes
fn stock_in_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_stock_in).post(handlers::create_stock_in),
        )
        .route(
            "/:movement_id",
            get(handlers::get_stock_in)
                .patch(handlers::amend_stock_in)
                .delete(handlers::delete_stock_in),
        )
}

/// Stock-out ledger routes
fn stock_out_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_stock_out).post(handlers::create_stock_out),
        )
        .route(
            "/:movement_id",
            get(handlers::get_stock_out)
                .patch(handlers::amend_stock_out)
                .delete(handlers::delete_stock_out),
        )
}

/// Alert routes
fn alert_routes() -> Router<AppState> {
    Router::new().route("/low-stock", get(handlers::low_stock_alerts))
}

/// Reporting routes
fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/stock", get(handlers::stock_report))
        .route("/transactions", get(handlers::transaction_report))
}
