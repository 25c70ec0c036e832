//! Warehouse Inventory Server
//!
//! SKU registry and stock ledger for a single warehouse: every stock-in and
//! stock-out movement is recorded together with its effect on the SKU's
//! on-hand quantity, in one transaction.

use std::{sync::Arc, time::Duration};

use axum::{routing::get, Router};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod store;

pub use config::Config;

use services::{SkuRegistry, StockLedger};
use store::PgStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub config: Arc<Config>,
}

impl AppState {
    /// SKU registry over the shared pool
    pub fn sku_registry(&self) -> SkuRegistry<PgStore> {
        SkuRegistry::new(PgStore::new(self.db.clone()))
    }

    /// Stock ledger over the shared pool, with the configured retry budget
    pub fn stock_ledger(&self) -> StockLedger<PgStore> {
        StockLedger::new(PgStore::new(self.db.clone()))
            .with_max_retries(self.config.ledger.max_retries)
    }
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let timeout = Duration::from_secs(state.config.server.request_timeout_secs);

    Router::new()
        .route("/", get(root))
        .nest("/api/v1", routes::api_routes(state.clone()))
        .layer(TimeoutLayer::new(timeout))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Warehouse Inventory API v1"
}
