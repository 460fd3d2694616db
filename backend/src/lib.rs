//! Pharmacy back-office server library
//!
//! Hosts the stock ledger and the purchase receipt assembler behind a small
//! HTTP API. Valuation itself lives in the `shared` crate.

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod error;
pub mod external;
pub mod handlers;
pub mod routes;
pub mod services;

pub use config::Config;
pub use error::{AppError, AppResult};

use services::{PurchaseReceiptAssembler, StockLedger};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub ledger: StockLedger,
    pub receipts: PurchaseReceiptAssembler,
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Pharmacy Back-Office API v1.0"
}
