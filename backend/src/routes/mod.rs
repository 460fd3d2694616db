//! Route definitions for the pharmacy back-office API

use axum::{
    routing::{get, post},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Purchase receipts (GRN)
        .nest("/receipts", receipt_routes())
        // Stock batches and adjustments
        .nest("/stock", stock_routes())
}

/// Purchase receipt routes
fn receipt_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::commit_receipt))
        .route("/preview", post(handlers::preview_receipt))
}

/// Stock routes
fn stock_routes() -> Router<AppState> {
    Router::new()
        .route("/adjustments", post(handlers::create_adjustment))
        .route("/batches", get(handlers::list_batches))
        .route("/batches/:batch_id", get(handlers::get_batch))
        .route(
            "/batches/:batch_id/adjustments",
            get(handlers::list_batch_adjustments),
        )
}
