//! HTTP handlers for purchase receipt endpoints

use axum::{extract::State, http::StatusCode, Json};
use shared::{DraftReceipt, DraftReceiptInput, PurchaseReceiptRecord};

use crate::error::AppResult;
use crate::AppState;

/// Recompute a draft's line amounts, tax breakup, and summary
pub async fn preview_receipt(
    State(state): State<AppState>,
    Json(input): Json<DraftReceiptInput>,
) -> AppResult<Json<DraftReceipt>> {
    Ok(Json(state.receipts.preview(input)?))
}

/// Commit a draft receipt and increment stock
pub async fn commit_receipt(
    State(state): State<AppState>,
    Json(draft): Json<DraftReceipt>,
) -> AppResult<(StatusCode, Json<PurchaseReceiptRecord>)> {
    let record = state.receipts.commit(&draft).await?;
    Ok((StatusCode::CREATED, Json(record)))
}
