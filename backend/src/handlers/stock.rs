//! HTTP handlers for stock batch and adjustment endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use shared::{AdjustmentInput, StockAdjustment, StockBatch};
use uuid::Uuid;

use crate::error::AppResult;
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustmentResponse {
    pub success: bool,
    pub updated_quantity: u64,
    pub adjustment: StockAdjustment,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchQuery {
    pub product_id: Option<Uuid>,
    pub batch_number: Option<String>,
}

/// Apply a manual stock adjustment
pub async fn create_adjustment(
    State(state): State<AppState>,
    Json(input): Json<AdjustmentInput>,
) -> AppResult<Json<AdjustmentResponse>> {
    let adjustment = state.ledger.submit_adjustment(input).await?;
    Ok(Json(AdjustmentResponse {
        success: true,
        updated_quantity: adjustment.resulting_quantity,
        adjustment,
    }))
}

/// List batches, optionally narrowed to one product and batch number
pub async fn list_batches(
    State(state): State<AppState>,
    Query(query): Query<BatchQuery>,
) -> Json<Vec<StockBatch>> {
    let batches = match (query.product_id, query.batch_number) {
        (Some(product_id), Some(batch_number)) => state
            .ledger
            .find_batch(product_id, &batch_number)
            .await
            .into_iter()
            .collect(),
        (Some(product_id), None) => state
            .ledger
            .batches()
            .await
            .into_iter()
            .filter(|batch| batch.product_id == product_id)
            .collect(),
        (None, Some(batch_number)) => {
            let wanted = batch_number.trim().to_uppercase();
            state
                .ledger
                .batches()
                .await
                .into_iter()
                .filter(|batch| batch.batch_number.trim().to_uppercase() == wanted)
                .collect()
        }
        (None, None) => state.ledger.batches().await,
    };
    Json(batches)
}

/// Get one batch
pub async fn get_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> AppResult<Json<StockBatch>> {
    let batch = state.ledger.batch(batch_id).await?;
    Ok(Json(batch))
}

/// Adjustment history for a batch, newest first
pub async fn list_batch_adjustments(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> AppResult<Json<Vec<StockAdjustment>>> {
    let adjustments = state.ledger.adjustments(batch_id).await?;
    Ok(Json(adjustments))
}
