//! Purchase receipt assembly and commit
//!
//! Order on commit: validate, check the stock movements, persist, then
//! increment stock. Stock is never touched before the receipt is durably
//! stored, and a persistence failure leaves both stock and the caller's draft
//! as they were. Commits run one at a time so the check still holds when the
//! increment is applied.

use chrono::Utc;
use shared::{
    validate_draft_for_commit, DomainError, DraftReceipt, DraftReceiptInput,
    PurchaseReceiptRecord, ReceiptLine,
};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{ReceiptStore, StockLedger};
use crate::error::{AppError, AppResult};

/// Orchestrates valuation and commit of draft receipts
#[derive(Clone)]
pub struct PurchaseReceiptAssembler {
    store: Arc<dyn ReceiptStore>,
    ledger: StockLedger,
    include_free_quantity: bool,
    commits: Arc<Mutex<()>>,
}

impl PurchaseReceiptAssembler {
    pub fn new(
        store: Arc<dyn ReceiptStore>,
        ledger: StockLedger,
        include_free_quantity: bool,
    ) -> Self {
        Self {
            store,
            ledger,
            include_free_quantity,
            commits: Arc::new(Mutex::new(())),
        }
    }

    /// Recompute every derived figure of a draft without committing it
    pub fn preview(&self, input: DraftReceiptInput) -> AppResult<DraftReceipt> {
        Ok(DraftReceipt::try_from(input)?)
    }

    /// Stock movements a draft will produce on commit
    pub fn receipt_lines(&self, draft: &DraftReceipt) -> AppResult<Vec<ReceiptLine>> {
        draft
            .items()
            .iter()
            .enumerate()
            .map(|(index, item)| -> AppResult<ReceiptLine> {
                let expiry = item.expiry_date.ok_or_else(|| {
                    DomainError::validation(
                        format!("items[{}].expiryDate", index),
                        "Expiry date is required",
                    )
                })?;
                Ok(ReceiptLine {
                    batch_id: item.batch_id,
                    product_id: item.product_id,
                    batch_number: item.batch_number.trim().to_string(),
                    quantity: item.stock_quantity(self.include_free_quantity),
                    expiry,
                })
            })
            .collect()
    }

    /// Validate, persist, and move stock for a draft.
    ///
    /// Persistence errors are surfaced as [`AppError::Persistence`] and never
    /// retried here.
    pub async fn commit(&self, draft: &DraftReceipt) -> AppResult<PurchaseReceiptRecord> {
        validate_draft_for_commit(draft)?;
        let lines = self.receipt_lines(draft)?;
        let request = draft.to_commit_request(Utc::now().date_naive())?;

        let _commit = self.commits.lock().await;
        self.ledger.check_receipt_lines(&lines).await?;

        for unslabbed in &request.tax_breakup.unslabbed {
            tracing::warn!(
                line = unslabbed.index,
                combined_rate = %unslabbed.combined_rate,
                amount = %unslabbed.amount,
                "GST rate matches no slab; line excluded from tax breakup"
            );
        }

        let record = self.store.create_receipt(&request).await.map_err(|e| {
            tracing::error!("Failed to persist purchase receipt: {}", e);
            AppError::Persistence(e.to_string())
        })?;

        // The receipt is stored; retrying would store it twice
        if let Err(e) = self.ledger.apply_receipt_lines(&lines).await {
            tracing::error!(
                invoice_number = %record.invoice_number,
                "Receipt persisted but stock increment failed: {}",
                e
            );
            return Err(AppError::Internal(format!(
                "Receipt {} was saved but stock was not updated",
                record.invoice_number
            )));
        }

        tracing::info!(
            invoice_number = %record.invoice_number,
            items = request.items.len(),
            invoice_amount = %request.grand_total,
            "Purchase receipt committed"
        );

        Ok(record)
    }
}
