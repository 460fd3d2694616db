//! Purchase receipt commit tests
//!
//! Tests for the commit sequence including:
//! - Validation runs before anything is persisted
//! - Stock movements are checked before the receipt is stored
//! - Stock moves only after the receipt is stored
//! - A failed write leaves stock and the draft untouched

mod common;

use chrono::NaiveDate;
use common::{
    committable_draft, dec, scenario_item, with_free_units, RecordingLedgerStore, RecordingStore,
};
use pharmacy_backend::services::{PurchaseReceiptAssembler, StockLedger};
use pharmacy_backend::AppError;
use shared::{DraftReceipt, DraftReceiptInput, LineItemEdit};
use std::sync::Arc;
use uuid::Uuid;

fn assembler(store: Arc<RecordingStore>, ledger: StockLedger) -> PurchaseReceiptAssembler {
    PurchaseReceiptAssembler::new(store, ledger, false)
}

// ============================================================================
// Successful Commit
// ============================================================================

#[cfg(test)]
mod commit_tests {
    use super::*;

    #[tokio::test]
    async fn test_commit_persists_and_creates_batch() {
        let store = Arc::new(RecordingStore::default());
        let ledger = StockLedger::new();
        let assembler = assembler(store.clone(), ledger.clone());
        let product_id = Uuid::new_v4();
        let draft = committable_draft(product_id, "B001");

        let record = assembler.commit(&draft).await.unwrap();

        assert_eq!(record.invoice_number, "GRN-000001");
        assert_eq!(record.receipt.sub_total, dec("900.00"));
        assert_eq!(record.receipt.tax_amount, dec("162.00"));
        assert_eq!(record.receipt.discount, dec("100.00"));
        assert_eq!(record.receipt.grand_total, dec("1062"));
        assert_eq!(store.requests().len(), 1);

        let batch = ledger.find_batch(product_id, "B001").await.unwrap();
        assert_eq!(batch.quantity, 10);
    }

    #[tokio::test]
    async fn test_commit_increments_existing_batch() {
        let seeded = common::batch(150);
        let store = Arc::new(RecordingStore::default());
        let ledger = StockLedger::with_batches([seeded.clone()]);
        let assembler = assembler(store, ledger.clone());

        let mut draft = committable_draft(seeded.product_id, &seeded.batch_number);
        draft
            .update_item(0, LineItemEdit::BatchId(Some(seeded.id)))
            .unwrap();

        assembler.commit(&draft).await.unwrap();

        assert_eq!(ledger.batch(seeded.id).await.unwrap().quantity, 160);
        assert!(ledger.adjustments(seeded.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invoice_date_defaults_to_today() {
        let store = Arc::new(RecordingStore::default());
        let assembler = assembler(store.clone(), StockLedger::new());

        assembler
            .commit(&committable_draft(Uuid::new_v4(), "B001"))
            .await
            .unwrap();

        let sent = store.requests();
        assert_eq!(sent[0].invoice_date, chrono::Utc::now().date_naive());
    }

    #[tokio::test]
    async fn test_free_units_are_informational_by_default() {
        let store = Arc::new(RecordingStore::default());
        let ledger = StockLedger::new();
        let product_id = Uuid::new_v4();
        let draft = with_free_units(committable_draft(product_id, "B001"), 2, 1);

        assembler(store, ledger.clone()).commit(&draft).await.unwrap();

        assert_eq!(ledger.find_batch(product_id, "B001").await.unwrap().quantity, 10);
    }

    #[tokio::test]
    async fn test_free_units_counted_when_enabled() {
        let store = Arc::new(RecordingStore::default());
        let ledger = StockLedger::new();
        let assembler = PurchaseReceiptAssembler::new(store, ledger.clone(), true);
        let product_id = Uuid::new_v4();
        let draft = with_free_units(committable_draft(product_id, "B001"), 2, 1);

        assembler.commit(&draft).await.unwrap();

        assert_eq!(ledger.find_batch(product_id, "B001").await.unwrap().quantity, 13);
    }

    #[tokio::test]
    async fn test_unslabbed_lines_still_commit() {
        let store = Arc::new(RecordingStore::default());
        let assembler = assembler(store.clone(), StockLedger::new());
        let mut draft = committable_draft(Uuid::new_v4(), "B001");
        draft.update_item(0, LineItemEdit::Cgst(dec("3"))).unwrap();
        draft.update_item(0, LineItemEdit::Sgst(dec("0"))).unwrap();

        let record = assembler.commit(&draft).await.unwrap();

        assert_eq!(record.receipt.tax_breakup.unslabbed.len(), 1);
        assert_eq!(record.receipt.tax_amount, dec("0.00"));
    }
}

// ============================================================================
// Rejected Commit
// ============================================================================

#[cfg(test)]
mod rejection_tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_supplier_is_rejected_before_persisting() {
        let store = Arc::new(RecordingStore::default());
        let assembler = assembler(store.clone(), StockLedger::new());
        let mut draft = committable_draft(Uuid::new_v4(), "B001");
        draft.set_supplier(None);

        let result = assembler.commit(&draft).await;

        assert!(matches!(
            result,
            Err(AppError::Validation { ref field, .. }) if field == "supplierId"
        ));
        assert!(store.requests().is_empty());
    }

    #[tokio::test]
    async fn test_empty_draft_is_rejected_before_persisting() {
        let store = Arc::new(RecordingStore::default());
        let assembler = assembler(store.clone(), StockLedger::new());
        let mut draft = DraftReceipt::new();
        draft.set_supplier(Some(Uuid::new_v4()));

        let result = assembler.commit(&draft).await;

        assert!(matches!(result, Err(AppError::Validation { .. })));
        assert!(store.requests().is_empty());
    }

    #[tokio::test]
    async fn test_item_without_expiry_is_rejected() {
        let store = Arc::new(RecordingStore::default());
        let assembler = assembler(store.clone(), StockLedger::new());
        let mut draft = committable_draft(Uuid::new_v4(), "B001");
        draft.update_item(0, LineItemEdit::ExpiryDate(None)).unwrap();

        assert!(assembler.commit(&draft).await.is_err());
        assert!(store.requests().is_empty());
    }

    #[tokio::test]
    async fn test_persistence_failure_leaves_stock_and_draft_untouched() {
        let seeded = common::batch(150);
        let store = Arc::new(RecordingStore::failing());
        let ledger = StockLedger::with_batches([seeded.clone()]);
        let assembler = assembler(store.clone(), ledger.clone());
        let draft = committable_draft(seeded.product_id, &seeded.batch_number);
        let summary_before = draft.summary().clone();

        let result = assembler.commit(&draft).await;

        let err = result.unwrap_err();
        assert!(matches!(err, AppError::Persistence(_)));
        assert!(err.is_retryable());
        assert_eq!(store.requests().len(), 1);
        assert_eq!(ledger.batch(seeded.id).await.unwrap().quantity, 150);
        assert_eq!(ledger.batches().await.len(), 1);
        assert_eq!(draft.summary(), &summary_before);
        assert_eq!(draft.items().len(), 1);
    }
}

// ============================================================================
// Stock Checks Before Persisting
// ============================================================================

#[cfg(test)]
mod stock_check_tests {
    use super::*;

    fn assert_batch_id_rejected(result: Result<shared::PurchaseReceiptRecord, AppError>) {
        assert!(matches!(
            result,
            Err(AppError::Validation { ref field, .. }) if field == "items[0].batchId"
        ));
    }

    #[tokio::test]
    async fn test_unknown_batch_id_is_rejected_before_persisting() {
        let store = Arc::new(RecordingStore::default());
        let ledger = StockLedger::new();
        let assembler = assembler(store.clone(), ledger.clone());
        let mut draft = committable_draft(Uuid::new_v4(), "B001");
        draft
            .update_item(0, LineItemEdit::BatchId(Some(Uuid::new_v4())))
            .unwrap();

        assert_batch_id_rejected(assembler.commit(&draft).await);
        assert!(store.requests().is_empty());
        assert!(ledger.batches().await.is_empty());
    }

    #[tokio::test]
    async fn test_batch_of_another_product_is_rejected() {
        let seeded = common::batch(150);
        let store = Arc::new(RecordingStore::default());
        let ledger = StockLedger::with_batches([seeded.clone()]);
        let assembler = assembler(store.clone(), ledger.clone());
        let mut draft = committable_draft(Uuid::new_v4(), &seeded.batch_number);
        draft
            .update_item(0, LineItemEdit::BatchId(Some(seeded.id)))
            .unwrap();

        assert_batch_id_rejected(assembler.commit(&draft).await);
        assert!(store.requests().is_empty());
        assert_eq!(ledger.batch(seeded.id).await.unwrap().quantity, 150);
    }

    #[tokio::test]
    async fn test_expiry_mismatch_is_rejected_before_persisting() {
        let seeded = common::batch(150);
        let store = Arc::new(RecordingStore::default());
        let ledger = StockLedger::with_batches([seeded.clone()]);
        let assembler = assembler(store.clone(), ledger.clone());
        let mut draft = committable_draft(seeded.product_id, &seeded.batch_number);
        let other_expiry = NaiveDate::from_ymd_opt(2027, 3, 31);
        draft
            .update_item(0, LineItemEdit::ExpiryDate(other_expiry))
            .unwrap();

        let result = assembler.commit(&draft).await;

        assert!(matches!(
            result,
            Err(AppError::Validation { ref field, .. }) if field == "items[0].expiryDate"
        ));
        assert!(store.requests().is_empty());
        assert_eq!(ledger.batch(seeded.id).await.unwrap().quantity, 150);
    }

    #[tokio::test]
    async fn test_ledger_write_failure_after_persisting_is_reported() {
        let seeded = common::batch(150);
        let ledger_store = Arc::new(RecordingLedgerStore::seeded(vec![seeded.clone()], Vec::new()));
        let ledger = StockLedger::load(ledger_store.clone()).await.unwrap();
        let store = Arc::new(RecordingStore::default());
        let assembler = assembler(store.clone(), ledger.clone());
        ledger_store.set_failing(true);

        let draft = committable_draft(seeded.product_id, &seeded.batch_number);
        let result = assembler.commit(&draft).await;

        let err = result.unwrap_err();
        assert!(matches!(err, AppError::Internal(ref message) if message.contains("GRN-000001")));
        assert!(!err.is_retryable());
        assert_eq!(store.requests().len(), 1);
        assert_eq!(ledger.batch(seeded.id).await.unwrap().quantity, 150);
    }
}

// ============================================================================
// Preview
// ============================================================================

#[cfg(test)]
mod preview_tests {
    use super::*;

    #[test]
    fn test_preview_recomputes_derived_fields() {
        let assembler = assembler(Arc::new(RecordingStore::default()), StockLedger::new());
        let mut item = scenario_item(Uuid::new_v4(), "B001");
        // A stale client-side amount is ignored
        item.amount = dec("1");

        let draft = assembler
            .preview(DraftReceiptInput {
                items: vec![item],
                tcs_amount: dec("0"),
                ..DraftReceiptInput::default()
            })
            .unwrap();

        assert_eq!(draft.items()[0].amount, dec("900.00"));
        assert_eq!(draft.tax_breakup().gst18.taxable, dec("900.00"));
        assert_eq!(draft.summary().invoice_amount, dec("1062"));
    }

    #[test]
    fn test_preview_rejects_figures_too_large_to_value() {
        let assembler = assembler(Arc::new(RecordingStore::default()), StockLedger::new());
        let mut item = scenario_item(Uuid::new_v4(), "B001");
        item.base_rate = dec("79228162514264337593543950");
        item.received_qty = 5000;

        let result = assembler.preview(DraftReceiptInput {
            items: vec![item],
            ..DraftReceiptInput::default()
        });

        assert!(matches!(
            result,
            Err(AppError::Validation { ref field, .. }) if field == "items[0].baseRate"
        ));
    }
}
