//! Shared fixtures for backend integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use pharmacy_backend::services::{BatchWrite, LedgerStore, ReceiptStore, StoreError};
use rust_decimal::Decimal;
use shared::{
    CommitRequest, DraftReceipt, LineItem, LineItemEdit, PurchaseReceiptRecord, StockAdjustment,
    StockBatch,
};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub fn expiry() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 12, 31).unwrap()
}

/// A batch with the given quantity and a fresh id
pub fn batch(quantity: u64) -> StockBatch {
    let now = Utc::now();
    let product_id = Uuid::new_v4();
    StockBatch {
        id: Uuid::new_v4(),
        product_id,
        batch_number: "AMX-2401".to_string(),
        quantity,
        expiry: expiry(),
        sku: shared::generate_sku(product_id, "AMX-2401"),
        created_at: now,
        updated_at: now,
    }
}

/// baseRate=100, receivedQty=10, discount 10%, CGST 9 + SGST 9, MRP 120
pub fn scenario_item(product_id: Uuid, batch_number: &str) -> LineItem {
    let mut item = LineItem::new(product_id);
    item.batch_number = batch_number.to_string();
    item.expiry_date = Some(expiry());
    item.base_rate = dec("100");
    item.received_qty = 10;
    item.discount_percent = dec("10");
    item.cgst = dec("9");
    item.sgst = dec("9");
    item.mrp = dec("120");
    item
}

/// Draft with a supplier and one scenario item
pub fn committable_draft(product_id: Uuid, batch_number: &str) -> DraftReceipt {
    let mut draft = DraftReceipt::new();
    draft.set_supplier(Some(Uuid::new_v4()));
    draft.add_item(scenario_item(product_id, batch_number)).unwrap();
    draft
}

pub fn with_free_units(mut draft: DraftReceipt, physical: u32, scheme: u32) -> DraftReceipt {
    draft.update_item(0, LineItemEdit::PhysicalFreeQty(physical)).unwrap();
    draft.update_item(0, LineItemEdit::SchemeFreeQty(scheme)).unwrap();
    draft
}

/// In-memory receipt store that records every request it receives
#[derive(Default)]
pub struct RecordingStore {
    pub fail: bool,
    sequence: AtomicI64,
    requests: Mutex<Vec<CommitRequest>>,
}

impl RecordingStore {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<CommitRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReceiptStore for RecordingStore {
    async fn create_receipt(
        &self,
        request: &CommitRequest,
    ) -> Result<PurchaseReceiptRecord, StoreError> {
        self.requests.lock().unwrap().push(request.clone());
        if self.fail {
            return Err(StoreError::Request("connection reset".to_string()));
        }
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(PurchaseReceiptRecord {
            id: Uuid::new_v4(),
            invoice_number: format!("GRN-{:06}", sequence),
            created_at: Utc::now(),
            receipt: request.clone(),
        })
    }
}

/// In-memory ledger store with the same conflict rules as the Postgres one
#[derive(Default)]
pub struct RecordingLedgerStore {
    fail: AtomicBool,
    batches: Mutex<HashMap<Uuid, StockBatch>>,
    adjustments: Mutex<Vec<StockAdjustment>>,
}

impl RecordingLedgerStore {
    pub fn seeded(batches: Vec<StockBatch>, adjustments: Vec<StockAdjustment>) -> Self {
        Self {
            fail: AtomicBool::new(false),
            batches: Mutex::new(batches.into_iter().map(|b| (b.id, b)).collect()),
            adjustments: Mutex::new(adjustments),
        }
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn stored_batch(&self, id: Uuid) -> Option<StockBatch> {
        self.batches.lock().unwrap().get(&id).cloned()
    }

    pub fn stored_batches(&self) -> Vec<StockBatch> {
        self.batches.lock().unwrap().values().cloned().collect()
    }

    pub fn stored_adjustments(&self) -> Vec<StockAdjustment> {
        self.adjustments.lock().unwrap().clone()
    }

    /// Change a stored quantity behind the ledger's back
    pub fn overwrite_quantity(&self, id: Uuid, quantity: u64) {
        if let Some(batch) = self.batches.lock().unwrap().get_mut(&id) {
            batch.quantity = quantity;
        }
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError::Request("connection reset".to_string()));
        }
        Ok(())
    }
}

fn check_previous(
    stored: &HashMap<Uuid, StockBatch>,
    batch: &StockBatch,
    previous_quantity: u64,
) -> Result<(), StoreError> {
    match stored.get(&batch.id) {
        Some(current) if current.quantity == previous_quantity => Ok(()),
        _ => Err(StoreError::Conflict(format!("batch {}", batch.id))),
    }
}

#[async_trait]
impl LedgerStore for RecordingLedgerStore {
    async fn load_batches(&self) -> Result<Vec<StockBatch>, StoreError> {
        self.check_available()?;
        Ok(self.stored_batches())
    }

    async fn load_adjustments(&self) -> Result<Vec<StockAdjustment>, StoreError> {
        self.check_available()?;
        Ok(self.stored_adjustments())
    }

    async fn record_adjustment(
        &self,
        batch: &StockBatch,
        previous_quantity: u64,
        adjustment: &StockAdjustment,
    ) -> Result<(), StoreError> {
        self.check_available()?;
        let mut stored = self.batches.lock().unwrap();
        check_previous(&stored, batch, previous_quantity)?;
        stored.insert(batch.id, batch.clone());
        self.adjustments.lock().unwrap().push(adjustment.clone());
        Ok(())
    }

    async fn record_receipt(&self, writes: &[BatchWrite]) -> Result<(), StoreError> {
        self.check_available()?;
        let mut stored = self.batches.lock().unwrap();
        for write in writes {
            if let BatchWrite::Update {
                batch,
                previous_quantity,
            } = write
            {
                check_previous(&stored, batch, *previous_quantity)?;
            }
        }
        for write in writes {
            stored.insert(write.batch().id, write.batch().clone());
        }
        Ok(())
    }
}
