//! Stock ledger: authoritative batch quantities and the adjustment audit trail
//!
//! Each batch sits behind its own mutex so read-modify-write on `quantity`
//! is serialized per batch while different batches proceed in parallel. The
//! index lock is only held long enough to look a batch up, except when a
//! receipt creates new batches.
//!
//! When a [`LedgerStore`] is attached every change is written to it before
//! memory is touched; a failed write leaves the ledger exactly as it was.

use chrono::{NaiveDate, Utc};
use shared::{
    generate_sku, AdjustmentInput, AdjustmentKind, AdjustmentRequest, AdjustmentState,
    DomainError, ReceiptLine, StockAdjustment, StockBatch,
};
use std::collections::{btree_map, BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use uuid::Uuid;

use super::{BatchWrite, LedgerStore, StoreError};
use crate::error::{AppError, AppResult};

/// Batch state plus its append-only adjustment log
#[derive(Debug)]
struct BatchEntry {
    batch: StockBatch,
    log: Vec<StockAdjustment>,
}

#[derive(Debug)]
struct IndexedBatch {
    /// Never changes after creation, so readable without the entry lock
    expiry: NaiveDate,
    entry: Arc<Mutex<BatchEntry>>,
}

#[derive(Debug, Default)]
struct LedgerIndex {
    batches: HashMap<Uuid, IndexedBatch>,
    /// (product, normalized batch number) -> batch id
    by_key: HashMap<(Uuid, String), Uuid>,
}

impl LedgerIndex {
    fn insert(&mut self, batch: StockBatch, log: Vec<StockAdjustment>) {
        self.by_key
            .insert(batch_key(batch.product_id, &batch.batch_number), batch.id);
        self.batches.insert(
            batch.id,
            IndexedBatch {
                expiry: batch.expiry,
                entry: Arc::new(Mutex::new(BatchEntry { batch, log })),
            },
        );
    }

    fn entry(&self, batch_id: Uuid) -> AppResult<Arc<Mutex<BatchEntry>>> {
        self.batches
            .get(&batch_id)
            .map(|indexed| indexed.entry.clone())
            .ok_or_else(|| AppError::NotFound(format!("Batch {}", batch_id)))
    }
}

/// A batch a receipt will create
#[derive(Debug)]
struct PendingBatch {
    batch_number: String,
    quantity: u64,
    expiry: NaiveDate,
}

/// Stock movements of one receipt, resolved against the index
#[derive(Debug, Default)]
struct ReceiptPlan {
    increments: BTreeMap<Uuid, u64>,
    new_batches: BTreeMap<(Uuid, String), PendingBatch>,
}

/// Batch numbers match the way SKUs are built: trimmed, case-insensitive
fn batch_key(product_id: Uuid, batch_number: &str) -> (Uuid, String) {
    (product_id, batch_number.trim().to_uppercase())
}

fn line_field(index: usize, field: &str) -> String {
    format!("items[{}].{}", index, field)
}

fn expiry_conflict(index: usize, expected: NaiveDate) -> AppError {
    DomainError::validation(
        line_field(index, "expiryDate"),
        format!("Batch already expires on {}", expected),
    )
    .into()
}

/// Resolve every line to an existing batch or a batch to create, merging
/// lines that land on the same batch.
fn plan_receipt(index: &LedgerIndex, lines: &[ReceiptLine]) -> AppResult<ReceiptPlan> {
    let mut plan = ReceiptPlan::default();

    for (position, line) in lines.iter().enumerate() {
        let key = batch_key(line.product_id, &line.batch_number);

        let existing = match line.batch_id {
            Some(id) => {
                let Some(indexed) = index.batches.get(&id) else {
                    return Err(DomainError::validation(
                        line_field(position, "batchId"),
                        format!("Batch {} does not exist", id),
                    )
                    .into());
                };
                if index.by_key.get(&key) != Some(&id) {
                    return Err(DomainError::validation(
                        line_field(position, "batchId"),
                        format!(
                            "Batch {} does not hold batch number '{}' of this product",
                            id,
                            line.batch_number.trim()
                        ),
                    )
                    .into());
                }
                Some((id, indexed.expiry))
            }
            None => index
                .by_key
                .get(&key)
                .and_then(|id| index.batches.get(id).map(|indexed| (*id, indexed.expiry))),
        };

        match existing {
            Some((id, expiry)) => {
                if line.expiry != expiry {
                    return Err(expiry_conflict(position, expiry));
                }
                let total = plan.increments.entry(id).or_insert(0);
                *total = total
                    .checked_add(line.quantity)
                    .ok_or(DomainError::QuantityOverflow)?;
            }
            None => match plan.new_batches.entry(key) {
                btree_map::Entry::Vacant(slot) => {
                    slot.insert(PendingBatch {
                        batch_number: line.batch_number.trim().to_string(),
                        quantity: line.quantity,
                        expiry: line.expiry,
                    });
                }
                btree_map::Entry::Occupied(mut slot) => {
                    let pending = slot.get_mut();
                    if line.expiry != pending.expiry {
                        return Err(expiry_conflict(position, pending.expiry));
                    }
                    pending.quantity = pending
                        .quantity
                        .checked_add(line.quantity)
                        .ok_or(DomainError::QuantityOverflow)?;
                }
            },
        }
    }

    Ok(plan)
}

fn storage_failure(e: StoreError) -> AppError {
    tracing::error!("Stock ledger storage failed: {}", e);
    AppError::Persistence(e.to_string())
}

/// Stock ledger shared by all request handlers
#[derive(Clone, Default)]
pub struct StockLedger {
    inner: Arc<RwLock<LedgerIndex>>,
    store: Option<Arc<dyn LedgerStore>>,
}

impl StockLedger {
    /// Create an empty, memory-only ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a memory-only ledger seeded with existing batches
    pub fn with_batches(batches: impl IntoIterator<Item = StockBatch>) -> Self {
        let mut index = LedgerIndex::default();
        for batch in batches {
            index.insert(batch, Vec::new());
        }
        Self {
            inner: Arc::new(RwLock::new(index)),
            store: None,
        }
    }

    /// Load every batch and its adjustment log from `store` and write
    /// through to it from then on
    pub async fn load(store: Arc<dyn LedgerStore>) -> AppResult<Self> {
        let batches = store.load_batches().await.map_err(storage_failure)?;
        let adjustments = store.load_adjustments().await.map_err(storage_failure)?;

        let mut logs: HashMap<Uuid, Vec<StockAdjustment>> = HashMap::new();
        for adjustment in adjustments {
            logs.entry(adjustment.batch_id).or_default().push(adjustment);
        }

        let batch_count = batches.len();
        let mut index = LedgerIndex::default();
        for batch in batches {
            let log = logs.remove(&batch.id).unwrap_or_default();
            index.insert(batch, log);
        }

        if let Some(orphan) = logs.keys().next() {
            return Err(AppError::Internal(format!(
                "Stored adjustments reference unknown batch {}",
                orphan
            )));
        }

        tracing::info!(batches = batch_count, "Stock ledger loaded");
        Ok(Self {
            inner: Arc::new(RwLock::new(index)),
            store: Some(store),
        })
    }

    async fn entry(&self, batch_id: Uuid) -> AppResult<Arc<Mutex<BatchEntry>>> {
        self.inner.read().await.entry(batch_id)
    }

    /// Validate and apply a raw adjustment request from an operator
    pub async fn submit_adjustment(&self, input: AdjustmentInput) -> AppResult<StockAdjustment> {
        let batch_id = input.batch_id;
        tracing::debug!(
            %batch_id,
            quantity = input.quantity,
            state = ?AdjustmentState::Submitted,
            "Stock adjustment submitted"
        );

        let request = AdjustmentRequest::try_from(input).map_err(|e| {
            tracing::debug!(
                %batch_id,
                state = ?AdjustmentState::Rejected,
                "Stock adjustment rejected: {}",
                e
            );
            AppError::from(e)
        })?;

        self.apply_adjustment(request).await
    }

    /// Apply a validated adjustment and append it to the batch log.
    ///
    /// Returns the recorded entry; its `resulting_quantity` is the batch's new
    /// quantity. A rejected request leaves both quantity and log untouched.
    pub async fn apply_adjustment(&self, request: AdjustmentRequest) -> AppResult<StockAdjustment> {
        let batch_id = request.batch_id();
        let quantity = request.quantity();
        tracing::debug!(
            %batch_id,
            quantity,
            state = ?AdjustmentState::Validated,
            "Stock adjustment validated"
        );

        let entry = match self.entry(batch_id).await {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!(
                    %batch_id,
                    state = ?AdjustmentState::Rejected,
                    "Stock adjustment rejected: unknown batch"
                );
                return Err(e);
            }
        };
        let mut entry = entry.lock().await;
        let current = entry.batch.quantity;

        let resulting = match request.kind() {
            AdjustmentKind::Deduct { .. } => {
                if quantity > current {
                    tracing::debug!(
                        %batch_id,
                        quantity,
                        current,
                        state = ?AdjustmentState::Rejected,
                        "Stock adjustment rejected: insufficient stock"
                    );
                    return Err(DomainError::InsufficientStock {
                        batch_id,
                        requested: quantity,
                        available: current,
                    }
                    .into());
                }
                current - quantity
            }
            AdjustmentKind::Add { .. } => current
                .checked_add(quantity)
                .ok_or(DomainError::QuantityOverflow)?,
        };

        let now = Utc::now();
        let mut updated = entry.batch.clone();
        updated.quantity = resulting;
        updated.updated_at = now;

        let record = StockAdjustment {
            id: Uuid::new_v4(),
            batch_id,
            kind: request.kind(),
            quantity,
            note: request.note().to_string(),
            adjuster: request.adjuster().clone(),
            resulting_quantity: resulting,
            created_at: now,
        };

        if let Some(store) = &self.store {
            if let Err(e) = store.record_adjustment(&updated, current, &record).await {
                tracing::debug!(
                    %batch_id,
                    state = ?AdjustmentState::Rejected,
                    "Stock adjustment rejected: not persisted"
                );
                return Err(storage_failure(e));
            }
        }

        entry.batch = updated;
        tracing::debug!(
            %batch_id,
            current,
            resulting,
            state = ?AdjustmentState::Applied,
            "Stock adjustment applied"
        );

        entry.log.push(record.clone());
        tracing::debug!(
            %batch_id,
            adjustment_id = %record.id,
            state = ?AdjustmentState::Recorded,
            "Stock adjustment recorded"
        );

        Ok(record)
    }

    /// Increment (or create) the batch for a single receipt line
    pub async fn apply_receipt(&self, line: ReceiptLine) -> AppResult<StockBatch> {
        let mut batches = self.apply_receipt_lines(std::slice::from_ref(&line)).await?;
        batches
            .pop()
            .ok_or_else(|| AppError::Internal("Receipt produced no batch".to_string()))
    }

    /// Check that every line of a receipt can be applied, without applying it.
    ///
    /// Catches the same batch, expiry, and overflow errors as
    /// [`StockLedger::apply_receipt_lines`] against the current state.
    pub async fn check_receipt_lines(&self, lines: &[ReceiptLine]) -> AppResult<()> {
        let index = self.inner.read().await;
        let plan = plan_receipt(&index, lines)?;

        for (id, increment) in &plan.increments {
            let entry = index.entry(*id)?;
            let entry = entry.lock().await;
            entry
                .batch
                .quantity
                .checked_add(*increment)
                .ok_or(DomainError::QuantityOverflow)?;
        }
        Ok(())
    }

    /// Apply every line of a committed receipt, all or nothing.
    ///
    /// Lines targeting the same batch are merged first. Existing batches are
    /// locked in id order, every increment is checked, and only then is
    /// anything written. No adjustment log entries are produced: receipt
    /// provenance lives on the receipt itself.
    pub async fn apply_receipt_lines(&self, lines: &[ReceiptLine]) -> AppResult<Vec<StockBatch>> {
        let mut index = self.inner.write().await;
        let plan = plan_receipt(&index, lines)?;

        // Lock in id order, check, then write
        let now = Utc::now();
        let mut locked: Vec<OwnedMutexGuard<BatchEntry>> =
            Vec::with_capacity(plan.increments.len());
        let mut writes = Vec::with_capacity(plan.increments.len() + plan.new_batches.len());
        for (id, increment) in &plan.increments {
            let guard = index.entry(*id)?.lock_owned().await;
            let previous_quantity = guard.batch.quantity;
            let mut batch = guard.batch.clone();
            batch.quantity = previous_quantity
                .checked_add(*increment)
                .ok_or(DomainError::QuantityOverflow)?;
            batch.updated_at = now;
            writes.push(BatchWrite::Update {
                batch,
                previous_quantity,
            });
            locked.push(guard);
        }

        for ((product_id, _), pending) in plan.new_batches {
            writes.push(BatchWrite::Insert(StockBatch {
                id: Uuid::new_v4(),
                product_id,
                sku: generate_sku(product_id, &pending.batch_number),
                batch_number: pending.batch_number,
                quantity: pending.quantity,
                expiry: pending.expiry,
                created_at: now,
                updated_at: now,
            }));
        }

        if let Some(store) = &self.store {
            store.record_receipt(&writes).await.map_err(storage_failure)?;
        }

        for (guard, write) in locked.iter_mut().zip(&writes) {
            guard.batch = write.batch().clone();
        }
        for write in &writes[locked.len()..] {
            let batch = write.batch();
            tracing::info!(
                batch_id = %batch.id,
                sku = %batch.sku,
                quantity = batch.quantity,
                "Created stock batch from receipt"
            );
            index.insert(batch.clone(), Vec::new());
        }

        Ok(writes.into_iter().map(BatchWrite::into_batch).collect())
    }

    /// Current state of one batch
    pub async fn batch(&self, batch_id: Uuid) -> AppResult<StockBatch> {
        let entry = self.entry(batch_id).await?;
        let entry = entry.lock().await;
        Ok(entry.batch.clone())
    }

    /// Look a batch up by product and batch number, ignoring case
    pub async fn find_batch(&self, product_id: Uuid, batch_number: &str) -> Option<StockBatch> {
        let entry = {
            let index = self.inner.read().await;
            let id = index.by_key.get(&batch_key(product_id, batch_number))?;
            index.entry(*id).ok()?
        };
        let entry = entry.lock().await;
        Some(entry.batch.clone())
    }

    /// All batches, ordered by product then batch number
    pub async fn batches(&self) -> Vec<StockBatch> {
        let entries: Vec<_> = {
            let index = self.inner.read().await;
            index
                .batches
                .values()
                .map(|indexed| indexed.entry.clone())
                .collect()
        };

        let mut batches = Vec::with_capacity(entries.len());
        for entry in entries {
            batches.push(entry.lock().await.batch.clone());
        }
        batches.sort_by(|a, b| {
            a.product_id
                .cmp(&b.product_id)
                .then_with(|| a.batch_number.cmp(&b.batch_number))
        });
        batches
    }

    /// Adjustment log for a batch, newest first
    pub async fn adjustments(&self, batch_id: Uuid) -> AppResult<Vec<StockAdjustment>> {
        let entry = self.entry(batch_id).await?;
        let entry = entry.lock().await;
        Ok(entry.log.iter().rev().cloned().collect())
    }
}
