//! Durable storage behind the stock ledger
//!
//! The ledger keeps batches in memory for fast reads and writes every change
//! here first. Memory is only updated once the write has committed, so a
//! restart reloads exactly what callers were told succeeded.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use shared::{Adjuster, AdjustmentKind, AdjustmentType, StockAdjustment, StockBatch};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::StoreError;

/// One batch change produced by a committed receipt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchWrite {
    /// Existing batch moved from `previous_quantity` to `batch.quantity`
    Update {
        batch: StockBatch,
        previous_quantity: u64,
    },
    /// Batch first created by this receipt
    Insert(StockBatch),
}

impl BatchWrite {
    pub fn batch(&self) -> &StockBatch {
        match self {
            BatchWrite::Update { batch, .. } | BatchWrite::Insert(batch) => batch,
        }
    }

    pub fn into_batch(self) -> StockBatch {
        match self {
            BatchWrite::Update { batch, .. } | BatchWrite::Insert(batch) => batch,
        }
    }
}

/// Where batch quantities and the adjustment log live between restarts.
///
/// Quantity updates carry the quantity they were computed from; a store must
/// refuse the write with [`StoreError::Conflict`] when the stored value differs.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn load_batches(&self) -> Result<Vec<StockBatch>, StoreError>;

    /// Every recorded adjustment, oldest first
    async fn load_adjustments(&self) -> Result<Vec<StockAdjustment>, StoreError>;

    /// Write a batch's new quantity together with the adjustment that produced it
    async fn record_adjustment(
        &self,
        batch: &StockBatch,
        previous_quantity: u64,
        adjustment: &StockAdjustment,
    ) -> Result<(), StoreError>;

    /// Write every batch change of one receipt, all or nothing
    async fn record_receipt(&self, writes: &[BatchWrite]) -> Result<(), StoreError>;
}

/// Postgres-backed ledger store
#[derive(Clone)]
pub struct PgLedgerStore {
    db: PgPool,
}

impl PgLedgerStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[derive(Debug, FromRow)]
struct BatchRow {
    id: Uuid,
    product_id: Uuid,
    batch_number: String,
    sku: String,
    quantity: i64,
    expiry: NaiveDate,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BatchRow> for StockBatch {
    type Error = StoreError;

    fn try_from(row: BatchRow) -> Result<Self, Self::Error> {
        Ok(StockBatch {
            id: row.id,
            product_id: row.product_id,
            batch_number: row.batch_number,
            sku: row.sku,
            quantity: from_db(row.quantity)?,
            expiry: row.expiry,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct AdjustmentRow {
    id: Uuid,
    batch_id: Uuid,
    adjustment_type: String,
    reason: String,
    quantity: i64,
    note: String,
    adjuster_name: String,
    adjuster_email: String,
    adjuster_mobile: String,
    resulting_quantity: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<AdjustmentRow> for StockAdjustment {
    type Error = StoreError;

    fn try_from(row: AdjustmentRow) -> Result<Self, Self::Error> {
        let adjustment_type = match row.adjustment_type.as_str() {
            "add" => AdjustmentType::Add,
            "deduct" => AdjustmentType::Deduct,
            other => {
                return Err(StoreError::Invalid(format!(
                    "adjustment {} has unknown type '{}'",
                    row.id, other
                )))
            }
        };
        let kind = AdjustmentKind::parse(adjustment_type, &row.reason)
            .map_err(|e| StoreError::Invalid(format!("adjustment {}: {}", row.id, e)))?;

        Ok(StockAdjustment {
            id: row.id,
            batch_id: row.batch_id,
            kind,
            quantity: from_db(row.quantity)?,
            note: row.note,
            adjuster: Adjuster::new(row.adjuster_name, row.adjuster_email, row.adjuster_mobile),
            resulting_quantity: from_db(row.resulting_quantity)?,
            created_at: row.created_at,
        })
    }
}

fn to_db(quantity: u64) -> Result<i64, StoreError> {
    i64::try_from(quantity)
        .map_err(|_| StoreError::Invalid(format!("quantity {} is too large to store", quantity)))
}

fn from_db(quantity: i64) -> Result<u64, StoreError> {
    u64::try_from(quantity)
        .map_err(|_| StoreError::Invalid(format!("stored quantity {} is negative", quantity)))
}

async fn update_quantity(
    tx: &mut Transaction<'_, Postgres>,
    batch: &StockBatch,
    previous_quantity: u64,
) -> Result<(), StoreError> {
    let result = sqlx::query(
        "UPDATE stock_batches SET quantity = $1, updated_at = $2 WHERE id = $3 AND quantity = $4",
    )
    .bind(to_db(batch.quantity)?)
    .bind(batch.updated_at)
    .bind(batch.id)
    .bind(to_db(previous_quantity)?)
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(StoreError::Conflict(format!(
            "batch {} no longer holds {} units",
            batch.id, previous_quantity
        )));
    }
    Ok(())
}

async fn insert_batch(
    tx: &mut Transaction<'_, Postgres>,
    batch: &StockBatch,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO stock_batches (
            id, product_id, batch_number, sku, quantity, expiry, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(batch.id)
    .bind(batch.product_id)
    .bind(&batch.batch_number)
    .bind(&batch.sku)
    .bind(to_db(batch.quantity)?)
    .bind(batch.expiry)
    .bind(batch.created_at)
    .bind(batch.updated_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn load_batches(&self) -> Result<Vec<StockBatch>, StoreError> {
        let rows = sqlx::query_as::<_, BatchRow>(
            r#"
            SELECT id, product_id, batch_number, sku, quantity, expiry, created_at, updated_at
            FROM stock_batches
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(StockBatch::try_from).collect()
    }

    async fn load_adjustments(&self) -> Result<Vec<StockAdjustment>, StoreError> {
        let rows = sqlx::query_as::<_, AdjustmentRow>(
            r#"
            SELECT id, batch_id, adjustment_type, reason, quantity, note,
                   adjuster_name, adjuster_email, adjuster_mobile, resulting_quantity, created_at
            FROM stock_adjustments
            ORDER BY created_at, id
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(StockAdjustment::try_from).collect()
    }

    async fn record_adjustment(
        &self,
        batch: &StockBatch,
        previous_quantity: u64,
        adjustment: &StockAdjustment,
    ) -> Result<(), StoreError> {
        let mut tx = self.db.begin().await?;

        update_quantity(&mut tx, batch, previous_quantity).await?;

        sqlx::query(
            r#"
            INSERT INTO stock_adjustments (
                id, batch_id, adjustment_type, reason, quantity, note,
                adjuster_name, adjuster_email, adjuster_mobile, resulting_quantity, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(adjustment.id)
        .bind(adjustment.batch_id)
        .bind(adjustment.kind.adjustment_type().as_str())
        .bind(adjustment.kind.reason())
        .bind(to_db(adjustment.quantity)?)
        .bind(&adjustment.note)
        .bind(&adjustment.adjuster.name)
        .bind(&adjustment.adjuster.email)
        .bind(&adjustment.adjuster.mobile)
        .bind(to_db(adjustment.resulting_quantity)?)
        .bind(adjustment.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn record_receipt(&self, writes: &[BatchWrite]) -> Result<(), StoreError> {
        let mut tx = self.db.begin().await?;

        for write in writes {
            match write {
                BatchWrite::Update {
                    batch,
                    previous_quantity,
                } => update_quantity(&mut tx, batch, *previous_quantity).await?,
                BatchWrite::Insert(batch) => insert_batch(&mut tx, batch).await?,
            }
        }

        tx.commit().await?;
        Ok(())
    }
}
