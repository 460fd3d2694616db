//! Persistence collaborator for committed purchase receipts

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::{CommitRequest, PurchaseReceiptRecord};
use sqlx::{types::Json, PgPool};
use thiserror::Error;
use uuid::Uuid;

/// Failure reported by a receipt or ledger store. Treated as opaque by callers.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("unexpected response: {0}")]
    Response(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("write conflict: {0}")]
    Conflict(String),

    #[error("invalid stored data: {0}")]
    Invalid(String),
}

/// Somewhere committed receipts are written and given an invoice number.
///
/// Implementations must not retry internally: a duplicated write would
/// double-count the stock increments that follow it.
#[async_trait]
pub trait ReceiptStore: Send + Sync {
    async fn create_receipt(
        &self,
        request: &CommitRequest,
    ) -> Result<PurchaseReceiptRecord, StoreError>;
}

/// Postgres-backed receipt store
#[derive(Clone)]
pub struct PgReceiptStore {
    db: PgPool,
}

impl PgReceiptStore {
    /// Create a new PgReceiptStore instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

/// Invoice numbers look like `GRN-000042`
pub fn format_invoice_number(sequence: i64) -> String {
    format!("GRN-{:06}", sequence)
}

#[async_trait]
impl ReceiptStore for PgReceiptStore {
    async fn create_receipt(
        &self,
        request: &CommitRequest,
    ) -> Result<PurchaseReceiptRecord, StoreError> {
        let mut tx = self.db.begin().await?;

        let sequence =
            sqlx::query_scalar::<_, i64>("SELECT nextval('purchase_receipt_invoice_seq')")
                .fetch_one(&mut *tx)
                .await?;
        let invoice_number = format_invoice_number(sequence);

        let (id, created_at) = sqlx::query_as::<_, (Uuid, DateTime<Utc>)>(
            r#"
            INSERT INTO purchase_receipts (
                invoice_number, supplier_id, invoice_date, notes, items, invoice_summary,
                tax_breakup, sub_total, tax_amount, discount, grand_total, status, payment_status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING id, created_at
            "#,
        )
        .bind(&invoice_number)
        .bind(request.supplier_id)
        .bind(request.invoice_date)
        .bind(&request.notes)
        .bind(Json(&request.items))
        .bind(Json(&request.invoice_summary))
        .bind(Json(&request.tax_breakup))
        .bind(request.sub_total)
        .bind(request.tax_amount)
        .bind(request.discount)
        .bind(request.grand_total)
        .bind(request.status.as_str())
        .bind(request.payment_status.as_str())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(PurchaseReceiptRecord {
            id,
            invoice_number,
            created_at,
            receipt: request.clone(),
        })
    }
}
