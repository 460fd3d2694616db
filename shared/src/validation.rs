//! Validation utilities for receipts and stock adjustments
//!
//! Every check here runs before any persistence call or ledger mutation.

use rust_decimal::Decimal;

use crate::error::DomainError;
use crate::models::{DraftReceipt, GstSlab};

// ============================================================================
// Stock Validations
// ============================================================================

/// Adjustment quantities must be positive integers
pub fn validate_adjustment_quantity(quantity: i64) -> Result<u64, DomainError> {
    if quantity <= 0 {
        return Err(DomainError::InvalidQuantity(quantity));
    }
    Ok(quantity as u64)
}

// ============================================================================
// Receipt Validations
// ============================================================================

/// Preconditions for committing a draft receipt.
///
/// Supplier and non-empty item list first, then per-line checks so the
/// operator sees the most basic problem before line-level ones.
pub fn validate_draft_for_commit(draft: &DraftReceipt) -> Result<(), DomainError> {
    if draft.supplier_id.is_none() {
        return Err(DomainError::validation("supplierId", "A supplier must be selected"));
    }
    if draft.items().is_empty() {
        return Err(DomainError::validation("items", "Add at least one item before saving"));
    }

    for (index, item) in draft.items().iter().enumerate() {
        if item.batch_number.trim().is_empty() {
            return Err(DomainError::validation(
                format!("items[{}].batchNumber", index),
                "Batch number is required",
            ));
        }
        if item.expiry_date.is_none() {
            return Err(DomainError::validation(
                format!("items[{}].expiryDate", index),
                "Expiry date is required",
            ));
        }
    }

    Ok(())
}

/// Whether a combined GST rate is one of the four recognised slabs
pub fn is_known_gst_rate(rate: Decimal) -> bool {
    GstSlab::from_rate(rate).is_some()
}

/// Validate a free-text adjustment reason against a direction string.
/// Used by clients that only have the raw form values.
pub fn validate_adjustment_reason(adjustment_type: &str, reason: &str) -> Result<(), DomainError> {
    use crate::models::{AdjustmentKind, AdjustmentType};

    let adjustment_type = match adjustment_type.trim().to_ascii_lowercase().as_str() {
        "add" => AdjustmentType::Add,
        "deduct" => AdjustmentType::Deduct,
        other => {
            return Err(DomainError::validation(
                "type",
                format!("Unknown adjustment type '{}'", other),
            ))
        }
    };
    AdjustmentKind::parse(adjustment_type, reason).map(|_| ())
}
