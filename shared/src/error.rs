//! Domain errors raised by the valuation engine and stock ledger model

use thiserror::Error;
use uuid::Uuid;

/// Errors produced by pure domain operations.
///
/// None of these are raised after a side effect has happened: every variant
/// is detected before any quantity or receipt is touched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Validation error on {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Invalid quantity {0}: quantity must be a positive integer")]
    InvalidQuantity(i64),

    #[error(
        "Insufficient stock in batch {batch_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        batch_id: Uuid,
        requested: u64,
        available: u64,
    },

    #[error("Line item {0} does not exist")]
    LineNotFound(usize),

    #[error("Batch quantity would overflow")]
    QuantityOverflow,
}

impl DomainError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        DomainError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// A figure too large to carry through the calculation
    pub fn out_of_range(field: impl Into<String>) -> Self {
        Self::validation(field, "Value is too large to calculate")
    }

    /// Qualify a validation field with the line it came from
    pub fn for_item(self, index: usize) -> Self {
        match self {
            DomainError::Validation { field, message } => DomainError::Validation {
                field: format!("items[{}].{}", index, field),
                message,
            },
            other => other,
        }
    }
}
