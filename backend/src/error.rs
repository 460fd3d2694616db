//! Error handling for the pharmacy back-office server
//!
//! Business-rule failures are reported with an actionable message; persistence
//! failures are reported as transient so the caller can retry the same draft.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::DomainError;
use thiserror::Error;
use uuid::Uuid;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(i64),

    // Business logic errors
    #[error(
        "Insufficient stock in batch {batch_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        batch_id: Uuid,
        requested: u64,
        available: u64,
    },

    #[error("Resource not found: {0}")]
    NotFound(String),

    // External collaborator errors
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation { field, message } => AppError::Validation { field, message },
            DomainError::InvalidQuantity(quantity) => AppError::InvalidQuantity(quantity),
            DomainError::InsufficientStock {
                batch_id,
                requested,
                available,
            } => AppError::InsufficientStock {
                batch_id,
                requested,
                available,
            },
            DomainError::LineNotFound(index) => AppError::NotFound(format!("Line item {}", index)),
            DomainError::QuantityOverflow => {
                AppError::Internal("Batch quantity would overflow".to_string())
            }
        }
    }
}

impl AppError {
    /// Whether retrying the same request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Persistence(_))
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub retryable: bool,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, field) = match &self {
            AppError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                message.clone(),
                Some(field.clone()),
            ),
            AppError::InvalidQuantity(quantity) => (
                StatusCode::BAD_REQUEST,
                "INVALID_QUANTITY",
                format!("Quantity must be a positive whole number, got {}", quantity),
                Some("quantity".to_string()),
            ),
            AppError::InsufficientStock {
                requested,
                available,
                ..
            } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "INSUFFICIENT_STOCK",
                format!(
                    "Cannot deduct {} units: only {} in stock",
                    requested, available
                ),
                Some("quantity".to_string()),
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("{} not found", resource),
                None,
            ),
            AppError::Persistence(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "PERSISTENCE_ERROR",
                "The change could not be saved. Nothing was applied; please try again."
                    .to_string(),
                None,
            ),
            AppError::Configuration(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONFIGURATION_ERROR",
                format!("Configuration error: {}", msg),
                None,
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg.clone(),
                None,
            ),
        };

        // Log the error for debugging
        tracing::error!("Error: {:?}", self);

        let detail = ErrorDetail {
            code: code.to_string(),
            message,
            field,
            retryable: self.is_retryable(),
        };

        (
            status,
            Json(ErrorResponse {
                success: false,
                error: detail,
            }),
        )
            .into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_map_to_app_errors() {
        let err: AppError =
            DomainError::validation("supplierId", "A supplier must be selected").into();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "supplierId"));

        let err: AppError = DomainError::InvalidQuantity(0).into();
        assert!(matches!(err, AppError::InvalidQuantity(0)));

        let err: AppError = DomainError::LineNotFound(2).into();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_only_persistence_is_retryable() {
        assert!(AppError::Persistence("timeout".to_string()).is_retryable());
        assert!(!AppError::NotFound("Batch".to_string()).is_retryable());
        assert!(!AppError::InvalidQuantity(-1).is_retryable());
    }

    #[test]
    fn test_status_codes() {
        let response = AppError::InsufficientStock {
            batch_id: Uuid::nil(),
            requested: 200,
            available: 150,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let response = AppError::Persistence("down".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
