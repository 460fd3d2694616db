//! External API integrations

pub mod receipt_api;

pub use receipt_api::ReceiptApiClient;
