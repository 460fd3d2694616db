//! Shared types and models for the pharmacy back-office
//!
//! Holds the purchase-receipt valuation engine (line item calculation, GST
//! slab aggregation, invoice summary) and the stock adjustment model. Nothing
//! in this crate performs I/O, so it runs unchanged in the backend and in
//! the browser via WASM.

pub mod error;
pub mod models;
pub mod types;
pub mod validation;

pub use error::*;
pub use models::*;
pub use types::*;
pub use validation::*;
