//! HTTP handlers for the pharmacy back-office API

pub mod health;
pub mod receipts;
pub mod stock;

pub use health::*;
pub use receipts::*;
pub use stock::*;
