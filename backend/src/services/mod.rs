//! Business logic services for the pharmacy back-office

pub mod ledger_store;
pub mod purchase_receipt;
pub mod receipt_store;
pub mod stock_ledger;

pub use ledger_store::{BatchWrite, LedgerStore, PgLedgerStore};
pub use purchase_receipt::PurchaseReceiptAssembler;
pub use receipt_store::{PgReceiptStore, ReceiptStore, StoreError};
pub use stock_ledger::StockLedger;
