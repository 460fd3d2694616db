//! Domain models for the pharmacy purchase and stock back-office

mod catalog;
mod line_item;
mod receipt;
mod stock;
mod summary;
mod tax;

pub use catalog::*;
pub use line_item::*;
pub use receipt::*;
pub use stock::*;
pub use summary::*;
pub use tax::*;
