//! Product catalog entry used to seed new receipt lines

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A product as published by the catalog service.
///
/// The catalog is owned elsewhere; this is only the subset of fields a
/// receipt line copies as defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogProduct {
    pub id: Uuid,
    pub name: String,
    pub hsn_code: String,
    pub cgst: Decimal,
    pub sgst: Decimal,
    pub igst: Decimal,
    pub ptr: Decimal,
    pub mrp: Decimal,
    pub purchase_price: Decimal,
    pub selling_price: Decimal,
}
