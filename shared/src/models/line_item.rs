//! Purchase receipt line items and their derived values

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::CatalogProduct;
use crate::error::DomainError;
use crate::types::{percent_of, round_money};

/// One product being received on a purchase receipt.
///
/// `amount` and `margin` are derived; callers never set them directly. Every
/// edit goes through [`apply_edit`] or [`recalculate_item`] so they stay in
/// step with the raw fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: Uuid,
    /// Existing batch this line tops up, if the operator picked one
    #[serde(default)]
    pub batch_id: Option<Uuid>,
    #[serde(default)]
    pub batch_number: String,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
    #[serde(default)]
    pub mfg_date: Option<NaiveDate>,
    #[serde(default)]
    pub ordered_qty: u32,
    #[serde(default)]
    pub received_qty: u32,
    #[serde(default)]
    pub physical_free_qty: u32,
    #[serde(default)]
    pub scheme_free_qty: u32,
    #[serde(default)]
    pub po_rate: Decimal,
    #[serde(default)]
    pub ptr: Decimal,
    #[serde(default)]
    pub base_rate: Decimal,
    #[serde(default)]
    pub scheme_discount: Decimal,
    #[serde(default)]
    pub discount_percent: Decimal,
    #[serde(default)]
    pub hsn_code: String,
    #[serde(default)]
    pub cgst: Decimal,
    #[serde(default)]
    pub sgst: Decimal,
    #[serde(default)]
    pub igst: Decimal,
    #[serde(default)]
    pub purchase_price: Decimal,
    #[serde(default)]
    pub selling_price: Decimal,
    #[serde(default)]
    pub mrp: Decimal,
    #[serde(default)]
    pub amount: Decimal,
    #[serde(default)]
    pub margin: Option<Decimal>,
}

impl LineItem {
    /// Blank line for a product, all figures zero
    pub fn new(product_id: Uuid) -> Self {
        Self {
            product_id,
            batch_id: None,
            batch_number: String::new(),
            expiry_date: None,
            mfg_date: None,
            ordered_qty: 0,
            received_qty: 0,
            physical_free_qty: 0,
            scheme_free_qty: 0,
            po_rate: Decimal::ZERO,
            ptr: Decimal::ZERO,
            base_rate: Decimal::ZERO,
            scheme_discount: Decimal::ZERO,
            discount_percent: Decimal::ZERO,
            hsn_code: String::new(),
            cgst: Decimal::ZERO,
            sgst: Decimal::ZERO,
            igst: Decimal::ZERO,
            purchase_price: Decimal::ZERO,
            selling_price: Decimal::ZERO,
            mrp: Decimal::ZERO,
            amount: Decimal::ZERO,
            margin: None,
        }
    }

    /// Seed a line from a catalog entry. The base rate starts at the PTR.
    pub fn from_catalog(product: &CatalogProduct) -> Result<Self, DomainError> {
        let item = Self {
            hsn_code: product.hsn_code.clone(),
            cgst: product.cgst,
            sgst: product.sgst,
            igst: product.igst,
            ptr: product.ptr,
            base_rate: product.ptr,
            mrp: product.mrp,
            purchase_price: product.purchase_price,
            selling_price: product.selling_price,
            ..Self::new(product.id)
        };
        recalculate_item(item)
    }

    /// Combined GST rate (CGST + SGST + IGST)
    pub fn combined_gst_rate(&self) -> Result<Decimal, DomainError> {
        self.cgst
            .checked_add(self.sgst)
            .and_then(|rate| rate.checked_add(self.igst))
            .ok_or_else(|| DomainError::out_of_range("cgst"))
    }

    /// Units that move into stock when the receipt is committed
    pub fn stock_quantity(&self, include_free_quantity: bool) -> u64 {
        let mut quantity = u64::from(self.received_qty);
        if include_free_quantity {
            quantity += u64::from(self.physical_free_qty) + u64::from(self.scheme_free_qty);
        }
        quantity
    }

    /// Value of the received units at printed MRP, unrounded
    pub fn mrp_value(&self) -> Result<Decimal, DomainError> {
        self.mrp
            .checked_mul(Decimal::from(self.received_qty))
            .ok_or_else(|| DomainError::out_of_range("mrp"))
    }

    /// Gross value before the line discount, unrounded
    pub fn gross_amount(&self) -> Result<Decimal, DomainError> {
        self.base_rate
            .checked_mul(Decimal::from(self.received_qty))
            .ok_or_else(|| DomainError::out_of_range("baseRate"))
    }
}

/// `baseRate × receivedQty × (1 − discountPercent/100)`, rounded to 2 places.
///
/// Percentages are taken literally: a negative discount raises the amount.
/// Inputs too large for a `Decimal` are a validation error, never a panic.
pub fn calculate_amount(
    base_rate: Decimal,
    received_qty: u32,
    discount_percent: Decimal,
) -> Result<Decimal, DomainError> {
    let discount = percent_of(Decimal::ONE, discount_percent)
        .and_then(|fraction| Decimal::ONE.checked_sub(fraction))
        .ok_or_else(|| DomainError::out_of_range("discountPercent"))?;
    let gross = base_rate
        .checked_mul(Decimal::from(received_qty))
        .ok_or_else(|| DomainError::out_of_range("baseRate"))?;
    let amount = gross
        .checked_mul(discount)
        .ok_or_else(|| DomainError::out_of_range("discountPercent"))?;
    Ok(round_money(amount))
}

/// Margin over purchase price in percent, or `None` when the purchase price
/// is not positive.
pub fn calculate_margin(
    purchase_price: Decimal,
    selling_price: Decimal,
) -> Result<Option<Decimal>, DomainError> {
    if purchase_price <= Decimal::ZERO {
        return Ok(None);
    }
    selling_price
        .checked_sub(purchase_price)
        .and_then(|markup| markup.checked_div(purchase_price))
        .and_then(|ratio| ratio.checked_mul(Decimal::from(100)))
        .map(|margin| Some(round_money(margin)))
        .ok_or_else(|| DomainError::out_of_range("purchasePrice"))
}

/// Recompute both derived fields of a line item
pub fn recalculate_item(mut item: LineItem) -> Result<LineItem, DomainError> {
    item.amount = calculate_amount(item.base_rate, item.received_qty, item.discount_percent)?;
    item.margin = calculate_margin(item.purchase_price, item.selling_price)?;
    Ok(item)
}

/// A single field edit on a line item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "camelCase")]
pub enum LineItemEdit {
    BatchId(Option<Uuid>),
    BatchNumber(String),
    ExpiryDate(Option<NaiveDate>),
    MfgDate(Option<NaiveDate>),
    OrderedQty(u32),
    ReceivedQty(u32),
    PhysicalFreeQty(u32),
    SchemeFreeQty(u32),
    PoRate(Decimal),
    Ptr(Decimal),
    BaseRate(Decimal),
    SchemeDiscount(Decimal),
    DiscountPercent(Decimal),
    HsnCode(String),
    Cgst(Decimal),
    Sgst(Decimal),
    Igst(Decimal),
    PurchasePrice(Decimal),
    SellingPrice(Decimal),
    Mrp(Decimal),
}

impl LineItemEdit {
    /// Whether this edit feeds `amount`
    pub fn affects_amount(&self) -> bool {
        matches!(
            self,
            LineItemEdit::BaseRate(_)
                | LineItemEdit::ReceivedQty(_)
                | LineItemEdit::DiscountPercent(_)
        )
    }

    /// Whether this edit feeds `margin`
    pub fn affects_margin(&self) -> bool {
        matches!(self, LineItemEdit::PurchasePrice(_) | LineItemEdit::SellingPrice(_))
    }
}

/// Apply one edit and refresh whichever derived field depends on it
pub fn apply_edit(mut item: LineItem, edit: LineItemEdit) -> Result<LineItem, DomainError> {
    let refresh_amount = edit.affects_amount();
    let refresh_margin = edit.affects_margin();

    match edit {
        LineItemEdit::BatchId(v) => item.batch_id = v,
        LineItemEdit::BatchNumber(v) => item.batch_number = v,
        LineItemEdit::ExpiryDate(v) => item.expiry_date = v,
        LineItemEdit::MfgDate(v) => item.mfg_date = v,
        LineItemEdit::OrderedQty(v) => item.ordered_qty = v,
        LineItemEdit::ReceivedQty(v) => item.received_qty = v,
        LineItemEdit::PhysicalFreeQty(v) => item.physical_free_qty = v,
        LineItemEdit::SchemeFreeQty(v) => item.scheme_free_qty = v,
        LineItemEdit::PoRate(v) => item.po_rate = v,
        LineItemEdit::Ptr(v) => item.ptr = v,
        LineItemEdit::BaseRate(v) => item.base_rate = v,
        LineItemEdit::SchemeDiscount(v) => item.scheme_discount = v,
        LineItemEdit::DiscountPercent(v) => item.discount_percent = v,
        LineItemEdit::HsnCode(v) => item.hsn_code = v,
        LineItemEdit::Cgst(v) => item.cgst = v,
        LineItemEdit::Sgst(v) => item.sgst = v,
        LineItemEdit::Igst(v) => item.igst = v,
        LineItemEdit::PurchasePrice(v) => item.purchase_price = v,
        LineItemEdit::SellingPrice(v) => item.selling_price = v,
        LineItemEdit::Mrp(v) => item.mrp = v,
    }

    if refresh_amount {
        item.amount = calculate_amount(item.base_rate, item.received_qty, item.discount_percent)?;
    }
    if refresh_margin {
        item.margin = calculate_margin(item.purchase_price, item.selling_price)?;
    }
    Ok(item)
}
