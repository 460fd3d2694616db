//! Invoice summary with whole-rupee rounding reconciliation

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{LineItem, TaxBreakup};
use crate::error::DomainError;
use crate::types::{checked_sum, round_money, round_whole};

/// Derived totals for a receipt. Never stored on its own.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceSummary {
    pub taxable_amount: Decimal,
    /// Passed through untouched; TCS is computed upstream if at all
    pub tcs_amount: Decimal,
    pub mrp_value: Decimal,
    pub net_amount: Decimal,
    pub amount_after_gst: Decimal,
    pub round_amount: Decimal,
    /// Whole rupees (scale 0)
    pub invoice_amount: Decimal,
}

impl InvoiceSummary {
    /// Tax charged on top of the taxable amount
    pub fn tax_amount(&self) -> Decimal {
        self.amount_after_gst - self.taxable_amount
    }
}

/// Build the summary from the items and their slab breakup.
pub fn build_summary(
    items: &[LineItem],
    breakup: &TaxBreakup,
    tcs_amount: Decimal,
) -> Result<InvoiceSummary, DomainError> {
    let taxable_amount = checked_sum(items.iter().map(|item| item.amount))
        .map(round_money)
        .ok_or_else(|| DomainError::out_of_range("items"))?;
    let mrp_values = items
        .iter()
        .enumerate()
        .map(|(index, item)| item.mrp_value().map_err(|e| e.for_item(index)))
        .collect::<Result<Vec<_>, _>>()?;
    let mrp_value = checked_sum(mrp_values)
        .map(round_money)
        .ok_or_else(|| DomainError::out_of_range("items"))?;
    let amount_after_gst = breakup
        .total_tax()
        .and_then(|total_tax| taxable_amount.checked_add(total_tax))
        .map(round_money)
        .ok_or_else(|| DomainError::out_of_range("items"))?;

    let invoice_amount = round_whole(amount_after_gst);
    let round_amount = invoice_amount
        .checked_sub(amount_after_gst)
        .map(round_money)
        .ok_or_else(|| DomainError::out_of_range("items"))?;

    Ok(InvoiceSummary {
        taxable_amount,
        tcs_amount: round_money(tcs_amount),
        mrp_value,
        net_amount: taxable_amount,
        amount_after_gst,
        round_amount,
        invoice_amount,
    })
}
