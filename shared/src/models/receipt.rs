//! Draft purchase receipts (GRN) and the commit payload

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    aggregate_tax, apply_edit, build_summary, recalculate_item, CatalogProduct, InvoiceSummary,
    LineItem, LineItemEdit, TaxBreakup,
};
use crate::error::DomainError;
use crate::types::{checked_sum, round_money};

/// Receipt status as stored by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptStatus {
    Pending,
    #[default]
    Received,
}

impl ReceiptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReceiptStatus::Pending => "pending",
            ReceiptStatus::Received => "received",
        }
    }
}

/// Supplier payment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Partial,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Partial => "partial",
            PaymentStatus::Paid => "paid",
        }
    }
}

/// Wire form of a draft. Derived fields sent by a client are ignored and
/// recomputed on conversion.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftReceiptInput {
    pub supplier_id: Option<Uuid>,
    pub invoice_date: Option<NaiveDate>,
    pub notes: Option<String>,
    #[serde(default)]
    pub status: ReceiptStatus,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub tcs_amount: Decimal,
    #[serde(default)]
    pub items: Vec<LineItem>,
}

/// An editable purchase receipt that has not been committed.
///
/// Items are private so every mutation passes through a method that
/// refreshes `tax_breakup` and `summary` over the full item list. A mutation
/// whose figures cannot be calculated is rejected and leaves the draft as it
/// was.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "DraftReceiptInput")]
pub struct DraftReceipt {
    pub supplier_id: Option<Uuid>,
    pub invoice_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub status: ReceiptStatus,
    pub payment_status: PaymentStatus,
    tcs_amount: Decimal,
    items: Vec<LineItem>,
    tax_breakup: TaxBreakup,
    summary: InvoiceSummary,
}

impl Default for DraftReceipt {
    fn default() -> Self {
        Self {
            supplier_id: None,
            invoice_date: None,
            notes: None,
            status: ReceiptStatus::default(),
            payment_status: PaymentStatus::default(),
            tcs_amount: Decimal::ZERO,
            items: Vec::new(),
            tax_breakup: TaxBreakup::default(),
            summary: InvoiceSummary::default(),
        }
    }
}

impl TryFrom<DraftReceiptInput> for DraftReceipt {
    type Error = DomainError;

    fn try_from(input: DraftReceiptInput) -> Result<Self, Self::Error> {
        let items = input
            .items
            .into_iter()
            .enumerate()
            .map(|(index, item)| recalculate_item(item).map_err(|e| e.for_item(index)))
            .collect::<Result<Vec<_>, _>>()?;
        let (tax_breakup, summary) = totals(&items, input.tcs_amount)?;

        Ok(Self {
            supplier_id: input.supplier_id,
            invoice_date: input.invoice_date,
            notes: input.notes,
            status: input.status,
            payment_status: input.payment_status,
            tcs_amount: input.tcs_amount,
            items,
            tax_breakup,
            summary,
        })
    }
}

fn totals(
    items: &[LineItem],
    tcs_amount: Decimal,
) -> Result<(TaxBreakup, InvoiceSummary), DomainError> {
    let breakup = aggregate_tax(items)?;
    let summary = build_summary(items, &breakup, tcs_amount)?;
    Ok((breakup, summary))
}

impl DraftReceipt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn tax_breakup(&self) -> &TaxBreakup {
        &self.tax_breakup
    }

    pub fn summary(&self) -> &InvoiceSummary {
        &self.summary
    }

    pub fn tcs_amount(&self) -> Decimal {
        self.tcs_amount
    }

    pub fn set_supplier(&mut self, supplier_id: Option<Uuid>) {
        self.supplier_id = supplier_id;
    }

    pub fn set_tcs_amount(&mut self, tcs_amount: Decimal) -> Result<(), DomainError> {
        let (tax_breakup, summary) = totals(&self.items, tcs_amount)?;
        self.tcs_amount = tcs_amount;
        self.tax_breakup = tax_breakup;
        self.summary = summary;
        Ok(())
    }

    /// Append a line and return its index
    pub fn add_item(&mut self, item: LineItem) -> Result<usize, DomainError> {
        let index = self.items.len();
        let item = recalculate_item(item).map_err(|e| e.for_item(index))?;
        self.items.push(item);
        if let Err(e) = self.refresh_totals() {
            self.items.pop();
            return Err(e);
        }
        Ok(index)
    }

    /// Append a line seeded from the catalog and return its index
    pub fn add_catalog_product(&mut self, product: &CatalogProduct) -> Result<usize, DomainError> {
        self.add_item(LineItem::from_catalog(product)?)
    }

    /// Apply a field edit to the line at `index`
    pub fn update_item(
        &mut self,
        index: usize,
        edit: LineItemEdit,
    ) -> Result<&LineItem, DomainError> {
        let current = self
            .items
            .get(index)
            .cloned()
            .ok_or(DomainError::LineNotFound(index))?;
        let edited = apply_edit(current, edit).map_err(|e| e.for_item(index))?;
        let previous = std::mem::replace(&mut self.items[index], edited);
        if let Err(e) = self.refresh_totals() {
            self.items[index] = previous;
            return Err(e);
        }
        Ok(&self.items[index])
    }

    /// Remove the line at `index`, returning it
    pub fn remove_item(&mut self, index: usize) -> Result<LineItem, DomainError> {
        if index >= self.items.len() {
            return Err(DomainError::LineNotFound(index));
        }
        let removed = self.items.remove(index);
        if let Err(e) = self.refresh_totals() {
            self.items.insert(index, removed);
            return Err(e);
        }
        Ok(removed)
    }

    /// Total line discount: gross value minus taxable amount
    pub fn discount_total(&self) -> Result<Decimal, DomainError> {
        let gross = self
            .items
            .iter()
            .enumerate()
            .map(|(index, item)| item.gross_amount().map_err(|e| e.for_item(index)))
            .collect::<Result<Vec<_>, _>>()?;
        checked_sum(gross)
            .and_then(|gross| gross.checked_sub(self.summary.taxable_amount))
            .map(round_money)
            .ok_or_else(|| DomainError::out_of_range("items"))
    }

    fn refresh_totals(&mut self) -> Result<(), DomainError> {
        let (tax_breakup, summary) = totals(&self.items, self.tcs_amount)?;
        self.tax_breakup = tax_breakup;
        self.summary = summary;
        Ok(())
    }

    /// Build the payload sent to the persistence collaborator.
    ///
    /// Only checks what the payload itself needs; business validation lives
    /// in [`crate::validation::validate_draft_for_commit`].
    pub fn to_commit_request(&self, today: NaiveDate) -> Result<CommitRequest, DomainError> {
        let supplier_id = self
            .supplier_id
            .ok_or_else(|| DomainError::validation("supplierId", "A supplier must be selected"))?;

        Ok(CommitRequest {
            supplier_id,
            invoice_date: self.invoice_date.unwrap_or(today),
            notes: self.notes.clone(),
            items: self.items.clone(),
            invoice_summary: self.summary.clone(),
            tax_breakup: self.tax_breakup.clone(),
            sub_total: self.summary.taxable_amount,
            tax_amount: self.summary.tax_amount(),
            discount: self.discount_total()?,
            grand_total: self.summary.invoice_amount,
            status: self.status,
            payment_status: self.payment_status,
        })
    }
}

/// Commit payload handed to the persistence collaborator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommitRequest {
    pub supplier_id: Uuid,
    pub invoice_date: NaiveDate,
    pub notes: Option<String>,
    pub items: Vec<LineItem>,
    pub invoice_summary: InvoiceSummary,
    pub tax_breakup: TaxBreakup,
    pub sub_total: Decimal,
    pub tax_amount: Decimal,
    pub discount: Decimal,
    pub grand_total: Decimal,
    pub status: ReceiptStatus,
    pub payment_status: PaymentStatus,
}

/// A committed receipt as returned by the persistence collaborator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseReceiptRecord {
    pub id: Uuid,
    pub invoice_number: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub receipt: CommitRequest,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn scenario_item() -> LineItem {
        let mut item = LineItem::new(Uuid::new_v4());
        item.batch_number = "B001".to_string();
        item.base_rate = dec("100");
        item.received_qty = 10;
        item.discount_percent = dec("10");
        item.cgst = dec("9");
        item.sgst = dec("9");
        item.mrp = dec("120");
        item
    }

    #[test]
    fn test_add_item_recomputes_everything() {
        let mut draft = DraftReceipt::new();
        let index = draft.add_item(scenario_item()).unwrap();

        assert_eq!(index, 0);
        assert_eq!(draft.items()[0].amount, dec("900.00"));
        assert_eq!(draft.tax_breakup().gst18.tax, dec("162.00"));
        assert_eq!(draft.summary().invoice_amount, dec("1062"));
        assert_eq!(draft.summary().mrp_value, dec("1200.00"));
    }

    #[test]
    fn test_update_item_refreshes_summary() {
        let mut draft = DraftReceipt::new();
        draft.add_item(scenario_item()).unwrap();

        let updated = draft
            .update_item(0, LineItemEdit::DiscountPercent(Decimal::ZERO))
            .unwrap();
        assert_eq!(updated.amount, dec("1000.00"));
        assert_eq!(draft.summary().taxable_amount, dec("1000.00"));
        assert_eq!(draft.summary().amount_after_gst, dec("1180.00"));
    }

    #[test]
    fn test_rejected_edit_leaves_draft_unchanged() {
        let mut draft = DraftReceipt::new();
        draft.add_item(scenario_item()).unwrap();

        let result = draft.update_item(0, LineItemEdit::BaseRate(Decimal::MAX));

        assert!(matches!(
            result,
            Err(DomainError::Validation { ref field, .. }) if field == "items[0].baseRate"
        ));
        assert_eq!(draft.items()[0].base_rate, dec("100"));
        assert_eq!(draft.summary().invoice_amount, dec("1062"));
    }

    #[test]
    fn test_rejected_tcs_and_items_leave_totals() {
        let mut draft = DraftReceipt::new();
        draft.add_item(scenario_item()).unwrap();

        let mut oversized = scenario_item();
        oversized.mrp = Decimal::MAX;
        assert!(draft.add_item(oversized).is_err());
        assert_eq!(draft.items().len(), 1);
        assert_eq!(draft.summary().mrp_value, dec("1200.00"));

        draft.set_tcs_amount(dec("2.50")).unwrap();
        assert_eq!(draft.tcs_amount(), dec("2.50"));
        assert_eq!(draft.summary().tcs_amount, dec("2.50"));
    }

    #[test]
    fn test_deserialize_rejects_oversized_figures() {
        let json = r#"{
            "items": [{
                "productId": "1b4e28ba-2fa1-11d2-883f-0016d3cca427",
                "receivedQty": 5000,
                "baseRate": "79228162514264337593543950"
            }]
        }"#;
        assert!(serde_json::from_str::<DraftReceipt>(json).is_err());
    }

    #[test]
    fn test_update_missing_item() {
        let mut draft = DraftReceipt::new();
        let result = draft.update_item(3, LineItemEdit::ReceivedQty(1));
        assert_eq!(result.unwrap_err(), DomainError::LineNotFound(3));
    }

    #[test]
    fn test_remove_item_zeroes_totals() {
        let mut draft = DraftReceipt::new();
        draft.add_item(scenario_item()).unwrap();
        let removed = draft.remove_item(0).unwrap();

        assert_eq!(removed.batch_number, "B001");
        assert!(draft.items().is_empty());
        assert_eq!(draft.summary(), &InvoiceSummary::default());
        assert!(draft.remove_item(0).is_err());
    }

    #[test]
    fn test_deserialize_ignores_client_derived_fields() {
        let json = r#"{
            "supplierId": "7f1d2c7e-4f55-4d38-9a3e-9f1c1b0f2a11",
            "items": [{
                "productId": "1b4e28ba-2fa1-11d2-883f-0016d3cca427",
                "batchNumber": "B9",
                "receivedQty": 2,
                "baseRate": "50",
                "cgst": "6",
                "sgst": "6",
                "amount": "999999"
            }]
        }"#;
        let draft: DraftReceipt = serde_json::from_str(json).unwrap();
        assert_eq!(draft.items()[0].amount, dec("100.00"));
        assert_eq!(draft.tax_breakup().gst12.tax, dec("12.00"));
        assert_eq!(draft.summary().invoice_amount, dec("112"));
    }

    #[test]
    fn test_commit_request_totals() {
        let mut draft = DraftReceipt::new();
        draft.set_supplier(Some(Uuid::new_v4()));
        draft.add_item(scenario_item()).unwrap();

        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let request = draft.to_commit_request(today).unwrap();

        assert_eq!(request.invoice_date, today);
        assert_eq!(request.sub_total, dec("900.00"));
        assert_eq!(request.tax_amount, dec("162.00"));
        assert_eq!(request.discount, dec("100.00"));
        assert_eq!(request.grand_total, dec("1062"));
        assert_eq!(request.status, ReceiptStatus::Received);
        assert_eq!(request.payment_status, PaymentStatus::Unpaid);
    }

    #[test]
    fn test_commit_request_requires_supplier() {
        let mut draft = DraftReceipt::new();
        draft.add_item(scenario_item()).unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert!(matches!(
            draft.to_commit_request(today),
            Err(DomainError::Validation { .. })
        ));
    }
}
