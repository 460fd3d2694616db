//! GST slab aggregation

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::LineItem;
use crate::error::DomainError;
use crate::types::{checked_sum, percent_of, round_money};

/// The four recognised combined GST rates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GstSlab {
    Gst5,
    Gst12,
    Gst18,
    Gst28,
}

impl GstSlab {
    pub const ALL: [GstSlab; 4] = [
        GstSlab::Gst5,
        GstSlab::Gst12,
        GstSlab::Gst18,
        GstSlab::Gst28,
    ];

    pub fn rate(&self) -> Decimal {
        match self {
            GstSlab::Gst5 => Decimal::from(5),
            GstSlab::Gst12 => Decimal::from(12),
            GstSlab::Gst18 => Decimal::from(18),
            GstSlab::Gst28 => Decimal::from(28),
        }
    }

    /// Exact match only; 18.0 matches `Gst18`, 18.5 matches nothing.
    pub fn from_rate(rate: Decimal) -> Option<Self> {
        Self::ALL.into_iter().find(|slab| slab.rate() == rate)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GstSlab::Gst5 => "gst5",
            GstSlab::Gst12 => "gst12",
            GstSlab::Gst18 => "gst18",
            GstSlab::Gst28 => "gst28",
        }
    }
}

impl std::fmt::Display for GstSlab {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.rate())
    }
}

/// Taxable value and tax collected for one slab
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaxSlabBucket {
    pub taxable: Decimal,
    pub tax: Decimal,
}

/// A line whose combined rate matched no slab.
///
/// Such lines still count towards the invoice taxable amount but are left out
/// of every bucket, and their tax is never charged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnslabbedLine {
    pub index: usize,
    pub combined_rate: Decimal,
    pub amount: Decimal,
}

/// Per-slab totals for a set of line items
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaxBreakup {
    pub gst5: TaxSlabBucket,
    pub gst12: TaxSlabBucket,
    pub gst18: TaxSlabBucket,
    pub gst28: TaxSlabBucket,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unslabbed: Vec<UnslabbedLine>,
}

impl TaxBreakup {
    pub fn bucket(&self, slab: GstSlab) -> &TaxSlabBucket {
        match slab {
            GstSlab::Gst5 => &self.gst5,
            GstSlab::Gst12 => &self.gst12,
            GstSlab::Gst18 => &self.gst18,
            GstSlab::Gst28 => &self.gst28,
        }
    }

    fn bucket_mut(&mut self, slab: GstSlab) -> &mut TaxSlabBucket {
        match slab {
            GstSlab::Gst5 => &mut self.gst5,
            GstSlab::Gst12 => &mut self.gst12,
            GstSlab::Gst18 => &mut self.gst18,
            GstSlab::Gst28 => &mut self.gst28,
        }
    }

    /// `None` if the buckets cannot be summed without overflow
    pub fn total_tax(&self) -> Option<Decimal> {
        checked_sum(GstSlab::ALL.iter().map(|slab| self.bucket(*slab).tax))
    }

    pub fn total_taxable(&self) -> Option<Decimal> {
        checked_sum(GstSlab::ALL.iter().map(|slab| self.bucket(*slab).taxable))
    }

    /// True when every line landed in one of the four slabs
    pub fn is_fully_slabbed(&self) -> bool {
        self.unslabbed.is_empty()
    }
}

/// Bucket line items by combined GST rate.
///
/// Sums are exact decimal additions, so the result does not depend on item
/// order. Bucket figures are rounded to 2 places once, at the end.
pub fn aggregate_tax(items: &[LineItem]) -> Result<TaxBreakup, DomainError> {
    let mut breakup = TaxBreakup::default();

    for (index, item) in items.iter().enumerate() {
        let combined_rate = item.combined_gst_rate().map_err(|e| e.for_item(index))?;
        match GstSlab::from_rate(combined_rate) {
            Some(slab) => {
                let bucket = breakup.bucket_mut(slab);
                let tax = percent_of(item.amount, combined_rate);
                let (taxable, tax) = bucket
                    .taxable
                    .checked_add(item.amount)
                    .zip(tax.and_then(|tax| bucket.tax.checked_add(tax)))
                    .ok_or_else(|| DomainError::out_of_range("amount").for_item(index))?;
                bucket.taxable = taxable;
                bucket.tax = tax;
            }
            None => breakup.unslabbed.push(UnslabbedLine {
                index,
                combined_rate,
                amount: item.amount,
            }),
        }
    }

    for slab in GstSlab::ALL {
        let bucket = breakup.bucket_mut(slab);
        bucket.taxable = round_money(bucket.taxable);
        bucket.tax = round_money(bucket.tax);
    }

    Ok(breakup)
}
