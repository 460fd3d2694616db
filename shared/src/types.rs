//! Common types and numeric helpers used across the platform

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Decimal places kept on every monetary output
pub const MONEY_SCALE: u32 = 2;

/// Round a monetary value to 2 decimal places, ties away from zero.
/// The result always carries exactly two decimal places.
pub fn round_money(value: Decimal) -> Decimal {
    let mut rounded =
        value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(MONEY_SCALE);
    rounded
}

/// Round to a whole currency unit, ties away from zero.
pub fn round_whole(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(0);
    rounded
}

/// `value × percent / 100`, unrounded. `None` on overflow.
pub fn percent_of(value: Decimal, percent: Decimal) -> Option<Decimal> {
    value
        .checked_mul(percent)
        .and_then(|scaled| scaled.checked_div(Decimal::from(100)))
}

/// Sum that reports overflow instead of panicking
pub fn checked_sum(values: impl IntoIterator<Item = Decimal>) -> Option<Decimal> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |total, value| total.checked_add(value))
}

/// Identity of the operator performing a stock adjustment.
///
/// Stored verbatim in the audit trail. Nothing here is verified; the ledger
/// records whatever the caller supplies.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Adjuster {
    pub name: String,
    pub email: String,
    pub mobile: String,
}

impl Adjuster {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        mobile: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            mobile: mobile.into(),
        }
    }
}
