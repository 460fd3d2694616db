//! Stock batches and the adjustment audit trail

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::DomainError;
use crate::types::Adjuster;
use crate::validation::validate_adjustment_quantity;

/// Quantity held for one (product, batch number) pair
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StockBatch {
    pub id: Uuid,
    pub product_id: Uuid,
    pub batch_number: String,
    pub quantity: u64,
    pub expiry: NaiveDate,
    pub sku: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Build a SKU for a new batch, e.g. `1B4E28BA-B001`
pub fn generate_sku(product_id: Uuid, batch_number: &str) -> String {
    let simple = product_id.simple().to_string();
    format!(
        "{}-{}",
        simple[..8].to_uppercase(),
        batch_number.trim().to_uppercase()
    )
}

/// Direction of a manual adjustment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdjustmentType {
    Add,
    Deduct,
}

impl AdjustmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjustmentType::Add => "add",
            AdjustmentType::Deduct => "deduct",
        }
    }
}

/// Reasons accepted for adding stock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddReason {
    Found,
    Return,
    Correction,
    Other,
}

impl AddReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            AddReason::Found => "found",
            AddReason::Return => "return",
            AddReason::Correction => "correction",
            AddReason::Other => "other",
        }
    }
}

impl FromStr for AddReason {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "found" => Ok(AddReason::Found),
            "return" => Ok(AddReason::Return),
            "correction" => Ok(AddReason::Correction),
            "other" => Ok(AddReason::Other),
            _ => Err(DomainError::validation(
                "reason",
                format!("'{}' is not a valid reason for adding stock", s),
            )),
        }
    }
}

/// Reasons accepted for deducting stock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeductReason {
    Damage,
    Expired,
    Theft,
    Correction,
    Other,
}

impl DeductReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeductReason::Damage => "damage",
            DeductReason::Expired => "expired",
            DeductReason::Theft => "theft",
            DeductReason::Correction => "correction",
            DeductReason::Other => "other",
        }
    }
}

impl FromStr for DeductReason {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "damage" => Ok(DeductReason::Damage),
            "expired" => Ok(DeductReason::Expired),
            "theft" => Ok(DeductReason::Theft),
            "correction" => Ok(DeductReason::Correction),
            "other" => Ok(DeductReason::Other),
            _ => Err(DomainError::validation(
                "reason",
                format!("'{}' is not a valid reason for deducting stock", s),
            )),
        }
    }
}

/// Adjustment direction together with a reason from that direction's domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AdjustmentKind {
    Add { reason: AddReason },
    Deduct { reason: DeductReason },
}

impl AdjustmentKind {
    /// Pair a direction with a free-text reason, rejecting reasons outside its domain
    pub fn parse(adjustment_type: AdjustmentType, reason: &str) -> Result<Self, DomainError> {
        match adjustment_type {
            AdjustmentType::Add => Ok(AdjustmentKind::Add {
                reason: reason.parse()?,
            }),
            AdjustmentType::Deduct => Ok(AdjustmentKind::Deduct {
                reason: reason.parse()?,
            }),
        }
    }

    pub fn adjustment_type(&self) -> AdjustmentType {
        match self {
            AdjustmentKind::Add { .. } => AdjustmentType::Add,
            AdjustmentKind::Deduct { .. } => AdjustmentType::Deduct,
        }
    }

    /// Reason in the lowercase form [`AdjustmentKind::parse`] accepts
    pub fn reason(&self) -> &'static str {
        match self {
            AdjustmentKind::Add { reason } => reason.as_str(),
            AdjustmentKind::Deduct { reason } => reason.as_str(),
        }
    }
}

/// Adjustment request as it arrives from an operator form
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustmentInput {
    pub batch_id: Uuid,
    #[serde(rename = "type")]
    pub adjustment_type: AdjustmentType,
    pub quantity: i64,
    pub reason: String,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub adjuster_name: String,
    #[serde(default)]
    pub adjuster_email: String,
    #[serde(default)]
    pub adjuster_mobile: String,
}

/// A validated adjustment request. Only constructible with a positive
/// quantity and a reason that belongs to the adjustment direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjustmentRequest {
    batch_id: Uuid,
    kind: AdjustmentKind,
    quantity: u64,
    note: String,
    adjuster: Adjuster,
}

impl AdjustmentRequest {
    pub fn new(
        batch_id: Uuid,
        kind: AdjustmentKind,
        quantity: i64,
        note: impl Into<String>,
        adjuster: Adjuster,
    ) -> Result<Self, DomainError> {
        let quantity = validate_adjustment_quantity(quantity)?;
        Ok(Self {
            batch_id,
            kind,
            quantity,
            note: note.into(),
            adjuster,
        })
    }

    pub fn batch_id(&self) -> Uuid {
        self.batch_id
    }

    pub fn kind(&self) -> AdjustmentKind {
        self.kind
    }

    pub fn quantity(&self) -> u64 {
        self.quantity
    }

    pub fn note(&self) -> &str {
        &self.note
    }

    pub fn adjuster(&self) -> &Adjuster {
        &self.adjuster
    }
}

impl TryFrom<AdjustmentInput> for AdjustmentRequest {
    type Error = DomainError;

    fn try_from(input: AdjustmentInput) -> Result<Self, Self::Error> {
        validate_adjustment_quantity(input.quantity)?;
        let kind = AdjustmentKind::parse(input.adjustment_type, &input.reason)?;
        Self::new(
            input.batch_id,
            kind,
            input.quantity,
            input.note,
            Adjuster::new(input.adjuster_name, input.adjuster_email, input.adjuster_mobile),
        )
    }
}

/// One immutable entry in a batch's adjustment log
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StockAdjustment {
    pub id: Uuid,
    pub batch_id: Uuid,
    #[serde(flatten)]
    pub kind: AdjustmentKind,
    pub quantity: u64,
    pub note: String,
    pub adjuster: Adjuster,
    pub resulting_quantity: u64,
    pub created_at: DateTime<Utc>,
}

/// Lifecycle of one adjustment request inside the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentState {
    Submitted,
    Validated,
    Applied,
    Recorded,
    Rejected,
}

impl AdjustmentState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AdjustmentState::Recorded | AdjustmentState::Rejected)
    }
}

/// A quantity increment produced by committing a receipt line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptLine {
    /// Existing batch to top up; `None` resolves by product and batch number
    pub batch_id: Option<Uuid>,
    pub product_id: Uuid,
    pub batch_number: String,
    pub quantity: u64,
    pub expiry: NaiveDate,
}
