//! Domain models for discrepancy-service.

#![allow(clippy::should_implement_trait)]

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

// ============================================================================
// Input Models
// ============================================================================

/// Which of the two systems a dataset came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    SystemA,
    SystemB,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SystemA => "system_a",
            Self::SystemB => "system_b",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A transaction record as produced by the ingestion layer.
///
/// Every field is optional at this point; `TransactionSet::from_records`
/// decides what is malformed.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TransactionRecord {
    #[serde(default)]
    pub transaction_id: Option<String>,
    /// JSON numbers are read from their literal digits, never through `f64`.
    #[serde(default, with = "rust_decimal::serde::arbitrary_precision_option")]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// A validated transaction, keyed by `transaction_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub transaction_id: String,
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub status: Option<String>,
}

// ============================================================================
// Discrepancy Models
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscrepancyType {
    MissingInB,
    MissingInA,
    AmountMismatch,
    StatusMismatch,
}

impl DiscrepancyType {
    pub const ALL: [DiscrepancyType; 4] = [
        Self::MissingInB,
        Self::MissingInA,
        Self::AmountMismatch,
        Self::StatusMismatch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingInB => "missing_in_b",
            Self::MissingInA => "missing_in_a",
            Self::AmountMismatch => "amount_mismatch",
            Self::StatusMismatch => "status_mismatch",
        }
    }

    /// Strict parse; unknown names are rejected rather than defaulted since
    /// this is used for caller-supplied filters.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "missing_in_b" => Some(Self::MissingInB),
            "missing_in_a" => Some(Self::MissingInA),
            "amount_mismatch" => Some(Self::AmountMismatch),
            "status_mismatch" => Some(Self::StatusMismatch),
            _ => None,
        }
    }
}

impl fmt::Display for DiscrepancyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified discrepancy that has not been persisted yet.
///
/// `seq` is its position in the classified stream and becomes the read
/// order once stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDiscrepancy {
    pub seq: i64,
    pub transaction_id: String,
    pub discrepancy_type: DiscrepancyType,
    pub amount_a: Option<Decimal>,
    pub amount_b: Option<Decimal>,
    pub status_a: Option<String>,
    pub status_b: Option<String>,
    pub currency: Option<String>,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Discrepancy {
    pub discrepancy_id: i64,
    pub report_id: i64,
    pub seq: i64,
    pub transaction_id: String,
    pub discrepancy_type: String,
    pub amount_a: Option<Decimal>,
    pub amount_b: Option<Decimal>,
    pub status_a: Option<String>,
    pub status_b: Option<String>,
    pub currency: Option<String>,
}

/// Per-type discrepancy totals for one report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TypeCounts {
    pub missing_in_a: i64,
    pub missing_in_b: i64,
    pub amount_mismatch: i64,
    pub status_mismatch: i64,
}

impl TypeCounts {
    pub fn add(&mut self, discrepancy_type: DiscrepancyType, n: i64) {
        match discrepancy_type {
            DiscrepancyType::MissingInA => self.missing_in_a += n,
            DiscrepancyType::MissingInB => self.missing_in_b += n,
            DiscrepancyType::AmountMismatch => self.amount_mismatch += n,
            DiscrepancyType::StatusMismatch => self.status_mismatch += n,
        }
    }

    pub fn total(&self) -> i64 {
        self.missing_in_a + self.missing_in_b + self.amount_mismatch + self.status_mismatch
    }
}

// ============================================================================
// Report Models
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStatus {
    Created,
    Finalized,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Finalized => "finalized",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "finalized" => Self::Finalized,
            _ => Self::Created,
        }
    }
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Report {
    pub report_id: i64,
    pub created_at: DateTime<Utc>,
    pub status: String,
    pub system_a_count: i64,
    pub system_b_count: i64,
    pub processing_time: f64,
    pub finalized_at: Option<DateTime<Utc>>,
}

impl Report {
    /// A report that is not finalized may be missing discrepancies and must
    /// not be presented as complete.
    pub fn is_finalized(&self) -> bool {
        ReportStatus::from_str(&self.status) == ReportStatus::Finalized
    }
}
