//! Case, customer, transaction and typology records.
//!
//! Customers and transactions are immutable reference data here; cases are
//! mutated only through the lifecycle engine.

use crate::types::{CaseId, CustomerId};
use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownLabel {
    pub kind: &'static str,
    pub value: String,
}

/// Implements the text encoding shared by the label enums: `as_str`,
/// `Display`, `FromStr` and the SQLite conversions.
macro_rules! labelled_enum {
    ($ty:ident, $kind:literal, { $($variant:ident => $label:literal),+ $(,)? }) => {
        impl $ty {
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = UnknownLabel;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($label => Ok($ty::$variant),)+
                    other => Err(UnknownLabel { kind: $kind, value: other.to_string() }),
                }
            }
        }

        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e: UnknownLabel| FromSqlError::Other(Box::new(e)))
            }
        }
    };
}

// ── Case status ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CaseStatus {
    Open,
    #[serde(rename = "In Review")]
    InReview,
    Drafting,
    #[serde(rename = "QA Pending")]
    QaPending,
    #[serde(rename = "Ready for Filing")]
    ReadyForFiling,
    Escalated,
    Filed,
}

labelled_enum!(CaseStatus, "case status", {
    Open => "Open",
    InReview => "In Review",
    Drafting => "Drafting",
    QaPending => "QA Pending",
    ReadyForFiling => "Ready for Filing",
    Escalated => "Escalated",
    Filed => "Filed",
});

impl CaseStatus {
    /// `Filed` admits no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Filed)
    }

    /// Review workflow steps reachable through `LifecycleEngine::advance`.
    /// Escalation and filing have dedicated operations and are not listed.
    pub fn can_advance_to(&self, target: CaseStatus) -> bool {
        use CaseStatus::*;
        matches!(
            (self, target),
            (Open, InReview)
                | (InReview, Drafting)
                | (Drafting, QaPending)
                | (QaPending, ReadyForFiling)
                | (QaPending, Drafting)
                | (Escalated, InReview)
        )
    }
}

// ── Risk level ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    High,
    Medium,
    Low,
}

labelled_enum!(RiskLevel, "risk level", {
    High => "High",
    Medium => "Medium",
    Low => "Low",
});

// ── Transaction attributes ───────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionType {
    Wire,
    #[serde(rename = "ACH")]
    Ach,
    Cash,
    Crypto,
}

labelled_enum!(TransactionType, "transaction type", {
    Wire => "Wire",
    Ach => "ACH",
    Cash => "Cash",
    Crypto => "Crypto",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Inbound,
    Outbound,
}

labelled_enum!(Direction, "direction", {
    Inbound => "Inbound",
    Outbound => "Outbound",
});

// ── Records ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub customer_id: CustomerId,
    pub timestamp: DateTime<Utc>,
    pub amount: Decimal,
    pub currency: String,
    pub counterparty: String,
    #[serde(rename = "type")]
    pub txn_type: TransactionType,
    pub direction: Direction,
    pub flagged: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A suspicious-activity pattern supplied by the upstream detection process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Typology {
    pub id: String,
    pub name: String,
    pub confidence: f64,
}

/// Row shape of `sar_cases`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub id: CaseId,
    pub customer_id: CustomerId,
    pub opened_at: DateTime<Utc>,
    pub status: CaseStatus,
    pub assignee: Option<String>,
    pub filed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseSummary {
    pub id: CaseId,
    pub customer_name: String,
    pub customer_id: CustomerId,
    pub opened_at: DateTime<Utc>,
    pub risk_score: u8,
    pub risk_level: RiskLevel,
    pub status: CaseStatus,
    pub assignee: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseDetail {
    #[serde(flatten)]
    pub summary: CaseSummary,
    /// Newest first.
    pub transactions: Vec<Transaction>,
    pub typologies: Vec<Typology>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use CaseStatus::*;

    #[test]
    fn status_labels_round_trip_through_text() {
        for status in CaseStatus::ALL {
            assert_eq!(status.as_str().parse::<CaseStatus>(), Ok(*status));
        }
        assert!("Closed".parse::<CaseStatus>().is_err());
    }

    #[test]
    fn serde_uses_display_labels() {
        let json = serde_json::to_string(&ReadyForFiling).unwrap();
        assert_eq!(json, "\"Ready for Filing\"");
        let back: CaseStatus = serde_json::from_str("\"QA Pending\"").unwrap();
        assert_eq!(back, QaPending);
    }

    #[test]
    fn only_filed_is_terminal() {
        let terminal: Vec<_> = CaseStatus::ALL.iter().filter(|s| s.is_terminal()).collect();
        assert_eq!(terminal, vec![&Filed]);
    }

    #[test]
    fn workflow_never_advances_into_escalated_or_filed() {
        for from in CaseStatus::ALL {
            assert!(!from.can_advance_to(Filed));
            assert!(!from.can_advance_to(Escalated));
            assert!(!Filed.can_advance_to(*from));
        }
        assert!(Open.can_advance_to(InReview));
        assert!(QaPending.can_advance_to(Drafting));
        assert!(!Open.can_advance_to(ReadyForFiling));
    }
}
