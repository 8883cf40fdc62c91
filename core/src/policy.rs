//! Pluggable business policies.
//!
//! Lifecycle and report logic depend only on these interfaces, so a real
//! scoring model or a stricter filing rule can be substituted without
//! touching either.

use crate::{case::CaseStatus, case::RiskLevel, config::RiskConfig};
use serde::{Deserialize, Serialize};

/// Derives the displayed risk score of a case. Applied at read time, never stored.
pub trait RiskScorer: Send + Sync {
    fn score(&self, level: RiskLevel) -> u8;
}

/// `High` maps to one score, every other level to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TieredRiskScorer {
    pub high: u8,
    pub other: u8,
}

impl TieredRiskScorer {
    pub fn from_config(config: &RiskConfig) -> Self {
        Self {
            high: config.high_score,
            other: config.default_score,
        }
    }
}

impl Default for TieredRiskScorer {
    fn default() -> Self {
        Self::from_config(&RiskConfig::default())
    }
}

impl RiskScorer for TieredRiskScorer {
    fn score(&self, level: RiskLevel) -> u8 {
        match level {
            RiskLevel::High => self.high,
            RiskLevel::Medium | RiskLevel::Low => self.other,
        }
    }
}

/// Which source statuses `submit_sar` accepts. `Filed` is rejected by both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilingPolicy {
    /// Any open status may be filed.
    #[default]
    Permissive,
    /// Only cases that went through review or escalation may be filed.
    RequireReview,
}

impl FilingPolicy {
    pub fn permits(&self, from: CaseStatus) -> bool {
        if from.is_terminal() {
            return false;
        }
        match self {
            Self::Permissive => true,
            Self::RequireReview => matches!(
                from,
                CaseStatus::ReadyForFiling | CaseStatus::Escalated | CaseStatus::InReview
            ),
        }
    }
}
