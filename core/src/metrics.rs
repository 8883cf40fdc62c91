//! Dashboard metrics. Read-only over the case store.

use crate::{case::RiskLevel, error::DeskResult, store::CaseStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const SECONDS_PER_DAY: f64 = 86_400.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardMetrics {
    pub open_cases: i64,
    pub high_risk_alerts: i64,
    pub sars_filed: i64,
    /// Mean days from open to filing over filed cases that recorded a
    /// filing time. `None` when no such case exists.
    pub avg_resolution_days: Option<f64>,
    /// Number of filed cases behind `avg_resolution_days`. Filed cases
    /// without a closure timestamp are left out, so this can be lower than
    /// `sars_filed`.
    pub resolution_sample: usize,
    pub last_updated: DateTime<Utc>,
}

pub struct MetricsAggregator {
    store: Arc<CaseStore>,
}

impl MetricsAggregator {
    pub fn new(store: Arc<CaseStore>) -> Self {
        Self { store }
    }

    pub fn snapshot(&self) -> DeskResult<DashboardMetrics> {
        let metrics = self.store.read(|s| {
            let spans = s.resolution_spans()?;
            Ok(DashboardMetrics {
                open_cases: s.count_open_cases()?,
                high_risk_alerts: s.count_open_cases_at_risk(RiskLevel::High)?,
                sars_filed: s.count_filed_cases()?,
                avg_resolution_days: mean_resolution_days(&spans),
                resolution_sample: spans.len(),
                last_updated: Utc::now(),
            })
        })?;
        log::debug!(
            "Dashboard snapshot: {} open, {} high risk, {} filed",
            metrics.open_cases,
            metrics.high_risk_alerts,
            metrics.sars_filed
        );
        Ok(metrics)
    }
}

pub fn mean_resolution_days(spans: &[(DateTime<Utc>, DateTime<Utc>)]) -> Option<f64> {
    if spans.is_empty() {
        return None;
    }
    let total: f64 = spans
        .iter()
        .map(|(opened, filed)| (*filed - *opened).num_seconds() as f64 / SECONDS_PER_DAY)
        .sum();
    Some(total / spans.len() as f64)
}
