//! Dataset ingest — customers, transactions, cases and typology findings
//! handed over by the upstream monitoring and detection processes.
//!
//! Cases are opened through the lifecycle engine and walked to their
//! requested status one legal step at a time, so the audit trail of an
//! ingested case looks exactly like one worked by hand.

use crate::{
    case::{CaseStatus, Customer, Transaction, Typology},
    desk::Desk,
    error::DeskResult,
    types::{CaseId, CustomerId},
};
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseSeed {
    pub id: CaseId,
    pub customer_id: CustomerId,
    pub opened_at: DateTime<Utc>,
    #[serde(default = "default_status")]
    pub status: CaseStatus,
    #[serde(default)]
    pub assignee: Option<String>,
    /// Closure time of a seeded `Filed` case. Without it the case is filed
    /// with no closure time and is left out of resolution metrics.
    #[serde(default)]
    pub filed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub typologies: Vec<Typology>,
}

fn default_status() -> CaseStatus {
    CaseStatus::Open
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Dataset {
    pub customers: Vec<Customer>,
    pub transactions: Vec<Transaction>,
    pub cases: Vec<CaseSeed>,
}

impl Dataset {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read dataset {path}"))?;
        let dataset = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse dataset {path}"))?;
        Ok(dataset)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub customers: usize,
    pub transactions: usize,
    pub cases: usize,
    pub typologies: usize,
}

/// Lifecycle steps that take a fresh case from `Open` to `target`.
fn steps_to(target: CaseStatus) -> Vec<Step> {
    use CaseStatus::*;
    let review = [InReview, Drafting, QaPending, ReadyForFiling];
    match target {
        Open => Vec::new(),
        Escalated => vec![Step::Escalate],
        Filed => review.iter().map(|s| Step::Advance(*s)).chain([Step::Submit]).collect(),
        other => review
            .iter()
            .take_while(|s| **s != other)
            .chain(std::iter::once(&other))
            .map(|s| Step::Advance(*s))
            .collect(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Advance(CaseStatus),
    Escalate,
    Submit,
}

/// Apply a dataset. Each record commits on its own, so a failure part way
/// leaves the records before it in place.
pub fn ingest_dataset(desk: &Desk, dataset: &Dataset, actor: &str) -> DeskResult<IngestSummary> {
    let mut summary = IngestSummary::default();

    for customer in &dataset.customers {
        desk.store.insert_customer(customer)?;
        summary.customers += 1;
    }
    for txn in &dataset.transactions {
        desk.store.insert_transaction(txn)?;
        summary.transactions += 1;
    }
    for seed in &dataset.cases {
        desk.lifecycle
            .open_case(&seed.id, &seed.customer_id, seed.opened_at, actor)?;
        for typology in &seed.typologies {
            desk.store.record_typology(&seed.id, typology)?;
            summary.typologies += 1;
        }
        if let Some(assignee) = &seed.assignee {
            desk.lifecycle.assign(&seed.id, assignee, actor)?;
        }
        for step in steps_to(seed.status) {
            match step {
                Step::Advance(target) => desk.lifecycle.advance(&seed.id, target, actor)?,
                Step::Escalate => desk.lifecycle.escalate(&seed.id, actor)?,
                Step::Submit => desk.lifecycle.submit_sar_at(&seed.id, actor, seed.filed_at)?,
            };
        }
        summary.cases += 1;
    }

    log::info!(
        "Ingested {} customers, {} transactions, {} cases, {} typologies",
        summary.customers,
        summary.transactions,
        summary.cases,
        summary.typologies
    );
    Ok(summary)
}
