//! Case lifecycle engine — the only writer of case status.
//!
//! STATES: Open, In Review, Drafting, QA Pending, Ready for Filing,
//!         Escalated, Filed (terminal).
//!
//! RULES:
//!   - Every operation runs in one IMMEDIATE transaction: read status,
//!     validate, mutate, append the audit entry, commit. Any failure rolls
//!     the whole unit back, so a status change never exists without its
//!     audit entry and vice versa.
//!   - Concurrent calls on the same case serialize on the store's write
//!     lock; the loser observes the winner's committed status.
//!   - Nothing moves a case out of Filed.

use crate::{
    audit::{self, AuditAction},
    case::{CaseRecord, CaseStatus},
    error::{DeskError, DeskResult},
    policy::FilingPolicy,
    store::{CaseStore, Session},
    types::{CaseId, LogId},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Outcome of a committed lifecycle operation. `to` is the case's new status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseTransition {
    pub case_id: CaseId,
    pub from: CaseStatus,
    pub to: CaseStatus,
    pub log_id: LogId,
}

pub struct LifecycleEngine {
    store: Arc<CaseStore>,
    filing: FilingPolicy,
}

impl LifecycleEngine {
    pub fn new(store: Arc<CaseStore>, filing: FilingPolicy) -> Self {
        Self { store, filing }
    }

    pub fn filing_policy(&self) -> FilingPolicy {
        self.filing
    }

    /// Open a new case in status `Open` for an existing customer.
    pub fn open_case(
        &self,
        case_id: &str,
        customer_id: &str,
        opened_at: DateTime<Utc>,
        actor: &str,
    ) -> DeskResult<CaseRecord> {
        self.store.write(|s| {
            s.customer(customer_id)?
                .ok_or_else(|| DeskError::customer_not_found(customer_id))?;
            if let Some(existing) = s.status_of(case_id)? {
                return Err(reject(case_id, existing, "OPEN"));
            }
            let record = CaseRecord {
                id: case_id.to_string(),
                customer_id: customer_id.to_string(),
                opened_at,
                status: CaseStatus::Open,
                assignee: None,
                filed_at: None,
            };
            s.insert_case(&record)?;
            audit::append(
                s,
                case_id,
                AuditAction::CaseOpened.as_str(),
                actor,
                &format!("Case opened for customer {customer_id}"),
            )?;
            log::info!("Case {case_id} opened for {customer_id} by {actor}");
            Ok(record)
        })
    }

    /// Move any non-filed case to `Escalated`.
    pub fn escalate(&self, case_id: &str, actor: &str) -> DeskResult<CaseTransition> {
        self.store.write(|s| {
            let from = current_status(s, case_id)?;
            if from.is_terminal() {
                return Err(reject(case_id, from, AuditAction::Escalate.as_str()));
            }
            commit(
                s,
                case_id,
                from,
                CaseStatus::Escalated,
                AuditAction::Escalate,
                actor,
                "Case escalated to Senior Compliance Officer",
                None,
            )
        })
    }

    /// File the SAR. The case becomes `Filed` and records its closure time.
    /// Source statuses are checked against the configured filing policy.
    pub fn submit_sar(&self, case_id: &str, actor: &str) -> DeskResult<CaseTransition> {
        self.submit_sar_at(case_id, actor, Some(Utc::now()))
    }

    /// File with a known closure time. Historical filings without one keep
    /// `filed_at` NULL and stay out of resolution metrics.
    pub(crate) fn submit_sar_at(
        &self,
        case_id: &str,
        actor: &str,
        filed_at: Option<DateTime<Utc>>,
    ) -> DeskResult<CaseTransition> {
        self.store.write(|s| {
            let from = current_status(s, case_id)?;
            if !self.filing.permits(from) {
                return Err(reject(case_id, from, AuditAction::FileSar.as_str()));
            }
            commit(
                s,
                case_id,
                from,
                CaseStatus::Filed,
                AuditAction::FileSar,
                actor,
                "SAR filed with FinCEN",
                filed_at,
            )
        })
    }

    /// Step through the review workflow (see `CaseStatus::can_advance_to`).
    pub fn advance(
        &self,
        case_id: &str,
        target: CaseStatus,
        actor: &str,
    ) -> DeskResult<CaseTransition> {
        self.store.write(|s| {
            let from = current_status(s, case_id)?;
            if !from.can_advance_to(target) {
                return Err(reject(case_id, from, &format!("move to {target}")));
            }
            commit(
                s,
                case_id,
                from,
                target,
                AuditAction::StatusChange,
                actor,
                &format!("{from} -> {target}"),
                None,
            )
        })
    }

    /// Hand the case to an investigator. Status is unchanged.
    pub fn assign(&self, case_id: &str, assignee: &str, actor: &str) -> DeskResult<CaseTransition> {
        self.store.write(|s| {
            let status = current_status(s, case_id)?;
            if status.is_terminal() {
                return Err(reject(case_id, status, AuditAction::Assign.as_str()));
            }
            s.set_assignee(case_id, assignee)?;
            let entry = audit::append(
                s,
                case_id,
                AuditAction::Assign.as_str(),
                actor,
                &format!("Case assigned to {assignee}"),
            )?;
            log::info!("Case {case_id} assigned to {assignee} by {actor}");
            Ok(CaseTransition {
                case_id: case_id.to_string(),
                from: status,
                to: status,
                log_id: entry.id,
            })
        })
    }
}

fn current_status(s: &Session<'_>, case_id: &str) -> DeskResult<CaseStatus> {
    s.status_of(case_id)?
        .ok_or_else(|| DeskError::case_not_found(case_id))
}

fn reject(case_id: &str, from: CaseStatus, action: &str) -> DeskError {
    log::warn!("Rejected {action} on case {case_id} (status {from})");
    DeskError::InvalidTransition {
        case_id: case_id.to_string(),
        from,
        action: action.to_string(),
    }
}

#[allow(clippy::too_many_arguments)]
fn commit(
    s: &Session<'_>,
    case_id: &str,
    from: CaseStatus,
    to: CaseStatus,
    action: AuditAction,
    actor: &str,
    details: &str,
    filed_at: Option<DateTime<Utc>>,
) -> DeskResult<CaseTransition> {
    s.set_status(case_id, to, filed_at)?;
    let entry = audit::append(s, case_id, action.as_str(), actor, details)?;
    log::info!(
        "Case {case_id}: {from} -> {to} by {actor} ({})",
        entry.id
    );
    Ok(CaseTransition {
        case_id: case_id.to_string(),
        from,
        to,
        log_id: entry.id,
    })
}
