//! The audit ledger — append-only record of every state-changing action.
//!
//! RULE: Entries are never updated or deleted. The ledger offers no such
//! operation and the schema rejects both.

use crate::{
    error::{DeskError, DeskResult},
    store::{CaseStore, Session},
    types::{Actor, CaseId, LogId},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Actions written by the lifecycle engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    CaseOpened,
    Escalate,
    FileSar,
    StatusChange,
    Assign,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CaseOpened => "CASE_OPENED",
            Self::Escalate => "ESCALATE",
            Self::FileSar => "FILE_SAR",
            Self::StatusChange => "STATUS_CHANGE",
            Self::Assign => "ASSIGN",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: LogId,
    pub case_id: CaseId,
    pub action: String,
    pub actor: Actor,
    pub details: String,
    pub timestamp: DateTime<Utc>,
}

pub struct AuditLedger {
    store: Arc<CaseStore>,
}

impl AuditLedger {
    pub fn new(store: Arc<CaseStore>) -> Self {
        Self { store }
    }

    /// Append one entry in its own transaction. Fails with `NotFound` if
    /// the case does not exist.
    pub fn log_action(
        &self,
        case_id: &str,
        action: &str,
        actor: &str,
        details: &str,
    ) -> DeskResult<LogId> {
        self.store.write(|s| {
            s.status_of(case_id)?
                .ok_or_else(|| DeskError::case_not_found(case_id))?;
            Ok(append(s, case_id, action, actor, details)?.id)
        })
    }

    /// Entries for one case, in commit order.
    pub fn entries_for_case(&self, case_id: &str) -> DeskResult<Vec<AuditLogEntry>> {
        self.store.read(|s| s.audit_entries_for_case(case_id))
    }

    pub fn entry(&self, log_id: &str) -> DeskResult<Option<AuditLogEntry>> {
        self.store.read(|s| s.audit_entry(log_id))
    }

    /// The system-wide view, newest first.
    pub fn recent_entries(&self, limit: usize) -> DeskResult<Vec<AuditLogEntry>> {
        self.store.read(|s| s.recent_audit_entries(limit))
    }
}

/// Append an entry inside an already-open write session, so it commits or
/// rolls back together with the mutation it records.
///
/// The timestamp never runs behind the latest stored entry, even if the
/// wall clock steps backwards.
pub(crate) fn append(
    session: &Session<'_>,
    case_id: &str,
    action: &str,
    actor: &str,
    details: &str,
) -> DeskResult<AuditLogEntry> {
    let now = Utc::now();
    let timestamp = match session.latest_audit_timestamp()? {
        Some(last) if last > now => last,
        _ => now,
    };
    let entry = AuditLogEntry {
        id: new_log_id(),
        case_id: case_id.to_string(),
        action: action.to_string(),
        actor: actor.to_string(),
        details: details.to_string(),
        timestamp,
    };
    session.insert_audit_entry(&entry)?;
    Ok(entry)
}

fn new_log_id() -> LogId {
    let hex = Uuid::new_v4().simple().to_string();
    format!("LOG-{}", hex[..12].to_uppercase())
}
