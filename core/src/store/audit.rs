use super::{timestamp_at, Session};
use crate::{
    audit::AuditLogEntry,
    error::DeskResult,
    types::to_db_timestamp,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

// audit_logs is append-only. No UPDATE or DELETE exists here
// and the schema triggers abort both.

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<AuditLogEntry> {
    Ok(AuditLogEntry {
        id: row.get(0)?,
        case_id: row.get(1)?,
        action: row.get(2)?,
        actor: row.get(3)?,
        details: row.get(4)?,
        timestamp: timestamp_at(row, 5)?,
    })
}

impl Session<'_> {
    pub(crate) fn insert_audit_entry(&self, entry: &AuditLogEntry) -> DeskResult<()> {
        self.conn.execute(
            "INSERT INTO audit_logs (id, case_id, action, actor, details, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                &entry.id,
                &entry.case_id,
                &entry.action,
                &entry.actor,
                &entry.details,
                to_db_timestamp(&entry.timestamp),
            ],
        )?;
        Ok(())
    }

    /// Timestamp of the most recently appended entry, if any.
    pub fn latest_audit_timestamp(&self) -> DeskResult<Option<DateTime<Utc>>> {
        let latest = self
            .conn
            .query_row(
                "SELECT timestamp FROM audit_logs ORDER BY seq DESC LIMIT 1",
                [],
                |row| timestamp_at(row, 0),
            )
            .optional()?;
        Ok(latest)
    }

    /// Entries for one case in the order they were committed.
    pub fn audit_entries_for_case(&self, case_id: &str) -> DeskResult<Vec<AuditLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, case_id, action, actor, details, timestamp
             FROM audit_logs WHERE case_id = ?1
             ORDER BY seq ASC",
        )?;
        let entries = stmt
            .query_map(params![case_id], entry_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn audit_entry(&self, log_id: &str) -> DeskResult<Option<AuditLogEntry>> {
        let entry = self
            .conn
            .query_row(
                "SELECT id, case_id, action, actor, details, timestamp
                 FROM audit_logs WHERE id = ?1",
                params![log_id],
                entry_from_row,
            )
            .optional()?;
        Ok(entry)
    }

    /// Newest first, across all cases.
    pub fn recent_audit_entries(&self, limit: usize) -> DeskResult<Vec<AuditLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, case_id, action, actor, details, timestamp
             FROM audit_logs ORDER BY seq DESC LIMIT ?1",
        )?;
        let entries = stmt
            .query_map(params![limit as i64], entry_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}
