use super::{opt_timestamp_at, timestamp_at, Session};
use crate::{
    case::{CaseRecord, CaseStatus, CaseSummary, RiskLevel},
    error::DeskResult,
    policy::RiskScorer,
    types::to_db_timestamp,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

const SUMMARY_COLUMNS: &str = "c.id, cust.name, cust.id, c.created_at, cust.risk_level, c.status, c.assignee";

fn summary_from_row(row: &Row<'_>, scorer: &dyn RiskScorer) -> rusqlite::Result<CaseSummary> {
    let risk_level: RiskLevel = row.get(4)?;
    Ok(CaseSummary {
        id: row.get(0)?,
        customer_name: row.get(1)?,
        customer_id: row.get(2)?,
        opened_at: timestamp_at(row, 3)?,
        risk_score: scorer.score(risk_level),
        risk_level,
        status: row.get(5)?,
        assignee: row.get(6)?,
    })
}

impl Session<'_> {
    // ── Case ──────────────────────────────────────────────────────

    pub(crate) fn insert_case(&self, case: &CaseRecord) -> DeskResult<()> {
        self.conn.execute(
            "INSERT INTO sar_cases (id, customer_id, created_at, status, assignee, filed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                &case.id,
                &case.customer_id,
                to_db_timestamp(&case.opened_at),
                case.status,
                &case.assignee,
                case.filed_at.as_ref().map(to_db_timestamp),
            ],
        )?;
        Ok(())
    }

    pub fn case_record(&self, case_id: &str) -> DeskResult<Option<CaseRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT id, customer_id, created_at, status, assignee, filed_at
                 FROM sar_cases WHERE id = ?1",
                params![case_id],
                |row| {
                    Ok(CaseRecord {
                        id: row.get(0)?,
                        customer_id: row.get(1)?,
                        opened_at: timestamp_at(row, 2)?,
                        status: row.get(3)?,
                        assignee: row.get(4)?,
                        filed_at: opt_timestamp_at(row, 5)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    pub fn status_of(&self, case_id: &str) -> DeskResult<Option<CaseStatus>> {
        let status = self
            .conn
            .query_row(
                "SELECT status FROM sar_cases WHERE id = ?1",
                params![case_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(status)
    }

    /// Only the lifecycle engine moves a case between statuses, always in
    /// the same transaction as the matching audit entry.
    pub(crate) fn set_status(
        &self,
        case_id: &str,
        status: CaseStatus,
        filed_at: Option<DateTime<Utc>>,
    ) -> DeskResult<()> {
        self.conn.execute(
            "UPDATE sar_cases SET status = ?2, filed_at = COALESCE(?3, filed_at) WHERE id = ?1",
            params![case_id, status, filed_at.as_ref().map(to_db_timestamp)],
        )?;
        Ok(())
    }

    pub(crate) fn set_assignee(&self, case_id: &str, assignee: &str) -> DeskResult<()> {
        self.conn.execute(
            "UPDATE sar_cases SET assignee = ?2 WHERE id = ?1",
            params![case_id, assignee],
        )?;
        Ok(())
    }

    pub fn case_summary(
        &self,
        case_id: &str,
        scorer: &dyn RiskScorer,
    ) -> DeskResult<Option<CaseSummary>> {
        let sql = format!(
            "SELECT {SUMMARY_COLUMNS}
             FROM sar_cases c JOIN customers cust ON c.customer_id = cust.id
             WHERE c.id = ?1"
        );
        let summary = self
            .conn
            .query_row(&sql, params![case_id], |row| summary_from_row(row, scorer))
            .optional()?;
        Ok(summary)
    }

    pub fn active_cases(&self, scorer: &dyn RiskScorer) -> DeskResult<Vec<CaseSummary>> {
        let sql = format!(
            "SELECT {SUMMARY_COLUMNS}
             FROM sar_cases c JOIN customers cust ON c.customer_id = cust.id
             WHERE c.status != ?1
             ORDER BY c.created_at DESC, c.id ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![CaseStatus::Filed], |row| summary_from_row(row, scorer))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ── Dashboard counts ──────────────────────────────────────────

    pub fn count_open_cases(&self) -> DeskResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM sar_cases WHERE status != ?1",
            params![CaseStatus::Filed],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn count_open_cases_at_risk(&self, level: RiskLevel) -> DeskResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*)
             FROM sar_cases c JOIN customers cust ON c.customer_id = cust.id
             WHERE cust.risk_level = ?1 AND c.status != ?2",
            params![level, CaseStatus::Filed],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn count_filed_cases(&self) -> DeskResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM sar_cases WHERE status = ?1",
            params![CaseStatus::Filed],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// (opened, filed) pairs for filed cases that carry a closure timestamp.
    pub fn resolution_spans(&self) -> DeskResult<Vec<(DateTime<Utc>, DateTime<Utc>)>> {
        let mut stmt = self.conn.prepare(
            "SELECT created_at, filed_at FROM sar_cases
             WHERE status = ?1 AND filed_at IS NOT NULL
             ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map(params![CaseStatus::Filed], |row| {
                Ok((timestamp_at(row, 0)?, timestamp_at(row, 1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
