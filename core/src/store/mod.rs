//! SQLite persistence layer.
//!
//! RULE: Only the store module talks to the database.
//! Components call `Session` methods inside `CaseStore::read` / `write`
//! scopes. They never execute SQL directly.

mod audit;
mod cases;
mod customers;
pub mod pool;

use crate::{
    case::{CaseDetail, CaseStatus, CaseSummary, Customer, Transaction, Typology},
    config::StoreConfig,
    error::{DeskError, DeskResult},
    policy::{RiskScorer, TieredRiskScorer},
    types::parse_db_timestamp,
};
use chrono::{DateTime, Utc};
use pool::ConnectionPool;
use rusqlite::{types::Type, Connection, Row, TransactionBehavior};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::time::Duration;

pub struct CaseStore {
    pool: ConnectionPool,
    scorer: Box<dyn RiskScorer>,
    path: Option<String>, // None for :memory:
}

/// Query and command primitives bound to one open transaction.
pub struct Session<'c> {
    conn: &'c Connection,
}

impl CaseStore {
    /// Open (or create) the case database described by `config`.
    /// `:memory:` yields a private in-memory database with one connection.
    pub fn open(config: &StoreConfig) -> DeskResult<Self> {
        if config.path == ":memory:" {
            return Self::in_memory_with_timeout(Duration::from_millis(config.acquire_timeout_ms));
        }
        let size = config.pool_size.max(1);
        let mut connections = Vec::with_capacity(size);
        for _ in 0..size {
            let conn = Connection::open(&config.path)?;
            // WAL: readers do not block the single writer.
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                row.get::<_, String>(0)
            })?;
            conn.execute_batch("PRAGMA foreign_keys=ON;")?;
            conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
            connections.push(conn);
        }
        log::info!("Case store opened at {} ({size} connections)", config.path);
        Ok(Self {
            pool: ConnectionPool::new(
                connections,
                Duration::from_millis(config.acquire_timeout_ms),
            ),
            scorer: Box::new(TieredRiskScorer::default()),
            path: Some(config.path.clone()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> DeskResult<Self> {
        Self::in_memory_with_timeout(Duration::from_millis(
            StoreConfig::default().acquire_timeout_ms,
        ))
    }

    fn in_memory_with_timeout(acquire_timeout: Duration) -> DeskResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            pool: ConnectionPool::new(vec![conn], acquire_timeout),
            scorer: Box::new(TieredRiskScorer::default()),
            path: None,
        })
    }

    /// Replace the risk scoring policy applied to case reads.
    pub fn with_risk_scorer(mut self, scorer: impl RiskScorer + 'static) -> Self {
        self.scorer = Box::new(scorer);
        self
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> DeskResult<()> {
        let conn = self.pool.acquire()?;
        conn.execute_batch(include_str!("../../../migrations/001_case_desk.sql"))?;
        log::debug!("Case store schema migrated");
        Ok(())
    }

    /// Release every pooled connection. Later operations fail with
    /// `StoreClosed`.
    pub fn close(&self) {
        self.pool.close();
        log::info!(
            "Case store closed ({})",
            self.path.as_deref().unwrap_or(":memory:")
        );
    }

    pub fn pool_size(&self) -> usize {
        self.pool.size()
    }

    pub fn health_check(&self) -> DeskResult<()> {
        let conn = self.pool.acquire()?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }

    // ── Transactional scopes ─────────────────────────────────────

    /// Run `f` inside an IMMEDIATE transaction. The write lock is taken
    /// before `f` reads anything, so read-then-write sequences on the same
    /// case are serialized. Commits on `Ok`; any `Err` or unwind rolls back.
    pub fn write<T>(&self, f: impl FnOnce(&Session<'_>) -> DeskResult<T>) -> DeskResult<T> {
        let mut conn = self.pool.acquire()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let out = f(&Session { conn: &tx })?;
        tx.commit()?;
        Ok(out)
    }

    /// Run `f` inside a deferred transaction so multi-query reads see one
    /// consistent state.
    pub fn read<T>(&self, f: impl FnOnce(&Session<'_>) -> DeskResult<T>) -> DeskResult<T> {
        let mut conn = self.pool.acquire()?;
        let tx = conn.transaction()?;
        let out = f(&Session { conn: &tx })?;
        tx.commit()?;
        Ok(out)
    }

    // ── Case reads ───────────────────────────────────────────────

    /// Non-filed cases, newest opened first.
    pub fn get_active_cases(&self) -> DeskResult<Vec<CaseSummary>> {
        self.read(|s| s.active_cases(self.scorer.as_ref()))
    }

    /// Case summary, transactions (newest first) and typologies.
    pub fn get_case_detail(&self, case_id: &str) -> DeskResult<CaseDetail> {
        self.read(|s| {
            let summary = s
                .case_summary(case_id, self.scorer.as_ref())?
                .ok_or_else(|| DeskError::case_not_found(case_id))?;
            let transactions = s.transactions_for_customer(&summary.customer_id)?;
            let typologies = s.typologies_for_case(case_id)?;
            log::debug!(
                "Loaded case {case_id}: {} transactions, {} typologies",
                transactions.len(),
                typologies.len()
            );
            Ok(CaseDetail {
                summary,
                transactions,
                typologies,
            })
        })
    }

    pub fn get_status(&self, case_id: &str) -> DeskResult<CaseStatus> {
        self.read(|s| {
            s.status_of(case_id)?
                .ok_or_else(|| DeskError::case_not_found(case_id))
        })
    }

    // ── Ingest ───────────────────────────────────────────────────

    pub fn insert_customer(&self, customer: &Customer) -> DeskResult<()> {
        self.write(|s| s.insert_customer(customer))
    }

    pub fn get_customer(&self, customer_id: &str) -> DeskResult<Customer> {
        self.read(|s| {
            s.customer(customer_id)?
                .ok_or_else(|| DeskError::customer_not_found(customer_id))
        })
    }

    /// Record a transaction. Fails with `NotFound` if the customer is absent.
    pub fn insert_transaction(&self, txn: &Transaction) -> DeskResult<()> {
        self.write(|s| {
            s.customer(&txn.customer_id)?
                .ok_or_else(|| DeskError::customer_not_found(&txn.customer_id))?;
            s.insert_transaction(txn)
        })
    }

    /// Attach a typology finding from the detection process to a case.
    /// A repeated typology id replaces the earlier confidence.
    pub fn record_typology(&self, case_id: &str, typology: &Typology) -> DeskResult<()> {
        self.write(|s| {
            s.status_of(case_id)?
                .ok_or_else(|| DeskError::case_not_found(case_id))?;
            s.upsert_typology(case_id, typology)
        })
    }
}

// ── Column decoding ──────────────────────────────────────────────────

fn corrupt(idx: usize, what: &'static str, value: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        Type::Text,
        Box::new(DeskError::Corrupt { what, value }),
    )
}

fn timestamp_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_db_timestamp(&raw).ok_or_else(|| corrupt(idx, "timestamp", raw))
}

fn opt_timestamp_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(raw) => parse_db_timestamp(&raw)
            .map(Some)
            .ok_or_else(|| corrupt(idx, "timestamp", raw)),
        None => Ok(None),
    }
}

fn decimal_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let raw: String = row.get(idx)?;
    Decimal::from_str(&raw).map_err(|_| corrupt(idx, "amount", raw))
}
