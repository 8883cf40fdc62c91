use super::{decimal_at, timestamp_at, Session};
use crate::{
    case::{Customer, Transaction, Typology},
    error::DeskResult,
    types::to_db_timestamp,
};
use rusqlite::{params, OptionalExtension};

impl Session<'_> {
    // ── Customer ──────────────────────────────────────────────────

    pub fn insert_customer(&self, c: &Customer) -> DeskResult<()> {
        self.conn.execute(
            "INSERT INTO customers (id, name, risk_level) VALUES (?1, ?2, ?3)",
            params![&c.id, &c.name, c.risk_level],
        )?;
        Ok(())
    }

    pub fn customer(&self, customer_id: &str) -> DeskResult<Option<Customer>> {
        let customer = self
            .conn
            .query_row(
                "SELECT id, name, risk_level FROM customers WHERE id = ?1",
                params![customer_id],
                |row| {
                    Ok(Customer {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        risk_level: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(customer)
    }

    // ── Transaction ───────────────────────────────────────────────

    pub fn insert_transaction(&self, t: &Transaction) -> DeskResult<()> {
        self.conn.execute(
            "INSERT INTO transactions (
                id, customer_id, timestamp, amount, currency, type, direction,
                counterparty, flagged, description
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                &t.id,
                &t.customer_id,
                to_db_timestamp(&t.timestamp),
                t.amount.to_string(),
                &t.currency,
                t.txn_type,
                t.direction,
                &t.counterparty,
                t.flagged,
                &t.description,
            ],
        )?;
        Ok(())
    }

    /// Newest first. Ties on timestamp fall back to descending id so the
    /// order is total and repeatable.
    pub fn transactions_for_customer(&self, customer_id: &str) -> DeskResult<Vec<Transaction>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, customer_id, timestamp, amount, currency, type, direction,
                    counterparty, flagged, description
             FROM transactions
             WHERE customer_id = ?1
             ORDER BY timestamp DESC, id DESC",
        )?;
        let rows = stmt
            .query_map(params![customer_id], |row| {
                Ok(Transaction {
                    id: row.get(0)?,
                    customer_id: row.get(1)?,
                    timestamp: timestamp_at(row, 2)?,
                    amount: decimal_at(row, 3)?,
                    currency: row.get(4)?,
                    txn_type: row.get(5)?,
                    direction: row.get(6)?,
                    counterparty: row.get(7)?,
                    flagged: row.get(8)?,
                    description: row.get(9)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ── Typology ──────────────────────────────────────────────────

    pub fn upsert_typology(&self, case_id: &str, t: &Typology) -> DeskResult<()> {
        self.conn.execute(
            "INSERT INTO case_typologies (case_id, typology_id, name, confidence)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (case_id, typology_id)
             DO UPDATE SET name = excluded.name, confidence = excluded.confidence",
            params![case_id, &t.id, &t.name, t.confidence],
        )?;
        Ok(())
    }

    /// Highest confidence first.
    pub fn typologies_for_case(&self, case_id: &str) -> DeskResult<Vec<Typology>> {
        let mut stmt = self.conn.prepare(
            "SELECT typology_id, name, confidence FROM case_typologies
             WHERE case_id = ?1
             ORDER BY confidence DESC, typology_id ASC",
        )?;
        let rows = stmt
            .query_map(params![case_id], |row| {
                Ok(Typology {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    confidence: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
