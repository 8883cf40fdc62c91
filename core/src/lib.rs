//! SAR case desk: case lifecycle, append-only audit ledger, dashboard
//! metrics and SAR narrative generation over a SQLite case store.

pub mod audit;
pub mod case;
pub mod config;
pub mod desk;
pub mod error;
pub mod ingest;
pub mod lifecycle;
pub mod metrics;
pub mod policy;
pub mod report;
pub mod store;
pub mod types;
