use crate::policy::FilingPolicy;
use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite path, or `:memory:` for a private in-memory database.
    pub path: String,
    pub pool_size: usize,
    /// How long a caller waits for a free connection before failing.
    pub acquire_timeout_ms: u64,
    /// How long SQLite waits on a held write lock before reporting busy.
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: ":memory:".into(),
            pool_size: 20,
            acquire_timeout_ms: 5_000,
            busy_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub high_score: u8,
    pub default_score: u8,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            high_score: 90,
            default_score: 50,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilingConfig {
    pub policy: FilingPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub filing_institution: String,
    /// Flagged transactions cited by id and amount in the activity narrative.
    pub illustrative_txn_cap: usize,
    /// Currency assumed for a case with no transactions.
    pub default_currency: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            filing_institution: "SARaansh Financial Services".into(),
            illustrative_txn_cap: 3,
            default_currency: "USD".into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeskConfig {
    pub store: StoreConfig,
    pub risk: RiskConfig,
    pub filing: FilingConfig,
    pub report: ReportConfig,
}

impl DeskConfig {
    /// Load configuration from a JSON file. Missing fields take defaults.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read desk config {path}"))?;
        let config: DeskConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse desk config {path}"))?;
        anyhow::ensure!(config.store.pool_size > 0, "store.pool_size must be at least 1");
        Ok(config)
    }

    /// In-memory store, single connection, short waits.
    pub fn default_test() -> Self {
        Self {
            store: StoreConfig {
                path: ":memory:".into(),
                pool_size: 1,
                acquire_timeout_ms: 500,
                busy_timeout_ms: 500,
            },
            ..Self::default()
        }
    }
}
