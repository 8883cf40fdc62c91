//! The desk — one explicitly constructed store shared by every component.
//!
//! COMPONENTS (leaf to root):
//!   1. Audit ledger
//!   2. Case store
//!   3. Lifecycle engine   (writes store + ledger in one transaction)
//!   4. Metrics aggregator (read-only)
//!   5. Report generator   (read-only)

use crate::{
    audit::AuditLedger,
    config::DeskConfig,
    error::DeskResult,
    lifecycle::LifecycleEngine,
    metrics::MetricsAggregator,
    policy::TieredRiskScorer,
    report::ReportGenerator,
    store::CaseStore,
};
use std::sync::Arc;

pub struct Desk {
    pub store: Arc<CaseStore>,
    pub ledger: AuditLedger,
    pub lifecycle: LifecycleEngine,
    pub metrics: MetricsAggregator,
    pub reports: ReportGenerator,
}

impl Desk {
    /// Open and migrate the store, then wire every component to it.
    pub fn build(config: &DeskConfig) -> DeskResult<Self> {
        let store = CaseStore::open(&config.store)?
            .with_risk_scorer(TieredRiskScorer::from_config(&config.risk));
        store.migrate()?;
        Ok(Self::with_store(Arc::new(store), config))
    }

    /// Wire components around an already migrated store.
    pub fn with_store(store: Arc<CaseStore>, config: &DeskConfig) -> Self {
        Self {
            ledger: AuditLedger::new(Arc::clone(&store)),
            lifecycle: LifecycleEngine::new(Arc::clone(&store), config.filing.policy),
            metrics: MetricsAggregator::new(Arc::clone(&store)),
            reports: ReportGenerator::new(Arc::clone(&store), config.report.clone()),
            store,
        }
    }

    /// In-memory desk with the test configuration.
    pub fn build_test() -> DeskResult<Self> {
        Self::build(&DeskConfig::default_test())
    }

    pub fn close(&self) {
        self.store.close();
    }
}
