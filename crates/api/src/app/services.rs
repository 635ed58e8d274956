//! Engine wiring shared by every route.

use std::sync::Arc;

use dentstock_alerts::{
    InMemoryAlertSink, LowStockEvaluator, LowStockPoller, PollerConfig, PollerHandle, SupplierAlerts,
};
use dentstock_catalog::{Catalog, CatalogConfig};
use dentstock_core::{OperatoryId, StockResult, UserId};
use dentstock_events::{EventBus, EventEnvelope, InMemoryEventBus};
use dentstock_ledger::{InMemoryLedgerStore, InMemoryUsageLog, StockLedger, UsageLog, UsageLogEntry};
use dentstock_movement::{MovementEngine, MovementEvent};

use crate::config::ApiConfig;

pub type MovementBus = Arc<InMemoryEventBus<EventEnvelope<MovementEvent>>>;
pub type Engine = MovementEngine<InMemoryLedgerStore, InMemoryUsageLog, MovementBus>;

pub struct AppServices {
    engine: Engine,
    evaluator: Arc<LowStockEvaluator<InMemoryLedgerStore>>,
    alerts: Arc<InMemoryAlertSink>,
    _poller: PollerHandle,
}

/// Build the in-memory engine, evaluator and background low-stock poller.
pub fn build_services(config: &ApiConfig) -> std::io::Result<AppServices> {
    let catalog = Arc::new(Catalog::new(
        CatalogConfig::default().with_default_low_stock_threshold(config.default_threshold),
    ));
    let ledger = Arc::new(StockLedger::new(InMemoryLedgerStore::new()));
    let bus: MovementBus = Arc::new(InMemoryEventBus::new());

    let evaluator = Arc::new(LowStockEvaluator::new(catalog.clone(), ledger.clone()));
    let alerts = Arc::new(InMemoryAlertSink::new());
    let poller = LowStockPoller::new(PollerConfig::default().with_interval(config.low_stock_poll))
        .spawn(
            "low-stock-poller",
            evaluator.clone(),
            alerts.clone(),
            Some(bus.subscribe()),
        )?;

    let engine = MovementEngine::new(catalog, ledger, InMemoryUsageLog::new(), bus);

    Ok(AppServices {
        engine,
        evaluator,
        alerts,
        _poller: poller,
    })
}

impl AppServices {
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Fresh evaluation, grouped by supplier.
    pub fn low_stock(&self) -> StockResult<Vec<SupplierAlerts>> {
        self.evaluator.grouped()
    }

    /// Last evaluation published by the background poller.
    pub fn low_stock_latest(&self) -> Option<Vec<SupplierAlerts>> {
        self.alerts.latest()
    }

    pub fn usage_log(
        &self,
        user_id: UserId,
        operatory_id: Option<OperatoryId>,
    ) -> StockResult<Vec<UsageLogEntry>> {
        let log = self.engine.usage_log();
        match operatory_id {
            Some(operatory_id) => Ok(log
                .entries_for_operatory(operatory_id)?
                .into_iter()
                .filter(|e| e.user_id == user_id)
                .collect()),
            None => log.entries_for_user(user_id),
        }
    }
}
