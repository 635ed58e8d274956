use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::debug;

use dentstock_catalog::Catalog;
use dentstock_core::{StockResult, SupplierId};
use dentstock_ledger::{LedgerKey, LedgerStore, StockLedger};

use crate::model::{Alert, SupplierAlerts};

/// Anything the poller can evaluate.
pub trait AlertSource: Send + Sync + 'static {
    fn evaluate(&self) -> StockResult<Vec<Alert>>;
}

/// Pure read: never mutates the ledger or catalog.
#[derive(Debug)]
pub struct LowStockEvaluator<S> {
    catalog: Arc<Catalog>,
    ledger: Arc<StockLedger<S>>,
}

impl<S> LowStockEvaluator<S>
where
    S: LedgerStore,
{
    pub fn new(catalog: Arc<Catalog>, ledger: Arc<StockLedger<S>>) -> Self {
        Self { catalog, ledger }
    }

    /// Every location and operatory row with `quantity <= threshold`.
    ///
    /// Ordered by supply name, then pool. Rows whose supply or pool no longer
    /// exists in the catalog are skipped.
    pub fn evaluate(&self) -> StockResult<Vec<Alert>> {
        let snapshot = self.ledger.snapshot()?;

        let supplies: HashMap<_, _> = self
            .catalog
            .supplies()?
            .into_iter()
            .map(|s| (s.id, s))
            .collect();
        let suppliers: HashMap<SupplierId, _> = self
            .catalog
            .suppliers()?
            .into_iter()
            .map(|s| (s.id, s))
            .collect();
        let locations: HashMap<_, _> = self
            .catalog
            .locations()?
            .into_iter()
            .map(|l| (l.id, l.name))
            .collect();
        let operatories: HashMap<_, _> = self
            .catalog
            .operatories()?
            .into_iter()
            .map(|o| (o.id, o.name))
            .collect();

        let mut alerts = Vec::new();
        for (key, row) in snapshot.iter() {
            if row.quantity > row.low_stock_threshold {
                continue;
            }
            let pool_name = match key {
                LedgerKey::Unassigned { .. } => continue,
                LedgerKey::Location { location_id, .. } => locations.get(location_id),
                LedgerKey::Operatory { operatory_id, .. } => operatories.get(operatory_id),
            };
            let (Some(supply), Some(pool_name), Some(pool_id)) =
                (supplies.get(&key.supply_id()), pool_name, key.pool_id())
            else {
                debug!(key = %key, "skipping low-stock row without catalog entry");
                continue;
            };

            alerts.push(Alert {
                supply_id: supply.id,
                supply_name: supply.name.clone(),
                pool: key.pool(),
                pool_id,
                pool_name: pool_name.clone(),
                quantity: row.quantity,
                threshold: row.low_stock_threshold,
                supplier: supply
                    .supplier_id
                    .and_then(|id| suppliers.get(&id))
                    .cloned(),
            });
        }

        alerts.sort_by(|a, b| {
            a.supply_name
                .to_lowercase()
                .cmp(&b.supply_name.to_lowercase())
                .then(a.pool.cmp(&b.pool))
                .then_with(|| a.pool_name.cmp(&b.pool_name))
        });
        Ok(alerts)
    }

    /// `evaluate()` grouped by supplier name.
    pub fn grouped(&self) -> StockResult<Vec<SupplierAlerts>> {
        Ok(group_by_supplier(self.evaluate()?))
    }
}

impl<S> AlertSource for LowStockEvaluator<S>
where
    S: LedgerStore + 'static,
{
    fn evaluate(&self) -> StockResult<Vec<Alert>> {
        LowStockEvaluator::evaluate(self)
    }
}

/// Group alerts by supplier name, alphabetically; alert order is kept within a group.
pub fn group_by_supplier(alerts: Vec<Alert>) -> Vec<SupplierAlerts> {
    let mut groups: BTreeMap<String, SupplierAlerts> = BTreeMap::new();
    for alert in alerts {
        let name = alert.supplier_name().to_string();
        groups
            .entry(name.clone())
            .or_insert_with(|| SupplierAlerts {
                supplier_name: name,
                supplier: alert.supplier.clone(),
                alerts: Vec::new(),
            })
            .alerts
            .push(alert);
    }
    groups.into_values().collect()
}
