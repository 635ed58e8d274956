use serde::{Deserialize, Serialize};
use uuid::Uuid;

use dentstock_catalog::Supplier;
use dentstock_core::{PoolKind, SupplyId};

/// Group label for supplies without a supplier.
pub const UNKNOWN_SUPPLIER: &str = "Unknown Supplier";

/// One (supply, pool) pair at or below its threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub supply_id: SupplyId,
    pub supply_name: String,
    pub pool: PoolKind,
    /// Location or operatory id.
    pub pool_id: Uuid,
    pub pool_name: String,
    pub quantity: u64,
    pub threshold: u64,
    pub supplier: Option<Supplier>,
}

impl Alert {
    pub fn supplier_name(&self) -> &str {
        self.supplier
            .as_ref()
            .map_or(UNKNOWN_SUPPLIER, |s| s.name.as_str())
    }
}

/// Alerts sharing a supplier, for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierAlerts {
    pub supplier_name: String,
    /// Contact details; `None` for the unknown-supplier group.
    pub supplier: Option<Supplier>,
    pub alerts: Vec<Alert>,
}
