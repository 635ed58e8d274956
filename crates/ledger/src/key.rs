use serde::{Deserialize, Serialize};
use uuid::Uuid;

use dentstock_core::{LocationId, OperatoryId, PoolKind, SupplyId};

/// Identity of one ledger row: a supply in one pool.
///
/// Ordering is total so multi-key lock sets and snapshots are deterministic.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "pool", rename_all = "snake_case")]
pub enum LedgerKey {
    Unassigned {
        supply_id: SupplyId,
    },
    Location {
        supply_id: SupplyId,
        location_id: LocationId,
    },
    Operatory {
        supply_id: SupplyId,
        operatory_id: OperatoryId,
    },
}

impl LedgerKey {
    pub fn unassigned(supply_id: SupplyId) -> Self {
        LedgerKey::Unassigned { supply_id }
    }

    pub fn location(supply_id: SupplyId, location_id: LocationId) -> Self {
        LedgerKey::Location {
            supply_id,
            location_id,
        }
    }

    pub fn operatory(supply_id: SupplyId, operatory_id: OperatoryId) -> Self {
        LedgerKey::Operatory {
            supply_id,
            operatory_id,
        }
    }

    pub fn supply_id(&self) -> SupplyId {
        match *self {
            LedgerKey::Unassigned { supply_id }
            | LedgerKey::Location { supply_id, .. }
            | LedgerKey::Operatory { supply_id, .. } => supply_id,
        }
    }

    pub fn pool(&self) -> PoolKind {
        match self {
            LedgerKey::Unassigned { .. } => PoolKind::Unassigned,
            LedgerKey::Location { .. } => PoolKind::Location,
            LedgerKey::Operatory { .. } => PoolKind::Operatory,
        }
    }

    /// Location or operatory id; `None` for the unassigned pool.
    pub fn pool_id(&self) -> Option<Uuid> {
        match *self {
            LedgerKey::Unassigned { .. } => None,
            LedgerKey::Location { location_id, .. } => Some(location_id.into()),
            LedgerKey::Operatory { operatory_id, .. } => Some(operatory_id.into()),
        }
    }
}

impl core::fmt::Display for LedgerKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.pool_id() {
            Some(pool_id) => write!(f, "{}:{}@{}", self.pool(), self.supply_id(), pool_id),
            None => write!(f, "{}:{}", self.pool(), self.supply_id()),
        }
    }
}
