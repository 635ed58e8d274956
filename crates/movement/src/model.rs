use serde::{Deserialize, Serialize};

use dentstock_catalog::{Supply, SupplyDraft};
use dentstock_core::{LocationId, OperatoryId, SupplyId};
use dentstock_ledger::LedgerKey;

/// Pool a check-in lands in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum CheckInDestination {
    /// Stock-room receiving into a location.
    Location(LocationId),
    /// Scan-to-operatory: bypasses the unassigned pool.
    Operatory(OperatoryId),
    /// Receiving into the global unassigned pool.
    Unassigned,
}

impl CheckInDestination {
    /// Ledger row a check-in of `supply_id` lands in.
    pub fn ledger_key(self, supply_id: SupplyId) -> LedgerKey {
        match self {
            CheckInDestination::Location(location_id) => LedgerKey::location(supply_id, location_id),
            CheckInDestination::Operatory(operatory_id) => {
                LedgerKey::operatory(supply_id, operatory_id)
            }
            CheckInDestination::Unassigned => LedgerKey::unassigned(supply_id),
        }
    }
}

/// Existing supply, or a draft to create before the quantity is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SupplyRef {
    Existing(SupplyId),
    New(SupplyDraft),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckInItem {
    pub supply: SupplyRef,
    pub quantity: u64,
}

impl CheckInItem {
    pub fn existing(supply_id: SupplyId, quantity: u64) -> Self {
        Self {
            supply: SupplyRef::Existing(supply_id),
            quantity,
        }
    }

    pub fn new_supply(draft: SupplyDraft, quantity: u64) -> Self {
        Self {
            supply: SupplyRef::New(draft),
            quantity,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self.supply, SupplyRef::New(_))
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumeItem {
    pub supply_id: SupplyId,
    pub quantity: u64,
}

impl ConsumeItem {
    pub fn new(supply_id: SupplyId, quantity: u64) -> Self {
        Self {
            supply_id,
            quantity,
        }
    }
}

/// One supply to assign, `quantity` per operatory.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignItem {
    pub supply_id: SupplyId,
    pub quantity_per_operatory: u64,
}

impl AssignItem {
    pub fn new(supply_id: SupplyId, quantity_per_operatory: u64) -> Self {
        Self {
            supply_id,
            quantity_per_operatory,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferOutcome {
    pub source_quantity: u64,
    pub destination_quantity: u64,
}

/// Current state of one (supply, operatory) assignment row.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatoryAssignment {
    pub supply_id: SupplyId,
    pub operatory_id: OperatoryId,
    pub quantity: u64,
    pub low_stock_threshold: u64,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "pool", rename_all = "snake_case")]
pub enum ThresholdTarget {
    /// The supply's own threshold (unassigned pool, default for new rows).
    Global { supply_id: SupplyId },
    Location {
        supply_id: SupplyId,
        location_id: LocationId,
    },
    Operatory {
        supply_id: SupplyId,
        operatory_id: OperatoryId,
    },
}

impl ThresholdTarget {
    pub fn supply_id(&self) -> SupplyId {
        match *self {
            ThresholdTarget::Global { supply_id }
            | ThresholdTarget::Location { supply_id, .. }
            | ThresholdTarget::Operatory { supply_id, .. } => supply_id,
        }
    }
}

/// Procedure template default clamped to what the operatory holds. A UI hint only.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub supply_id: SupplyId,
    pub default_quantity: u64,
    pub available: u64,
    pub suggested: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyView {
    pub supply: Supply,
    pub unassigned_quantity: u64,
    pub total_assigned: u64,
    pub total_at_locations: u64,
}
