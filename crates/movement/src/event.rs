use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use dentstock_core::{LocationId, OperatoryId, ProcedureId, SupplyId};
use dentstock_events::Event;

use crate::model::{CheckInDestination, ThresholdTarget};

/// Notification of a committed movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MovementEvent {
    SupplyCreated {
        supply_id: SupplyId,
        name: String,
        barcode: Option<String>,
        occurred_at: DateTime<Utc>,
    },
    CheckedIn {
        supply_id: SupplyId,
        destination: CheckInDestination,
        quantity: u64,
        new_quantity: u64,
        occurred_at: DateTime<Utc>,
    },
    Consumed {
        supply_id: SupplyId,
        operatory_id: OperatoryId,
        procedure_id: Option<ProcedureId>,
        quantity: u64,
        remaining: u64,
        occurred_at: DateTime<Utc>,
    },
    Transferred {
        supply_id: SupplyId,
        source_location_id: LocationId,
        destination_location_id: LocationId,
        quantity: u64,
        occurred_at: DateTime<Utc>,
    },
    /// Quantity moved from the unassigned pool into an operatory.
    Assigned {
        supply_id: SupplyId,
        operatory_id: OperatoryId,
        quantity: u64,
        occurred_at: DateTime<Utc>,
    },
    /// Quantity returned from an operatory to the unassigned pool.
    Unassigned {
        supply_id: SupplyId,
        operatory_id: OperatoryId,
        quantity: u64,
        row_removed: bool,
        occurred_at: DateTime<Utc>,
    },
    ThresholdChanged {
        target: ThresholdTarget,
        value: u64,
        occurred_at: DateTime<Utc>,
    },
    RemovedFromLocation {
        supply_id: SupplyId,
        location_id: LocationId,
        occurred_at: DateTime<Utc>,
    },
    BarcodeAssigned {
        supply_id: SupplyId,
        barcode: String,
        occurred_at: DateTime<Utc>,
    },
}

impl MovementEvent {
    /// Supply the event is about.
    pub fn supply_id(&self) -> SupplyId {
        match self {
            MovementEvent::SupplyCreated { supply_id, .. }
            | MovementEvent::CheckedIn { supply_id, .. }
            | MovementEvent::Consumed { supply_id, .. }
            | MovementEvent::Transferred { supply_id, .. }
            | MovementEvent::Assigned { supply_id, .. }
            | MovementEvent::Unassigned { supply_id, .. }
            | MovementEvent::RemovedFromLocation { supply_id, .. }
            | MovementEvent::BarcodeAssigned { supply_id, .. } => *supply_id,
            MovementEvent::ThresholdChanged { target, .. } => target.supply_id(),
        }
    }

    /// Whether the event changed a quantity (as opposed to metadata).
    pub fn changes_quantity(&self) -> bool {
        matches!(
            self,
            MovementEvent::CheckedIn { .. }
                | MovementEvent::Consumed { .. }
                | MovementEvent::Transferred { .. }
                | MovementEvent::Assigned { .. }
                | MovementEvent::Unassigned { .. }
        )
    }
}

impl Event for MovementEvent {
    fn event_type(&self) -> &'static str {
        match self {
            MovementEvent::SupplyCreated { .. } => "stock.supply.created",
            MovementEvent::CheckedIn { .. } => "stock.checked_in",
            MovementEvent::Consumed { .. } => "stock.consumed",
            MovementEvent::Transferred { .. } => "stock.transferred",
            MovementEvent::Assigned { .. } => "stock.assigned",
            MovementEvent::Unassigned { .. } => "stock.unassigned",
            MovementEvent::ThresholdChanged { .. } => "stock.threshold_changed",
            MovementEvent::RemovedFromLocation { .. } => "stock.removed_from_location",
            MovementEvent::BarcodeAssigned { .. } => "stock.barcode_assigned",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            MovementEvent::SupplyCreated { occurred_at, .. }
            | MovementEvent::CheckedIn { occurred_at, .. }
            | MovementEvent::Consumed { occurred_at, .. }
            | MovementEvent::Transferred { occurred_at, .. }
            | MovementEvent::Assigned { occurred_at, .. }
            | MovementEvent::Unassigned { occurred_at, .. }
            | MovementEvent::ThresholdChanged { occurred_at, .. }
            | MovementEvent::RemovedFromLocation { occurred_at, .. }
            | MovementEvent::BarcodeAssigned { occurred_at, .. } => *occurred_at,
        }
    }
}
