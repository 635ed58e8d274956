//! Domain error model.

use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};
use thiserror::Error;
use uuid::Uuid;

use crate::id::{OperatoryId, SupplyId};
use crate::pool::PoolKind;

/// Result type used across the ledger, engine and scanner.
pub type StockResult<T> = Result<T, StockError>;

/// Catalog entity kinds, used to name the subject of `InUse` / `NotFound`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Supply,
    Location,
    Operatory,
    Category,
    Supplier,
    Procedure,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Supply => "supply",
            EntityKind::Location => "location",
            EntityKind::Operatory => "operatory",
            EntityKind::Category => "category",
            EntityKind::Supplier => "supplier",
            EntityKind::Procedure => "procedure",
        }
    }
}

impl core::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The class of dependent row that blocks a delete.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dependency {
    /// A location still holds a positive quantity.
    LocationStock,
    /// An operatory still holds a positive assigned quantity.
    OperatoryAssignment,
    /// The supply still has unassigned quantity.
    UnassignedStock,
    /// The entity is flagged as protected (e.g. the default holding area).
    Protected,
    /// Supplies still reference the category/supplier.
    Supplies,
}

impl Dependency {
    pub fn as_str(self) -> &'static str {
        match self {
            Dependency::LocationStock => "location_stock",
            Dependency::OperatoryAssignment => "operatory_assignment",
            Dependency::UnassignedStock => "unassigned_stock",
            Dependency::Protected => "protected",
            Dependency::Supplies => "supplies",
        }
    }
}

impl core::fmt::Display for Dependency {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ledger/engine error.
///
/// Every variant carries enough structure for a caller to render a specific
/// message. None of them are retried automatically.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StockError {
    /// A guard would drive a pool negative.
    #[error(
        "insufficient stock in {pool} pool for supply {supply_id}: available {available}, requested {requested}"
    )]
    InsufficientStock {
        pool: PoolKind,
        supply_id: SupplyId,
        /// Location or operatory id; `None` for the unassigned pool.
        pool_id: Option<Uuid>,
        available: u64,
        requested: u64,
    },

    /// Transfer source and destination are the same location.
    #[error("source and destination location are the same ({location_id})")]
    SameLocation { location_id: Uuid },

    /// A name collides with an existing one, ignoring case.
    #[error("{entity} named \"{name}\" already exists")]
    DuplicateName { entity: EntityKind, name: String },

    /// Delete blocked by a dependent row.
    #[error("{entity} {id} is in use ({blocking})")]
    InUse {
        entity: EntityKind,
        id: Uuid,
        blocking: Dependency,
    },

    /// Barcode (or lookup key) resolves to no supply.
    #[error("no supply found for barcode \"{code}\"")]
    NotFoundInInventory { code: String },

    /// The supply exists but the operatory holds none of it.
    #[error("supply {supply_id} is not stocked in operatory {operatory_id}")]
    ItemNotFoundInInventory {
        supply_id: SupplyId,
        operatory_id: OperatoryId,
    },

    /// One write of a multi-operatory assignment failed; the batch was rolled back.
    #[error("assignment to operatory {operatory_id} failed: {reason}")]
    PartialAssignmentFailure {
        operatory_id: OperatoryId,
        reason: String,
    },

    /// A value failed validation (negative/zero quantity, malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A referenced catalog record does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: EntityKind, id: Uuid },

    /// Storage infrastructure failure; the call had no lasting effect.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl StockError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn not_found(entity: EntityKind, id: impl Into<Uuid>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn duplicate_name(entity: EntityKind, name: impl Into<String>) -> Self {
        Self::DuplicateName {
            entity,
            name: name.into(),
        }
    }

    pub fn in_use(entity: EntityKind, id: impl Into<Uuid>, blocking: Dependency) -> Self {
        Self::InUse {
            entity,
            id: id.into(),
            blocking,
        }
    }

    /// Stable machine-readable code.
    pub fn kind(&self) -> &'static str {
        match self {
            StockError::InsufficientStock { .. } => "insufficient_stock",
            StockError::SameLocation { .. } => "same_location",
            StockError::DuplicateName { .. } => "duplicate_name",
            StockError::InUse { .. } => "in_use",
            StockError::NotFoundInInventory { .. } => "not_found_in_inventory",
            StockError::ItemNotFoundInInventory { .. } => "item_not_found_in_inventory",
            StockError::PartialAssignmentFailure { .. } => "partial_assignment_failure",
            StockError::Validation(_) => "validation_error",
            StockError::NotFound { .. } => "not_found",
            StockError::Storage(_) => "storage_error",
        }
    }

    /// Structured detail for rendering a specific message.
    pub fn detail(&self) -> JsonValue {
        match self {
            StockError::InsufficientStock {
                pool,
                supply_id,
                pool_id,
                available,
                requested,
            } => json!({
                "pool": pool,
                "supply_id": supply_id,
                "pool_id": pool_id,
                "available": available,
                "requested": requested,
            }),
            StockError::SameLocation { location_id } => json!({ "location_id": location_id }),
            StockError::DuplicateName { entity, name } => json!({ "entity": entity, "name": name }),
            StockError::InUse {
                entity,
                id,
                blocking,
            } => json!({ "entity": entity, "id": id, "blocking": blocking }),
            StockError::NotFoundInInventory { code } => json!({ "code": code }),
            StockError::ItemNotFoundInInventory {
                supply_id,
                operatory_id,
            } => json!({ "supply_id": supply_id, "operatory_id": operatory_id }),
            StockError::PartialAssignmentFailure {
                operatory_id,
                reason,
            } => json!({ "operatory_id": operatory_id, "reason": reason }),
            StockError::NotFound { entity, id } => json!({ "entity": entity, "id": id }),
            StockError::Validation(_) | StockError::Storage(_) => JsonValue::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_stock_message_names_amounts() {
        let supply_id = SupplyId::new();
        let err = StockError::InsufficientStock {
            pool: PoolKind::Operatory,
            supply_id,
            pool_id: None,
            available: 3,
            requested: 5,
        };
        let msg = err.to_string();
        assert!(msg.contains("operatory pool"));
        assert!(msg.contains("available 3, requested 5"));
        assert_eq!(err.kind(), "insufficient_stock");
        assert_eq!(err.detail()["available"], 3);
    }

    #[test]
    fn in_use_names_blocking_dependency() {
        let err = StockError::in_use(EntityKind::Location, uuid::Uuid::nil(), Dependency::Protected);
        assert!(err.to_string().contains("(protected)"));
        assert_eq!(err.detail()["blocking"], "protected");
    }
}
