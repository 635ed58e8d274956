use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use dentstock_core::{
    CategoryId, Entity, LocationId, OperatoryId, ProcedureId, SupplierId, SupplyId, StockError,
};

/// Unit a supply is counted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    #[default]
    Piece,
    Box,
    Container,
}

impl Unit {
    pub fn as_str(self) -> &'static str {
        match self {
            Unit::Piece => "piece",
            Unit::Box => "box",
            Unit::Container => "container",
        }
    }
}

impl core::str::FromStr for Unit {
    type Err = StockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "piece" => Ok(Unit::Piece),
            "box" => Ok(Unit::Box),
            "container" => Ok(Unit::Container),
            other => Err(StockError::validation(format!(
                "unit must be one of: piece, box, container (got \"{other}\")"
            ))),
        }
    }
}

/// Catalog record for a supply.
///
/// The unassigned quantity is held by the stock ledger, not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supply {
    pub id: SupplyId,
    pub name: String,
    pub unit: Unit,
    /// Cost in smallest currency unit (e.g. cents).
    pub cost_per_unit: Option<u64>,
    pub barcode: Option<String>,
    pub category_id: Option<CategoryId>,
    pub supplier_id: Option<SupplierId>,
    /// Global threshold; also the default for new location/operatory rows.
    pub low_stock_threshold: u64,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a supply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyDraft {
    pub name: String,
    #[serde(default)]
    pub unit: Unit,
    #[serde(default)]
    pub cost_per_unit: Option<u64>,
    #[serde(default)]
    pub barcode: Option<String>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub supplier_id: Option<SupplierId>,
    #[serde(default)]
    pub low_stock_threshold: Option<u64>,
}

impl SupplyDraft {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = unit;
        self
    }

    pub fn with_barcode(mut self, barcode: impl Into<String>) -> Self {
        self.barcode = Some(barcode.into());
        self
    }

    pub fn with_cost(mut self, cost_per_unit: u64) -> Self {
        self.cost_per_unit = Some(cost_per_unit);
        self
    }

    pub fn with_category(mut self, category_id: CategoryId) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn with_supplier(mut self, supplier_id: SupplierId) -> Self {
        self.supplier_id = Some(supplier_id);
        self
    }

    pub fn with_threshold(mut self, threshold: u64) -> Self {
        self.low_stock_threshold = Some(threshold);
        self
    }
}

/// Metadata edit for an existing supply; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyUpdate {
    pub name: Option<String>,
    pub unit: Option<Unit>,
    pub cost_per_unit: Option<u64>,
    pub category_id: Option<CategoryId>,
    pub supplier_id: Option<SupplierId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

/// Supplier contact details shown next to low-stock alerts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub poc: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    pub id: SupplierId,
    pub name: String,
    pub contact: ContactInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierDraft {
    pub name: String,
    #[serde(default)]
    pub contact: ContactInfo,
}

/// Physical stock-keeping area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    /// Protected locations (the default holding area) cannot be deleted.
    pub protected: bool,
}

/// Treatment room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operatory {
    pub id: OperatoryId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Procedure {
    pub id: ProcedureId,
    pub name: String,
}

/// Template row: how much of a supply a procedure usually consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureSupply {
    pub procedure_id: ProcedureId,
    pub supply_id: SupplyId,
    pub default_quantity: u64,
}

macro_rules! impl_entity {
    ($t:ty, $id:ty) => {
        impl Entity for $t {
            type Id = $id;

            fn id(&self) -> Self::Id {
                self.id
            }

            fn name(&self) -> &str {
                &self.name
            }
        }
    };
}

impl_entity!(Supply, SupplyId);
impl_entity!(Category, CategoryId);
impl_entity!(Supplier, SupplierId);
impl_entity!(Location, LocationId);
impl_entity!(Operatory, OperatoryId);
impl_entity!(Procedure, ProcedureId);
