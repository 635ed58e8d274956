use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use dentstock_core::{
    CategoryId, Dependency, Entity, EntityKind, LocationId, OperatoryId, ProcedureId, StockError,
    StockResult, SupplierId, SupplyId,
};

use crate::config::CatalogConfig;
use crate::model::{
    Category, Location, Operatory, Procedure, ProcedureSupply, Supplier, SupplierDraft, Supply,
    SupplyDraft, SupplyUpdate,
};

#[derive(Debug, Default)]
struct CatalogState {
    supplies: BTreeMap<SupplyId, Supply>,
    barcodes: HashMap<String, SupplyId>,
    categories: BTreeMap<CategoryId, Category>,
    suppliers: BTreeMap<SupplierId, Supplier>,
    locations: BTreeMap<LocationId, Location>,
    operatories: BTreeMap<OperatoryId, Operatory>,
    procedures: BTreeMap<ProcedureId, Procedure>,
    procedure_supplies: BTreeMap<(ProcedureId, SupplyId), u64>,
}

/// In-memory catalog of reference data.
///
/// All check-then-insert sequences (name uniqueness, barcode binding) run under a
/// single write lock, so two concurrent creates of "Gauze" and "gauze" cannot both
/// succeed.
#[derive(Debug)]
pub struct Catalog {
    config: CatalogConfig,
    default_location: LocationId,
    inner: RwLock<CatalogState>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new(CatalogConfig::default())
    }
}

impl Catalog {
    /// Create a catalog seeded with the protected default location.
    pub fn new(config: CatalogConfig) -> Self {
        let default_location = Location {
            id: LocationId::new(),
            name: config.default_location_name.clone(),
            protected: true,
        };
        let mut state = CatalogState::default();
        let default_id = default_location.id;
        state.locations.insert(default_id, default_location);

        Self {
            config,
            default_location: default_id,
            inner: RwLock::new(state),
        }
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    fn read(&self) -> StockResult<RwLockReadGuard<'_, CatalogState>> {
        self.inner
            .read()
            .map_err(|_| StockError::storage("catalog lock poisoned"))
    }

    fn write(&self) -> StockResult<RwLockWriteGuard<'_, CatalogState>> {
        self.inner
            .write()
            .map_err(|_| StockError::storage("catalog lock poisoned"))
    }

    // -------------------------
    // Supplies
    // -------------------------

    /// Create a supply. Names are unique ignoring case; barcodes are unique.
    pub fn create_supply(&self, draft: SupplyDraft) -> StockResult<Supply> {
        let name = normalize_name(&draft.name, EntityKind::Supply)?;
        let barcode = draft.barcode.as_deref().map(normalize_barcode).transpose()?;

        let mut state = self.write()?;
        ensure_unique_name(&state.supplies, EntityKind::Supply, &name, None)?;
        if let Some(code) = &barcode {
            if let Some(owner) = state.barcodes.get(code) {
                return Err(StockError::validation(format!(
                    "barcode \"{code}\" is already assigned to supply {owner}"
                )));
            }
        }
        if let Some(category_id) = draft.category_id {
            require(&state.categories, EntityKind::Category, category_id)?;
        }
        if let Some(supplier_id) = draft.supplier_id {
            require(&state.suppliers, EntityKind::Supplier, supplier_id)?;
        }

        let supply = Supply {
            id: SupplyId::new(),
            name,
            unit: draft.unit,
            cost_per_unit: draft.cost_per_unit,
            barcode: barcode.clone(),
            category_id: draft.category_id,
            supplier_id: draft.supplier_id,
            low_stock_threshold: draft
                .low_stock_threshold
                .unwrap_or(self.config.default_low_stock_threshold),
            created_at: Utc::now(),
        };

        if let Some(code) = barcode {
            state.barcodes.insert(code, supply.id);
        }
        state.supplies.insert(supply.id, supply.clone());
        debug!(supply = %supply.id, name = %supply.name, "supply created");
        Ok(supply)
    }

    pub fn update_supply(&self, id: SupplyId, update: SupplyUpdate) -> StockResult<Supply> {
        let mut state = self.write()?;
        require(&state.supplies, EntityKind::Supply, id)?;

        let name = match update.name.as_deref() {
            Some(raw) => {
                let name = normalize_name(raw, EntityKind::Supply)?;
                ensure_unique_name(&state.supplies, EntityKind::Supply, &name, Some(id))?;
                Some(name)
            }
            None => None,
        };
        if let Some(category_id) = update.category_id {
            require(&state.categories, EntityKind::Category, category_id)?;
        }
        if let Some(supplier_id) = update.supplier_id {
            require(&state.suppliers, EntityKind::Supplier, supplier_id)?;
        }

        let supply = state
            .supplies
            .get_mut(&id)
            .ok_or_else(|| StockError::not_found(EntityKind::Supply, id))?;
        if let Some(name) = name {
            supply.name = name;
        }
        if let Some(unit) = update.unit {
            supply.unit = unit;
        }
        if let Some(cost) = update.cost_per_unit {
            supply.cost_per_unit = Some(cost);
        }
        if update.category_id.is_some() {
            supply.category_id = update.category_id;
        }
        if update.supplier_id.is_some() {
            supply.supplier_id = update.supplier_id;
        }
        Ok(supply.clone())
    }

    pub fn supply(&self, id: SupplyId) -> StockResult<Supply> {
        require(&self.read()?.supplies, EntityKind::Supply, id)
    }

    pub fn supplies(&self) -> StockResult<Vec<Supply>> {
        Ok(self.read()?.supplies.values().cloned().collect())
    }

    /// Case-insensitive lookup by name.
    pub fn find_supply_by_name(&self, name: &str) -> StockResult<Option<Supply>> {
        let lowered = name.trim().to_lowercase();
        Ok(self
            .read()?
            .supplies
            .values()
            .find(|s| s.name.to_lowercase() == lowered)
            .cloned())
    }

    /// Resolve a barcode to its supply, or `NotFoundInInventory`.
    pub fn lookup_by_barcode(&self, code: &str) -> StockResult<Supply> {
        let code = code.trim();
        let state = self.read()?;
        state
            .barcodes
            .get(code)
            .and_then(|id| state.supplies.get(id))
            .cloned()
            .ok_or_else(|| StockError::NotFoundInInventory {
                code: code.to_string(),
            })
    }

    /// Bind a barcode to an existing supply. No quantity changes.
    ///
    /// Re-binding the same code to the same supply is a no-op; a supply's previous
    /// code (if any) is released.
    pub fn assign_barcode(&self, supply_id: SupplyId, code: &str) -> StockResult<Supply> {
        let code = normalize_barcode(code)?;
        let mut state = self.write()?;
        require(&state.supplies, EntityKind::Supply, supply_id)?;

        match state.barcodes.get(&code) {
            Some(owner) if *owner == supply_id => {
                return require(&state.supplies, EntityKind::Supply, supply_id);
            }
            Some(owner) => {
                return Err(StockError::validation(format!(
                    "barcode \"{code}\" is already assigned to supply {owner}"
                )));
            }
            None => {}
        }

        let previous = state
            .supplies
            .get(&supply_id)
            .and_then(|s| s.barcode.clone());
        if let Some(previous) = previous {
            state.barcodes.remove(&previous);
        }
        state.barcodes.insert(code.clone(), supply_id);

        let supply = state
            .supplies
            .get_mut(&supply_id)
            .ok_or_else(|| StockError::not_found(EntityKind::Supply, supply_id))?;
        supply.barcode = Some(code);
        debug!(supply = %supply_id, "barcode assigned");
        Ok(supply.clone())
    }

    pub fn set_supply_threshold(&self, id: SupplyId, threshold: u64) -> StockResult<Supply> {
        let mut state = self.write()?;
        let supply = state
            .supplies
            .get_mut(&id)
            .ok_or_else(|| StockError::not_found(EntityKind::Supply, id))?;
        supply.low_stock_threshold = threshold;
        Ok(supply.clone())
    }

    /// Remove a supply record, its barcode binding and its procedure template rows.
    ///
    /// Ledger-side dependents are checked by the movement engine before this runs.
    pub fn remove_supply(&self, id: SupplyId) -> StockResult<Supply> {
        let mut state = self.write()?;
        let supply = state
            .supplies
            .remove(&id)
            .ok_or_else(|| StockError::not_found(EntityKind::Supply, id))?;
        if let Some(code) = &supply.barcode {
            state.barcodes.remove(code);
        }
        state.procedure_supplies.retain(|(_, s), _| *s != id);
        Ok(supply)
    }

    // -------------------------
    // Categories & suppliers
    // -------------------------

    pub fn create_category(&self, name: &str) -> StockResult<Category> {
        let name = normalize_name(name, EntityKind::Category)?;
        let mut state = self.write()?;
        ensure_unique_name(&state.categories, EntityKind::Category, &name, None)?;
        let category = Category {
            id: CategoryId::new(),
            name,
        };
        state.categories.insert(category.id, category.clone());
        Ok(category)
    }

    pub fn rename_category(&self, id: CategoryId, name: &str) -> StockResult<Category> {
        let mut state = self.write()?;
        rename(&mut state.categories, EntityKind::Category, id, name, |c, n| c.name = n)
    }

    pub fn category(&self, id: CategoryId) -> StockResult<Category> {
        require(&self.read()?.categories, EntityKind::Category, id)
    }

    pub fn categories(&self) -> StockResult<Vec<Category>> {
        Ok(self.read()?.categories.values().cloned().collect())
    }

    pub fn remove_category(&self, id: CategoryId) -> StockResult<Category> {
        let mut state = self.write()?;
        require(&state.categories, EntityKind::Category, id)?;
        if state.supplies.values().any(|s| s.category_id == Some(id)) {
            return Err(StockError::in_use(EntityKind::Category, id, Dependency::Supplies));
        }
        state
            .categories
            .remove(&id)
            .ok_or_else(|| StockError::not_found(EntityKind::Category, id))
    }

    pub fn create_supplier(&self, draft: SupplierDraft) -> StockResult<Supplier> {
        let name = normalize_name(&draft.name, EntityKind::Supplier)?;
        let mut state = self.write()?;
        ensure_unique_name(&state.suppliers, EntityKind::Supplier, &name, None)?;
        let supplier = Supplier {
            id: SupplierId::new(),
            name,
            contact: draft.contact,
        };
        state.suppliers.insert(supplier.id, supplier.clone());
        Ok(supplier)
    }

    pub fn rename_supplier(&self, id: SupplierId, name: &str) -> StockResult<Supplier> {
        let mut state = self.write()?;
        rename(&mut state.suppliers, EntityKind::Supplier, id, name, |s, n| s.name = n)
    }

    pub fn supplier(&self, id: SupplierId) -> StockResult<Supplier> {
        require(&self.read()?.suppliers, EntityKind::Supplier, id)
    }

    pub fn suppliers(&self) -> StockResult<Vec<Supplier>> {
        Ok(self.read()?.suppliers.values().cloned().collect())
    }

    pub fn remove_supplier(&self, id: SupplierId) -> StockResult<Supplier> {
        let mut state = self.write()?;
        require(&state.suppliers, EntityKind::Supplier, id)?;
        if state.supplies.values().any(|s| s.supplier_id == Some(id)) {
            return Err(StockError::in_use(EntityKind::Supplier, id, Dependency::Supplies));
        }
        state
            .suppliers
            .remove(&id)
            .ok_or_else(|| StockError::not_found(EntityKind::Supplier, id))
    }

    // -------------------------
    // Locations & operatories
    // -------------------------

    pub fn default_location(&self) -> LocationId {
        self.default_location
    }

    pub fn create_location(&self, name: &str) -> StockResult<Location> {
        let name = normalize_name(name, EntityKind::Location)?;
        let mut state = self.write()?;
        ensure_unique_name(&state.locations, EntityKind::Location, &name, None)?;
        let location = Location {
            id: LocationId::new(),
            name,
            protected: false,
        };
        state.locations.insert(location.id, location.clone());
        Ok(location)
    }

    pub fn rename_location(&self, id: LocationId, name: &str) -> StockResult<Location> {
        let mut state = self.write()?;
        rename(&mut state.locations, EntityKind::Location, id, name, |l, n| l.name = n)
    }

    pub fn location(&self, id: LocationId) -> StockResult<Location> {
        require(&self.read()?.locations, EntityKind::Location, id)
    }

    pub fn locations(&self) -> StockResult<Vec<Location>> {
        Ok(self.read()?.locations.values().cloned().collect())
    }

    /// Remove a location. Protected locations are never removed.
    pub fn remove_location(&self, id: LocationId) -> StockResult<Location> {
        let mut state = self.write()?;
        let location = require(&state.locations, EntityKind::Location, id)?;
        if location.protected {
            return Err(StockError::in_use(EntityKind::Location, id, Dependency::Protected));
        }
        state
            .locations
            .remove(&id)
            .ok_or_else(|| StockError::not_found(EntityKind::Location, id))
    }

    pub fn create_operatory(&self, name: &str) -> StockResult<Operatory> {
        let name = normalize_name(name, EntityKind::Operatory)?;
        let mut state = self.write()?;
        ensure_unique_name(&state.operatories, EntityKind::Operatory, &name, None)?;
        let operatory = Operatory {
            id: OperatoryId::new(),
            name,
        };
        state.operatories.insert(operatory.id, operatory.clone());
        Ok(operatory)
    }

    pub fn rename_operatory(&self, id: OperatoryId, name: &str) -> StockResult<Operatory> {
        let mut state = self.write()?;
        rename(&mut state.operatories, EntityKind::Operatory, id, name, |o, n| o.name = n)
    }

    pub fn operatory(&self, id: OperatoryId) -> StockResult<Operatory> {
        require(&self.read()?.operatories, EntityKind::Operatory, id)
    }

    pub fn operatories(&self) -> StockResult<Vec<Operatory>> {
        Ok(self.read()?.operatories.values().cloned().collect())
    }

    pub fn remove_operatory(&self, id: OperatoryId) -> StockResult<Operatory> {
        self.write()?
            .operatories
            .remove(&id)
            .ok_or_else(|| StockError::not_found(EntityKind::Operatory, id))
    }

    // -------------------------
    // Procedures
    // -------------------------

    pub fn create_procedure(&self, name: &str) -> StockResult<Procedure> {
        let name = normalize_name(name, EntityKind::Procedure)?;
        let mut state = self.write()?;
        ensure_unique_name(&state.procedures, EntityKind::Procedure, &name, None)?;
        let procedure = Procedure {
            id: ProcedureId::new(),
            name,
        };
        state.procedures.insert(procedure.id, procedure.clone());
        Ok(procedure)
    }

    pub fn rename_procedure(&self, id: ProcedureId, name: &str) -> StockResult<Procedure> {
        let mut state = self.write()?;
        rename(&mut state.procedures, EntityKind::Procedure, id, name, |p, n| p.name = n)
    }

    pub fn procedure(&self, id: ProcedureId) -> StockResult<Procedure> {
        require(&self.read()?.procedures, EntityKind::Procedure, id)
    }

    pub fn procedures(&self) -> StockResult<Vec<Procedure>> {
        Ok(self.read()?.procedures.values().cloned().collect())
    }

    /// Remove a procedure together with its template rows.
    pub fn remove_procedure(&self, id: ProcedureId) -> StockResult<Procedure> {
        let mut state = self.write()?;
        let procedure = state
            .procedures
            .remove(&id)
            .ok_or_else(|| StockError::not_found(EntityKind::Procedure, id))?;
        state.procedure_supplies.retain(|(p, _), _| *p != id);
        Ok(procedure)
    }

    /// Upsert a template row.
    pub fn set_procedure_supply(
        &self,
        procedure_id: ProcedureId,
        supply_id: SupplyId,
        default_quantity: u64,
    ) -> StockResult<ProcedureSupply> {
        if default_quantity == 0 {
            return Err(StockError::validation("default quantity must be greater than zero"));
        }
        let mut state = self.write()?;
        require(&state.procedures, EntityKind::Procedure, procedure_id)?;
        require(&state.supplies, EntityKind::Supply, supply_id)?;
        state
            .procedure_supplies
            .insert((procedure_id, supply_id), default_quantity);
        Ok(ProcedureSupply {
            procedure_id,
            supply_id,
            default_quantity,
        })
    }

    pub fn remove_procedure_supply(
        &self,
        procedure_id: ProcedureId,
        supply_id: SupplyId,
    ) -> StockResult<()> {
        self.write()?
            .procedure_supplies
            .remove(&(procedure_id, supply_id))
            .map(|_| ())
            .ok_or_else(|| StockError::not_found(EntityKind::Supply, supply_id))
    }

    pub fn procedure_supplies(&self, procedure_id: ProcedureId) -> StockResult<Vec<ProcedureSupply>> {
        let state = self.read()?;
        require(&state.procedures, EntityKind::Procedure, procedure_id)?;
        Ok(state
            .procedure_supplies
            .iter()
            .filter(|((p, _), _)| *p == procedure_id)
            .map(|((p, s), q)| ProcedureSupply {
                procedure_id: *p,
                supply_id: *s,
                default_quantity: *q,
            })
            .collect())
    }
}

fn normalize_name(raw: &str, kind: EntityKind) -> StockResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(StockError::validation(format!("{kind} name cannot be empty")));
    }
    Ok(name.to_string())
}

fn normalize_barcode(raw: &str) -> StockResult<String> {
    let code = raw.trim();
    if code.is_empty() {
        return Err(StockError::validation("barcode cannot be empty"));
    }
    Ok(code.to_string())
}

fn ensure_unique_name<E: Entity>(
    records: &BTreeMap<E::Id, E>,
    kind: EntityKind,
    name: &str,
    except: Option<E::Id>,
) -> StockResult<()> {
    let lowered = name.to_lowercase();
    let taken = records
        .values()
        .any(|r| Some(r.id()) != except && r.name().to_lowercase() == lowered);
    if taken {
        return Err(StockError::duplicate_name(kind, name));
    }
    Ok(())
}

fn require<E>(records: &BTreeMap<E::Id, E>, kind: EntityKind, id: E::Id) -> StockResult<E>
where
    E: Entity + Clone,
    E::Id: Into<Uuid>,
{
    records
        .get(&id)
        .cloned()
        .ok_or_else(|| StockError::not_found(kind, id))
}

fn rename<E>(
    records: &mut BTreeMap<E::Id, E>,
    kind: EntityKind,
    id: E::Id,
    raw: &str,
    set_name: impl FnOnce(&mut E, String),
) -> StockResult<E>
where
    E: Entity + Clone,
    E::Id: Into<Uuid>,
{
    let name = normalize_name(raw, kind)?;
    ensure_unique_name(records, kind, &name, Some(id))?;
    let record = records
        .get_mut(&id)
        .ok_or_else(|| StockError::not_found(kind, id))?;
    set_name(record, name);
    Ok(record.clone())
}
