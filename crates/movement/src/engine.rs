use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use dentstock_catalog::{Catalog, Supply, SupplyDraft};
use dentstock_core::{
    CategoryId, Dependency, EntityKind, LocationId, OperatoryId, PoolKind, ProcedureId,
    SessionContext, StockError, StockResult, SupplierId, SupplyId,
};
use dentstock_events::{Event, EventBus, EventEnvelope};
use dentstock_ledger::{LedgerKey, LedgerStore, NewUsage, StockLedger, UsageLog, UsageLogEntry};

use crate::event::MovementEvent;
use crate::model::{
    AssignItem, CheckInDestination, CheckInItem, ConsumeItem, OperatoryAssignment, Suggestion,
    SupplyRef, SupplyView, ThresholdTarget, TransferOutcome,
};

/// Compound stock operations over the catalog and the ledger.
///
/// The engine owns no state besides the event sequence counter; quantities live
/// in the ledger and metadata in the catalog. Each public mutating method is one
/// all-or-nothing call.
pub struct MovementEngine<S, L, B>
where
    S: LedgerStore,
{
    catalog: Arc<Catalog>,
    ledger: Arc<StockLedger<S>>,
    usage: L,
    bus: B,
    sequence: AtomicU64,
}

impl<S, L, B> MovementEngine<S, L, B>
where
    S: LedgerStore,
    L: UsageLog,
    B: EventBus<EventEnvelope<MovementEvent>>,
{
    pub fn new(catalog: Arc<Catalog>, ledger: Arc<StockLedger<S>>, usage: L, bus: B) -> Self {
        Self {
            catalog,
            ledger,
            usage,
            bus,
            sequence: AtomicU64::new(0),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn ledger(&self) -> &StockLedger<S> {
        &self.ledger
    }

    pub fn usage_log(&self) -> &L {
        &self.usage
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    // -------------------------
    // Check-in
    // -------------------------

    /// Increase `destination` by each item's quantity, creating new supplies first.
    ///
    /// Returns the supply of each item, in item order. If any step fails, supplies
    /// created by this call are removed again and no quantity changes.
    pub fn check_in(
        &self,
        ctx: &SessionContext,
        destination: CheckInDestination,
        items: Vec<CheckInItem>,
    ) -> StockResult<Vec<Supply>> {
        self.check_in_inner(ctx, destination, items)
            .inspect_err(|err| rejected("check_in", ctx, err))
    }

    fn check_in_inner(
        &self,
        ctx: &SessionContext,
        destination: CheckInDestination,
        items: Vec<CheckInItem>,
    ) -> StockResult<Vec<Supply>> {
        if items.is_empty() {
            return Err(StockError::validation("check-in needs at least one item"));
        }
        for item in &items {
            positive(item.quantity, "check-in quantity")?;
        }
        match destination {
            CheckInDestination::Location(id) => {
                self.catalog.location(id)?;
            }
            CheckInDestination::Operatory(id) => {
                self.catalog.operatory(id)?;
            }
            CheckInDestination::Unassigned => {}
        }

        // Existing references are resolved before anything is created.
        for item in &items {
            if let SupplyRef::Existing(id) = &item.supply {
                self.catalog.supply(*id)?;
            }
        }

        let mut created: Vec<Supply> = Vec::new();
        let mut resolved: Vec<(Supply, u64)> = Vec::with_capacity(items.len());
        for item in items {
            let supply = match item.supply {
                SupplyRef::Existing(id) => self.catalog.supply(id),
                SupplyRef::New(draft) => self.catalog.create_supply(draft).inspect(|s| {
                    created.push(s.clone());
                }),
            };
            match supply {
                Ok(supply) => resolved.push((supply, item.quantity)),
                Err(err) => {
                    self.discard_created(&created);
                    return Err(err);
                }
            }
        }

        let applied = self.apply_check_in(destination, &resolved);
        let new_quantities = match applied {
            Ok(quantities) => quantities,
            Err(err) => {
                self.discard_created(&created);
                return Err(err);
            }
        };

        for supply in &created {
            self.publish(
                ctx,
                MovementEvent::SupplyCreated {
                    supply_id: supply.id,
                    name: supply.name.clone(),
                    barcode: supply.barcode.clone(),
                    occurred_at: supply.created_at,
                },
            );
        }
        let now = Utc::now();
        for ((supply, quantity), new_quantity) in resolved.iter().zip(new_quantities) {
            info!(
                op = "check_in",
                user = %ctx.user_id(),
                supply = %supply.id,
                destination = ?destination,
                quantity,
                new_quantity,
                "stock checked in"
            );
            self.publish(
                ctx,
                MovementEvent::CheckedIn {
                    supply_id: supply.id,
                    destination,
                    quantity: *quantity,
                    new_quantity,
                    occurred_at: now,
                },
            );
        }

        Ok(resolved.into_iter().map(|(supply, _)| supply).collect())
    }

    fn apply_check_in(
        &self,
        destination: CheckInDestination,
        resolved: &[(Supply, u64)],
    ) -> StockResult<Vec<u64>> {
        let keys: Vec<LedgerKey> = resolved
            .iter()
            .map(|(supply, _)| destination.ledger_key(supply.id))
            .collect();

        let mut txn = self.ledger.begin(keys.iter().copied())?;
        let mut quantities = Vec::with_capacity(resolved.len());
        for ((supply, quantity), key) in resolved.iter().zip(&keys) {
            quantities.push(txn.credit(*key, *quantity, supply.low_stock_threshold)?);
        }
        txn.commit();
        Ok(quantities)
    }

    fn discard_created(&self, created: &[Supply]) {
        for supply in created {
            if let Err(err) = self.catalog.remove_supply(supply.id) {
                warn!(supply = %supply.id, error = %err, "failed to discard supply created by rejected check-in");
            }
        }
    }

    // -------------------------
    // Consume
    // -------------------------

    /// Decrement operatory assignments and log each use, all or nothing.
    ///
    /// A supply the operatory holds no row for is `ItemNotFoundInInventory`; a row
    /// holding too little is `InsufficientStock`.
    pub fn consume(
        &self,
        ctx: &SessionContext,
        operatory_id: OperatoryId,
        items: &[ConsumeItem],
        procedure_id: Option<ProcedureId>,
    ) -> StockResult<Vec<UsageLogEntry>> {
        self.consume_inner(ctx, operatory_id, items, procedure_id)
            .inspect_err(|err| rejected("consume", ctx, err))
    }

    fn consume_inner(
        &self,
        ctx: &SessionContext,
        operatory_id: OperatoryId,
        items: &[ConsumeItem],
        procedure_id: Option<ProcedureId>,
    ) -> StockResult<Vec<UsageLogEntry>> {
        if items.is_empty() {
            return Err(StockError::validation("consume needs at least one item"));
        }
        for item in items {
            positive(item.quantity, "consume quantity")?;
        }
        self.catalog.operatory(operatory_id)?;
        if let Some(procedure_id) = procedure_id {
            self.catalog.procedure(procedure_id)?;
        }
        let supplies = items
            .iter()
            .map(|item| self.catalog.supply(item.supply_id))
            .collect::<StockResult<Vec<_>>>()?;

        let keys = items
            .iter()
            .map(|item| LedgerKey::operatory(item.supply_id, operatory_id));
        let mut txn = self.ledger.begin(keys)?;

        let mut remaining = Vec::with_capacity(items.len());
        for item in items {
            let key = LedgerKey::operatory(item.supply_id, operatory_id);
            if txn.row(&key)?.is_none() {
                return Err(StockError::ItemNotFoundInInventory {
                    supply_id: item.supply_id,
                    operatory_id,
                });
            }
            remaining.push(txn.debit(key, item.quantity)?);
        }

        let batch = items
            .iter()
            .zip(&supplies)
            .map(|(item, supply)| NewUsage {
                user_id: ctx.user_id(),
                operatory_id,
                supply_id: item.supply_id,
                quantity: item.quantity,
                procedure_id,
                unit_cost_snapshot: supply.cost_per_unit,
            })
            .collect();
        // Appended while the rows are still locked, so a failed append rolls back.
        let entries = self.usage.append(batch)?;
        txn.commit();

        for (entry, remaining) in entries.iter().zip(remaining) {
            info!(
                op = "consume",
                user = %ctx.user_id(),
                supply = %entry.supply_id,
                operatory = %operatory_id,
                quantity = entry.quantity,
                remaining,
                "stock consumed"
            );
            self.publish(
                ctx,
                MovementEvent::Consumed {
                    supply_id: entry.supply_id,
                    operatory_id,
                    procedure_id,
                    quantity: entry.quantity,
                    remaining,
                    occurred_at: entry.timestamp,
                },
            );
        }
        Ok(entries)
    }

    // -------------------------
    // Transfer
    // -------------------------

    /// Move `quantity` of a supply between two locations.
    pub fn transfer(
        &self,
        ctx: &SessionContext,
        supply_id: SupplyId,
        source: LocationId,
        destination: LocationId,
        quantity: u64,
    ) -> StockResult<TransferOutcome> {
        self.transfer_inner(ctx, supply_id, source, destination, quantity)
            .inspect_err(|err| rejected("transfer", ctx, err))
    }

    fn transfer_inner(
        &self,
        ctx: &SessionContext,
        supply_id: SupplyId,
        source: LocationId,
        destination: LocationId,
        quantity: u64,
    ) -> StockResult<TransferOutcome> {
        positive(quantity, "transfer quantity")?;
        if source == destination {
            return Err(StockError::SameLocation {
                location_id: source.into(),
            });
        }
        let supply = self.catalog.supply(supply_id)?;
        self.catalog.location(source)?;
        self.catalog.location(destination)?;

        let from = LedgerKey::location(supply_id, source);
        let to = LedgerKey::location(supply_id, destination);
        let mut txn = self.ledger.begin([from, to])?;
        let source_quantity = txn.debit(from, quantity)?;
        let destination_quantity = txn.credit(to, quantity, supply.low_stock_threshold)?;
        txn.commit();

        info!(
            op = "transfer",
            user = %ctx.user_id(),
            supply = %supply_id,
            source = %source,
            destination = %destination,
            quantity,
            "stock transferred"
        );
        self.publish(
            ctx,
            MovementEvent::Transferred {
                supply_id,
                source_location_id: source,
                destination_location_id: destination,
                quantity,
                occurred_at: Utc::now(),
            },
        );
        Ok(TransferOutcome {
            source_quantity,
            destination_quantity,
        })
    }

    // -------------------------
    // Operatory assignment
    // -------------------------

    /// Move each item's per-operatory quantity from the unassigned pool into every
    /// listed operatory.
    ///
    /// The whole batch is one transaction. A failed operatory write is reported as
    /// `PartialAssignmentFailure` after every write of the batch has been undone.
    pub fn assign(
        &self,
        ctx: &SessionContext,
        items: &[AssignItem],
        operatory_ids: &[OperatoryId],
    ) -> StockResult<Vec<OperatoryAssignment>> {
        self.assign_inner(ctx, items, operatory_ids)
            .inspect_err(|err| rejected("assign", ctx, err))
    }

    fn assign_inner(
        &self,
        ctx: &SessionContext,
        items: &[AssignItem],
        operatory_ids: &[OperatoryId],
    ) -> StockResult<Vec<OperatoryAssignment>> {
        if items.is_empty() {
            return Err(StockError::validation("assign needs at least one supply"));
        }
        if operatory_ids.is_empty() {
            return Err(StockError::validation("assign needs at least one operatory"));
        }
        let distinct_ops: BTreeSet<OperatoryId> = operatory_ids.iter().copied().collect();
        if distinct_ops.len() != operatory_ids.len() {
            return Err(StockError::validation("operatory listed more than once"));
        }
        let distinct_supplies: BTreeSet<SupplyId> = items.iter().map(|i| i.supply_id).collect();
        if distinct_supplies.len() != items.len() {
            return Err(StockError::validation("supply listed more than once"));
        }
        for item in items {
            positive(item.quantity_per_operatory, "quantity per operatory")?;
        }
        for op in operatory_ids {
            self.catalog.operatory(*op)?;
        }
        let supplies = items
            .iter()
            .map(|item| self.catalog.supply(item.supply_id))
            .collect::<StockResult<Vec<_>>>()?;

        let mut keys = Vec::with_capacity(items.len() * (operatory_ids.len() + 1));
        for item in items {
            keys.push(LedgerKey::unassigned(item.supply_id));
            keys.extend(
                operatory_ids
                    .iter()
                    .map(|op| LedgerKey::operatory(item.supply_id, *op)),
            );
        }
        let mut txn = self.ledger.begin(keys)?;

        let mut assignments = Vec::with_capacity(items.len() * operatory_ids.len());
        for (item, supply) in items.iter().zip(&supplies) {
            let unassigned = LedgerKey::unassigned(item.supply_id);
            let total = item
                .quantity_per_operatory
                .checked_mul(operatory_ids.len() as u64)
                .ok_or_else(|| StockError::validation("assignment total overflows"))?;
            let available = txn.quantity(&unassigned)?;
            if available < total {
                return Err(StockError::InsufficientStock {
                    pool: unassigned.pool(),
                    supply_id: item.supply_id,
                    pool_id: None,
                    available,
                    requested: total,
                });
            }

            for op in operatory_ids {
                let key = LedgerKey::operatory(item.supply_id, *op);
                let quantity = txn
                    .credit(key, item.quantity_per_operatory, supply.low_stock_threshold)
                    .map_err(|err| StockError::PartialAssignmentFailure {
                        operatory_id: *op,
                        reason: err.to_string(),
                    })?;
                let threshold = txn
                    .row(&key)?
                    .map_or(supply.low_stock_threshold, |r| r.low_stock_threshold);
                assignments.push(OperatoryAssignment {
                    supply_id: item.supply_id,
                    operatory_id: *op,
                    quantity,
                    low_stock_threshold: threshold,
                });
            }
            txn.debit(unassigned, total)?;
        }
        txn.commit();

        let now = Utc::now();
        for item in items {
            for op in operatory_ids {
                info!(
                    op = "assign",
                    user = %ctx.user_id(),
                    supply = %item.supply_id,
                    operatory = %op,
                    quantity = item.quantity_per_operatory,
                    "stock assigned"
                );
                self.publish(
                    ctx,
                    MovementEvent::Assigned {
                        supply_id: item.supply_id,
                        operatory_id: *op,
                        quantity: item.quantity_per_operatory,
                        occurred_at: now,
                    },
                );
            }
        }
        Ok(assignments)
    }

    /// Return an operatory's whole assignment to the unassigned pool and delete the row.
    pub fn unassign(
        &self,
        ctx: &SessionContext,
        supply_id: SupplyId,
        operatory_id: OperatoryId,
    ) -> StockResult<u64> {
        self.unassign_inner(ctx, supply_id, operatory_id)
            .inspect_err(|err| rejected("unassign", ctx, err))
    }

    fn unassign_inner(
        &self,
        ctx: &SessionContext,
        supply_id: SupplyId,
        operatory_id: OperatoryId,
    ) -> StockResult<u64> {
        let assigned = LedgerKey::operatory(supply_id, operatory_id);
        let unassigned = LedgerKey::unassigned(supply_id);
        let mut txn = self.ledger.begin([assigned, unassigned])?;
        if txn.row(&assigned)?.is_none() {
            return Err(StockError::ItemNotFoundInInventory {
                supply_id,
                operatory_id,
            });
        }
        let returned = txn.drain_row(assigned)?;
        txn.credit(unassigned, returned, 0)?;
        txn.commit();

        info!(
            op = "unassign",
            user = %ctx.user_id(),
            supply = %supply_id,
            operatory = %operatory_id,
            quantity = returned,
            "assignment returned to unassigned pool"
        );
        self.publish(
            ctx,
            MovementEvent::Unassigned {
                supply_id,
                operatory_id,
                quantity: returned,
                row_removed: true,
                occurred_at: Utc::now(),
            },
        );
        Ok(returned)
    }

    /// Set an operatory's assignment to exactly `quantity`, moving the difference
    /// to or from the unassigned pool.
    pub fn set_assignment_quantity(
        &self,
        ctx: &SessionContext,
        supply_id: SupplyId,
        operatory_id: OperatoryId,
        quantity: u64,
    ) -> StockResult<OperatoryAssignment> {
        self.set_assignment_quantity_inner(ctx, supply_id, operatory_id, quantity)
            .inspect_err(|err| rejected("set_assignment_quantity", ctx, err))
    }

    fn set_assignment_quantity_inner(
        &self,
        ctx: &SessionContext,
        supply_id: SupplyId,
        operatory_id: OperatoryId,
        quantity: u64,
    ) -> StockResult<OperatoryAssignment> {
        let supply = self.catalog.supply(supply_id)?;
        self.catalog.operatory(operatory_id)?;

        let assigned = LedgerKey::operatory(supply_id, operatory_id);
        let unassigned = LedgerKey::unassigned(supply_id);
        let mut txn = self.ledger.begin([assigned, unassigned])?;
        let current = txn.quantity(&assigned)?;

        let event = if quantity > current {
            let diff = quantity - current;
            txn.debit(unassigned, diff)?;
            txn.credit(assigned, diff, supply.low_stock_threshold)?;
            Some(MovementEvent::Assigned {
                supply_id,
                operatory_id,
                quantity: diff,
                occurred_at: Utc::now(),
            })
        } else if quantity < current {
            let diff = current - quantity;
            txn.debit(assigned, diff)?;
            txn.credit(unassigned, diff, 0)?;
            Some(MovementEvent::Unassigned {
                supply_id,
                operatory_id,
                quantity: diff,
                row_removed: false,
                occurred_at: Utc::now(),
            })
        } else {
            None
        };
        let row = txn.ensure_row(assigned, supply.low_stock_threshold)?;
        txn.commit();

        if let Some(event) = event {
            info!(
                op = "set_assignment_quantity",
                user = %ctx.user_id(),
                supply = %supply_id,
                operatory = %operatory_id,
                from = current,
                to = quantity,
                "assignment quantity changed"
            );
            self.publish(ctx, event);
        }
        Ok(OperatoryAssignment {
            supply_id,
            operatory_id,
            quantity: row.quantity,
            low_stock_threshold: row.low_stock_threshold,
        })
    }

    /// Delete an empty location row. Fails `InUse` while the location still holds stock.
    ///
    /// Returns whether a row existed.
    pub fn remove_from_location(
        &self,
        ctx: &SessionContext,
        supply_id: SupplyId,
        location_id: LocationId,
    ) -> StockResult<bool> {
        let key = LedgerKey::location(supply_id, location_id);
        let removed = self
            .ledger
            .begin([key])
            .and_then(|mut txn| {
                let removed = txn.remove_empty_row(key)?;
                txn.commit();
                Ok(removed)
            })
            .inspect_err(|err| rejected("remove_from_location", ctx, err))?;

        if removed {
            info!(
                op = "remove_from_location",
                user = %ctx.user_id(),
                supply = %supply_id,
                location = %location_id,
                "supply removed from location"
            );
            self.publish(
                ctx,
                MovementEvent::RemovedFromLocation {
                    supply_id,
                    location_id,
                    occurred_at: Utc::now(),
                },
            );
        }
        Ok(removed)
    }

    // -------------------------
    // Deletes
    // -------------------------

    /// Delete a supply once no location or operatory holds any of it.
    ///
    /// Empty rows go with it, and so does the unassigned row whatever it holds.
    pub fn delete_supply(&self, ctx: &SessionContext, supply_id: SupplyId) -> StockResult<Supply> {
        self.delete_supply_inner(supply_id)
            .inspect(|(_, discarded)| {
                info!(
                    op = "delete_supply",
                    user = %ctx.user_id(),
                    supply = %supply_id,
                    discarded_unassigned = *discarded,
                    "supply deleted"
                )
            })
            .map(|(supply, _)| supply)
            .inspect_err(|err| rejected("delete_supply", ctx, err))
    }

    fn delete_supply_inner(&self, supply_id: SupplyId) -> StockResult<(Supply, u64)> {
        self.catalog.supply(supply_id)?;
        let keys: Vec<LedgerKey> = self
            .ledger
            .rows_for_supply(supply_id)?
            .into_iter()
            .map(|(key, _)| key)
            .collect();

        let mut txn = self.ledger.begin(keys.iter().copied())?;
        let mut discarded = 0;
        for key in &keys {
            if key.pool() == PoolKind::Unassigned {
                discarded += txn.drain_row(*key)?;
            } else {
                txn.remove_empty_row(*key)?;
            }
        }
        let supply = self.catalog.remove_supply(supply_id)?;
        txn.commit();
        Ok((supply, discarded))
    }

    /// Delete a location once none of its rows holds stock. Protected locations stay.
    pub fn delete_location(&self, ctx: &SessionContext, location_id: LocationId) -> StockResult<()> {
        self.delete_location_inner(location_id)
            .inspect(|_| info!(op = "delete_location", user = %ctx.user_id(), location = %location_id, "location deleted"))
            .inspect_err(|err| rejected("delete_location", ctx, err))
    }

    fn delete_location_inner(&self, location_id: LocationId) -> StockResult<()> {
        let location = self.catalog.location(location_id)?;
        if location.protected {
            return Err(StockError::in_use(
                EntityKind::Location,
                location_id,
                Dependency::Protected,
            ));
        }
        let keys: Vec<LedgerKey> = self
            .ledger
            .rows_for_location(location_id)?
            .into_iter()
            .map(|(supply_id, _)| LedgerKey::location(supply_id, location_id))
            .collect();

        let mut txn = self.ledger.begin(keys.iter().copied())?;
        for key in keys {
            if txn.quantity(&key)? > 0 {
                return Err(StockError::in_use(
                    EntityKind::Location,
                    location_id,
                    Dependency::LocationStock,
                ));
            }
            txn.drain_row(key)?;
        }
        self.catalog.remove_location(location_id)?;
        txn.commit();
        Ok(())
    }

    /// Delete an operatory once none of its assignment rows holds stock.
    pub fn delete_operatory(&self, ctx: &SessionContext, operatory_id: OperatoryId) -> StockResult<()> {
        self.delete_operatory_inner(operatory_id)
            .inspect(|_| info!(op = "delete_operatory", user = %ctx.user_id(), operatory = %operatory_id, "operatory deleted"))
            .inspect_err(|err| rejected("delete_operatory", ctx, err))
    }

    fn delete_operatory_inner(&self, operatory_id: OperatoryId) -> StockResult<()> {
        self.catalog.operatory(operatory_id)?;
        let keys: Vec<LedgerKey> = self
            .ledger
            .rows_for_operatory(operatory_id)?
            .into_iter()
            .map(|(supply_id, _)| LedgerKey::operatory(supply_id, operatory_id))
            .collect();

        let mut txn = self.ledger.begin(keys.iter().copied())?;
        for key in keys {
            if txn.quantity(&key)? > 0 {
                return Err(StockError::in_use(
                    EntityKind::Operatory,
                    operatory_id,
                    Dependency::OperatoryAssignment,
                ));
            }
            txn.drain_row(key)?;
        }
        self.catalog.remove_operatory(operatory_id)?;
        txn.commit();
        Ok(())
    }

    pub fn delete_category(&self, ctx: &SessionContext, category_id: CategoryId) -> StockResult<()> {
        self.catalog
            .remove_category(category_id)
            .map(|_| ())
            .inspect_err(|err| rejected("delete_category", ctx, err))
    }

    pub fn delete_supplier(&self, ctx: &SessionContext, supplier_id: SupplierId) -> StockResult<()> {
        self.catalog
            .remove_supplier(supplier_id)
            .map(|_| ())
            .inspect_err(|err| rejected("delete_supplier", ctx, err))
    }

    // -------------------------
    // Thresholds & read helpers
    // -------------------------

    /// Set the low-stock threshold of the supply itself or of one of its rows.
    pub fn set_threshold(
        &self,
        ctx: &SessionContext,
        target: ThresholdTarget,
        value: u64,
    ) -> StockResult<()> {
        self.set_threshold_inner(target, value)
            .inspect_err(|err| rejected("set_threshold", ctx, err))?;

        info!(op = "set_threshold", user = %ctx.user_id(), target = ?target, value, "threshold updated");
        self.publish(
            ctx,
            MovementEvent::ThresholdChanged {
                target,
                value,
                occurred_at: Utc::now(),
            },
        );
        Ok(())
    }

    fn set_threshold_inner(&self, target: ThresholdTarget, value: u64) -> StockResult<()> {
        match target {
            ThresholdTarget::Global { supply_id } => {
                self.catalog.set_supply_threshold(supply_id, value)?;
            }
            ThresholdTarget::Location {
                supply_id,
                location_id,
            } => {
                self.catalog.supply(supply_id)?;
                self.catalog.location(location_id)?;
                self.ledger
                    .set_threshold(LedgerKey::location(supply_id, location_id), value)?;
            }
            ThresholdTarget::Operatory {
                supply_id,
                operatory_id,
            } => {
                self.catalog.supply(supply_id)?;
                self.catalog.operatory(operatory_id)?;
                self.ledger
                    .set_threshold(LedgerKey::operatory(supply_id, operatory_id), value)?;
            }
        }
        Ok(())
    }

    /// Procedure template defaults, each clamped to the operatory's current assignment.
    pub fn suggested_quantities(
        &self,
        operatory_id: OperatoryId,
        procedure_id: ProcedureId,
    ) -> StockResult<Vec<Suggestion>> {
        self.catalog.operatory(operatory_id)?;
        self.catalog
            .procedure_supplies(procedure_id)?
            .into_iter()
            .map(|template| {
                let available = self
                    .ledger
                    .quantity(LedgerKey::operatory(template.supply_id, operatory_id))?;
                Ok(Suggestion {
                    supply_id: template.supply_id,
                    default_quantity: template.default_quantity,
                    available,
                    suggested: template.default_quantity.min(available),
                })
            })
            .collect()
    }

    pub fn supply_view(&self, supply_id: SupplyId) -> StockResult<SupplyView> {
        let supply = self.catalog.supply(supply_id)?;
        let snapshot = self.ledger.snapshot()?;
        Ok(SupplyView {
            unassigned_quantity: snapshot.unassigned(supply_id),
            total_assigned: snapshot.total_assigned(supply_id),
            total_at_locations: snapshot.total_at_locations(supply_id),
            supply,
        })
    }

    pub fn operatory_assignments(
        &self,
        operatory_id: OperatoryId,
    ) -> StockResult<Vec<OperatoryAssignment>> {
        Ok(self
            .ledger
            .rows_for_operatory(operatory_id)?
            .into_iter()
            .map(|(supply_id, row)| OperatoryAssignment {
                supply_id,
                operatory_id,
                quantity: row.quantity,
                low_stock_threshold: row.low_stock_threshold,
            })
            .collect())
    }

    // -------------------------
    // Catalog-facing writes and barcodes
    // -------------------------

    pub fn create_supply(&self, ctx: &SessionContext, draft: SupplyDraft) -> StockResult<Supply> {
        let supply = self
            .catalog
            .create_supply(draft)
            .inspect_err(|err| rejected("create_supply", ctx, err))?;
        self.publish(
            ctx,
            MovementEvent::SupplyCreated {
                supply_id: supply.id,
                name: supply.name.clone(),
                barcode: supply.barcode.clone(),
                occurred_at: supply.created_at,
            },
        );
        Ok(supply)
    }

    pub fn lookup_by_barcode(&self, code: &str) -> StockResult<Supply> {
        self.catalog.lookup_by_barcode(code)
    }

    /// Bind `code` to an existing supply. No quantity changes.
    pub fn assign_barcode(
        &self,
        ctx: &SessionContext,
        supply_id: SupplyId,
        code: &str,
    ) -> StockResult<Supply> {
        let supply = self
            .catalog
            .assign_barcode(supply_id, code)
            .inspect_err(|err| rejected("assign_barcode", ctx, err))?;
        info!(op = "assign_barcode", user = %ctx.user_id(), supply = %supply_id, "barcode assigned");
        if let Some(barcode) = &supply.barcode {
            self.publish(
                ctx,
                MovementEvent::BarcodeAssigned {
                    supply_id,
                    barcode: barcode.clone(),
                    occurred_at: Utc::now(),
                },
            );
        }
        Ok(supply)
    }

    /// Create a supply whose draft carries the scanned barcode.
    pub fn create_with_barcode(
        &self,
        ctx: &SessionContext,
        draft: SupplyDraft,
    ) -> StockResult<Supply> {
        if draft.barcode.as_deref().is_none_or(|c| c.trim().is_empty()) {
            let err = StockError::validation("a barcode is required");
            rejected("create_with_barcode", ctx, &err);
            return Err(err);
        }
        self.create_supply(ctx, draft)
    }

    fn publish(&self, ctx: &SessionContext, event: MovementEvent) {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let envelope = EventEnvelope::new(
            Uuid::now_v7(),
            ctx.user_id(),
            event.event_type(),
            sequence,
            event,
        );
        if let Err(err) = self.bus.publish(envelope) {
            warn!(sequence, error = ?err, "movement committed but event publication failed");
        }
    }
}

fn positive(quantity: u64, what: &str) -> StockResult<()> {
    if quantity == 0 {
        return Err(StockError::validation(format!("{what} must be greater than zero")));
    }
    Ok(())
}

fn rejected(op: &'static str, ctx: &SessionContext, err: &StockError) {
    warn!(op, user = %ctx.user_id(), kind = err.kind(), error = %err, "movement rejected");
}
