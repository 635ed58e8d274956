//! End-to-end tests of the engine over the in-memory catalog, ledger and bus.
//!
//! Verifies:
//! - Conservation across the unassigned/operatory pair and across transfers
//! - Rejected calls leave every pool exactly as before
//! - Concurrent calls on one row never lose updates
//! - Events are published only after a commit

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use proptest::prelude::*;

    use dentstock_catalog::{Catalog, CatalogConfig, SupplyDraft, SupplyUpdate, Unit};
    use dentstock_core::{
        Dependency, EntityKind, LocationId, OperatoryId, PoolKind, SessionContext, StockError,
        SupplyId, UserId,
    };
    use dentstock_events::{EventBus, EventEnvelope, InMemoryEventBus};
    use dentstock_ledger::{
        FaultInjectingStore, InMemoryLedgerStore, InMemoryUsageLog, LedgerKey, LedgerStore,
        StockLedger, UsageLog,
    };

    use crate::engine::MovementEngine;
    use crate::event::MovementEvent;
    use crate::model::{
        AssignItem, CheckInDestination, CheckInItem, ConsumeItem, ThresholdTarget,
    };

    type Bus = Arc<InMemoryEventBus<EventEnvelope<MovementEvent>>>;
    type Engine<S> = MovementEngine<S, Arc<InMemoryUsageLog>, Bus>;

    fn engine_with<S: LedgerStore>(store: S) -> Engine<S> {
        MovementEngine::new(
            Arc::new(Catalog::new(CatalogConfig::default())),
            Arc::new(StockLedger::new(store)),
            Arc::new(InMemoryUsageLog::new()),
            Arc::new(InMemoryEventBus::new()),
        )
    }

    fn setup() -> (Engine<InMemoryLedgerStore>, SessionContext) {
        (
            engine_with(InMemoryLedgerStore::new()),
            SessionContext::new(UserId::new()),
        )
    }

    fn supply<S: LedgerStore>(engine: &Engine<S>, name: &str) -> SupplyId {
        engine.catalog().create_supply(SupplyDraft::named(name)).unwrap().id
    }

    fn operatory<S: LedgerStore>(engine: &Engine<S>, name: &str) -> OperatoryId {
        engine.catalog().create_operatory(name).unwrap().id
    }

    fn location<S: LedgerStore>(engine: &Engine<S>, name: &str) -> LocationId {
        engine.catalog().create_location(name).unwrap().id
    }

    fn stock_unassigned<S: LedgerStore>(
        engine: &Engine<S>,
        ctx: &SessionContext,
        supply_id: SupplyId,
        quantity: u64,
    ) {
        engine
            .check_in(
                ctx,
                CheckInDestination::Unassigned,
                vec![CheckInItem::existing(supply_id, quantity)],
            )
            .unwrap();
    }

    fn assigned<S: LedgerStore>(engine: &Engine<S>, supply_id: SupplyId, op: OperatoryId) -> u64 {
        engine
            .ledger()
            .quantity(LedgerKey::operatory(supply_id, op))
            .unwrap()
    }

    // -------------------------
    // Worked examples
    // -------------------------

    #[test]
    fn assign_splits_unassigned_across_operatories() {
        let (engine, ctx) = setup();
        let s = supply(&engine, "Gloves");
        let a = operatory(&engine, "Op A");
        let b = operatory(&engine, "Op B");
        stock_unassigned(&engine, &ctx, s, 10);

        let rows = engine.assign(&ctx, &[AssignItem::new(s, 3)], &[a, b]).unwrap();

        assert_eq!(rows.len(), 2);
        let snap = engine.ledger().snapshot().unwrap();
        assert_eq!(snap.unassigned(s), 4);
        assert_eq!(snap.quantity(&LedgerKey::operatory(s, a)), 3);
        assert_eq!(snap.quantity(&LedgerKey::operatory(s, b)), 3);
    }

    #[test]
    fn consuming_more_than_assigned_is_rejected_without_change() {
        let (engine, ctx) = setup();
        let s = supply(&engine, "Gauze");
        let a = operatory(&engine, "Op A");
        engine
            .check_in(&ctx, CheckInDestination::Operatory(a), vec![CheckInItem::existing(s, 3)])
            .unwrap();
        let before = engine.ledger().snapshot().unwrap();

        let err = engine
            .consume(&ctx, a, &[ConsumeItem::new(s, 5)], None)
            .unwrap_err();

        assert_eq!(
            err,
            StockError::InsufficientStock {
                pool: PoolKind::Operatory,
                supply_id: s,
                pool_id: Some(a.into()),
                available: 3,
                requested: 5,
            }
        );
        assert_eq!(engine.ledger().snapshot().unwrap(), before);
        assert!(engine.usage_log().is_empty());
    }

    #[test]
    fn transfer_can_empty_the_source_location() {
        let (engine, ctx) = setup();
        let s = supply(&engine, "Bibs");
        let l1 = location(&engine, "Back room");
        let l2 = location(&engine, "Front desk");
        engine
            .check_in(&ctx, CheckInDestination::Location(l1), vec![CheckInItem::existing(s, 10)])
            .unwrap();

        let outcome = engine.transfer(&ctx, s, l1, l2, 10).unwrap();

        assert_eq!(outcome.source_quantity, 0);
        assert_eq!(outcome.destination_quantity, 10);
    }

    #[test]
    fn concurrent_check_ins_to_one_row_are_not_lost() {
        let (engine, ctx) = setup();
        let s = supply(&engine, "Masks");
        let l = location(&engine, "Store");

        for round in 1..=20u64 {
            std::thread::scope(|scope| {
                for _ in 0..2 {
                    scope.spawn(|| {
                        engine
                            .check_in(
                                &ctx,
                                CheckInDestination::Location(l),
                                vec![CheckInItem::existing(s, 5)],
                            )
                            .unwrap();
                    });
                }
            });
            assert_eq!(
                engine.ledger().quantity(LedgerKey::location(s, l)).unwrap(),
                round * 10
            );
        }
        // One row, never a duplicate.
        assert_eq!(engine.ledger().rows_for_location(l).unwrap().len(), 1);
    }

    #[test]
    fn failed_operatory_write_rolls_back_the_whole_assignment() {
        let engine = engine_with(FaultInjectingStore::new(InMemoryLedgerStore::new()));
        let ctx = SessionContext::new(UserId::new());
        let s = supply(&engine, "Cotton rolls");
        let ops = [
            operatory(&engine, "Op 1"),
            operatory(&engine, "Op 2"),
            operatory(&engine, "Op 3"),
        ];
        stock_unassigned(&engine, &ctx, s, 9);
        engine.assign(&ctx, &[AssignItem::new(s, 1)], &ops).unwrap();
        let before = engine.ledger().snapshot().unwrap();

        engine.ledger().store().fail_nth_write(2);
        let err = engine.assign(&ctx, &[AssignItem::new(s, 2)], &ops).unwrap_err();

        match err {
            StockError::PartialAssignmentFailure { operatory_id, .. } => {
                assert_eq!(operatory_id, ops[1]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(engine.ledger().snapshot().unwrap(), before);
        assert_eq!(engine.ledger().snapshot().unwrap().unassigned(s), 6);
    }

    // -------------------------
    // Check-in
    // -------------------------

    #[test]
    fn check_in_creates_new_supplies_and_rejects_duplicate_names() {
        let (engine, ctx) = setup();
        let l = location(&engine, "Store");
        let created = engine
            .check_in(
                &ctx,
                CheckInDestination::Location(l),
                vec![CheckInItem::new_supply(
                    SupplyDraft::named("Gauze").with_unit(Unit::Box).with_barcode("999"),
                    4,
                )],
            )
            .unwrap();
        let gauze = &created[0];
        assert_eq!(gauze.unit, Unit::Box);
        assert_eq!(engine.lookup_by_barcode("999").unwrap().id, gauze.id);
        assert_eq!(engine.ledger().quantity(LedgerKey::location(gauze.id, l)).unwrap(), 4);
        assert_eq!(engine.ledger().quantity(LedgerKey::unassigned(gauze.id)).unwrap(), 0);

        let err = engine
            .check_in(
                &ctx,
                CheckInDestination::Location(l),
                vec![CheckInItem::new_supply(SupplyDraft::named("gauze"), 1)],
            )
            .unwrap_err();
        assert_eq!(err.kind(), "duplicate_name");
        assert_eq!(engine.catalog().supplies().unwrap().len(), 1);
    }

    #[test]
    fn check_in_to_operatory_bypasses_unassigned_pool() {
        let (engine, ctx) = setup();
        let s = supply(&engine, "Floss");
        let op = operatory(&engine, "Op A");
        engine
            .check_in(&ctx, CheckInDestination::Operatory(op), vec![CheckInItem::existing(s, 2)])
            .unwrap();

        let view = engine.supply_view(s).unwrap();
        assert_eq!(view.unassigned_quantity, 0);
        assert_eq!(view.total_assigned, 2);
    }

    #[test]
    fn failed_check_in_discards_supplies_it_created() {
        let engine = engine_with(FaultInjectingStore::new(InMemoryLedgerStore::new()));
        let ctx = SessionContext::new(UserId::new());
        let l = location(&engine, "Store");
        engine.ledger().store().fail_nth_write(1);

        let err = engine
            .check_in(
                &ctx,
                CheckInDestination::Location(l),
                vec![CheckInItem::new_supply(SupplyDraft::named("Bib"), 3)],
            )
            .unwrap_err();

        assert_eq!(err.kind(), "storage_error");
        assert!(engine.catalog().find_supply_by_name("bib").unwrap().is_none());
        assert!(engine.ledger().snapshot().unwrap().is_empty());
    }

    #[test]
    fn check_in_rejects_zero_quantity() {
        let (engine, ctx) = setup();
        let s = supply(&engine, "Floss");
        let err = engine
            .check_in(&ctx, CheckInDestination::Unassigned, vec![CheckInItem::existing(s, 0)])
            .unwrap_err();
        assert_eq!(err.kind(), "validation_error");
    }

    #[test]
    fn new_rows_inherit_the_supply_threshold() {
        let (engine, ctx) = setup();
        let s = engine
            .catalog()
            .create_supply(SupplyDraft::named("Needles").with_threshold(5))
            .unwrap()
            .id;
        let l = location(&engine, "Store");
        engine
            .check_in(&ctx, CheckInDestination::Location(l), vec![CheckInItem::existing(s, 1)])
            .unwrap();
        let row = engine.ledger().row(LedgerKey::location(s, l)).unwrap().unwrap();
        assert_eq!(row.low_stock_threshold, 5);
    }

    // -------------------------
    // Consume
    // -------------------------

    #[test]
    fn consume_logs_usage_with_cost_at_call_time() {
        let (engine, ctx) = setup();
        let s = engine
            .catalog()
            .create_supply(SupplyDraft::named("Anesthetic").with_cost(250))
            .unwrap()
            .id;
        let op = operatory(&engine, "Op A");
        let procedure = engine.catalog().create_procedure("Filling").unwrap().id;
        engine
            .check_in(&ctx, CheckInDestination::Operatory(op), vec![CheckInItem::existing(s, 5)])
            .unwrap();

        let first = engine
            .consume(&ctx, op, &[ConsumeItem::new(s, 2)], Some(procedure))
            .unwrap();
        engine
            .catalog()
            .update_supply(
                s,
                SupplyUpdate {
                    cost_per_unit: Some(300),
                    ..SupplyUpdate::default()
                },
            )
            .unwrap();
        let second = engine.consume(&ctx, op, &[ConsumeItem::new(s, 1)], None).unwrap();

        assert_eq!(first[0].unit_cost_snapshot, Some(250));
        assert_eq!(first[0].procedure_id, Some(procedure));
        assert_eq!(first[0].user_id, ctx.user_id());
        assert_eq!(second[0].unit_cost_snapshot, Some(300));
        assert_eq!(assigned(&engine, s, op), 2);

        let log = engine.usage_log().entries_for_operatory(op).unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].unit_cost_snapshot, Some(250));
    }

    #[test]
    fn consume_batch_is_all_or_nothing() {
        let (engine, ctx) = setup();
        let a = supply(&engine, "Gloves");
        let b = supply(&engine, "Gauze");
        let op = operatory(&engine, "Op A");
        engine
            .check_in(
                &ctx,
                CheckInDestination::Operatory(op),
                vec![CheckInItem::existing(a, 4), CheckInItem::existing(b, 1)],
            )
            .unwrap();

        let err = engine
            .consume(&ctx, op, &[ConsumeItem::new(a, 2), ConsumeItem::new(b, 2)], None)
            .unwrap_err();

        assert_eq!(err.kind(), "insufficient_stock");
        assert_eq!(assigned(&engine, a, op), 4);
        assert_eq!(assigned(&engine, b, op), 1);
        assert!(engine.usage_log().is_empty());
    }

    #[test]
    fn consume_of_unassigned_supply_is_item_not_found() {
        let (engine, ctx) = setup();
        let s = supply(&engine, "Gloves");
        let op = operatory(&engine, "Op A");

        let err = engine.consume(&ctx, op, &[ConsumeItem::new(s, 1)], None).unwrap_err();

        assert_eq!(
            err,
            StockError::ItemNotFoundInInventory {
                supply_id: s,
                operatory_id: op,
            }
        );
    }

    // -------------------------
    // Transfer / assignment edits
    // -------------------------

    #[test]
    fn transfer_guards() {
        let (engine, ctx) = setup();
        let s = supply(&engine, "Bibs");
        let l1 = location(&engine, "A");
        let l2 = location(&engine, "B");
        engine
            .check_in(&ctx, CheckInDestination::Location(l1), vec![CheckInItem::existing(s, 2)])
            .unwrap();

        assert_eq!(
            engine.transfer(&ctx, s, l1, l1, 1).unwrap_err(),
            StockError::SameLocation {
                location_id: l1.into()
            }
        );
        assert_eq!(
            engine.transfer(&ctx, s, l1, l2, 3).unwrap_err().kind(),
            "insufficient_stock"
        );
        assert_eq!(engine.ledger().rows_for_location(l2).unwrap().len(), 0);
    }

    #[test]
    fn unassign_returns_everything_and_deletes_row() {
        let (engine, ctx) = setup();
        let s = supply(&engine, "Gloves");
        let op = operatory(&engine, "Op A");
        stock_unassigned(&engine, &ctx, s, 5);
        engine.assign(&ctx, &[AssignItem::new(s, 4)], &[op]).unwrap();

        assert_eq!(engine.unassign(&ctx, s, op).unwrap(), 4);

        assert_eq!(engine.ledger().row(LedgerKey::operatory(s, op)).unwrap(), None);
        assert_eq!(engine.ledger().quantity(LedgerKey::unassigned(s)).unwrap(), 5);
        assert_eq!(
            engine.unassign(&ctx, s, op).unwrap_err().kind(),
            "item_not_found_in_inventory"
        );
    }

    #[test]
    fn set_assignment_quantity_moves_the_difference() {
        let (engine, ctx) = setup();
        let s = supply(&engine, "Gloves");
        let op = operatory(&engine, "Op A");
        stock_unassigned(&engine, &ctx, s, 10);

        let row = engine.set_assignment_quantity(&ctx, s, op, 7).unwrap();
        assert_eq!(row.quantity, 7);
        assert_eq!(engine.ledger().quantity(LedgerKey::unassigned(s)).unwrap(), 3);

        engine.set_assignment_quantity(&ctx, s, op, 2).unwrap();
        assert_eq!(engine.ledger().quantity(LedgerKey::unassigned(s)).unwrap(), 8);

        let err = engine.set_assignment_quantity(&ctx, s, op, 11).unwrap_err();
        assert_eq!(err.kind(), "insufficient_stock");
        assert_eq!(assigned(&engine, s, op), 2);
    }

    #[test]
    fn assign_rejects_when_total_exceeds_unassigned() {
        let (engine, ctx) = setup();
        let s = supply(&engine, "Gloves");
        let a = operatory(&engine, "Op A");
        let b = operatory(&engine, "Op B");
        stock_unassigned(&engine, &ctx, s, 5);

        let err = engine.assign(&ctx, &[AssignItem::new(s, 3)], &[a, b]).unwrap_err();

        match err {
            StockError::InsufficientStock {
                pool,
                available,
                requested,
                ..
            } => {
                assert_eq!(pool, PoolKind::Unassigned);
                assert_eq!(available, 5);
                assert_eq!(requested, 6);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(engine.supply_view(s).unwrap().total_assigned, 0);
    }

    #[test]
    fn remove_from_location_requires_empty_row() {
        let (engine, ctx) = setup();
        let s = supply(&engine, "Gloves");
        let l1 = location(&engine, "A");
        let l2 = location(&engine, "B");
        engine
            .check_in(&ctx, CheckInDestination::Location(l1), vec![CheckInItem::existing(s, 2)])
            .unwrap();

        let err = engine.remove_from_location(&ctx, s, l1).unwrap_err();
        assert_eq!(
            err,
            StockError::in_use(EntityKind::Supply, s, Dependency::LocationStock)
        );

        engine.transfer(&ctx, s, l1, l2, 2).unwrap();
        assert!(engine.remove_from_location(&ctx, s, l1).unwrap());
        assert!(!engine.remove_from_location(&ctx, s, l1).unwrap());
    }

    // -------------------------
    // Deletes
    // -------------------------

    #[test]
    fn delete_supply_names_the_blocking_pool() {
        let (engine, ctx) = setup();
        let s = supply(&engine, "Gloves");
        let l = location(&engine, "A");
        let op = operatory(&engine, "Op A");
        engine
            .check_in(&ctx, CheckInDestination::Location(l), vec![CheckInItem::existing(s, 2)])
            .unwrap();
        engine
            .check_in(&ctx, CheckInDestination::Operatory(op), vec![CheckInItem::existing(s, 1)])
            .unwrap();

        let err = engine.delete_supply(&ctx, s).unwrap_err();
        assert_eq!(
            err,
            StockError::in_use(EntityKind::Supply, s, Dependency::LocationStock)
        );

        engine.ledger().adjust_location_stock(s, l, -2).unwrap();
        let err = engine.delete_supply(&ctx, s).unwrap_err();
        assert_eq!(
            err,
            StockError::in_use(EntityKind::Supply, s, Dependency::OperatoryAssignment)
        );

        engine.consume(&ctx, op, &[ConsumeItem::new(s, 1)], None).unwrap();
        engine.delete_supply(&ctx, s).unwrap();
        assert!(engine.ledger().rows_for_supply(s).unwrap().is_empty());
        assert_eq!(engine.catalog().supply(s).unwrap_err().kind(), "not_found");
    }

    #[test]
    fn unassigned_stock_does_not_block_supply_delete() {
        let (engine, ctx) = setup();
        let s = supply(&engine, "Gloves");
        engine
            .check_in(&ctx, CheckInDestination::Unassigned, vec![CheckInItem::existing(s, 5)])
            .unwrap();

        let deleted = engine.delete_supply(&ctx, s).unwrap();

        assert_eq!(deleted.id, s);
        assert!(engine.ledger().rows_for_supply(s).unwrap().is_empty());
        assert_eq!(engine.catalog().supply(s).unwrap_err().kind(), "not_found");
    }

    #[test]
    fn blocked_supply_delete_keeps_unassigned_stock() {
        let (engine, ctx) = setup();
        let s = supply(&engine, "Gloves");
        let op = operatory(&engine, "Op A");
        engine
            .check_in(&ctx, CheckInDestination::Unassigned, vec![CheckInItem::existing(s, 5)])
            .unwrap();
        engine
            .check_in(&ctx, CheckInDestination::Operatory(op), vec![CheckInItem::existing(s, 1)])
            .unwrap();

        let err = engine.delete_supply(&ctx, s).unwrap_err();

        assert_eq!(
            err,
            StockError::in_use(EntityKind::Supply, s, Dependency::OperatoryAssignment)
        );
        assert_eq!(engine.ledger().quantity(LedgerKey::unassigned(s)).unwrap(), 5);
        assert!(engine.catalog().supply(s).is_ok());
    }

    #[test]
    fn delete_location_and_operatory_guards() {
        let (engine, ctx) = setup();
        let s = supply(&engine, "Gloves");
        let l = location(&engine, "A");
        let op = operatory(&engine, "Op A");
        let default = engine.catalog().default_location();

        assert_eq!(
            engine.delete_location(&ctx, default).unwrap_err(),
            StockError::in_use(EntityKind::Location, default, Dependency::Protected)
        );

        engine
            .check_in(&ctx, CheckInDestination::Location(l), vec![CheckInItem::existing(s, 1)])
            .unwrap();
        engine
            .check_in(&ctx, CheckInDestination::Operatory(op), vec![CheckInItem::existing(s, 1)])
            .unwrap();
        assert_eq!(
            engine.delete_location(&ctx, l).unwrap_err(),
            StockError::in_use(EntityKind::Location, l, Dependency::LocationStock)
        );
        assert_eq!(
            engine.delete_operatory(&ctx, op).unwrap_err(),
            StockError::in_use(EntityKind::Operatory, op, Dependency::OperatoryAssignment)
        );

        engine.ledger().adjust_location_stock(s, l, -1).unwrap();
        engine.unassign(&ctx, s, op).unwrap();
        engine.delete_location(&ctx, l).unwrap();
        engine.delete_operatory(&ctx, op).unwrap();
        assert!(engine.ledger().rows_for_location(l).unwrap().is_empty());
    }

    // -------------------------
    // Thresholds, suggestions, barcodes, events
    // -------------------------

    #[test]
    fn thresholds_route_to_catalog_or_ledger() {
        let (engine, ctx) = setup();
        let s = supply(&engine, "Gloves");
        let op = operatory(&engine, "Op A");

        engine
            .set_threshold(&ctx, ThresholdTarget::Global { supply_id: s }, 4)
            .unwrap();
        engine
            .set_threshold(
                &ctx,
                ThresholdTarget::Operatory {
                    supply_id: s,
                    operatory_id: op,
                },
                2,
            )
            .unwrap();

        assert_eq!(engine.catalog().supply(s).unwrap().low_stock_threshold, 4);
        assert_eq!(
            engine
                .ledger()
                .row(LedgerKey::operatory(s, op))
                .unwrap()
                .unwrap()
                .low_stock_threshold,
            2
        );
    }

    #[test]
    fn suggestions_are_clamped_to_assignment() {
        let (engine, ctx) = setup();
        let gloves = supply(&engine, "Gloves");
        let gauze = supply(&engine, "Gauze");
        let op = operatory(&engine, "Op A");
        let procedure = engine.catalog().create_procedure("Cleaning").unwrap().id;
        engine.catalog().set_procedure_supply(procedure, gloves, 2).unwrap();
        engine.catalog().set_procedure_supply(procedure, gauze, 4).unwrap();
        engine
            .check_in(&ctx, CheckInDestination::Operatory(op), vec![CheckInItem::existing(gauze, 3)])
            .unwrap();

        let mut suggestions = engine.suggested_quantities(op, procedure).unwrap();
        suggestions.sort_by_key(|s| s.default_quantity);

        assert_eq!(suggestions[0].supply_id, gloves);
        assert_eq!(suggestions[0].suggested, 0);
        assert_eq!(suggestions[1].supply_id, gauze);
        assert_eq!(suggestions[1].available, 3);
        assert_eq!(suggestions[1].suggested, 3);
    }

    #[test]
    fn create_with_barcode_requires_a_code() {
        let (engine, ctx) = setup();
        let err = engine
            .create_with_barcode(&ctx, SupplyDraft::named("Gauze"))
            .unwrap_err();
        assert_eq!(err.kind(), "validation_error");

        let created = engine
            .create_with_barcode(&ctx, SupplyDraft::named("Gauze").with_barcode("999"))
            .unwrap();
        let other = supply(&engine, "Gloves");
        assert_eq!(
            engine.assign_barcode(&ctx, other, "999").unwrap_err().kind(),
            "validation_error"
        );
        assert_eq!(engine.assign_barcode(&ctx, created.id, "999").unwrap().id, created.id);
    }

    #[test]
    fn events_follow_commits_in_sequence() {
        let (engine, ctx) = setup();
        let subscription = engine.bus().subscribe();
        let s = supply(&engine, "Gloves");
        let a = operatory(&engine, "Op A");
        stock_unassigned(&engine, &ctx, s, 2);
        let _ = engine.assign(&ctx, &[AssignItem::new(s, 5)], &[a]);
        engine.assign(&ctx, &[AssignItem::new(s, 1)], &[a]).unwrap();

        let first = subscription.try_recv().unwrap();
        let second = subscription.try_recv().unwrap();
        assert!(subscription.try_recv().is_err());

        assert_eq!(first.sequence_number(), 1);
        assert_eq!(first.event_type(), "stock.checked_in");
        assert_eq!(first.user_id(), ctx.user_id());
        assert_eq!(second.sequence_number(), 2);
        assert!(matches!(
            second.payload(),
            MovementEvent::Assigned { quantity: 1, .. }
        ));
        assert!(second.payload().changes_quantity());
    }

    // -------------------------
    // Properties
    // -------------------------

    #[derive(Debug, Clone)]
    enum AssignmentOp {
        Assign { op: usize, quantity: u64 },
        Unassign { op: usize },
        Set { op: usize, quantity: u64 },
    }

    fn assignment_op() -> impl Strategy<Value = AssignmentOp> {
        prop_oneof![
            (0usize..3, 0u64..12).prop_map(|(op, quantity)| AssignmentOp::Assign { op, quantity }),
            (0usize..3).prop_map(|op| AssignmentOp::Unassign { op }),
            (0usize..3, 0u64..20).prop_map(|(op, quantity)| AssignmentOp::Set { op, quantity }),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]

        #[test]
        fn assignment_moves_conserve_supply(ops in proptest::collection::vec(assignment_op(), 1..30)) {
            let (engine, ctx) = setup();
            let s = supply(&engine, "Gloves");
            let operatories = [
                operatory(&engine, "Op 1"),
                operatory(&engine, "Op 2"),
                operatory(&engine, "Op 3"),
            ];
            stock_unassigned(&engine, &ctx, s, 25);

            for step in ops {
                let before = engine.ledger().snapshot().unwrap();
                let result = match step {
                    AssignmentOp::Assign { op, quantity } => engine
                        .assign(&ctx, &[AssignItem::new(s, quantity)], &[operatories[op]])
                        .map(|_| ()),
                    AssignmentOp::Unassign { op } => engine.unassign(&ctx, s, operatories[op]).map(|_| ()),
                    AssignmentOp::Set { op, quantity } => engine
                        .set_assignment_quantity(&ctx, s, operatories[op], quantity)
                        .map(|_| ()),
                };

                let after = engine.ledger().snapshot().unwrap();
                prop_assert_eq!(after.unassigned(s) + after.total_assigned(s), 25);
                if result.is_err() {
                    prop_assert_eq!(after, before);
                }
            }
        }

        #[test]
        fn transfers_are_zero_sum(moves in proptest::collection::vec((any::<bool>(), 0u64..15), 1..30)) {
            let (engine, ctx) = setup();
            let s = supply(&engine, "Bibs");
            let a = location(&engine, "A");
            let b = location(&engine, "B");
            engine
                .check_in(&ctx, CheckInDestination::Location(a), vec![CheckInItem::existing(s, 12)])
                .unwrap();

            for (a_to_b, quantity) in moves {
                let (from, to) = if a_to_b { (a, b) } else { (b, a) };
                let before = engine.ledger().snapshot().unwrap();
                let result = engine.transfer(&ctx, s, from, to, quantity);
                let after = engine.ledger().snapshot().unwrap();

                prop_assert_eq!(
                    after.quantity(&LedgerKey::location(s, a)) + after.quantity(&LedgerKey::location(s, b)),
                    12
                );
                if let Err(err) = result {
                    prop_assert!(matches!(
                        err,
                        StockError::InsufficientStock { .. } | StockError::Validation(_)
                    ), "unexpected error variant: {:?}", err);
                    prop_assert_eq!(after, before);
                }
            }
        }
    }
}
