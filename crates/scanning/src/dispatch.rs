use std::sync::Arc;

use dentstock_catalog::{Supply, SupplyDraft};
use dentstock_core::{SessionContext, StockError, StockResult, SupplyId};
use dentstock_events::{EventBus, EventEnvelope};
use dentstock_ledger::{LedgerStore, UsageLog};
use dentstock_movement::{
    AssignItem, CheckInDestination, CheckInItem, ConsumeItem, MovementEngine, MovementEvent,
};

use crate::session::{ScanMode, UndoToken};

/// What a scan session needs from the rest of the system.
///
/// Implemented by `MovementEngine`; tests may substitute their own.
pub trait ScanDispatcher {
    /// Resolve a cleaned code. A miss is `NotFoundInInventory`.
    fn lookup(&self, code: &str) -> StockResult<Supply>;

    /// Apply the movement `mode` describes for `quantity` of `supply_id`.
    fn dispatch(
        &self,
        ctx: &SessionContext,
        mode: &ScanMode,
        supply_id: SupplyId,
        quantity: u64,
    ) -> StockResult<()>;

    fn assign_barcode(&self, ctx: &SessionContext, supply_id: SupplyId, code: &str)
    -> StockResult<Supply>;

    /// Create a supply from `draft` and check `quantity` of it in to `destination`
    /// as one call. A rejected check-in leaves no supply behind.
    fn create_and_check_in(
        &self,
        ctx: &SessionContext,
        draft: SupplyDraft,
        destination: CheckInDestination,
        quantity: u64,
    ) -> StockResult<Supply>;

    /// Issue the exact inverse of a completed dispatch as a new, independent mutation.
    fn compensate(&self, ctx: &SessionContext, token: &UndoToken) -> StockResult<()>;
}

impl<D> ScanDispatcher for &D
where
    D: ScanDispatcher + ?Sized,
{
    fn lookup(&self, code: &str) -> StockResult<Supply> {
        (**self).lookup(code)
    }

    fn dispatch(
        &self,
        ctx: &SessionContext,
        mode: &ScanMode,
        supply_id: SupplyId,
        quantity: u64,
    ) -> StockResult<()> {
        (**self).dispatch(ctx, mode, supply_id, quantity)
    }

    fn assign_barcode(
        &self,
        ctx: &SessionContext,
        supply_id: SupplyId,
        code: &str,
    ) -> StockResult<Supply> {
        (**self).assign_barcode(ctx, supply_id, code)
    }

    fn create_and_check_in(
        &self,
        ctx: &SessionContext,
        draft: SupplyDraft,
        destination: CheckInDestination,
        quantity: u64,
    ) -> StockResult<Supply> {
        (**self).create_and_check_in(ctx, draft, destination, quantity)
    }

    fn compensate(&self, ctx: &SessionContext, token: &UndoToken) -> StockResult<()> {
        (**self).compensate(ctx, token)
    }
}

impl<D> ScanDispatcher for Arc<D>
where
    D: ScanDispatcher + ?Sized,
{
    fn lookup(&self, code: &str) -> StockResult<Supply> {
        (**self).lookup(code)
    }

    fn dispatch(
        &self,
        ctx: &SessionContext,
        mode: &ScanMode,
        supply_id: SupplyId,
        quantity: u64,
    ) -> StockResult<()> {
        (**self).dispatch(ctx, mode, supply_id, quantity)
    }

    fn assign_barcode(
        &self,
        ctx: &SessionContext,
        supply_id: SupplyId,
        code: &str,
    ) -> StockResult<Supply> {
        (**self).assign_barcode(ctx, supply_id, code)
    }

    fn create_and_check_in(
        &self,
        ctx: &SessionContext,
        draft: SupplyDraft,
        destination: CheckInDestination,
        quantity: u64,
    ) -> StockResult<Supply> {
        (**self).create_and_check_in(ctx, draft, destination, quantity)
    }

    fn compensate(&self, ctx: &SessionContext, token: &UndoToken) -> StockResult<()> {
        (**self).compensate(ctx, token)
    }
}

impl<S, L, B> ScanDispatcher for MovementEngine<S, L, B>
where
    S: LedgerStore,
    L: UsageLog,
    B: EventBus<EventEnvelope<MovementEvent>>,
{
    fn lookup(&self, code: &str) -> StockResult<Supply> {
        self.lookup_by_barcode(code)
    }

    fn dispatch(
        &self,
        ctx: &SessionContext,
        mode: &ScanMode,
        supply_id: SupplyId,
        quantity: u64,
    ) -> StockResult<()> {
        match *mode {
            ScanMode::CheckIn(destination) => self
                .check_in(ctx, destination, vec![CheckInItem::existing(supply_id, quantity)])
                .map(|_| ()),
            ScanMode::AssignToOperatory(operatory_id) => self
                .assign(ctx, &[AssignItem::new(supply_id, quantity)], &[operatory_id])
                .map(|_| ()),
            ScanMode::Consume {
                operatory_id,
                procedure_id,
            } => self
                .consume(
                    ctx,
                    operatory_id,
                    &[ConsumeItem::new(supply_id, quantity)],
                    procedure_id,
                )
                .map(|_| ()),
        }
    }

    fn assign_barcode(
        &self,
        ctx: &SessionContext,
        supply_id: SupplyId,
        code: &str,
    ) -> StockResult<Supply> {
        MovementEngine::assign_barcode(self, ctx, supply_id, code)
    }

    fn create_and_check_in(
        &self,
        ctx: &SessionContext,
        draft: SupplyDraft,
        destination: CheckInDestination,
        quantity: u64,
    ) -> StockResult<Supply> {
        if draft.barcode.as_deref().is_none_or(|c| c.trim().is_empty()) {
            return Err(StockError::validation("a barcode is required"));
        }
        self.check_in(ctx, destination, vec![CheckInItem::new_supply(draft, quantity)])?
            .into_iter()
            .next()
            .ok_or_else(|| StockError::validation("check-in returned no supply"))
    }

    fn compensate(&self, ctx: &SessionContext, token: &UndoToken) -> StockResult<()> {
        let adjustments = token.inverse()?;
        let mut txn = self.ledger().begin(adjustments.iter().map(|(key, _)| *key))?;
        for (key, delta) in &adjustments {
            txn.adjust(*key, *delta)?;
        }
        txn.commit();
        tracing::info!(
            user = %ctx.user_id(),
            supply = %token.supply_id,
            quantity = token.quantity,
            "scan undone"
        );
        Ok(())
    }
}
