use std::collections::BTreeMap;
use std::sync::RwLock;
use std::sync::RwLockReadGuard;

use dentstock_core::{
    Dependency, EntityKind, LocationId, OperatoryId, PoolKind, StockError, StockResult, SupplyId,
};

use crate::key::LedgerKey;
use crate::locks::{KeyGuard, KeyLocks};
use crate::store::{LedgerStore, StockRow};

/// Authoritative quantities for every (supply, pool) row.
///
/// Mutations run inside a [`LedgerTxn`] that holds the locks of every key it may
/// touch. Transactions share a commit gate in read mode; [`StockLedger::snapshot`]
/// takes it in write mode, so a snapshot never contains half of a transaction.
#[derive(Debug)]
pub struct StockLedger<S> {
    store: S,
    locks: KeyLocks,
    gate: RwLock<()>,
}

impl<S> StockLedger<S>
where
    S: LedgerStore,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            locks: KeyLocks::new(),
            gate: RwLock::new(()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Open a transaction over `keys`, blocking until no other caller holds any of them.
    ///
    /// Every row the transaction reads or writes must be in `keys`.
    pub fn begin<I>(&self, keys: I) -> StockResult<LedgerTxn<'_, S>>
    where
        I: IntoIterator<Item = LedgerKey>,
    {
        let gate = self
            .gate
            .read()
            .map_err(|_| StockError::storage("ledger commit gate poisoned"))?;
        let guard = self.locks.acquire(keys)?;

        Ok(LedgerTxn {
            store: &self.store,
            journal: Vec::new(),
            committed: false,
            guard,
            _gate: gate,
        })
    }

    pub fn adjust_unassigned(&self, supply_id: SupplyId, delta: i64) -> StockResult<u64> {
        self.adjust_one(LedgerKey::unassigned(supply_id), delta)
    }

    /// Creates the row on the first positive adjustment.
    pub fn adjust_location_stock(
        &self,
        supply_id: SupplyId,
        location_id: LocationId,
        delta: i64,
    ) -> StockResult<u64> {
        self.adjust_one(LedgerKey::location(supply_id, location_id), delta)
    }

    pub fn adjust_operatory_assignment(
        &self,
        supply_id: SupplyId,
        operatory_id: OperatoryId,
        delta: i64,
    ) -> StockResult<u64> {
        self.adjust_one(LedgerKey::operatory(supply_id, operatory_id), delta)
    }

    /// Per-row threshold override for a location or operatory row.
    ///
    /// The unassigned pool's threshold is the supply's own and lives in the catalog.
    pub fn set_threshold(&self, key: LedgerKey, value: u64) -> StockResult<StockRow> {
        let mut txn = self.begin([key])?;
        let row = txn.set_threshold(key, value)?;
        txn.commit();
        Ok(row)
    }

    fn adjust_one(&self, key: LedgerKey, delta: i64) -> StockResult<u64> {
        let mut txn = self.begin([key])?;
        let quantity = txn.adjust(key, delta)?;
        txn.commit();
        Ok(quantity)
    }

    pub fn row(&self, key: LedgerKey) -> StockResult<Option<StockRow>> {
        let txn = self.begin([key])?;
        let row = txn.row(&key)?;
        txn.commit();
        Ok(row)
    }

    /// Absent rows read as zero.
    pub fn quantity(&self, key: LedgerKey) -> StockResult<u64> {
        Ok(self.row(key)?.map_or(0, |r| r.quantity))
    }

    /// Consistent copy of every row.
    pub fn snapshot(&self) -> StockResult<LedgerSnapshot> {
        let _exclusive = self
            .gate
            .write()
            .map_err(|_| StockError::storage("ledger commit gate poisoned"))?;
        let rows = self.store.scan()?.into_iter().collect();
        Ok(LedgerSnapshot { rows })
    }

    /// Sum of all operatory assignments of one supply.
    pub fn total_assigned(&self, supply_id: SupplyId) -> StockResult<u64> {
        Ok(self.snapshot()?.total_assigned(supply_id))
    }

    pub fn rows_for_supply(&self, supply_id: SupplyId) -> StockResult<Vec<(LedgerKey, StockRow)>> {
        Ok(self
            .snapshot()?
            .iter()
            .filter(|(k, _)| k.supply_id() == supply_id)
            .map(|(k, r)| (*k, *r))
            .collect())
    }

    pub fn rows_for_location(&self, location_id: LocationId) -> StockResult<Vec<(SupplyId, StockRow)>> {
        Ok(self
            .snapshot()?
            .iter()
            .filter_map(|(k, r)| match *k {
                LedgerKey::Location {
                    supply_id,
                    location_id: l,
                } if l == location_id => Some((supply_id, *r)),
                _ => None,
            })
            .collect())
    }

    pub fn rows_for_operatory(
        &self,
        operatory_id: OperatoryId,
    ) -> StockResult<Vec<(SupplyId, StockRow)>> {
        Ok(self
            .snapshot()?
            .iter()
            .filter_map(|(k, r)| match *k {
                LedgerKey::Operatory {
                    supply_id,
                    operatory_id: o,
                } if o == operatory_id => Some((supply_id, *r)),
                _ => None,
            })
            .collect())
    }
}

/// All-or-nothing unit of work over a locked key set.
///
/// Writes go straight to the store; the prior image of each touched row is
/// journaled and restored on drop unless [`LedgerTxn::commit`] was called.
#[must_use = "dropping a transaction without commit rolls it back"]
pub struct LedgerTxn<'a, S>
where
    S: LedgerStore,
{
    store: &'a S,
    journal: Vec<(LedgerKey, Option<StockRow>)>,
    committed: bool,
    guard: KeyGuard<'a>,
    _gate: RwLockReadGuard<'a, ()>,
}

impl<S> core::fmt::Debug for LedgerTxn<'_, S>
where
    S: LedgerStore,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LedgerTxn")
            .field("keys", &self.guard.keys().collect::<Vec<_>>())
            .field("journal", &self.journal.len())
            .field("committed", &self.committed)
            .finish()
    }
}

impl<S> LedgerTxn<'_, S>
where
    S: LedgerStore,
{
    fn check_held(&self, key: &LedgerKey) -> StockResult<()> {
        if self.guard.holds(key) {
            Ok(())
        } else {
            Err(StockError::storage(format!(
                "ledger key {key} is not locked by this transaction"
            )))
        }
    }

    pub fn row(&self, key: &LedgerKey) -> StockResult<Option<StockRow>> {
        self.check_held(key)?;
        self.store.load(key)
    }

    pub fn quantity(&self, key: &LedgerKey) -> StockResult<u64> {
        Ok(self.row(key)?.map_or(0, |r| r.quantity))
    }

    /// Signed adjustment; a new row starts with threshold 0.
    pub fn adjust(&mut self, key: LedgerKey, delta: i64) -> StockResult<u64> {
        self.apply(key, i128::from(delta), 0)
    }

    /// Add `quantity`; a row created by this call gets `threshold_if_new`.
    pub fn credit(&mut self, key: LedgerKey, quantity: u64, threshold_if_new: u64) -> StockResult<u64> {
        self.apply(key, i128::from(quantity), threshold_if_new)
    }

    /// Remove `quantity`, failing with `InsufficientStock` if the row holds less.
    pub fn debit(&mut self, key: LedgerKey, quantity: u64) -> StockResult<u64> {
        self.apply(key, -i128::from(quantity), 0)
    }

    fn apply(&mut self, key: LedgerKey, delta: i128, threshold_if_new: u64) -> StockResult<u64> {
        let prior = self.row(&key)?;
        let current = prior.map_or(0, |r| r.quantity);
        if delta == 0 {
            return Ok(current);
        }

        let next = i128::from(current) + delta;
        if next < 0 {
            return Err(StockError::InsufficientStock {
                pool: key.pool(),
                supply_id: key.supply_id(),
                pool_id: key.pool_id(),
                available: current,
                requested: u64::try_from(delta.unsigned_abs()).unwrap_or(u64::MAX),
            });
        }
        let next = u64::try_from(next)
            .map_err(|_| StockError::validation(format!("quantity overflow on {key}")))?;

        let row = match prior {
            Some(row) => StockRow {
                quantity: next,
                ..row
            },
            None => StockRow::new(next, threshold_if_new),
        };
        self.write(key, prior, Some(row))?;
        Ok(next)
    }

    /// Create a zero-quantity row if none exists; returns the current row.
    pub fn ensure_row(&mut self, key: LedgerKey, threshold: u64) -> StockResult<StockRow> {
        match self.row(&key)? {
            Some(row) => Ok(row),
            None => {
                let row = StockRow::new(0, threshold);
                self.write(key, None, Some(row))?;
                Ok(row)
            }
        }
    }

    pub fn set_threshold(&mut self, key: LedgerKey, value: u64) -> StockResult<StockRow> {
        if key.pool() == PoolKind::Unassigned {
            return Err(StockError::validation(
                "the unassigned pool uses the supply's own low-stock threshold",
            ));
        }
        let prior = self.row(&key)?;
        let row = StockRow {
            low_stock_threshold: value,
            ..prior.unwrap_or_default()
        };
        self.write(key, prior, Some(row))?;
        Ok(row)
    }

    /// Delete the row whatever its quantity; returns the quantity it held.
    pub fn drain_row(&mut self, key: LedgerKey) -> StockResult<u64> {
        match self.row(&key)? {
            Some(row) => {
                self.write(key, Some(row), None)?;
                Ok(row.quantity)
            }
            None => Ok(0),
        }
    }

    /// Delete the row only if it holds nothing. Returns whether a row existed.
    pub fn remove_empty_row(&mut self, key: LedgerKey) -> StockResult<bool> {
        match self.row(&key)? {
            None => Ok(false),
            Some(row) if row.quantity > 0 => Err(StockError::InUse {
                entity: EntityKind::Supply,
                id: key.supply_id().into(),
                blocking: blocking_dependency(key.pool()),
            }),
            Some(row) => {
                self.write(key, Some(row), None)?;
                Ok(true)
            }
        }
    }

    fn write(&mut self, key: LedgerKey, prior: Option<StockRow>, next: Option<StockRow>) -> StockResult<()> {
        // Only the first image of a row is the one to restore.
        if !self.journal.iter().any(|(k, _)| *k == key) {
            self.journal.push((key, prior));
        }
        match next {
            Some(row) => self.store.save(key, row),
            None => self.store.delete(&key),
        }
    }

    /// Keep every write made so far.
    pub fn commit(mut self) {
        self.committed = true;
        if !self.journal.is_empty() {
            tracing::debug!(rows = self.journal.len(), "ledger transaction committed");
        }
    }

    /// Restore every touched row now, reporting the first restore failure.
    pub fn rollback(mut self) -> StockResult<()> {
        let result = self.undo();
        self.committed = true;
        result
    }

    fn undo(&mut self) -> StockResult<()> {
        let mut first_err = None;
        while let Some((key, prior)) = self.journal.pop() {
            let restored = match prior {
                Some(row) => self.store.save(key, row),
                None => self.store.delete(&key),
            };
            if let Err(err) = restored {
                tracing::error!(key = %key, error = %err, "ledger rollback failed to restore row");
                first_err.get_or_insert(err);
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl<S> Drop for LedgerTxn<'_, S>
where
    S: LedgerStore,
{
    fn drop(&mut self) {
        if self.committed || self.journal.is_empty() {
            return;
        }
        let rows = self.journal.len();
        if self.undo().is_ok() {
            tracing::debug!(rows, "ledger transaction rolled back");
        }
    }
}

fn blocking_dependency(pool: PoolKind) -> Dependency {
    match pool {
        PoolKind::Unassigned => Dependency::UnassignedStock,
        PoolKind::Location => Dependency::LocationStock,
        PoolKind::Operatory => Dependency::OperatoryAssignment,
    }
}

/// Point-in-time copy of the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LedgerSnapshot {
    rows: BTreeMap<LedgerKey, StockRow>,
}

impl LedgerSnapshot {
    pub fn row(&self, key: &LedgerKey) -> Option<StockRow> {
        self.rows.get(key).copied()
    }

    pub fn quantity(&self, key: &LedgerKey) -> u64 {
        self.row(key).map_or(0, |r| r.quantity)
    }

    pub fn unassigned(&self, supply_id: SupplyId) -> u64 {
        self.quantity(&LedgerKey::unassigned(supply_id))
    }

    pub fn total_assigned(&self, supply_id: SupplyId) -> u64 {
        self.rows
            .iter()
            .filter(|(k, _)| k.pool() == PoolKind::Operatory && k.supply_id() == supply_id)
            .map(|(_, r)| r.quantity)
            .sum()
    }

    pub fn total_at_locations(&self, supply_id: SupplyId) -> u64 {
        self.rows
            .iter()
            .filter(|(k, _)| k.pool() == PoolKind::Location && k.supply_id() == supply_id)
            .map(|(_, r)| r.quantity)
            .sum()
    }

    /// First row of the supply, in key order, that still holds stock.
    pub fn first_blocking(&self, supply_id: SupplyId) -> Option<LedgerKey> {
        self.rows
            .iter()
            .find(|(k, r)| k.supply_id() == supply_id && r.quantity > 0)
            .map(|(k, _)| *k)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&LedgerKey, &StockRow)> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
