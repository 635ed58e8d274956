use std::collections::{BTreeSet, HashSet};
use std::sync::{Condvar, Mutex};

use dentstock_core::{StockError, StockResult};

use crate::key::LedgerKey;

/// Per-key mutual exclusion for ledger rows.
///
/// A caller acquires every key it will touch in one step; it waits until none
/// of them is held by anyone else. Because no caller ever holds a subset while
/// waiting for the rest, lock-order deadlocks cannot happen.
#[derive(Debug, Default)]
pub struct KeyLocks {
    held: Mutex<HashSet<LedgerKey>>,
    released: Condvar,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until all `keys` are free, then hold them until the guard drops.
    pub fn acquire<I>(&self, keys: I) -> StockResult<KeyGuard<'_>>
    where
        I: IntoIterator<Item = LedgerKey>,
    {
        let keys: BTreeSet<LedgerKey> = keys.into_iter().collect();

        let mut held = self
            .held
            .lock()
            .map_err(|_| StockError::storage("ledger key locks poisoned"))?;
        while keys.iter().any(|k| held.contains(k)) {
            held = self
                .released
                .wait(held)
                .map_err(|_| StockError::storage("ledger key locks poisoned"))?;
        }
        held.extend(keys.iter().copied());

        Ok(KeyGuard { locks: self, keys })
    }

    /// Number of keys currently held (diagnostics/tests).
    pub fn held_count(&self) -> usize {
        self.held.lock().map(|h| h.len()).unwrap_or_else(|e| e.into_inner().len())
    }
}

/// Releases its keys on drop.
#[derive(Debug)]
pub struct KeyGuard<'a> {
    locks: &'a KeyLocks,
    keys: BTreeSet<LedgerKey>,
}

impl KeyGuard<'_> {
    pub fn holds(&self, key: &LedgerKey) -> bool {
        self.keys.contains(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &LedgerKey> {
        self.keys.iter()
    }
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        // Release even if another holder panicked; the set only tracks ownership.
        let mut held = self.locks.held.lock().unwrap_or_else(|e| e.into_inner());
        for key in &self.keys {
            held.remove(key);
        }
        drop(held);
        self.locks.released.notify_all();
    }
}
