//! Store wrapper that fails a chosen write, for atomicity tests.

use std::sync::Mutex;

use dentstock_core::{StockError, StockResult};

use crate::key::LedgerKey;
use crate::store::{LedgerStore, StockRow};

/// Wraps a store and fails the N-th write (save or delete) exactly once.
///
/// After firing, the fault disarms so rollback writes go through.
#[derive(Debug)]
pub struct FaultInjectingStore<S> {
    inner: S,
    countdown: Mutex<Option<usize>>,
}

impl<S> FaultInjectingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            countdown: Mutex::new(None),
        }
    }

    /// Arm the fault: the `n`-th write from now (1-based) fails.
    pub fn fail_nth_write(&self, n: usize) {
        if let Ok(mut countdown) = self.countdown.lock() {
            *countdown = Some(n.max(1));
        }
    }

    pub fn disarm(&self) {
        if let Ok(mut countdown) = self.countdown.lock() {
            *countdown = None;
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn check_write(&self) -> StockResult<()> {
        let mut countdown = self
            .countdown
            .lock()
            .map_err(|_| StockError::storage("fault injector lock poisoned"))?;
        match countdown.as_mut() {
            Some(1) => {
                *countdown = None;
                Err(StockError::storage("injected write failure"))
            }
            Some(n) => {
                *n -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl<S: LedgerStore> LedgerStore for FaultInjectingStore<S> {
    fn load(&self, key: &LedgerKey) -> StockResult<Option<StockRow>> {
        self.inner.load(key)
    }

    fn save(&self, key: LedgerKey, row: StockRow) -> StockResult<()> {
        self.check_write()?;
        self.inner.save(key, row)
    }

    fn delete(&self, key: &LedgerKey) -> StockResult<()> {
        self.check_write()?;
        self.inner.delete(key)
    }

    fn scan(&self) -> StockResult<Vec<(LedgerKey, StockRow)>> {
        self.inner.scan()
    }
}
