use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use dentstock_core::{StockError, StockResult};

use crate::key::LedgerKey;

/// One ledger row: a non-negative quantity and its low-stock threshold.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StockRow {
    pub quantity: u64,
    pub low_stock_threshold: u64,
}

impl StockRow {
    pub fn new(quantity: u64, low_stock_threshold: u64) -> Self {
        Self {
            quantity,
            low_stock_threshold,
        }
    }
}

/// Row storage behind the ledger.
///
/// Implementations only need single-row atomicity; multi-row atomicity, locking
/// and rollback are the ledger's job. Errors are infrastructure failures
/// (`StockError::Storage`).
pub trait LedgerStore: Send + Sync {
    fn load(&self, key: &LedgerKey) -> StockResult<Option<StockRow>>;
    fn save(&self, key: LedgerKey, row: StockRow) -> StockResult<()>;
    fn delete(&self, key: &LedgerKey) -> StockResult<()>;
    /// All rows, ordered by key.
    fn scan(&self) -> StockResult<Vec<(LedgerKey, StockRow)>>;
}

impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore + ?Sized,
{
    fn load(&self, key: &LedgerKey) -> StockResult<Option<StockRow>> {
        (**self).load(key)
    }

    fn save(&self, key: LedgerKey, row: StockRow) -> StockResult<()> {
        (**self).save(key, row)
    }

    fn delete(&self, key: &LedgerKey) -> StockResult<()> {
        (**self).delete(key)
    }

    fn scan(&self) -> StockResult<Vec<(LedgerKey, StockRow)>> {
        (**self).scan()
    }
}

/// In-memory row store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    inner: RwLock<BTreeMap<LedgerKey, StockRow>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> StockError {
    StockError::storage("ledger store lock poisoned")
}

impl LedgerStore for InMemoryLedgerStore {
    fn load(&self, key: &LedgerKey) -> StockResult<Option<StockRow>> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.get(key).copied())
    }

    fn save(&self, key: LedgerKey, row: StockRow) -> StockResult<()> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        map.insert(key, row);
        Ok(())
    }

    fn delete(&self, key: &LedgerKey) -> StockResult<()> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        map.remove(key);
        Ok(())
    }

    fn scan(&self) -> StockResult<Vec<(LedgerKey, StockRow)>> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.iter().map(|(k, v)| (*k, *v)).collect())
    }
}
