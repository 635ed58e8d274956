//! Stock ledger: authoritative quantities for the three supply pools.
//!
//! Every quantity change in the system goes through this crate:
//!
//! - `StockLedger` exposes single-row primitives (`adjust_unassigned`,
//!   `adjust_location_stock`, `adjust_operatory_assignment`, `set_threshold`) and
//!   multi-row transactions (`begin`) that either commit as a whole or roll back.
//! - Calls touching the same `(supply, pool)` key are serialized by `KeyLocks`;
//!   disjoint keys proceed concurrently.
//! - `UsageLog` is the append-only audit trail written by consumption.

pub mod key;
pub mod ledger;
pub mod locks;
pub mod store;
pub mod usage_log;

#[cfg(any(test, feature = "test-helpers"))]
pub mod fault;

pub use key::LedgerKey;
pub use ledger::{LedgerSnapshot, LedgerTxn, StockLedger};
pub use locks::{KeyGuard, KeyLocks};
pub use store::{InMemoryLedgerStore, LedgerStore, StockRow};
pub use usage_log::{InMemoryUsageLog, NewUsage, UsageAction, UsageLog, UsageLogEntry};

#[cfg(any(test, feature = "test-helpers"))]
pub use fault::FaultInjectingStore;
