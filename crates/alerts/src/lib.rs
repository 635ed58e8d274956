//! Low-stock alerts.
//!
//! - `LowStockEvaluator` is a pure read over the ledger and catalog: every
//!   location or operatory row whose quantity is at or below its threshold.
//! - `LowStockPoller` re-runs an evaluation on a fixed interval while its consumer
//!   is visible, and shortly after any commit that changed a quantity.

pub mod config;
pub mod evaluator;
pub mod model;
pub mod poller;

pub use config::PollerConfig;
pub use evaluator::{AlertSource, LowStockEvaluator, group_by_supplier};
pub use model::{Alert, SupplierAlerts, UNKNOWN_SUPPLIER};
pub use poller::{AlertSink, InMemoryAlertSink, LowStockPoller, PollerHandle};
