//! Movement engine: the compound, invariant-preserving stock operations.
//!
//! Every operation here is one atomic call against the ledger. It validates its
//! input, locks the ledger rows it will touch, applies all adjustments inside a
//! single ledger transaction, and publishes a `MovementEvent` once the
//! transaction has committed.
//!
//! ```text
//! Validating ──guard ok──▶ Applying ──all writes ok──▶ Committed ──▶ publish
//!     │                        │
//!     └──guard failed──▶ Rejected(reason) ◀──write failed (rolled back)
//! ```
//!
//! Two quantity axes are kept separate: location stock (stock-room tracking,
//! conserved under transfer) and the unassigned/operatory pair (conserved under
//! assign, unassign and assignment edits).

pub mod engine;
pub mod event;
pub mod model;

mod integration_tests;

pub use engine::MovementEngine;
pub use event::MovementEvent;
pub use model::{
    AssignItem, CheckInDestination, CheckInItem, ConsumeItem, OperatoryAssignment, Suggestion,
    SupplyRef, SupplyView, ThresholdTarget, TransferOutcome,
};
