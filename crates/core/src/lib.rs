//! `dentstock-core` — shared building blocks for the supply ledger.
//!
//! This crate contains **pure domain** primitives (no storage, no IO): identifiers,
//! the error taxonomy every engine call reports through, and the explicit session
//! context that replaces any notion of a process-global "current user".

pub mod context;
pub mod entity;
pub mod error;
pub mod id;
pub mod pool;

pub use context::SessionContext;
pub use entity::Entity;
pub use error::{Dependency, EntityKind, StockError, StockResult};
pub use id::{
    CategoryId, LocationId, OperatoryId, ProcedureId, SupplierId, SupplyId, UserId,
};
pub use pool::PoolKind;
