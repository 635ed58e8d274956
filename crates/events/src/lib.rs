//! Movement notifications: event trait, envelope, and pub/sub bus.
//!
//! The ledger is state-based, not event-sourced: events here are **notifications**
//! published after a commit so read-side consumers (the low-stock poller, HTTP
//! streams) can refresh. They are never replayed to rebuild quantities.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
