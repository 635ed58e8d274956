//! Barcode capture: turns keystrokes or camera detections into validated stock movements.
//!
//! ```text
//! Idle ──key──▶ Buffering ──flush──▶ Resolving ──hit──▶ Dispatching ──▶ Idle
//!                   │                    │
//!                   └─too short──▶ Idle  └─miss (add mode)──▶ NotFound
//!                                                              ├─ assign to existing ─▶ Idle
//!                                                              ├─ create new + check in ─▶ Idle
//!                                                              └─ cancel ─▶ Idle
//! ```
//!
//! Input sources (`UsbKeyBuffer`, `CameraGate`) are plain state objects that take
//! the current `Instant` from the caller, so timing is deterministic under test.
//! A `ScanSession` owns one of each and resolves flushed codes strictly in order.

pub mod camera;
pub mod clean;
pub mod config;
pub mod dispatch;
pub mod session;
pub mod usb;

pub use camera::CameraGate;
pub use clean::{accept_code, clean_barcode};
pub use config::ScannerConfig;
pub use dispatch::ScanDispatcher;
pub use session::{ScanMode, ScanOutcome, ScanSession, ScanState, UndoToken};
pub use usb::UsbKeyBuffer;
