use std::collections::VecDeque;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::debug;

use dentstock_catalog::SupplyDraft;
use dentstock_core::{
    OperatoryId, ProcedureId, SessionContext, StockError, StockResult, SupplyId,
};
use dentstock_ledger::LedgerKey;
use dentstock_movement::CheckInDestination;

use crate::camera::CameraGate;
use crate::config::ScannerConfig;
use crate::dispatch::ScanDispatcher;
use crate::usb::UsbKeyBuffer;

/// Movement applied to each resolved scan.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "target", rename_all = "snake_case")]
pub enum ScanMode {
    /// Add mode: check the scanned supply in.
    CheckIn(CheckInDestination),
    /// Add mode: move from the unassigned pool into one operatory.
    AssignToOperatory(OperatoryId),
    Consume {
        operatory_id: OperatoryId,
        procedure_id: Option<ProcedureId>,
    },
}

impl ScanMode {
    /// Add modes enter `NotFound` recovery on a miss; consume mode does not.
    pub fn is_add(&self) -> bool {
        !matches!(self, ScanMode::Consume { .. })
    }
}

/// Everything needed to issue the exact inverse of one dispatch.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoToken {
    pub mode: ScanMode,
    pub supply_id: SupplyId,
    pub quantity: u64,
}

impl UndoToken {
    /// Signed ledger adjustments that reverse the dispatch.
    pub fn inverse(&self) -> StockResult<Vec<(LedgerKey, i64)>> {
        let quantity = i64::try_from(self.quantity)
            .map_err(|_| StockError::validation("quantity too large to undo"))?;
        let supply_id = self.supply_id;
        Ok(match self.mode {
            ScanMode::CheckIn(destination) => vec![(destination.ledger_key(supply_id), -quantity)],
            ScanMode::AssignToOperatory(operatory_id) => vec![
                (LedgerKey::operatory(supply_id, operatory_id), -quantity),
                (LedgerKey::unassigned(supply_id), quantity),
            ],
            ScanMode::Consume { operatory_id, .. } => {
                vec![(LedgerKey::operatory(supply_id, operatory_id), quantity)]
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ScanState {
    Idle,
    Buffering,
    Resolving {
        code: String,
    },
    Dispatching {
        code: String,
        supply_id: SupplyId,
    },
    /// Waiting for the operator to assign, create or cancel.
    NotFound {
        code: String,
        pending_quantity: u64,
    },
}

/// Result of processing one flushed code or one recovery action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Dispatched {
        code: String,
        supply_id: SupplyId,
        quantity: u64,
        undo: UndoToken,
    },
    /// Add-mode miss; the session is now in `NotFound`.
    NotFound { code: String },
    /// Consume-mode miss, surfaced directly.
    Missed { code: String, error: StockError },
    /// Lookup or dispatch failed; nothing was applied.
    Failed { code: String, error: StockError },
    BarcodeAssigned { code: String, supply_id: SupplyId },
    Created { code: String, supply_id: SupplyId },
    Cancelled { code: String },
}

/// One scanner instance: input buffers, a FIFO of flushed codes and the
/// resolution state machine.
///
/// Only one code is ever resolving or dispatching; codes flushed meanwhile, or
/// while a `NotFound` recovery is open, wait in the queue and run in scan order.
#[derive(Debug)]
pub struct ScanSession<D> {
    dispatcher: D,
    ctx: SessionContext,
    mode: ScanMode,
    quantity: u64,
    state: ScanState,
    queue: VecDeque<String>,
    outcomes: Vec<ScanOutcome>,
    usb: UsbKeyBuffer,
    camera: CameraGate,
}

impl<D> ScanSession<D>
where
    D: ScanDispatcher,
{
    pub fn new(dispatcher: D, ctx: SessionContext, mode: ScanMode, config: ScannerConfig) -> Self {
        Self {
            dispatcher,
            ctx,
            mode,
            quantity: 1,
            state: ScanState::Idle,
            queue: VecDeque::new(),
            outcomes: Vec::new(),
            camera: CameraGate::new(&config),
            usb: UsbKeyBuffer::new(config),
        }
    }

    pub fn state(&self) -> &ScanState {
        &self.state
    }

    pub fn mode(&self) -> &ScanMode {
        &self.mode
    }

    /// Code awaiting a recovery decision, if any.
    pub fn pending_not_found(&self) -> Option<&str> {
        match &self.state {
            ScanState::NotFound { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Flushed codes waiting behind the current one.
    pub fn queued(&self) -> &VecDeque<String> {
        &self.queue
    }

    /// Every outcome so far, oldest first.
    pub fn outcomes(&self) -> &[ScanOutcome] {
        &self.outcomes
    }

    pub fn set_mode(&mut self, mode: ScanMode) {
        self.mode = mode;
    }

    /// Quantity applied per scan (1 in fast mode).
    pub fn set_quantity(&mut self, quantity: u64) -> StockResult<()> {
        if quantity == 0 {
            return Err(StockError::validation("scan quantity must be greater than zero"));
        }
        self.quantity = quantity;
        Ok(())
    }

    // -------------------------
    // Input
    // -------------------------

    pub fn on_key(&mut self, key: &str, now: Instant) -> Vec<ScanOutcome> {
        let flushed = self.usb.on_key(key, now);
        self.after_usb(flushed)
    }

    /// Drive the inactivity timeout.
    pub fn poll(&mut self, now: Instant) -> Vec<ScanOutcome> {
        let flushed = self.usb.poll(now);
        self.after_usb(flushed)
    }

    pub fn on_frame(&mut self, raw: &str) -> Vec<ScanOutcome> {
        match self.camera.on_detection(raw) {
            Some(code) => self.submit(code),
            None => Vec::new(),
        }
    }

    /// Resume the camera after an accepted detection.
    pub fn scan_next(&mut self) {
        self.camera.scan_next();
    }

    /// Resume the camera and allow the last code to be read again.
    pub fn reopen_camera(&mut self) {
        self.camera.reopen();
    }

    /// Queue a cleaned code and process the queue.
    pub fn submit(&mut self, code: String) -> Vec<ScanOutcome> {
        self.queue.push_back(code);
        self.drain()
    }

    fn after_usb(&mut self, flushed: Option<String>) -> Vec<ScanOutcome> {
        if let Some(code) = flushed {
            if self.state == ScanState::Buffering {
                self.transition(ScanState::Idle);
            }
            let outcomes = self.submit(code);
            self.mark_buffering();
            return outcomes;
        }
        if self.usb.is_empty() {
            if self.state == ScanState::Buffering {
                self.transition(ScanState::Idle);
            }
        } else {
            self.mark_buffering();
        }
        Vec::new()
    }

    fn mark_buffering(&mut self) {
        if self.state == ScanState::Idle && !self.usb.is_empty() {
            self.transition(ScanState::Buffering);
        }
    }

    // -------------------------
    // Resolution
    // -------------------------

    fn drain(&mut self) -> Vec<ScanOutcome> {
        let mut produced = Vec::new();
        while matches!(self.state, ScanState::Idle | ScanState::Buffering) {
            let Some(code) = self.queue.pop_front() else {
                break;
            };
            let outcome = self.resolve(code);
            self.record(&mut produced, outcome);
        }
        produced
    }

    fn resolve(&mut self, code: String) -> ScanOutcome {
        self.transition(ScanState::Resolving { code: code.clone() });

        let supply = match self.dispatcher.lookup(&code) {
            Ok(supply) => supply,
            Err(StockError::NotFoundInInventory { .. }) if self.mode.is_add() => {
                self.transition(ScanState::NotFound {
                    code: code.clone(),
                    pending_quantity: self.quantity,
                });
                return ScanOutcome::NotFound { code };
            }
            Err(error @ StockError::NotFoundInInventory { .. }) => {
                self.transition(ScanState::Idle);
                return ScanOutcome::Missed { code, error };
            }
            Err(error) => {
                self.transition(ScanState::Idle);
                return ScanOutcome::Failed { code, error };
            }
        };

        self.transition(ScanState::Dispatching {
            code: code.clone(),
            supply_id: supply.id,
        });
        let outcome = self.apply(code, supply.id, self.quantity);
        self.transition(ScanState::Idle);
        outcome
    }

    fn apply(&self, code: String, supply_id: SupplyId, quantity: u64) -> ScanOutcome {
        match self
            .dispatcher
            .dispatch(&self.ctx, &self.mode, supply_id, quantity)
        {
            Ok(()) => ScanOutcome::Dispatched {
                code,
                supply_id,
                quantity,
                undo: UndoToken {
                    mode: self.mode,
                    supply_id,
                    quantity,
                },
            },
            Err(error) => ScanOutcome::Failed { code, error },
        }
    }

    // -------------------------
    // NotFound recovery
    // -------------------------

    /// Bind the pending code to an existing supply. No quantity changes.
    ///
    /// On failure the session stays in `NotFound` so the operator can choose again.
    pub fn assign_to_existing(&mut self, supply_id: SupplyId) -> StockResult<Vec<ScanOutcome>> {
        let (code, _) = self.pending()?;
        self.dispatcher.assign_barcode(&self.ctx, supply_id, &code)?;

        let mut produced = Vec::new();
        self.transition(ScanState::Idle);
        self.record(&mut produced, ScanOutcome::BarcodeAssigned { code, supply_id });
        produced.extend(self.drain());
        Ok(produced)
    }

    /// Create a supply carrying the pending code and check in the pending quantity.
    ///
    /// Check-in modes use their own destination; assign mode has nothing to assign
    /// from yet, so the new stock lands in the unassigned pool. On failure nothing
    /// is created and the session stays in `NotFound`.
    pub fn create_new(&mut self, draft: SupplyDraft) -> StockResult<Vec<ScanOutcome>> {
        let (code, pending_quantity) = self.pending()?;
        let destination = match self.mode {
            ScanMode::CheckIn(destination) => destination,
            ScanMode::AssignToOperatory(_) | ScanMode::Consume { .. } => {
                CheckInDestination::Unassigned
            }
        };
        let supply = self.dispatcher.create_and_check_in(
            &self.ctx,
            draft.with_barcode(code.clone()),
            destination,
            pending_quantity,
        )?;

        let mut produced = Vec::new();
        self.transition(ScanState::Idle);
        self.record(
            &mut produced,
            ScanOutcome::Created {
                code: code.clone(),
                supply_id: supply.id,
            },
        );
        self.record(
            &mut produced,
            ScanOutcome::Dispatched {
                code,
                supply_id: supply.id,
                quantity: pending_quantity,
                undo: UndoToken {
                    mode: ScanMode::CheckIn(destination),
                    supply_id: supply.id,
                    quantity: pending_quantity,
                },
            },
        );
        produced.extend(self.drain());
        Ok(produced)
    }

    /// Leave recovery without changing anything.
    pub fn cancel(&mut self) -> Vec<ScanOutcome> {
        let mut produced = Vec::new();
        if let ScanState::NotFound { code, .. } = &self.state {
            let code = code.clone();
            self.transition(ScanState::Idle);
            self.record(&mut produced, ScanOutcome::Cancelled { code });
        }
        produced.extend(self.drain());
        produced
    }

    /// Issue the inverse of a completed dispatch.
    pub fn undo(&self, token: &UndoToken) -> StockResult<()> {
        self.dispatcher.compensate(&self.ctx, token)
    }

    fn pending(&self) -> StockResult<(String, u64)> {
        match &self.state {
            ScanState::NotFound {
                code,
                pending_quantity,
            } => Ok((code.clone(), *pending_quantity)),
            _ => Err(StockError::validation("no unknown barcode is awaiting a decision")),
        }
    }

    fn record(&mut self, produced: &mut Vec<ScanOutcome>, outcome: ScanOutcome) {
        self.outcomes.push(outcome.clone());
        produced.push(outcome);
    }

    fn transition(&mut self, next: ScanState) {
        debug!(from = ?self.state, to = ?next, "scan state");
        self.state = next;
    }
}
