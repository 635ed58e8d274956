use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, mpsc};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use dentstock_events::{EventEnvelope, Subscription};
use dentstock_movement::MovementEvent;

use crate::config::PollerConfig;
use crate::evaluator::{AlertSource, group_by_supplier};
use crate::model::SupplierAlerts;

/// Receives each successful evaluation, already grouped by supplier.
pub trait AlertSink: Send + Sync + 'static {
    fn publish(&self, groups: Vec<SupplierAlerts>);
}

/// Keeps the latest evaluation; for tests and the HTTP surface.
#[derive(Debug, Default)]
pub struct InMemoryAlertSink {
    latest: Mutex<Option<Vec<SupplierAlerts>>>,
    refreshes: AtomicUsize,
}

impl InMemoryAlertSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest(&self) -> Option<Vec<SupplierAlerts>> {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of evaluations published so far.
    pub fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

impl AlertSink for InMemoryAlertSink {
    fn publish(&self, groups: Vec<SupplierAlerts>) {
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner) = Some(groups);
        self.refreshes.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug)]
enum Control {
    Visible(bool),
    Shutdown,
}

/// Handle for a running poller thread.
///
/// Dropping the handle stops the thread.
#[derive(Debug)]
pub struct PollerHandle {
    control: mpsc::Sender<Control>,
    trigger: mpsc::SyncSender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl PollerHandle {
    /// Ask for an evaluation after the settle delay.
    ///
    /// Requests are coalesced: if one is already pending this is a no-op.
    pub fn request_refresh(&self) {
        let _ = self.trigger.try_send(());
    }

    /// Pause (hidden) or resume (visible). Resuming evaluates right away.
    pub fn set_visible(&self, visible: bool) {
        let _ = self.control.send(Control::Visible(visible));
    }

    /// Stop the thread and wait for it to exit.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let _ = self.control.send(Control::Shutdown);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Cancellable, visibility-aware low-stock refresh loop.
#[derive(Debug, Clone, Default)]
pub struct LowStockPoller {
    config: PollerConfig,
}

impl LowStockPoller {
    pub fn new(config: PollerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Spawn the poller thread.
    ///
    /// - Evaluates once on start, then every `interval` while visible.
    /// - `request_refresh()` and, when `events` is given, every committed movement
    ///   that can change an alert schedule an evaluation `settle_delay` later.
    /// - Evaluation failures are logged and never stop the loop.
    pub fn spawn<A, K>(
        &self,
        name: &'static str,
        source: Arc<A>,
        sink: Arc<K>,
        events: Option<Subscription<EventEnvelope<MovementEvent>>>,
    ) -> std::io::Result<PollerHandle>
    where
        A: AlertSource,
        K: AlertSink,
    {
        let (control_tx, control_rx) = mpsc::channel::<Control>();
        let (trigger_tx, trigger_rx) = mpsc::sync_channel::<()>(1);

        let config = self.config.clone();
        let join = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                poll_loop(
                    name,
                    config,
                    control_rx,
                    trigger_rx,
                    events,
                    source.as_ref(),
                    sink.as_ref(),
                )
            })?;

        Ok(PollerHandle {
            control: control_tx,
            trigger: trigger_tx,
            join: Some(join),
        })
    }
}

fn affects_alerts(event: &MovementEvent) -> bool {
    event.changes_quantity()
        || matches!(
            event,
            MovementEvent::ThresholdChanged { .. } | MovementEvent::RemovedFromLocation { .. }
        )
}

fn poll_loop<A, K>(
    name: &'static str,
    config: PollerConfig,
    control_rx: mpsc::Receiver<Control>,
    trigger_rx: mpsc::Receiver<()>,
    events: Option<Subscription<EventEnvelope<MovementEvent>>>,
    source: &A,
    sink: &K,
) where
    A: AlertSource,
    K: AlertSink,
{
    let interval = config.effective_interval();
    info!(poller = name, interval_ms = interval.as_millis() as u64, "low-stock poller started");

    let mut visible = true;
    let mut next_tick = Instant::now() + interval;
    // Evaluate once on startup.
    let mut due: Option<Instant> = Some(Instant::now());

    'outer: loop {
        // Control messages (shutdown first) before anything else.
        loop {
            match control_rx.try_recv() {
                Ok(Control::Shutdown) | Err(mpsc::TryRecvError::Disconnected) => break 'outer,
                Ok(Control::Visible(now_visible)) => {
                    if now_visible && !visible {
                        debug!(poller = name, "resumed");
                        due = Some(Instant::now());
                        next_tick = Instant::now() + interval;
                    } else if !now_visible && visible {
                        debug!(poller = name, "paused");
                    }
                    visible = now_visible;
                }
                Err(mpsc::TryRecvError::Empty) => break,
            }
        }

        let now = Instant::now();
        let settle_at = now + config.settle_delay;
        let mut requested = false;
        while trigger_rx.try_recv().is_ok() {
            requested = true;
        }
        if let Some(events) = &events {
            while let Ok(envelope) = events.try_recv() {
                requested |= affects_alerts(envelope.payload());
            }
        }
        if requested {
            // Debounce: a later request pushes the read back.
            due = Some(due.map_or(settle_at, |d| d.max(settle_at)));
        }

        if !visible {
            thread::sleep(config.idle_tick);
            continue;
        }

        let tick_reached = now >= next_tick;
        if tick_reached {
            // Missed ticks are skipped, not replayed.
            next_tick = now + interval;
        }

        if tick_reached || due.is_some_and(|d| now >= d) {
            due = None;
            match source.evaluate() {
                Ok(alerts) => {
                    debug!(poller = name, alerts = alerts.len(), "low-stock evaluation");
                    sink.publish(group_by_supplier(alerts));
                }
                Err(err) => {
                    warn!(poller = name, kind = err.kind(), error = %err, "low-stock evaluation failed");
                }
            }
            continue;
        }

        let wake_at = due.map_or(next_tick, |d| d.min(next_tick));
        let sleep_for = wake_at
            .saturating_duration_since(Instant::now())
            .min(config.idle_tick)
            .max(Duration::from_millis(1));
        thread::sleep(sleep_for);
    }

    info!(poller = name, "low-stock poller stopped");
}
