use std::sync::{Mutex, mpsc};

use crate::bus::{EventBus, Subscription};

/// The subscriber list lock was poisoned by a panicking publisher.
#[derive(Debug)]
pub enum InMemoryBusError {
    Poisoned,
}

/// Single-process fan-out of committed movements.
///
/// Each subscriber owns an unbounded channel. A subscriber whose receiving side
/// is gone is dropped from the list on the next publish.
#[derive(Debug)]
pub struct InMemoryEventBus<M> {
    senders: Mutex<Vec<mpsc::Sender<M>>>,
}

impl<M> InMemoryEventBus<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live subscribers as of the last publish.
    pub fn subscriber_count(&self) -> usize {
        self.senders.lock().map(|s| s.len()).unwrap_or(0)
    }
}

impl<M> Default for InMemoryEventBus<M> {
    fn default() -> Self {
        Self {
            senders: Mutex::new(Vec::new()),
        }
    }
}

impl<M> EventBus<M> for InMemoryEventBus<M>
where
    M: Clone + Send + 'static,
{
    type Error = InMemoryBusError;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        let mut senders = self.senders.lock().map_err(|_| InMemoryBusError::Poisoned)?;
        let live_before = senders.len();
        senders.retain(|tx| tx.send(message.clone()).is_ok());

        let gone = live_before - senders.len();
        if gone > 0 {
            tracing::debug!(gone, live = senders.len(), "movement subscribers disconnected");
        }
        Ok(())
    }

    fn subscribe(&self) -> Subscription<M> {
        let (tx, rx) = mpsc::channel();
        match self.senders.lock() {
            Ok(mut senders) => senders.push(tx),
            // Subscribing never fails; this subscription just stays silent.
            Err(_) => tracing::warn!("movement bus poisoned; subscription will receive nothing"),
        }
        Subscription::new(rx)
    }
}
