use std::time::Instant;

use crate::clean::accept_code;
use crate::config::ScannerConfig;

/// Keystroke buffer for a scanner that emulates a keyboard.
///
/// `Enter` or a quiet period of `inactivity_timeout` flushes the buffer; the
/// timer restarts on every keystroke.
#[derive(Debug, Clone)]
pub struct UsbKeyBuffer {
    config: ScannerConfig,
    buffer: String,
    last_key: Option<Instant>,
}

impl UsbKeyBuffer {
    pub fn new(config: ScannerConfig) -> Self {
        Self {
            config,
            buffer: String::new(),
            last_key: None,
        }
    }

    /// Feed one keydown. Returns a code if this key (or an expired quiet period
    /// before it) flushed the buffer.
    pub fn on_key(&mut self, key: &str, now: Instant) -> Option<String> {
        let expired = self.poll(now);
        if key == "Enter" {
            return expired.or_else(|| self.flush());
        }
        self.buffer.push_str(key);
        self.last_key = Some(now);
        expired
    }

    /// Flush the buffer if the quiet period has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        match self.last_key {
            Some(last) if now.saturating_duration_since(last) >= self.config.inactivity_timeout => {
                self.flush()
            }
            _ => None,
        }
    }

    /// Clear the buffer, returning its cleaned contents if long enough.
    pub fn flush(&mut self) -> Option<String> {
        self.last_key = None;
        let raw = std::mem::take(&mut self.buffer);
        let code = accept_code(&raw, self.config.min_code_len);
        if code.is_none() && !raw.is_empty() {
            tracing::debug!(len = raw.len(), "discarded short scanner buffer");
        }
        code
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Raw keys buffered since the last flush.
    pub fn pending(&self) -> &str {
        &self.buffer
    }
}

impl Default for UsbKeyBuffer {
    fn default() -> Self {
        Self::new(ScannerConfig::default())
    }
}
