use std::time::Duration;

/// Scanner tunables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannerConfig {
    /// Quiet period after the last keystroke that flushes the USB buffer.
    pub inactivity_timeout: Duration,
    /// Shorter cleaned codes are discarded as noise.
    pub min_code_len: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            inactivity_timeout: Duration::from_millis(300),
            min_code_len: 3,
        }
    }
}

impl ScannerConfig {
    pub fn with_inactivity_timeout(mut self, timeout: Duration) -> Self {
        self.inactivity_timeout = timeout;
        self
    }

    pub fn with_min_code_len(mut self, len: usize) -> Self {
        self.min_code_len = len;
        self
    }
}
