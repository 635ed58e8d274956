use std::time::Duration;

/// Timing for the low-stock poller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerConfig {
    /// Self-refresh cadence while visible.
    pub interval: Duration,
    /// Wait after a refresh request before reading, so the triggering write has landed.
    pub settle_delay: Duration,
    /// Upper bound on how long the loop sleeps between checks.
    pub idle_tick: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            settle_delay: Duration::from_millis(100),
            idle_tick: Duration::from_millis(50),
        }
    }
}

impl PollerConfig {
    /// Shortest interval the poller runs at; smaller values are raised to it.
    pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(Self::MIN_INTERVAL);
        self
    }

    /// `interval`, raised to `MIN_INTERVAL` when a caller set the field directly.
    pub fn effective_interval(&self) -> Duration {
        self.interval.max(Self::MIN_INTERVAL)
    }

    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    pub fn with_idle_tick(mut self, idle_tick: Duration) -> Self {
        self.idle_tick = idle_tick;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_interval_is_raised_to_the_minimum() {
        let config = PollerConfig::default().with_interval(Duration::ZERO);
        assert_eq!(config.interval, PollerConfig::MIN_INTERVAL);

        let direct = PollerConfig {
            interval: Duration::ZERO,
            ..PollerConfig::default()
        };
        assert_eq!(direct.effective_interval(), PollerConfig::MIN_INTERVAL);
    }
}
