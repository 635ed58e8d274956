//! Process configuration read from the environment.

use std::time::Duration;

use dentstock_observability::LogFormat;

/// Settings for the API binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub bind: String,
    pub log_format: LogFormat,
    /// Threshold given to supplies created without one.
    pub default_threshold: u64,
    pub low_stock_poll: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
            log_format: LogFormat::Json,
            default_threshold: 0,
            low_stock_poll: Duration::from_secs(30),
        }
    }
}

impl ApiConfig {
    /// Read `DENTSTOCK_*` variables, falling back to defaults on missing or bad values.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let bind = lookup("DENTSTOCK_BIND").unwrap_or(defaults.bind);
        let log_format = parsed(&lookup, "DENTSTOCK_LOG_FORMAT").unwrap_or(defaults.log_format);
        let default_threshold =
            parsed(&lookup, "DENTSTOCK_DEFAULT_THRESHOLD").unwrap_or(defaults.default_threshold);
        let low_stock_poll = parsed::<u64>(&lookup, "DENTSTOCK_LOW_STOCK_POLL_SECS")
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.low_stock_poll);

        Self {
            bind,
            log_format,
            default_threshold,
            low_stock_poll,
        }
    }
}

fn parsed<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    let raw = lookup(key)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "invalid value; using default");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        assert_eq!(ApiConfig::from_lookup(lookup(&[])), ApiConfig::default());
    }

    #[test]
    fn reads_overrides() {
        let config = ApiConfig::from_lookup(lookup(&[
            ("DENTSTOCK_BIND", "127.0.0.1:9000"),
            ("DENTSTOCK_LOG_FORMAT", "pretty"),
            ("DENTSTOCK_DEFAULT_THRESHOLD", "4"),
            ("DENTSTOCK_LOW_STOCK_POLL_SECS", "5"),
        ]));
        assert_eq!(config.bind, "127.0.0.1:9000");
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.default_threshold, 4);
        assert_eq!(config.low_stock_poll, Duration::from_secs(5));
    }

    #[test]
    fn invalid_values_fall_back() {
        let config = ApiConfig::from_lookup(lookup(&[
            ("DENTSTOCK_DEFAULT_THRESHOLD", "-1"),
            ("DENTSTOCK_LOW_STOCK_POLL_SECS", "0"),
            ("DENTSTOCK_LOG_FORMAT", "xml"),
        ]));
        assert_eq!(config.default_threshold, 0);
        assert_eq!(config.low_stock_poll, Duration::from_secs(30));
        assert_eq!(config.log_format, LogFormat::Json);
    }
}
