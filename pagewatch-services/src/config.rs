//! Monitor configuration

use std::time::Duration;

use pagewatch_core::{MonitorError, MonitorResult};

/// Refresh cadence of the observed system
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 250;
pub const DEFAULT_FEED_CAPACITY: usize = 64;
pub const DEFAULT_DETAIL_EVENT_LIMIT: usize = 50;

/// Largest accepted push-subscriber backlog; the broadcast buffer is
/// allocated up front at this size
pub const MAX_FEED_CAPACITY: usize = 65_536;
pub const MAX_DETAIL_EVENT_LIMIT: usize = 10_000;

/// Configuration for the PageMonitor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Period between scheduled ticks
    pub refresh_interval: Duration,
    /// How many updates a push subscriber may fall behind
    pub feed_capacity: usize,
    /// Events of the selected page attached to each update
    pub detail_event_limit: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_millis(DEFAULT_REFRESH_INTERVAL_MS),
            feed_capacity: DEFAULT_FEED_CAPACITY,
            detail_event_limit: DEFAULT_DETAIL_EVENT_LIMIT,
        }
    }
}

impl MonitorConfig {
    /// Build from `PAGEWATCH_*` environment variables, falling back to defaults
    pub fn from_env() -> MonitorResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> MonitorResult<Self> {
        let mut config = Self::default();

        if let Some(ms) = parse_positive(&lookup, "PAGEWATCH_REFRESH_MS")? {
            config.refresh_interval = Duration::from_millis(ms);
        }
        if let Some(capacity) =
            parse_count(&lookup, "PAGEWATCH_FEED_CAPACITY", MAX_FEED_CAPACITY)?
        {
            config.feed_capacity = capacity;
        }
        if let Some(limit) =
            parse_count(&lookup, "PAGEWATCH_DETAIL_EVENTS", MAX_DETAIL_EVENT_LIMIT)?
        {
            config.detail_event_limit = limit;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check that every value is usable to build a monitor
    pub fn validate(&self) -> MonitorResult<()> {
        if self.refresh_interval.is_zero() {
            return Err(MonitorError::config("refresh interval must be greater than zero"));
        }
        if self.feed_capacity == 0 || self.feed_capacity > MAX_FEED_CAPACITY {
            return Err(MonitorError::config(format!(
                "feed capacity {} outside 1..={}",
                self.feed_capacity, MAX_FEED_CAPACITY
            )));
        }
        if self.detail_event_limit > MAX_DETAIL_EVENT_LIMIT {
            return Err(MonitorError::config(format!(
                "detail event limit {} exceeds {}",
                self.detail_event_limit, MAX_DETAIL_EVENT_LIMIT
            )));
        }
        Ok(())
    }
}

fn parse_positive(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> MonitorResult<Option<u64>> {
    let Some(raw) = lookup(name) else {
        return Ok(None);
    };
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(MonitorError::config(format!("{name} must be greater than zero"))),
        Ok(value) => Ok(Some(value)),
        Err(e) => Err(MonitorError::config(format!("{name}={raw:?}: {e}"))),
    }
}

fn parse_count(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    max: usize,
) -> MonitorResult<Option<usize>> {
    let Some(value) = parse_positive(lookup, name)? else {
        return Ok(None);
    };
    match usize::try_from(value) {
        Ok(count) if count <= max => Ok(Some(count)),
        _ => Err(MonitorError::config(format!(
            "{name}={value} exceeds the maximum of {max}"
        ))),
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
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = MonitorConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, MonitorConfig::default());
        assert_eq!(config.refresh_interval, Duration::from_millis(250));
    }

    #[test]
    fn test_overrides() {
        let config = MonitorConfig::from_lookup(lookup(&[
            ("PAGEWATCH_REFRESH_MS", "100"),
            ("PAGEWATCH_FEED_CAPACITY", " 16 "),
            ("PAGEWATCH_DETAIL_EVENTS", "5"),
        ]))
        .unwrap();

        assert_eq!(config.refresh_interval, Duration::from_millis(100));
        assert_eq!(config.feed_capacity, 16);
        assert_eq!(config.detail_event_limit, 5);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let zero = MonitorConfig::from_lookup(lookup(&[("PAGEWATCH_REFRESH_MS", "0")]));
        assert!(matches!(zero, Err(MonitorError::Config(_))));

        let garbage = MonitorConfig::from_lookup(lookup(&[("PAGEWATCH_FEED_CAPACITY", "lots")]));
        assert!(matches!(garbage, Err(MonitorError::Config(_))));
    }

    #[test]
    fn test_oversized_counts_rejected() {
        let huge = MonitorConfig::from_lookup(lookup(&[(
            "PAGEWATCH_FEED_CAPACITY",
            "18446744073709551615",
        )]));
        assert!(matches!(huge, Err(MonitorError::Config(_))));

        let over = (MAX_DETAIL_EVENT_LIMIT + 1).to_string();
        let detail = MonitorConfig::from_lookup(lookup(&[("PAGEWATCH_DETAIL_EVENTS", over.as_str())]));
        assert!(matches!(detail, Err(MonitorError::Config(_))));

        let at_limit = MAX_FEED_CAPACITY.to_string();
        let config =
            MonitorConfig::from_lookup(lookup(&[("PAGEWATCH_FEED_CAPACITY", at_limit.as_str())])).unwrap();
        assert_eq!(config.feed_capacity, MAX_FEED_CAPACITY);
    }

    #[test]
    fn test_validate_hand_built_config() {
        assert!(MonitorConfig::default().validate().is_ok());

        let oversized = MonitorConfig {
            feed_capacity: usize::MAX,
            ..MonitorConfig::default()
        };
        assert!(matches!(oversized.validate(), Err(MonitorError::Config(_))));

        let stalled = MonitorConfig {
            refresh_interval: Duration::ZERO,
            ..MonitorConfig::default()
        };
        assert!(matches!(stalled.validate(), Err(MonitorError::Config(_))));
    }
}
