//! Aggregation configuration from environment variables

use std::env;
use std::time::Duration;

/// Windows and sweep interval of the aggregation engine
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationConfig {
    /// Master switch; when false every notification is forwarded immediately
    pub enabled: bool,

    /// Window of document merging and per-resource suppression
    pub window_ms: u64,

    /// Window of tag edit aggregation
    pub tag_window_ms: u64,

    /// Period of the background sweep
    pub sweep_interval_ms: u64,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            window_ms: 10_000,
            tag_window_ms: 30_000,
            sweep_interval_ms: 10_000,
        }
    }
}

impl AggregationConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `ACTIVITIES_AGGREGATE` (default: false)
    /// - `ACTIVITIES_AGGREGATE_INTERVAL_MS` (default: 10000)
    /// - `ACTIVITIES_TAGS_AGGREGATE_INTERVAL_MS` (default: 30000)
    /// - `ACTIVITIES_SWEEP_INTERVAL_MS` (default: the aggregate interval)
    pub fn from_env() -> Self {
        let window_ms = env::var("ACTIVITIES_AGGREGATE_INTERVAL_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10_000);

        Self {
            enabled: env::var("ACTIVITIES_AGGREGATE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(false),

            window_ms,

            tag_window_ms: env::var("ACTIVITIES_TAGS_AGGREGATE_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30_000),

            sweep_interval_ms: env::var("ACTIVITIES_SWEEP_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(window_ms),
        }
    }

    /// Enabled configuration with one window for everything (tests, demos)
    pub fn enabled_with_window(window: Duration) -> Self {
        let ms = window.as_millis() as u64;
        Self {
            enabled: true,
            window_ms: ms,
            tag_window_ms: ms,
            sweep_interval_ms: ms.max(1),
        }
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    pub fn tag_window(&self) -> Duration {
        Duration::from_millis(self.tag_window_ms)
    }

    /// Never zero: `tokio::time::interval` rejects a zero period
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Both cases share one test: they mutate the same process-wide variables
    #[test]
    fn test_config_from_env() {
        env::remove_var("ACTIVITIES_AGGREGATE");
        env::remove_var("ACTIVITIES_AGGREGATE_INTERVAL_MS");
        env::remove_var("ACTIVITIES_TAGS_AGGREGATE_INTERVAL_MS");
        env::remove_var("ACTIVITIES_SWEEP_INTERVAL_MS");

        let config = AggregationConfig::from_env();
        assert_eq!(config, AggregationConfig::default());

        env::set_var("ACTIVITIES_AGGREGATE", "true");
        env::set_var("ACTIVITIES_AGGREGATE_INTERVAL_MS", "2000");
        env::set_var("ACTIVITIES_TAGS_AGGREGATE_INTERVAL_MS", "not-a-number");

        let config = AggregationConfig::from_env();
        assert!(config.enabled);
        assert_eq!(config.window_ms, 2_000);
        assert_eq!(config.tag_window_ms, 30_000);
        assert_eq!(config.sweep_interval_ms, 2_000);

        env::set_var("ACTIVITIES_SWEEP_INTERVAL_MS", "500");
        assert_eq!(AggregationConfig::from_env().sweep_interval(), Duration::from_millis(500));

        env::remove_var("ACTIVITIES_AGGREGATE");
        env::remove_var("ACTIVITIES_AGGREGATE_INTERVAL_MS");
        env::remove_var("ACTIVITIES_TAGS_AGGREGATE_INTERVAL_MS");
        env::remove_var("ACTIVITIES_SWEEP_INTERVAL_MS");
    }

    #[test]
    fn test_zero_sweep_interval_is_clamped() {
        let config = AggregationConfig::enabled_with_window(Duration::ZERO);
        assert_eq!(config.window(), Duration::ZERO);
        assert_eq!(config.sweep_interval(), Duration::from_millis(1));
    }
}
