//! Local distributor configuration from environment variables.

use std::env;
use std::time::Duration;

/// Process-local settings for the stream distributor.
///
/// On-chain settings (replication factor, extra candidates, required
/// operators) come from the `OnChainConfig` port, not from here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributorConfig {
    /// Seed the load tracker from registry stream counts at startup.
    pub warm_start: bool,

    /// Reload membership at the current block when the event feed lags.
    pub reload_on_feed_lag: bool,

    /// Reseed loads from the registry every this many seconds. Zero disables.
    pub reseed_interval_secs: u64,
}

impl Default for DistributorConfig {
    fn default() -> Self {
        Self {
            warm_start: true,
            reload_on_feed_lag: true,
            reseed_interval_secs: 0,
        }
    }
}

impl DistributorConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `SP_WARM_START`: Seed loads from the registry at startup (default: true)
    /// - `SP_RELOAD_ON_FEED_LAG`: Reload membership after feed lag (default: true)
    /// - `SP_RESEED_INTERVAL_SECS`: Periodic reseed interval, 0 = off (default: 0)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            warm_start: env::var("SP_WARM_START")
                .map(|v| parse_flag(&v, defaults.warm_start))
                .unwrap_or(defaults.warm_start),

            reload_on_feed_lag: env::var("SP_RELOAD_ON_FEED_LAG")
                .map(|v| parse_flag(&v, defaults.reload_on_feed_lag))
                .unwrap_or(defaults.reload_on_feed_lag),

            reseed_interval_secs: env::var("SP_RESEED_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.reseed_interval_secs),
        }
    }

    /// Cold start: every node begins at zero load.
    pub fn cold() -> Self {
        Self {
            warm_start: false,
            ..Self::default()
        }
    }

    /// Periodic reseed interval, if enabled.
    pub fn reseed_interval(&self) -> Option<Duration> {
        match self.reseed_interval_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

fn parse_flag(value: &str, default: bool) -> bool {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => true,
        "false" | "0" | "no" => false,
        _ => default,
    }
}
