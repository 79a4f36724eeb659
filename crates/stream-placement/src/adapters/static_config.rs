//! Static on-chain configuration adapter.

use crate::domain::StreamDistributionSettings;
use crate::ports::outbound::OnChainConfig;
use parking_lot::RwLock;
use tracing::info;

/// `OnChainConfig` backed by a value held in memory.
///
/// The value can be swapped at runtime, mirroring an on-chain config update.
#[derive(Default)]
pub struct StaticOnChainConfig {
    settings: RwLock<StreamDistributionSettings>,
}

impl StaticOnChainConfig {
    /// Serve fixed settings.
    pub fn new(settings: StreamDistributionSettings) -> Self {
        Self {
            settings: RwLock::new(settings),
        }
    }

    /// Parse settings from a JSON object keyed by registry config keys.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    /// Replace the served settings.
    pub fn replace(&self, settings: StreamDistributionSettings) {
        info!(
            replication_factor = settings.replication_factor,
            extra_candidates = settings.extra_candidates_count,
            required_operators = settings.required_operators.len(),
            "Stream distribution settings updated"
        );
        *self.settings.write() = settings;
    }
}

impl OnChainConfig for StaticOnChainConfig {
    fn stream_distribution(&self) -> StreamDistributionSettings {
        self.settings.read().clone()
    }
}
