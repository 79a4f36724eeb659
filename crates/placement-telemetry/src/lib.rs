//! # Placement Telemetry
//!
//! Logging and metrics export for the stream placement subsystem.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use placement_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() {
//!     init_telemetry(&TelemetryConfig::from_env()).expect("Failed to init telemetry");
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OTEL_SERVICE_NAME` | `stream-placement` | Service name in logs |
//! | `SP_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `SP_JSON_LOGS` | `false` (`true` in containers) | JSON log output |
//! | `SP_CONSOLE_OUTPUT` | `true` | Write logs to the console |

#![warn(missing_docs)]

mod config;
mod logging;
mod metrics;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::encode_metrics;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// The global subscriber could not be installed.
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    /// Metrics could not be encoded.
    #[error("Failed to export Prometheus metrics: {0}")]
    MetricsExport(String),

    /// A configuration value was rejected.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging for a placement process.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    init_logging(config)
}
