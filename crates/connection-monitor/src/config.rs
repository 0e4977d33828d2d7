//! Configuration for connection monitors and the `pathwatch` tool.
//!
//! ```toml
//! [monitor]
//! connection_label = "edge-1"
//! close_on_blackhole = true
//!
//! [monitor.detector]
//! path_degrading_ptos = 4
//! path_mtu_reduction_ptos = 3
//! blackhole_ptos = 6
//!
//! [logging]
//! level = "debug"
//! span_events = "lifecycle"
//! ```

use std::path::Path;

use pathwatch_detector_core::DetectorConfig;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::logging::LoggingConfig;

/// Default capacity of a monitor's event channel
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 100;

/// Settings for one [`ConnectionMonitor`](crate::ConnectionMonitor)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Label attached to every log line and event of this connection
    pub connection_label: String,

    /// Permanently stop detection once a blackhole is detected
    pub close_on_blackhole: bool,

    /// Capacity of the event channel; events beyond it are dropped
    pub event_channel_capacity: usize,

    /// Detection delays
    pub detector: DetectorConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            connection_label: "connection".to_string(),
            close_on_blackhole: true,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            detector: DetectorConfig::default(),
        }
    }
}

impl MonitorConfig {
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.connection_label = label.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.event_channel_capacity == 0 {
            return Err(Error::Config(
                "event_channel_capacity must be at least 1".to_string(),
            ));
        }
        self.detector.validate()?;
        Ok(())
    }
}

/// Top-level configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathwatchConfig {
    pub monitor: MonitorConfig,
    pub logging: LoggingConfig,
}

impl PathwatchConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: PathwatchConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&source)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.monitor.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}
