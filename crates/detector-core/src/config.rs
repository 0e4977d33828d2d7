//! Detection delays expressed in probe timeouts (PTOs).
//!
//! A connection restarts detection on every forward-progress event; the
//! deadlines of the new round are derived from the current PTO so that the
//! detector scales with the path's round-trip time.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use pathwatch_detector_core::{DetectorConfig, Timestamp};
//!
//! let config = DetectorConfig::default();
//! let deadlines = config.deadlines(Timestamp::from_secs(1), Duration::from_millis(200));
//! assert_eq!(deadlines.path_degrading, Some(Timestamp::from_millis(1800)));
//! assert_eq!(deadlines.blackhole, Timestamp::from_millis(2000));
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::deadline::DetectionDeadlines;
use crate::error::{Error, Result};
use crate::time::Timestamp;

/// Default number of PTOs without progress before path degrading fires.
pub const DEFAULT_PATH_DEGRADING_PTOS: u32 = 4;

/// Default number of PTOs without progress before path MTU reduction fires.
pub const DEFAULT_PATH_MTU_REDUCTION_PTOS: u32 = 2;

/// Default number of PTOs without progress before the blackhole fires.
pub const DEFAULT_BLACKHOLE_PTOS: u32 = 5;

/// How far each detection stage lies from the last forward progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Watch for path degrading at all.
    pub path_degrading_enabled: bool,

    /// PTOs until path degrading is signalled.
    pub path_degrading_ptos: u32,

    /// Watch for path MTU reduction at all.
    pub path_mtu_reduction_enabled: bool,

    /// PTOs until path MTU reduction is signalled.
    pub path_mtu_reduction_ptos: u32,

    /// PTOs until the blackhole is signalled.
    pub blackhole_ptos: u32,

    /// Lower bound for the blackhole delay, in milliseconds.
    pub min_blackhole_delay_ms: u64,

    /// Alarm re-arm granularity, in milliseconds. Zero keeps the alarm exactly
    /// on the earliest deadline.
    pub alarm_granularity_ms: u64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            path_degrading_enabled: true,
            path_degrading_ptos: DEFAULT_PATH_DEGRADING_PTOS,
            path_mtu_reduction_enabled: true,
            path_mtu_reduction_ptos: DEFAULT_PATH_MTU_REDUCTION_PTOS,
            blackhole_ptos: DEFAULT_BLACKHOLE_PTOS,
            min_blackhole_delay_ms: 0,
            alarm_granularity_ms: 0,
        }
    }
}

impl DetectorConfig {
    /// Enable the path MTU reduction stage at `ptos`
    pub fn with_path_mtu_reduction(mut self, ptos: u32) -> Self {
        self.path_mtu_reduction_enabled = true;
        self.path_mtu_reduction_ptos = ptos;
        self
    }

    pub fn without_path_mtu_reduction(mut self) -> Self {
        self.path_mtu_reduction_enabled = false;
        self
    }

    pub fn without_path_degrading(mut self) -> Self {
        self.path_degrading_enabled = false;
        self
    }

    pub fn min_blackhole_delay(&self) -> Duration {
        Duration::from_millis(self.min_blackhole_delay_ms)
    }

    pub fn alarm_granularity(&self) -> Duration {
        Duration::from_millis(self.alarm_granularity_ms)
    }

    /// Check that every stage fires strictly before the blackhole.
    pub fn validate(&self) -> Result<()> {
        if self.blackhole_ptos == 0 {
            return Err(Error::InvalidConfig(
                "blackhole_ptos must be at least 1".to_string(),
            ));
        }
        if self.path_degrading_enabled {
            if self.path_degrading_ptos == 0 {
                return Err(Error::InvalidConfig(
                    "path_degrading_ptos must be at least 1".to_string(),
                ));
            }
            if self.path_degrading_ptos >= self.blackhole_ptos {
                return Err(Error::InvalidConfig(format!(
                    "path_degrading_ptos ({}) must be below blackhole_ptos ({})",
                    self.path_degrading_ptos, self.blackhole_ptos
                )));
            }
        }
        if self.path_mtu_reduction_enabled
            && (self.path_mtu_reduction_ptos == 0
                || self.path_mtu_reduction_ptos >= self.blackhole_ptos)
        {
            return Err(Error::InvalidConfig(format!(
                "path_mtu_reduction_ptos ({}) must be between 1 and blackhole_ptos ({})",
                self.path_mtu_reduction_ptos, self.blackhole_ptos
            )));
        }
        Ok(())
    }

    /// Deadlines for a detection round starting at `now` with probe timeout `pto`.
    ///
    /// Delays that do not fit a [`Duration`] saturate to the latest timestamp.
    pub fn deadlines(&self, now: Timestamp, pto: Duration) -> DetectionDeadlines {
        let after_ptos = |ptos: u32| now + pto.saturating_mul(ptos);
        let path_degrading = self
            .path_degrading_enabled
            .then(|| after_ptos(self.path_degrading_ptos));
        let path_mtu_reduction = self
            .path_mtu_reduction_enabled
            .then(|| after_ptos(self.path_mtu_reduction_ptos));
        let blackhole = std::cmp::max(
            after_ptos(self.blackhole_ptos),
            now + self.min_blackhole_delay(),
        );

        DetectionDeadlines {
            path_degrading,
            blackhole,
            path_mtu_reduction,
        }
    }
}
