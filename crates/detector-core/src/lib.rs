//! Network path failure detection for transport connections.
//!
//! This crate provides a detector that watches the time elapsed since the
//! last forward progress on a connection and raises escalating failure
//! signals: path degrading, path MTU reduction and finally blackhole. All
//! three deadlines share a single alarm, which is always armed to the
//! earliest pending one.
//!
//! The timer primitive ([`Alarm`]), the time source ([`Clock`]) and the
//! receiver of the signals ([`DetectorDelegate`]) are supplied by the caller.
//! The detector is sans-I/O: whoever owns the alarm routes its firing into
//! [`PathFailureDetector::on_alarm`].
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use pathwatch_detector_core::prelude::*;
//!
//! struct Log(Vec<DeadlineKind>);
//!
//! impl DetectorDelegate for Log {
//!     fn on_path_degrading_detected(&mut self, _: &mut dyn DetectionControl) {
//!         self.0.push(DeadlineKind::PathDegrading);
//!     }
//!     fn on_path_mtu_reduction_detected(&mut self, _: &mut dyn DetectionControl) {
//!         self.0.push(DeadlineKind::MtuReduction);
//!     }
//!     fn on_blackhole_detected(&mut self, detector: &mut dyn DetectionControl) {
//!         self.0.push(DeadlineKind::Blackhole);
//!         detector.stop_detection(true);
//!     }
//! }
//!
//! struct FixedClock(Timestamp);
//!
//! impl Clock for FixedClock {
//!     fn now(&self) -> Timestamp {
//!         self.0
//!     }
//! }
//!
//! #[derive(Default)]
//! struct OneShot(Option<Timestamp>);
//!
//! impl Alarm for OneShot {
//!     fn set(&mut self, deadline: Timestamp) {
//!         self.0 = Some(deadline);
//!     }
//!     fn cancel(&mut self) {
//!         self.0 = None;
//!     }
//!     fn deadline(&self) -> Option<Timestamp> {
//!         self.0
//!     }
//! }
//!
//! # fn main() -> Result<()> {
//! let mut detector = PathFailureDetector::new(OneShot::default(), FixedClock(Timestamp::from_secs(20)));
//! detector.restart_detection(Some(Timestamp::from_secs(5)), Timestamp::from_secs(10), None)?;
//! assert_eq!(detector.alarm().deadline(), Some(Timestamp::from_secs(5)));
//!
//! // The alarm was delivered late; both stages are reported in order.
//! let mut log = Log(Vec::new());
//! detector.on_alarm(&mut log);
//! assert_eq!(log.0, vec![DeadlineKind::PathDegrading, DeadlineKind::Blackhole]);
//! assert_eq!(detector.state(), DetectorState::Disabled);
//! # Ok(())
//! # }
//! ```

pub mod alarm;
pub mod config;
pub mod deadline;
pub mod delegate;
pub mod detector;
mod error;
pub mod time;

#[cfg(any(test, feature = "testing"))]
pub mod test_utils;

pub use alarm::{Alarm, AlarmFactory};
pub use config::DetectorConfig;
pub use deadline::{DeadlineKind, DetectionDeadlines};
pub use delegate::{DetectionControl, DetectorDelegate};
pub use detector::{DetectorState, PathFailureDetector};
pub use error::{Error, Result};
pub use time::{Clock, Timestamp};

/// Re-export of common types and traits
pub mod prelude {
    pub use super::{
        Alarm, AlarmFactory, Clock, DeadlineKind, DetectionControl, DetectionDeadlines,
        DetectorConfig, DetectorDelegate, DetectorState, Error, PathFailureDetector, Result,
        Timestamp,
    };
}
