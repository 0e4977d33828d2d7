use std::time::Duration;

use pathwatch_detector_core::{Clock, Timestamp};
use tokio::time::Instant;

/// Latest instant an alarm is scheduled for, relative to the clock epoch.
/// Matches the horizon tokio uses for its own far-future sleeps.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// [`Clock`] over tokio's time source, counting from the instant it was created.
///
/// Follows tokio's paused clock in tests.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    epoch: Instant,
}

impl TokioClock {
    /// Create a clock whose epoch is now
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(epoch: Instant) -> Self {
        Self { epoch }
    }

    /// The tokio instant a timestamp from this clock refers to. Timestamps
    /// past the far-future horizon are clamped to it.
    pub fn instant_at(&self, timestamp: Timestamp) -> Instant {
        self.epoch + timestamp.as_duration().min(FAR_FUTURE)
    }

    pub fn timestamp_of(&self, instant: Instant) -> Timestamp {
        Timestamp::from_duration(instant.saturating_duration_since(self.epoch))
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now(&self) -> Timestamp {
        self.timestamp_of(Instant::now())
    }
}
