//! Monotonic timestamps and the clock abstraction the detector reads "now" from.

use std::fmt;
use std::ops::{Add, AddAssign, Sub};
use std::sync::Arc;
use std::time::Duration;

/// An absolute point in monotonic time, measured from the epoch of the
/// [`Clock`] that produced it.
///
/// Deadlines handed to the detector and values returned by [`Clock::now`]
/// must come from the same epoch to be comparable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(Duration);

impl Timestamp {
    /// The clock epoch
    pub const ZERO: Timestamp = Timestamp(Duration::ZERO);

    /// The latest representable timestamp; additions saturate here
    pub const MAX: Timestamp = Timestamp(Duration::MAX);

    /// Create a timestamp `offset` after the epoch
    pub const fn from_duration(offset: Duration) -> Self {
        Timestamp(offset)
    }

    pub const fn from_secs(secs: u64) -> Self {
        Timestamp(Duration::from_secs(secs))
    }

    pub const fn from_millis(millis: u64) -> Self {
        Timestamp(Duration::from_millis(millis))
    }

    pub const fn from_micros(micros: u64) -> Self {
        Timestamp(Duration::from_micros(micros))
    }

    /// Offset of this timestamp from the epoch
    pub const fn as_duration(&self) -> Duration {
        self.0
    }

    /// Time elapsed from `earlier` to `self`, or zero if `earlier` is later.
    pub fn saturating_duration_since(&self, earlier: Timestamp) -> Duration {
        self.0.saturating_sub(earlier.0)
    }

}

/// Saturates at the largest representable timestamp.
impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: Duration) -> Timestamp {
        Timestamp(self.0.saturating_add(rhs))
    }
}

impl AddAssign<Duration> for Timestamp {
    fn add_assign(&mut self, rhs: Duration) {
        *self = *self + rhs;
    }
}

impl Sub<Duration> for Timestamp {
    type Output = Timestamp;

    fn sub(self, rhs: Duration) -> Timestamp {
        Timestamp(self.0.saturating_sub(rhs))
    }
}

impl Sub<Timestamp> for Timestamp {
    type Output = Duration;

    /// Saturates at zero when `rhs` is later than `self`.
    fn sub(self, rhs: Timestamp) -> Duration {
        self.saturating_duration_since(rhs)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:06}s", self.0.as_secs(), self.0.subsec_micros())
    }
}

/// Monotonic time source.
pub trait Clock {
    /// Current time, from this clock's epoch.
    fn now(&self) -> Timestamp;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic() {
        let t = Timestamp::from_secs(1);
        assert_eq!(t + Duration::from_millis(500), Timestamp::from_millis(1500));
        assert_eq!(Timestamp::from_secs(3) - t, Duration::from_secs(2));
        // Subtraction saturates instead of panicking on reversed operands
        assert_eq!(t - Timestamp::from_secs(3), Duration::ZERO);
        assert_eq!(t - Duration::from_secs(5), Timestamp::ZERO);

        let mut u = t;
        u += Duration::from_micros(250);
        assert_eq!(u, Timestamp::from_micros(1_000_250));
    }

    #[test]
    fn test_addition_saturates() {
        let far = Timestamp::from_secs(u64::MAX);
        assert_eq!(far + Duration::from_secs(1), Timestamp::MAX);
        assert_eq!(Timestamp::MAX + Duration::MAX, Timestamp::MAX);

        let mut u = far;
        u += Duration::MAX;
        assert_eq!(u, Timestamp::MAX);
    }

    #[test]
    fn test_display() {
        assert_eq!(Timestamp::from_micros(6_100_000).to_string(), "6.100000s");
        assert_eq!(Timestamp::ZERO.to_string(), "0.000000s");
    }
}
