//! The timer primitive the detector multiplexes its deadlines onto.
//!
//! An [`Alarm`] holds at most one pending registration. Arming it again
//! replaces the previous registration; cancelling it guarantees (as far as the
//! implementation can) that the replaced registration never fires. The owner
//! of the detector is responsible for routing a fired alarm into
//! [`PathFailureDetector::on_alarm`](crate::PathFailureDetector::on_alarm).

use std::time::Duration;

use crate::time::Timestamp;

/// A single-registration timer.
pub trait Alarm {
    /// Arm (or re-arm) the alarm to fire at or after `deadline`.
    fn set(&mut self, deadline: Timestamp);

    /// Disarm the alarm. A no-op when not armed.
    fn cancel(&mut self);

    /// The currently armed deadline, if any.
    fn deadline(&self) -> Option<Timestamp>;

    fn is_set(&self) -> bool {
        self.deadline().is_some()
    }

    /// Move the alarm to `deadline`, or cancel it when `deadline` is `None`.
    ///
    /// When already armed within `granularity` of the new deadline the
    /// existing registration is kept.
    fn update(&mut self, deadline: Option<Timestamp>, granularity: Duration) {
        let Some(new_deadline) = deadline else {
            self.cancel();
            return;
        };

        if let Some(current) = self.deadline() {
            let drift = if new_deadline > current {
                new_deadline - current
            } else {
                current - new_deadline
            };
            if current == new_deadline || drift < granularity {
                return;
            }
        }

        self.set(new_deadline);
    }

    /// Called by the detector when the armed registration has fired, before
    /// any deadline is dispatched. Clears the registration by default.
    fn on_fired(&mut self) {
        self.cancel();
    }
}

impl<A: Alarm + ?Sized> Alarm for Box<A> {
    fn set(&mut self, deadline: Timestamp) {
        (**self).set(deadline)
    }

    fn cancel(&mut self) {
        (**self).cancel()
    }

    fn deadline(&self) -> Option<Timestamp> {
        (**self).deadline()
    }

    fn is_set(&self) -> bool {
        (**self).is_set()
    }

    fn update(&mut self, deadline: Option<Timestamp>, granularity: Duration) {
        (**self).update(deadline, granularity)
    }

    fn on_fired(&mut self) {
        (**self).on_fired()
    }
}

/// Creates the alarm a detector will own for its whole lifetime.
pub trait AlarmFactory {
    type Alarm: Alarm;

    /// Create an alarm. `context` is an opaque label the implementation may
    /// attach to the registration (typically the connection it belongs to).
    fn create_alarm(&self, context: Option<&str>) -> Self::Alarm;
}
