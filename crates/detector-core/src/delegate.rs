//! Callbacks the detector raises, and the control surface they may use to
//! re-enter the detector while a fire event is being dispatched.

use crate::deadline::DeadlineKind;
use crate::error::Result;
use crate::time::Timestamp;

/// Operations a delegate may call back into while handling a detection.
///
/// Implemented by [`PathFailureDetector`](crate::PathFailureDetector). Changes
/// made through this handle are visible to the rest of the dispatch: a
/// restart pushes the remaining stages out, a stop suppresses them.
pub trait DetectionControl {
    /// See [`PathFailureDetector::restart_detection`](crate::PathFailureDetector::restart_detection).
    fn restart_detection(
        &mut self,
        path_degrading_deadline: Option<Timestamp>,
        blackhole_deadline: Timestamp,
        path_mtu_reduction_deadline: Option<Timestamp>,
    ) -> Result<()>;

    /// See [`PathFailureDetector::stop_detection`](crate::PathFailureDetector::stop_detection).
    fn stop_detection(&mut self, permanent: bool);

    fn is_detection_in_progress(&self) -> bool;

    /// Current time on the detector's clock.
    fn now(&self) -> Timestamp;
}

/// Receives the detector's failure signals.
///
/// Each callback fires at most once per activation of its stage. The
/// detector does not own the delegate; it is lent for each fire event.
pub trait DetectorDelegate {
    fn on_path_degrading_detected(&mut self, detector: &mut dyn DetectionControl);

    fn on_path_mtu_reduction_detected(&mut self, detector: &mut dyn DetectionControl);

    fn on_blackhole_detected(&mut self, detector: &mut dyn DetectionControl);

    /// Route a detection of `kind` to its callback.
    fn on_detected(&mut self, kind: DeadlineKind, detector: &mut dyn DetectionControl) {
        match kind {
            DeadlineKind::PathDegrading => self.on_path_degrading_detected(detector),
            DeadlineKind::MtuReduction => self.on_path_mtu_reduction_detected(detector),
            DeadlineKind::Blackhole => self.on_blackhole_detected(detector),
        }
    }
}

impl<D: DetectorDelegate + ?Sized> DetectorDelegate for &mut D {
    fn on_path_degrading_detected(&mut self, detector: &mut dyn DetectionControl) {
        (**self).on_path_degrading_detected(detector)
    }

    fn on_path_mtu_reduction_detected(&mut self, detector: &mut dyn DetectionControl) {
        (**self).on_path_mtu_reduction_detected(detector)
    }

    fn on_blackhole_detected(&mut self, detector: &mut dyn DetectionControl) {
        (**self).on_blackhole_detected(detector)
    }
}
