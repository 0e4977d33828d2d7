use pathwatch_detector_core::{DeadlineKind, DetectionControl, DetectorDelegate, Timestamp};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Events published by a [`ConnectionMonitor`](crate::ConnectionMonitor)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEvent {
    /// A detection stage fired
    Detected {
        connection: String,
        kind: DeadlineKind,
        at: Timestamp,
    },

    /// Detection was permanently stopped after a blackhole; the connection
    /// should be closed
    Closed {
        connection: String,
        at: Timestamp,
    },
}

impl MonitorEvent {
    pub fn connection(&self) -> &str {
        match self {
            MonitorEvent::Detected { connection, .. } | MonitorEvent::Closed { connection, .. } => {
                connection
            }
        }
    }

    /// The detection kind, for `Detected` events
    pub fn kind(&self) -> Option<DeadlineKind> {
        match self {
            MonitorEvent::Detected { kind, .. } => Some(*kind),
            MonitorEvent::Closed { .. } => None,
        }
    }
}

/// Delegate that turns detections into [`MonitorEvent`]s.
///
/// With `close_on_blackhole` the blackhole callback permanently stops the
/// detector before publishing [`MonitorEvent::Closed`].
#[derive(Debug)]
pub struct MonitorDelegate {
    connection: String,
    events: mpsc::Sender<MonitorEvent>,
    close_on_blackhole: bool,
}

impl MonitorDelegate {
    pub fn new(
        connection: impl Into<String>,
        events: mpsc::Sender<MonitorEvent>,
        close_on_blackhole: bool,
    ) -> Self {
        Self {
            connection: connection.into(),
            events,
            close_on_blackhole,
        }
    }

    fn publish(&self, event: MonitorEvent) {
        if let Err(e) = self.events.try_send(event) {
            warn!(connection = %self.connection, error = %e, "Dropping monitor event");
        }
    }

    fn detected(&self, kind: DeadlineKind, detector: &dyn DetectionControl) {
        self.publish(MonitorEvent::Detected {
            connection: self.connection.clone(),
            kind,
            at: detector.now(),
        });
    }
}

impl DetectorDelegate for MonitorDelegate {
    fn on_path_degrading_detected(&mut self, detector: &mut dyn DetectionControl) {
        self.detected(DeadlineKind::PathDegrading, detector);
    }

    fn on_path_mtu_reduction_detected(&mut self, detector: &mut dyn DetectionControl) {
        self.detected(DeadlineKind::MtuReduction, detector);
    }

    fn on_blackhole_detected(&mut self, detector: &mut dyn DetectionControl) {
        self.detected(DeadlineKind::Blackhole, detector);

        if self.close_on_blackhole {
            debug!(connection = %self.connection, "Closing connection after blackhole");
            detector.stop_detection(true);
            self.publish(MonitorEvent::Closed {
                connection: self.connection.clone(),
                at: detector.now(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pathwatch_detector_core::test_utils::{MockAlarm, MockClock};
    use pathwatch_detector_core::{DetectorState, PathFailureDetector};
    use std::time::Duration;

    #[test]
    fn test_blackhole_closes_detector() {
        let clock = MockClock::new();
        let mut detector = PathFailureDetector::new(MockAlarm::new(), clock.clone());
        let (tx, mut rx) = mpsc::channel(8);
        let mut delegate = MonitorDelegate::new("conn-9", tx, true);

        detector
            .restart_detection(Some(Timestamp::from_secs(1)), Timestamp::from_secs(2), None)
            .unwrap();
        clock.advance(Duration::from_secs(2));
        detector.on_alarm(&mut delegate);

        assert_eq!(
            rx.try_recv().unwrap(),
            MonitorEvent::Detected {
                connection: "conn-9".to_string(),
                kind: DeadlineKind::PathDegrading,
                at: Timestamp::from_secs(2),
            }
        );
        assert_eq!(rx.try_recv().unwrap().kind(), Some(DeadlineKind::Blackhole));
        let closed = rx.try_recv().unwrap();
        assert_eq!(closed.kind(), None);
        assert_eq!(closed.connection(), "conn-9");
        assert_eq!(detector.state(), DetectorState::Disabled);
    }

    #[test]
    fn test_full_channel_drops_events() {
        let clock = MockClock::new();
        let mut detector = PathFailureDetector::new(MockAlarm::new(), clock.clone());
        let (tx, mut rx) = mpsc::channel(1);
        let mut delegate = MonitorDelegate::new("conn-1", tx, false);

        detector
            .restart_detection(Some(Timestamp::from_secs(1)), Timestamp::from_secs(1), None)
            .unwrap();
        clock.advance(Duration::from_secs(1));
        detector.on_alarm(&mut delegate);

        assert_eq!(rx.try_recv().unwrap().kind(), Some(DeadlineKind::PathDegrading));
        assert!(rx.try_recv().is_err());
        assert!(!detector.is_detection_in_progress());
    }
}
