//! Test doubles for driving a detector deterministically.
//!
//! Available in this crate's tests and, to other crates, behind the `testing`
//! feature.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::alarm::{Alarm, AlarmFactory};
use crate::deadline::DeadlineKind;
use crate::delegate::{DetectionControl, DetectorDelegate};
use crate::time::{Clock, Timestamp};

/// Manually advanced clock. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct MockClock {
    micros: Arc<AtomicU64>,
}

impl MockClock {
    /// A clock at its epoch
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, delta: Duration) {
        self.micros
            .fetch_add(delta.as_micros() as u64, Ordering::SeqCst);
    }
}

impl Clock for MockClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_micros(self.micros.load(Ordering::SeqCst))
    }
}

/// Alarm that only records its registration. Tests fire it by calling
/// `on_alarm` on the detector that owns it.
#[derive(Debug, Default)]
pub struct MockAlarm {
    deadline: Option<Timestamp>,
    set_count: usize,
    cancel_count: usize,
}

impl MockAlarm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times the alarm was armed
    pub fn set_count(&self) -> usize {
        self.set_count
    }

    /// Number of cancel calls, including ones on a disarmed alarm
    pub fn cancel_count(&self) -> usize {
        self.cancel_count
    }
}

impl Alarm for MockAlarm {
    fn set(&mut self, deadline: Timestamp) {
        self.deadline = Some(deadline);
        self.set_count += 1;
    }

    fn cancel(&mut self) {
        self.deadline = None;
        self.cancel_count += 1;
    }

    fn deadline(&self) -> Option<Timestamp> {
        self.deadline
    }
}

/// Factory handing out [`MockAlarm`]s and remembering each context it saw.
#[derive(Debug, Default)]
pub struct MockAlarmFactory {
    contexts: Mutex<Vec<Option<String>>>,
}

impl MockAlarmFactory {
    pub fn contexts(&self) -> Vec<Option<String>> {
        self.contexts
            .lock()
            .map(|contexts| contexts.clone())
            .unwrap_or_default()
    }
}

impl AlarmFactory for MockAlarmFactory {
    type Alarm = MockAlarm;

    fn create_alarm(&self, context: Option<&str>) -> MockAlarm {
        if let Ok(mut contexts) = self.contexts.lock() {
            contexts.push(context.map(str::to_string));
        }
        MockAlarm::new()
    }
}

type Reaction = Box<dyn FnMut(DeadlineKind, &mut dyn DetectionControl) + Send>;

/// Delegate recording every detection in the order received, optionally
/// reacting to each one through the detector's control handle.
#[derive(Default)]
pub struct RecordingDelegate {
    detections: Vec<DeadlineKind>,
    reaction: Option<Reaction>,
}

impl RecordingDelegate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record detections and run `reaction` after recording each one.
    pub fn with_reaction<F>(reaction: F) -> Self
    where
        F: FnMut(DeadlineKind, &mut dyn DetectionControl) + Send + 'static,
    {
        Self {
            detections: Vec::new(),
            reaction: Some(Box::new(reaction)),
        }
    }

    pub fn detections(&self) -> &[DeadlineKind] {
        &self.detections
    }

    fn record(&mut self, kind: DeadlineKind, detector: &mut dyn DetectionControl) {
        self.detections.push(kind);
        if let Some(reaction) = self.reaction.as_mut() {
            reaction(kind, detector);
        }
    }
}

impl DetectorDelegate for RecordingDelegate {
    fn on_path_degrading_detected(&mut self, detector: &mut dyn DetectionControl) {
        self.record(DeadlineKind::PathDegrading, detector);
    }

    fn on_path_mtu_reduction_detected(&mut self, detector: &mut dyn DetectionControl) {
        self.record(DeadlineKind::MtuReduction, detector);
    }

    fn on_blackhole_detected(&mut self, detector: &mut dyn DetectionControl) {
        self.record(DeadlineKind::Blackhole, detector);
    }
}
