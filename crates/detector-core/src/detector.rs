//! The path failure detector.
//!
//! One alarm carries three logical deadlines. The alarm is always armed to the
//! earliest active deadline and recomputed after every state change:
//!
//! ```text
//!   restart_detection ──▶ [degrading, mtu, blackhole] ──min──▶ Alarm
//!                                   ▲                           │ fires
//!                                   │ clear elapsed,            ▼
//!                                   └── re-arm ◀────────── on_alarm ──▶ Delegate
//! ```

use std::fmt;
use std::time::Duration;

use tracing::{debug, error, info, trace, warn};

use crate::alarm::{Alarm, AlarmFactory};
use crate::deadline::{DeadlineKind, DetectionDeadlines};
use crate::delegate::{DetectionControl, DetectorDelegate};
use crate::error::{Error, Result};
use crate::time::{Clock, Timestamp};

/// Overall detector state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorState {
    /// No stage is being watched; the alarm is disarmed.
    Idle,
    /// At least one stage is pending; the alarm is armed to `next_deadline`.
    Armed { next_deadline: Timestamp },
    /// Permanently stopped. No further alarm activity.
    Disabled,
}

impl fmt::Display for DetectorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Armed { next_deadline } => write!(f, "armed({})", next_deadline),
            Self::Disabled => write!(f, "disabled"),
        }
    }
}

/// Watches for lack of forward progress on a connection and signals path
/// degrading, path MTU reduction and blackhole detections through a single
/// alarm.
pub struct PathFailureDetector<A: Alarm, C: Clock> {
    /// Pending deadline per stage, indexed by [`DeadlineKind::index`].
    deadlines: [Option<Timestamp>; 3],

    /// Exclusively owned; armed iff some deadline is pending.
    alarm: A,

    clock: C,

    /// Re-arming is skipped when the alarm is already this close to the target.
    granularity: Duration,

    /// Trap flag, set by a permanent stop.
    permanently_stopped: bool,

    /// Connection label for log correlation.
    label: String,
}

impl<A: Alarm, C: Clock> PathFailureDetector<A, C> {
    /// Create an idle detector owning `alarm`.
    pub fn new(alarm: A, clock: C) -> Self {
        Self {
            deadlines: [None; 3],
            alarm,
            clock,
            granularity: Duration::ZERO,
            permanently_stopped: false,
            label: String::from("-"),
        }
    }

    /// Create an idle detector whose alarm comes from `factory`.
    pub fn from_factory<F>(factory: &F, clock: C, context: Option<&str>) -> Self
    where
        F: AlarmFactory<Alarm = A>,
    {
        let alarm = factory.create_alarm(context);
        let detector = Self::new(alarm, clock);
        match context {
            Some(label) => detector.with_label(label),
            None => detector,
        }
    }

    /// Tolerate up to `granularity` of drift before moving an armed alarm.
    pub fn with_granularity(mut self, granularity: Duration) -> Self {
        self.granularity = granularity;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Replace the watched deadlines with a fresh set.
    ///
    /// Any stage not given here is dropped without firing. Fails with
    /// [`Error::PermanentlyStopped`] once the detector has been permanently
    /// stopped.
    pub fn restart_detection(
        &mut self,
        path_degrading_deadline: Option<Timestamp>,
        blackhole_deadline: Timestamp,
        path_mtu_reduction_deadline: Option<Timestamp>,
    ) -> Result<()> {
        if self.permanently_stopped {
            error!(connection = %self.label, "Detection restarted after being permanently stopped");
            return Err(Error::PermanentlyStopped);
        }

        self.deadlines[DeadlineKind::PathDegrading.index()] = path_degrading_deadline;
        self.deadlines[DeadlineKind::MtuReduction.index()] = path_mtu_reduction_deadline;
        self.deadlines[DeadlineKind::Blackhole.index()] = Some(blackhole_deadline);

        if self.last_deadline() != Some(blackhole_deadline) {
            error!(
                connection = %self.label,
                path_degrading = ?path_degrading_deadline,
                path_mtu_reduction = ?path_mtu_reduction_deadline,
                blackhole = %blackhole_deadline,
                "Blackhole deadline is not the last armed deadline"
            );
        }

        trace!(
            connection = %self.label,
            path_degrading = ?path_degrading_deadline,
            path_mtu_reduction = ?path_mtu_reduction_deadline,
            blackhole = %blackhole_deadline,
            "Detection restarted"
        );
        self.update_alarm();
        Ok(())
    }

    /// [`restart_detection`](Self::restart_detection) with a prepared deadline set.
    pub fn restart_with(&mut self, deadlines: DetectionDeadlines) -> Result<()> {
        self.restart_detection(
            deadlines.path_degrading,
            deadlines.blackhole,
            deadlines.path_mtu_reduction,
        )
    }

    /// Drop every pending deadline and disarm the alarm.
    ///
    /// With `permanent` set the detector refuses all later restarts.
    pub fn stop_detection(&mut self, permanent: bool) {
        if permanent && !self.permanently_stopped {
            debug!(connection = %self.label, "Detection permanently stopped");
            self.permanently_stopped = true;
        } else if self.is_detection_in_progress() {
            trace!(connection = %self.label, "Detection stopped");
        }

        self.deadlines = [None; 3];
        self.alarm.cancel();
    }

    /// Whether any stage is pending.
    pub fn is_detection_in_progress(&self) -> bool {
        self.deadlines.iter().any(Option::is_some)
    }

    /// Handle the alarm firing.
    ///
    /// Every pending stage whose deadline has passed is cleared and reported
    /// to `delegate`, in [`DeadlineKind::ALL`] order. Each stage is checked
    /// against the detector's state at that moment, so a delegate that
    /// restarts or stops detection from a callback affects the stages still
    /// to be checked. The alarm is re-armed from the state left once all
    /// callbacks have returned.
    ///
    /// A fire with nothing pending is a stale registration and is ignored.
    pub fn on_alarm<D>(&mut self, delegate: &mut D)
    where
        D: DetectorDelegate + ?Sized,
    {
        self.alarm.on_fired();

        if !self.is_detection_in_progress() {
            debug!(connection = %self.label, "Alarm fired with no deadline pending, ignoring");
            return;
        }

        let now = self.clock.now();
        let mut dispatched = 0usize;

        for kind in DeadlineKind::ALL {
            let slot = kind.index();
            match self.deadlines[slot] {
                Some(deadline) if deadline <= now => {
                    self.deadlines[slot] = None;
                    dispatched += 1;
                    match kind {
                        DeadlineKind::Blackhole => {
                            warn!(connection = %self.label, %deadline, %now, "Blackhole detected")
                        }
                        _ => {
                            info!(connection = %self.label, kind = %kind, %deadline, %now, "Path failure stage detected")
                        }
                    }
                    delegate.on_detected(kind, self);
                }
                _ => {}
            }
        }

        if dispatched == 0 {
            debug!(
                connection = %self.label,
                %now,
                earliest = ?self.earliest_deadline(),
                "Alarm fired before any deadline elapsed"
            );
        }

        self.update_alarm();
    }

    /// The pending deadline for `kind`
    pub fn deadline(&self, kind: DeadlineKind) -> Option<Timestamp> {
        self.deadlines[kind.index()]
    }

    /// Earliest pending deadline, which the alarm is armed to.
    pub fn earliest_deadline(&self) -> Option<Timestamp> {
        self.deadlines.iter().flatten().min().copied()
    }

    /// Latest pending deadline.
    pub fn last_deadline(&self) -> Option<Timestamp> {
        self.deadlines.iter().flatten().max().copied()
    }

    pub fn is_permanently_stopped(&self) -> bool {
        self.permanently_stopped
    }

    pub fn state(&self) -> DetectorState {
        if self.permanently_stopped {
            return DetectorState::Disabled;
        }
        match self.earliest_deadline() {
            Some(next_deadline) => DetectorState::Armed { next_deadline },
            None => DetectorState::Idle,
        }
    }

    /// The owned alarm, for inspection.
    pub fn alarm(&self) -> &A {
        &self.alarm
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    fn update_alarm(&mut self) {
        let next = if self.permanently_stopped {
            None
        } else {
            self.earliest_deadline()
        };

        match next {
            Some(deadline) => trace!(connection = %self.label, %deadline, "Arming detection alarm"),
            None => trace!(connection = %self.label, "Disarming detection alarm"),
        }
        self.alarm.update(next, self.granularity);
    }
}

impl<A: Alarm, C: Clock> DetectionControl for PathFailureDetector<A, C> {
    fn restart_detection(
        &mut self,
        path_degrading_deadline: Option<Timestamp>,
        blackhole_deadline: Timestamp,
        path_mtu_reduction_deadline: Option<Timestamp>,
    ) -> Result<()> {
        PathFailureDetector::restart_detection(
            self,
            path_degrading_deadline,
            blackhole_deadline,
            path_mtu_reduction_deadline,
        )
    }

    fn stop_detection(&mut self, permanent: bool) {
        PathFailureDetector::stop_detection(self, permanent)
    }

    fn is_detection_in_progress(&self) -> bool {
        PathFailureDetector::is_detection_in_progress(self)
    }

    fn now(&self) -> Timestamp {
        self.clock.now()
    }
}

impl<A: Alarm, C: Clock> fmt::Debug for PathFailureDetector<A, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathFailureDetector")
            .field("label", &self.label)
            .field("path_degrading", &self.deadline(DeadlineKind::PathDegrading))
            .field("path_mtu_reduction", &self.deadline(DeadlineKind::MtuReduction))
            .field("blackhole", &self.deadline(DeadlineKind::Blackhole))
            .field("alarm", &self.alarm.deadline())
            .field("permanently_stopped", &self.permanently_stopped)
            .finish()
    }
}
