//! Tokio-backed alarm for the path failure detector.
//!
//! Each arming spawns a task that sleeps until the deadline and then posts an
//! [`AlarmFired`] message to the owning monitor. Re-arming or cancelling
//! aborts the task and bumps the alarm's generation, so a message from a
//! registration that was replaced while already in flight is recognised as
//! stale and dropped.

use pathwatch_detector_core::{Alarm, AlarmFactory, Timestamp};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::trace;

use crate::clock::TokioClock;

/// Notification that an alarm registration reached its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlarmFired {
    /// Generation of the registration that fired
    pub generation: u64,
}

/// An [`Alarm`] driven by tokio timers.
///
/// Must be armed from within a tokio runtime.
#[derive(Debug)]
pub struct TokioAlarm {
    clock: TokioClock,
    fire_tx: mpsc::UnboundedSender<AlarmFired>,
    deadline: Option<Timestamp>,
    generation: u64,
    task: Option<JoinHandle<()>>,
    label: Option<String>,
}

impl TokioAlarm {
    /// Create a disarmed alarm reporting fires on `fire_tx`
    pub fn new(clock: TokioClock, fire_tx: mpsc::UnboundedSender<AlarmFired>) -> Self {
        Self {
            clock,
            fire_tx,
            deadline: None,
            generation: 0,
            task: None,
            label: None,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether `fired` belongs to the registration currently armed.
    pub fn is_current(&self, fired: &AlarmFired) -> bool {
        self.deadline.is_some() && fired.generation == self.generation
    }

    fn abort_task(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Alarm for TokioAlarm {
    fn set(&mut self, deadline: Timestamp) {
        self.abort_task();
        self.generation += 1;
        self.deadline = Some(deadline);

        let generation = self.generation;
        let when = self.clock.instant_at(deadline);
        let fire_tx = self.fire_tx.clone();
        trace!(alarm = ?self.label, %deadline, generation, "Alarm armed");

        self.task = Some(tokio::spawn(async move {
            tokio::time::sleep_until(when).await;
            // The monitor may already be gone
            let _ = fire_tx.send(AlarmFired { generation });
        }));
    }

    fn cancel(&mut self) {
        if self.deadline.take().is_some() {
            trace!(alarm = ?self.label, generation = self.generation, "Alarm cancelled");
        }
        self.abort_task();
        self.generation += 1;
    }

    fn deadline(&self) -> Option<Timestamp> {
        self.deadline
    }

    fn on_fired(&mut self) {
        // The sleeping task has completed; only clear the registration.
        self.task = None;
        self.deadline = None;
    }
}

impl Drop for TokioAlarm {
    fn drop(&mut self) {
        self.abort_task();
    }
}

/// Creates [`TokioAlarm`]s that all report to the same monitor channel.
#[derive(Debug, Clone)]
pub struct TokioAlarmFactory {
    clock: TokioClock,
    fire_tx: mpsc::UnboundedSender<AlarmFired>,
}

impl TokioAlarmFactory {
    pub fn new(clock: TokioClock, fire_tx: mpsc::UnboundedSender<AlarmFired>) -> Self {
        Self { clock, fire_tx }
    }
}

impl AlarmFactory for TokioAlarmFactory {
    type Alarm = TokioAlarm;

    fn create_alarm(&self, context: Option<&str>) -> TokioAlarm {
        let mut alarm = TokioAlarm::new(self.clock, self.fire_tx.clone());
        alarm.label = context.map(str::to_string);
        alarm
    }
}
