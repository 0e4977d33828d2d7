//! Per-connection monitor task.
//!
//! A [`ConnectionMonitor`] runs one [`PathFailureDetector`] inside its own
//! tokio task. Commands from the connection (forward progress, stop, status
//! queries) and fires from the detector's alarm are serialized through the
//! task's event loop, so the detector itself is never shared.
//!
//! ```text
//!  ConnectionMonitor ── MonitorCommand ──▶ monitor loop ── MonitorEvent ──▶ receiver
//!                                           │      ▲
//!                                     arms  ▼      │ AlarmFired
//!                                          TokioAlarm (sleep task)
//! ```

use std::time::Duration;

use pathwatch_detector_core::{
    Alarm, Clock, DetectionDeadlines, DetectorConfig, DetectorState, PathFailureDetector,
    Timestamp,
};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info_span, trace, warn, Instrument};

use crate::alarm::{AlarmFired, TokioAlarm, TokioAlarmFactory};
use crate::clock::TokioClock;
use crate::config::MonitorConfig;
use crate::delegate::{MonitorDelegate, MonitorEvent};
use crate::error::{Error, Result};

const COMMAND_CHANNEL_CAPACITY: usize = 32;

/// Snapshot of a monitor's detector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorStatus {
    pub state: DetectorState,
    pub alarm_deadline: Option<Timestamp>,
    pub now: Timestamp,
}

impl MonitorStatus {
    pub fn is_detection_in_progress(&self) -> bool {
        matches!(self.state, DetectorState::Armed { .. })
    }
}

/// Commands processed by the monitor loop
#[derive(Debug)]
enum MonitorCommand {
    /// Forward progress observed; restart detection from the current PTO
    ForwardProgress {
        pto: Duration,
        reply: oneshot::Sender<Result<()>>,
    },
    /// Restart detection with explicit deadlines
    Restart {
        deadlines: DetectionDeadlines,
        reply: oneshot::Sender<Result<()>>,
    },
    Stop {
        permanent: bool,
        reply: oneshot::Sender<()>,
    },
    Status {
        reply: oneshot::Sender<MonitorStatus>,
    },
    Shutdown,
}

/// Handle to a running per-connection monitor task.
#[derive(Debug)]
pub struct ConnectionMonitor {
    label: String,
    clock: TokioClock,
    cmd_tx: mpsc::Sender<MonitorCommand>,
    task: JoinHandle<()>,
}

impl ConnectionMonitor {
    /// Spawn a monitor on the current runtime.
    ///
    /// Returns the handle and the receiver of its events.
    pub fn spawn(config: MonitorConfig) -> Result<(Self, mpsc::Receiver<MonitorEvent>)> {
        Self::spawn_with_clock(config, TokioClock::new())
    }

    /// Spawn a monitor whose timestamps are measured on `clock`.
    pub fn spawn_with_clock(
        config: MonitorConfig,
        clock: TokioClock,
    ) -> Result<(Self, mpsc::Receiver<MonitorEvent>)> {
        config.validate()?;

        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel(config.event_channel_capacity);
        let (fire_tx, fire_rx) = mpsc::unbounded_channel();

        let label = config.connection_label.clone();
        let factory = TokioAlarmFactory::new(clock, fire_tx);
        let detector = PathFailureDetector::from_factory(&factory, clock, Some(label.as_str()))
            .with_granularity(config.detector.alarm_granularity());
        let delegate = MonitorDelegate::new(label.clone(), event_tx, config.close_on_blackhole);

        debug!(connection = %label, "Spawning connection monitor");
        let span = info_span!("monitor", connection = %label);
        let task = tokio::spawn(
            run_monitor_loop(detector, delegate, config.detector, cmd_rx, fire_rx).instrument(span),
        );

        Ok((
            Self {
                label,
                clock,
                cmd_tx,
                task,
            },
            event_rx,
        ))
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// The clock event timestamps are measured on
    pub fn clock(&self) -> TokioClock {
        self.clock
    }

    /// Report forward progress; detection restarts from now with deadlines
    /// derived from `pto`.
    pub async fn on_forward_progress(&self, pto: Duration) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .send(MonitorCommand::ForwardProgress { pto, reply })
            .await?;
        rx.await?
    }

    /// Restart detection with explicit deadlines on this monitor's clock.
    pub async fn restart(&self, deadlines: DetectionDeadlines) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .send(MonitorCommand::Restart { deadlines, reply })
            .await?;
        rx.await?
    }

    /// Stop detection; with `permanent` the monitor refuses further restarts.
    pub async fn stop(&self, permanent: bool) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .send(MonitorCommand::Stop { permanent, reply })
            .await?;
        Ok(rx.await?)
    }

    pub async fn status(&self) -> Result<MonitorStatus> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx.send(MonitorCommand::Status { reply }).await?;
        Ok(rx.await?)
    }

    pub async fn is_detection_in_progress(&self) -> Result<bool> {
        Ok(self.status().await?.is_detection_in_progress())
    }

    /// Permanently stop detection and wait for the monitor task to end.
    pub async fn shutdown(self) -> Result<()> {
        // The loop may already have exited; joining below still succeeds
        let _ = self.cmd_tx.send(MonitorCommand::Shutdown).await;
        self.task
            .await
            .map_err(|e| Error::TaskFailed(e.to_string()))
    }
}

/// Route a fire into the detector unless its registration was replaced or
/// cancelled after the message was sent. Returns whether it was delivered.
fn deliver_fire(
    detector: &mut PathFailureDetector<TokioAlarm, TokioClock>,
    delegate: &mut MonitorDelegate,
    fired: AlarmFired,
) -> bool {
    if !detector.alarm().is_current(&fired) {
        trace!(connection = %detector.label(), generation = fired.generation, "Ignoring stale alarm");
        return false;
    }
    detector.on_alarm(delegate);
    true
}

async fn run_monitor_loop(
    mut detector: PathFailureDetector<TokioAlarm, TokioClock>,
    mut delegate: MonitorDelegate,
    config: DetectorConfig,
    mut cmd_rx: mpsc::Receiver<MonitorCommand>,
    mut fire_rx: mpsc::UnboundedReceiver<AlarmFired>,
) {
    let label = detector.label().to_string();
    debug!(connection = %label, "Monitor loop starting");

    loop {
        tokio::select! {
            Some(fired) = fire_rx.recv() => {
                deliver_fire(&mut detector, &mut delegate, fired);
            }
            command = cmd_rx.recv() => {
                let Some(command) = command else {
                    debug!(connection = %label, "All monitor handles dropped");
                    break;
                };
                match command {
                    MonitorCommand::ForwardProgress { pto, reply } => {
                        let now = detector.clock().now();
                        let result = detector
                            .restart_with(config.deadlines(now, pto))
                            .map_err(Error::from);
                        let _ = reply.send(result);
                    }
                    MonitorCommand::Restart { deadlines, reply } => {
                        let result = detector.restart_with(deadlines).map_err(Error::from);
                        let _ = reply.send(result);
                    }
                    MonitorCommand::Stop { permanent, reply } => {
                        detector.stop_detection(permanent);
                        let _ = reply.send(());
                    }
                    MonitorCommand::Status { reply } => {
                        let _ = reply.send(MonitorStatus {
                            state: detector.state(),
                            alarm_deadline: detector.alarm().deadline(),
                            now: detector.clock().now(),
                        });
                    }
                    MonitorCommand::Shutdown => {
                        debug!(connection = %label, "Monitor shutdown requested");
                        break;
                    }
                }
            }
        }
    }

    if detector.is_detection_in_progress() {
        warn!(connection = %label, state = %detector.state(), "Monitor stopped with detection in progress");
    }
    detector.stop_detection(true);
    debug!(connection = %label, "Monitor loop ended");
}
