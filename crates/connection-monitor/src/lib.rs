//! Tokio runtime support for path failure detection.
//!
//! This crate runs a [`PathFailureDetector`](pathwatch_detector_core::PathFailureDetector)
//! per connection on top of tokio timers:
//!
//! - [`TokioClock`] and [`TokioAlarm`] implement the detector's clock and
//!   alarm seams.
//! - [`ConnectionMonitor`] owns a detector inside a task and publishes
//!   [`MonitorEvent`]s.
//! - [`PathwatchConfig`] and [`setup_logging`] cover configuration files and
//!   the tracing subscriber.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use pathwatch_monitor::{ConnectionMonitor, MonitorConfig, MonitorEvent};
//!
//! # async fn example() -> pathwatch_monitor::Result<()> {
//! let (monitor, mut events) = ConnectionMonitor::spawn(MonitorConfig::default().with_label("conn-1"))?;
//!
//! // Call on every acknowledgement that shows forward progress
//! monitor.on_forward_progress(Duration::from_millis(300)).await?;
//!
//! while let Some(event) = events.recv().await {
//!     if let MonitorEvent::Closed { connection, .. } = event {
//!         println!("{} is blackholed", connection);
//!         break;
//!     }
//! }
//! monitor.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod alarm;
pub mod clock;
pub mod config;
pub mod delegate;
mod error;
pub mod logging;
pub mod monitor;

pub use alarm::{AlarmFired, TokioAlarm, TokioAlarmFactory};
pub use clock::TokioClock;
pub use config::{MonitorConfig, PathwatchConfig};
pub use delegate::{MonitorDelegate, MonitorEvent};
pub use error::{Error, Result};
pub use logging::{parse_log_level, setup_logging, LogFormat, LoggingConfig, SpanEvents};
pub use monitor::{ConnectionMonitor, MonitorStatus};
