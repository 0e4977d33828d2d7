use std::io;
use thiserror::Error;

/// A type alias for handling `Result`s with `Error`
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while running connection monitors
#[derive(Error, Debug)]
pub enum Error {
    /// Error originating from the detector core (contract violations, bad config).
    #[error("Detector error: {0}")]
    Detector(#[from] pathwatch_detector_core::Error),

    /// The monitor task is gone (shut down or panicked).
    #[error("Monitor channel closed")]
    ChannelClosed,

    /// The monitor task panicked or was aborted.
    #[error("Monitor task failed: {0}")]
    TaskFailed(String),

    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file could not be parsed.
    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// Configuration could not be rendered.
    #[error("TOML render error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// Logging could not be initialized.
    #[error("Logging error: {0}")]
    Logging(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for Error {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        Error::ChannelClosed
    }
}

impl From<tokio::sync::oneshot::error::RecvError> for Error {
    fn from(_: tokio::sync::oneshot::error::RecvError) -> Self {
        Error::ChannelClosed
    }
}
