use thiserror::Error;

/// A type alias for handling `Result`s with `Error`
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the path failure detector
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Detection was restarted after it had been permanently stopped.
    ///
    /// This is a contract violation on the caller's side: once a connection
    /// has torn down its detector it must not feed it forward progress again.
    #[error("detection restarted after being permanently stopped")]
    PermanentlyStopped,

    /// A detector configuration failed validation.
    #[error("invalid detector configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Whether this error signals a programmer error rather than a runtime condition
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Error::PermanentlyStopped)
    }
}
