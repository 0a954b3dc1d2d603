use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum TricklerError {
    /// The scale's serial connection could not be opened.
    #[error("scale not ready: {0}")]
    ScaleNotReady(String),
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("shared state store error: {0}")]
    Store(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid state: {0}")]
    State(String),
    #[error("invalid setting: {0}")]
    InvalidSetting(String),
    #[error("timeout talking to device")]
    Timeout,
    #[error("io error: {0}")]
    Io(String),
}

/// Why a serial line was discarded. Always recoverable: the caller keeps the
/// previous reading.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("line is not valid text")]
    InvalidEncoding,
    #[error("empty line")]
    Empty,
    #[error("unrecognized line prefix {0:?}")]
    UnknownPrefix(String),
    #[error("malformed weight field {0:?}")]
    MalformedWeight(String),
    #[error("unknown unit token {0:?}")]
    UnknownUnit(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing scale link")]
    MissingLink,
    #[error("missing shared state store")]
    MissingStore,
    #[error("missing pwm output")]
    MissingPwm,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
