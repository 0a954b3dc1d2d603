use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("serial port {port} could not be opened: {source}")]
    SerialOpen {
        port: String,
        #[source]
        source: serialport::Error,
    },
    #[error("serial error: {0}")]
    Serial(#[from] serialport::Error),
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("output already closed")]
    Closed,
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;
