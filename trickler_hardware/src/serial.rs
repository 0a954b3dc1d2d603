//! Serial transport for scales, backed by the `serialport` crate.

use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use serialport::{ClearBuffer, SerialPort};
use trickler_traits::{BoxError, SerialLink};

use crate::error::{HwError, Result};

/// Upper bound on a single line; scale frames are well under 32 bytes.
const MAX_LINE_LEN: usize = 256;

pub struct SerialPortLink {
    port: Box<dyn SerialPort>,
    name: String,
}

impl SerialPortLink {
    /// Open `port` at `baudrate`. Reads give up after `timeout` and return
    /// whatever arrived so far, like a blocking readline with a deadline.
    pub fn open(port: &str, baudrate: u32, timeout: Duration) -> Result<Self> {
        let handle = serialport::new(port, baudrate)
            .timeout(timeout)
            .open()
            .map_err(|source| HwError::SerialOpen {
                port: port.to_string(),
                source,
            })?;
        tracing::debug!(port, baudrate, timeout_ms = timeout.as_millis() as u64, "serial port open");
        Ok(Self {
            port: handle,
            name: port.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl SerialLink for SerialPortLink {
    fn clear_input(&mut self) -> std::result::Result<(), BoxError> {
        self.port
            .clear(ClearBuffer::Input)
            .map_err(|e| Box::new(HwError::from(e)) as BoxError)
    }

    fn read_line(&mut self) -> std::result::Result<Vec<u8>, BoxError> {
        let mut line = Vec::with_capacity(32);
        let mut byte = [0u8; 1];
        while line.len() < MAX_LINE_LEN {
            match self.port.read(&mut byte) {
                Ok(0) => break,
                Ok(_) => {
                    line.push(byte[0]);
                    if byte[0] == b'\n' {
                        break;
                    }
                }
                Err(e) if e.kind() == ErrorKind::TimedOut => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(Box::new(HwError::Io(e))),
            }
        }
        Ok(line)
    }

    fn write_all(&mut self, bytes: &[u8]) -> std::result::Result<(), BoxError> {
        self.port
            .write_all(bytes)
            .and_then(|()| self.port.flush())
            .map_err(|e| Box::new(HwError::Io(e)) as BoxError)
    }
}

impl Drop for SerialPortLink {
    fn drop(&mut self) {
        tracing::debug!(port = %self.name, "closing serial port");
    }
}
