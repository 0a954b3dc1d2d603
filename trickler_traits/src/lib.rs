//! Hardware seams shared by the trickler crates.
//!
//! Implementations live in `trickler_hardware` (serial port, Raspberry Pi PWM,
//! simulation) and in test fakes; `trickler_core` only sees these traits.

pub mod clock;

pub use clock::{Clock, MonotonicClock, TestClock};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Line-oriented serial connection to a scale.
pub trait SerialLink {
    /// Discard anything buffered on the input side.
    fn clear_input(&mut self) -> Result<(), BoxError>;
    /// Read one line including its terminator. Returns an empty buffer when the
    /// configured read timeout expires before any byte arrives.
    fn read_line(&mut self) -> Result<Vec<u8>, BoxError>;
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), BoxError>;
}

/// PWM-capable digital output driving the trickler motor.
pub trait PwmOutput {
    /// Apply a duty cycle in `[0.0, 1.0]`.
    fn set_duty(&mut self, duty: f32) -> Result<(), BoxError>;
    /// Release the underlying pin. Called once, after the output was driven to 0.
    fn close(&mut self) -> Result<(), BoxError>;
}

/// Blink style of the status LED.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedMode {
    Off,
    On,
    FastBlink,
    SlowBlink,
    Pulse,
}

/// Status LED output.
pub trait Indicator {
    fn apply(&mut self, mode: LedMode) -> Result<(), BoxError>;
}

impl<T: SerialLink + ?Sized> SerialLink for Box<T> {
    fn clear_input(&mut self) -> Result<(), BoxError> {
        (**self).clear_input()
    }
    fn read_line(&mut self) -> Result<Vec<u8>, BoxError> {
        (**self).read_line()
    }
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), BoxError> {
        (**self).write_all(bytes)
    }
}

impl<T: PwmOutput + ?Sized> PwmOutput for Box<T> {
    fn set_duty(&mut self, duty: f32) -> Result<(), BoxError> {
        (**self).set_duty(duty)
    }
    fn close(&mut self) -> Result<(), BoxError> {
        (**self).close()
    }
}

impl<T: Indicator + ?Sized> Indicator for Box<T> {
    fn apply(&mut self, mode: LedMode) -> Result<(), BoxError> {
        (**self).apply(mode)
    }
}
