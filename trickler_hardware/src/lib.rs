//! Device backends for the trickler: serial scales, the motor PWM pin, the
//! status LED and a simulated rig for development without hardware.

pub mod error;
pub mod serial;
pub mod sim;

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod led;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod pwm;

pub use error::HwError;
pub use serial::SerialPortLink;
pub use sim::{SimUnit, SimulatedLed, SimulatedPwm, SimulatedRig, SimulatedScaleLink};
