#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Closed-loop powder trickler (hardware-agnostic).
//!
//! All device access goes through the `trickler_traits` seams: a serial
//! link to the scale, a PWM output for the motor and an indicator for the
//! status LED. Processes coordinate only through the shared key/value
//! state in [`store`].
//!
//! ## Architecture
//!
//! - **Protocol**: per-vendor line decoders (`protocol` module)
//! - **Scale**: owns the link and the canonical reading (`scale`)
//! - **Motor**: clamped duty output, mirrored into shared state (`motor`)
//! - **Control**: PID plus the IDLE/ARMED/DISPENSING loop (`pid`, `trickler`)
//! - **Indicators**: status LED and the BLE settings bridge (`led`, `ble`)
//!
//! ## Exact weights
//!
//! Weights are [`Decimal`] values. Comparisons against the target never go
//! through floating point; only the PID input (a percentage) is an `f64`.

pub mod ble;
pub mod builder;
pub mod conversions;
pub mod decimal;
pub mod error;
pub mod hw_error;
pub mod led;
pub mod mocks;
pub mod motor;
pub mod pid;
pub mod protocol;
pub mod reading;
pub mod scale;
pub mod settings;
pub mod stability;
pub mod store;
pub mod trickler;
pub mod tune;

use std::sync::Arc;

use trickler_traits::Clock;

/// Clock handle shared by every loop that sleeps or measures time.
pub type SharedClock = Arc<dyn Clock + Send + Sync>;

pub use builder::TricklerBuilder;
pub use decimal::Decimal;
pub use error::{BuildError, DecodeError, Result, TricklerError};
pub use led::{LedPatterns, StatusLed, TricklerStatus};
pub use motor::MotorActuator;
pub use pid::Pid;
pub use protocol::{ScaleDecoder, ScaleModel};
pub use reading::{Reading, ScaleStatus, Unit};
pub use scale::ScaleController;
pub use settings::{Settings, SettingsUpdate};
pub use store::{Key, SharedState, StateStore};
pub use trickler::{ExitReason, InitialSettings, LoopTiming, Phase, ShutdownFlag, Trickler};
pub use tune::PidTuneLog;
