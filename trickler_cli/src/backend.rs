//! Device and store assembly: real hardware behind the `hardware` feature,
//! the simulated rig otherwise.

use std::sync::Arc;
use std::time::Duration;

use trickler_config::{Config, StoreBackend, StoreCfg};
use trickler_core::error::Result;
use trickler_core::store::{MemcacheStore, MemoryStore};
use trickler_core::{SharedState, StateStore};
use trickler_traits::{Indicator, PwmOutput, SerialLink};

pub type BoxLink = Box<dyn SerialLink + Send>;
pub type BoxPwm = Box<dyn PwmOutput + Send>;
pub type BoxLed = Box<dyn Indicator + Send>;

pub fn open_state(cfg: &StoreCfg) -> Result<SharedState> {
    let store: Arc<dyn StateStore> = match cfg.backend {
        StoreBackend::Memcache => Arc::new(MemcacheStore::connect(
            &cfg.server,
            Duration::from_millis(cfg.connect_timeout_ms),
            Duration::from_millis(cfg.timeout_ms),
        )?),
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
    };
    tracing::debug!(backend = ?cfg.backend, prefix = %cfg.prefix, "shared state store open");
    Ok(SharedState::with_prefix(store, cfg.prefix.clone()))
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
mod devices {
    use super::*;
    use trickler_core::hw_error::to_report;
    use trickler_hardware::SerialPortLink;
    use trickler_hardware::led::GpioLed;
    use trickler_hardware::pwm::GpioPwm;

    pub fn scale_link(cfg: &Config) -> Result<BoxLink> {
        let link = SerialPortLink::open(
            &cfg.scale.port,
            cfg.scale.baudrate,
            Duration::from_millis(cfg.scale.timeout_ms),
        )
        .map_err(|e| to_report(Box::new(e)))?;
        Ok(Box::new(link))
    }

    pub fn motor_pwm(cfg: &Config) -> Result<BoxPwm> {
        let pwm = GpioPwm::open(cfg.motor.pin, cfg.motor.pwm_frequency_hz)
            .map_err(|e| to_report(Box::new(e)))?;
        Ok(Box::new(pwm))
    }

    pub fn scale_and_motor(cfg: &Config) -> Result<(BoxLink, BoxPwm)> {
        Ok((scale_link(cfg)?, motor_pwm(cfg)?))
    }

    pub fn status_led(cfg: &Config) -> Result<BoxLed> {
        let led = GpioLed::open(cfg.leds.pin, cfg.leds.active_high)
            .map_err(|e| to_report(Box::new(e)))?;
        Ok(Box::new(led))
    }
}

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
mod devices {
    use super::*;
    use trickler_hardware::{SimUnit, SimulatedLed, SimulatedRig};

    /// Ten-thousandths of a unit added per scale read at full duty.
    const DEFAULT_FLOW_E4: i64 = 1_000;

    fn env_i64(name: &str, default: i64) -> i64 {
        std::env::var(name)
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    pub fn rig() -> SimulatedRig {
        let start = env_i64("TRICKLER_SIM_START", 0);
        let flow = env_i64("TRICKLER_SIM_FLOW", DEFAULT_FLOW_E4);
        tracing::info!(start_e4 = start, flow_e4 = flow, "using simulated scale and motor");
        SimulatedRig::new(SimUnit::Grains, start, flow)
    }

    pub fn scale_link(_cfg: &Config) -> Result<BoxLink> {
        Ok(Box::new(rig().scale_link()))
    }

    pub fn motor_pwm(_cfg: &Config) -> Result<BoxPwm> {
        Ok(Box::new(rig().pwm()))
    }

    /// Both halves share one rig so motor duty moves the simulated pan.
    pub fn scale_and_motor(_cfg: &Config) -> Result<(BoxLink, BoxPwm)> {
        let rig = rig();
        Ok((Box::new(rig.scale_link()), Box::new(rig.pwm())))
    }

    pub fn status_led(_cfg: &Config) -> Result<BoxLed> {
        Ok(Box::new(SimulatedLed::default()))
    }
}

pub use devices::{motor_pwm, scale_and_motor, scale_link, status_led};
