//! Simulated trickler rig.
//!
//! A `SimulatedScaleLink` and a `SimulatedPwm` share one physical model: while
//! the PWM duty is non-zero every scale read adds `flow * duty` to the pan.
//! The link speaks the A&D line format (`ST,+00012.34 GN`) and answers the
//! `U\r\n` mode command by switching between grains and grams.
//!
//! Weights are kept in ten-thousandths of the active unit.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use trickler_traits::{BoxError, Indicator, LedMode, PwmOutput, SerialLink};

use crate::error::HwError;

/// Grains per gram, scaled by 1e7.
const GRAINS_PER_GRAM_E7: i64 = 154_323_584;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimUnit {
    Grains,
    Grams,
}

#[derive(Debug)]
struct SimState {
    weight_e4: i64,
    unit: SimUnit,
    duty: f32,
    flow_e4: i64,
    pending: VecDeque<Vec<u8>>,
    pwm_closed: bool,
}

/// Shared handle to the simulated physics; clones observe the same pan.
#[derive(Debug, Clone)]
pub struct SimulatedRig {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedRig {
    /// `flow_e4` is the weight added per scale read at full duty.
    pub fn new(unit: SimUnit, start_weight_e4: i64, flow_e4: i64) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                weight_e4: start_weight_e4,
                unit,
                duty: 0.0,
                flow_e4,
                pending: VecDeque::new(),
                pwm_closed: false,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn scale_link(&self) -> SimulatedScaleLink {
        SimulatedScaleLink { rig: self.clone() }
    }

    pub fn pwm(&self) -> SimulatedPwm {
        SimulatedPwm { rig: self.clone() }
    }

    pub fn weight_e4(&self) -> i64 {
        self.lock().weight_e4
    }

    pub fn set_weight_e4(&self, weight_e4: i64) {
        self.lock().weight_e4 = weight_e4;
    }

    pub fn unit(&self) -> SimUnit {
        self.lock().unit
    }

    pub fn duty(&self) -> f32 {
        self.lock().duty
    }

    pub fn pwm_closed(&self) -> bool {
        self.lock().pwm_closed
    }
}

pub struct SimulatedScaleLink {
    rig: SimulatedRig,
}

impl SerialLink for SimulatedScaleLink {
    fn clear_input(&mut self) -> Result<(), BoxError> {
        Ok(())
    }

    fn read_line(&mut self) -> Result<Vec<u8>, BoxError> {
        let mut s = self.rig.lock();
        if let Some(line) = s.pending.pop_front() {
            return Ok(line);
        }
        let running = s.duty > 0.0;
        if running {
            let added = (s.flow_e4 as f64 * f64::from(s.duty)).round() as i64;
            s.weight_e4 = s.weight_e4.saturating_add(added.max(1));
        }
        Ok(format_and_line(running, s.weight_e4, s.unit).into_bytes())
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), BoxError> {
        let mut s = self.rig.lock();
        if bytes == b"U\r\n" {
            let (weight_e4, unit) = match s.unit {
                SimUnit::Grams => (
                    s.weight_e4.saturating_mul(GRAINS_PER_GRAM_E7) / 10_000_000,
                    SimUnit::Grains,
                ),
                SimUnit::Grains => (
                    s.weight_e4.saturating_mul(10_000_000) / GRAINS_PER_GRAM_E7,
                    SimUnit::Grams,
                ),
            };
            s.weight_e4 = weight_e4;
            s.unit = unit;
            s.pending.push_back(b"AK,\r\n".to_vec());
            tracing::debug!(?unit, "simulated scale switched unit");
        } else {
            tracing::debug!(cmd = ?bytes, "simulated scale ignored command");
        }
        Ok(())
    }
}

/// Render a reading in the A&D frame layout: 2-char header, comma, 9-char
/// signed data field, 3-char unit field, CRLF.
fn format_and_line(unstable: bool, weight_e4: i64, unit: SimUnit) -> String {
    let header = if unstable { "US" } else { "ST" };
    let sign = if weight_e4 < 0 { '-' } else { '+' };
    let mag = weight_e4.unsigned_abs();
    let (data, unit_field) = match unit {
        // 0.02 gr display resolution
        SimUnit::Grains => {
            let hundredths = (mag / 100) / 2 * 2;
            (
                format!("{sign}{:05}.{:02}", hundredths / 100, hundredths % 100),
                " GN",
            )
        }
        SimUnit::Grams => (format!("{sign}{:03}.{:04}", mag / 10_000, mag % 10_000), "  g"),
    };
    format!("{header},{data}{unit_field}\r\n")
}

pub struct SimulatedPwm {
    rig: SimulatedRig,
}

impl PwmOutput for SimulatedPwm {
    fn set_duty(&mut self, duty: f32) -> Result<(), BoxError> {
        let mut s = self.rig.lock();
        if s.pwm_closed {
            return Err(Box::new(HwError::Closed));
        }
        s.duty = duty;
        Ok(())
    }

    fn close(&mut self) -> Result<(), BoxError> {
        let mut s = self.rig.lock();
        s.duty = 0.0;
        s.pwm_closed = true;
        Ok(())
    }
}

/// LED that only reports the mode it was asked to show.
#[derive(Debug, Default)]
pub struct SimulatedLed {
    pub mode: Option<LedMode>,
}

impl Indicator for SimulatedLed {
    fn apply(&mut self, mode: LedMode) -> Result<(), BoxError> {
        tracing::info!(?mode, "status led (simulated)");
        self.mode = Some(mode);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_and_frames() {
        assert_eq!(
            format_and_line(false, 123_400, SimUnit::Grains),
            "ST,+00012.34 GN\r\n"
        );
        assert_eq!(
            format_and_line(true, 95_000, SimUnit::Grams),
            "US,+009.5000  g\r\n"
        );
        assert_eq!(
            format_and_line(false, -500, SimUnit::Grams),
            "ST,-000.0500  g\r\n"
        );
    }

    #[test]
    fn weight_grows_only_while_duty_is_set() {
        let rig = SimulatedRig::new(SimUnit::Grams, 0, 1_000);
        let mut link = rig.scale_link();
        let mut pwm = rig.pwm();
        link.read_line().unwrap();
        assert_eq!(rig.weight_e4(), 0);
        pwm.set_duty(0.5).unwrap();
        link.read_line().unwrap();
        assert_eq!(rig.weight_e4(), 500);
        pwm.set_duty(0.0).unwrap();
        link.read_line().unwrap();
        assert_eq!(rig.weight_e4(), 500);
    }

    #[test]
    fn mode_command_switches_unit_and_acknowledges() {
        let rig = SimulatedRig::new(SimUnit::Grams, 10_000, 0);
        let mut link = rig.scale_link();
        link.write_all(b"U\r\n").unwrap();
        assert_eq!(rig.unit(), SimUnit::Grains);
        assert_eq!(link.read_line().unwrap(), b"AK,\r\n".to_vec());
        // 1 g ~ 15.43 gr
        assert_eq!(
            String::from_utf8(link.read_line().unwrap()).unwrap(),
            "ST,+00015.42 GN\r\n"
        );
    }

    #[test]
    fn closed_pwm_rejects_duty() {
        let rig = SimulatedRig::new(SimUnit::Grams, 0, 0);
        let mut pwm = rig.pwm();
        pwm.close().unwrap();
        assert!(rig.pwm_closed());
        assert!(pwm.set_duty(0.2).is_err());
    }
}
