//! Trickler motor actuator.
//!
//! Owns the PWM output exclusively. Dropping the actuator turns the motor off
//! and releases the pin, so every exit path (including unwinding panics)
//! leaves the motor stopped.

use eyre::WrapErr;
use trickler_config::MotorCfg;
use trickler_traits::PwmOutput;

use crate::error::{Result, TricklerError};
use crate::hw_error::to_report;
use crate::store::SharedState;

pub struct MotorActuator<P: PwmOutput> {
    pwm: P,
    state: SharedState,
    /// Safety bounds on the 0..=100 duty scale.
    min_pwm: f64,
    max_pwm: f64,
    speed: f64,
    released: bool,
}

impl<P: PwmOutput> MotorActuator<P> {
    /// Wrap `pwm` and drive it to 0.
    pub fn new(pwm: P, state: SharedState, cfg: &MotorCfg) -> Result<Self> {
        if !(cfg.min_pwm.is_finite() && cfg.max_pwm.is_finite()) || cfg.min_pwm > cfg.max_pwm {
            return Err(TricklerError::Config(format!(
                "motor duty bounds [{}, {}] are invalid",
                cfg.min_pwm, cfg.max_pwm
            ))
            .into());
        }
        let mut motor = Self {
            pwm,
            state,
            min_pwm: cfg.min_pwm,
            max_pwm: cfg.max_pwm,
            speed: 0.0,
            released: false,
        };
        motor.off()?;
        Ok(motor)
    }

    /// Realized speed as a fraction in `[0, 1]`.
    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn bounds(&self) -> (f64, f64) {
        (self.min_pwm, self.max_pwm)
    }

    /// Clamp a controller output (0..=100 scale) to the duty bounds and
    /// apply it. NaN is treated as the minimum duty.
    pub fn update(&mut self, target: f64) -> Result<()> {
        let duty = clamp_duty(target, self.min_pwm, self.max_pwm);
        self.set_speed(duty / 100.0)
    }

    /// Apply a speed fraction. Values outside `[0, 1]` are ignored with a
    /// warning and leave the realized speed unchanged.
    pub fn set_speed(&mut self, speed: f64) -> Result<()> {
        if !(0.0..=1.0).contains(&speed) {
            tracing::warn!(speed, "rejected motor speed outside [0, 1]");
            return Ok(());
        }
        if self.released {
            return Err(TricklerError::State("motor output already released".into()).into());
        }
        // speed is within [0, 1], so the narrowing is exact enough for a duty cycle
        self.pwm
            .set_duty(speed as f32)
            .map_err(to_report)
            .wrap_err("setting motor duty")?;
        self.speed = speed;
        self.state
            .set_motor_speed(speed)
            .wrap_err("publishing motor speed")?;
        Ok(())
    }

    pub fn off(&mut self) -> Result<()> {
        self.set_speed(0.0)
    }

    /// Turn the motor off and release the output. Idempotent.
    pub fn release(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        let off = self.off();
        self.released = true;
        let closed = self
            .pwm
            .close()
            .map_err(to_report)
            .wrap_err("releasing motor output");
        tracing::debug!("motor output released");
        off.and(closed)
    }
}

impl<P: PwmOutput> Drop for MotorActuator<P> {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            tracing::error!(error = %e, "motor shutdown failed");
        }
    }
}

/// Clamp `target` into `[min, max]`, mapping NaN to `min`.
pub fn clamp_duty(target: f64, min: f64, max: f64) -> f64 {
    if target.is_nan() {
        return min;
    }
    target.clamp(min, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::RecordingPwm;

    fn cfg(min: f64, max: f64) -> MotorCfg {
        MotorCfg {
            min_pwm: min,
            max_pwm: max,
            ..MotorCfg::default()
        }
    }

    #[test]
    fn starts_off_and_publishes_speed() {
        let pwm = RecordingPwm::default();
        let state = SharedState::in_memory();
        let motor = MotorActuator::new(pwm.clone(), state.clone(), &cfg(15.0, 100.0)).unwrap();
        assert_eq!(motor.speed(), 0.0);
        assert_eq!(pwm.duties(), vec![0.0]);
        assert_eq!(state.motor_speed().unwrap(), Some(0.0));
    }

    #[test]
    fn update_clamps_into_bounds() {
        let pwm = RecordingPwm::default();
        let state = SharedState::in_memory();
        let mut motor = MotorActuator::new(pwm.clone(), state.clone(), &cfg(15.0, 80.0)).unwrap();
        motor.update(5.0).unwrap();
        assert_eq!(motor.speed(), 0.15);
        motor.update(250.0).unwrap();
        assert_eq!(motor.speed(), 0.80);
        motor.update(f64::NAN).unwrap();
        assert_eq!(motor.speed(), 0.15);
        motor.update(42.0).unwrap();
        assert_eq!(motor.speed(), 0.42);
        assert_eq!(state.motor_speed().unwrap(), Some(0.42));
    }

    #[test]
    fn out_of_range_speed_is_ignored() {
        let pwm = RecordingPwm::default();
        let state = SharedState::in_memory();
        let mut motor = MotorActuator::new(pwm.clone(), state.clone(), &cfg(0.0, 100.0)).unwrap();
        motor.set_speed(0.5).unwrap();
        motor.set_speed(1.5).unwrap();
        motor.set_speed(-0.1).unwrap();
        motor.set_speed(f64::NAN).unwrap();
        assert_eq!(motor.speed(), 0.5);
        assert_eq!(state.motor_speed().unwrap(), Some(0.5));
        assert_eq!(pwm.duties().len(), 2);
    }

    #[test]
    fn drop_turns_off_and_closes_once() {
        let pwm = RecordingPwm::default();
        let state = SharedState::in_memory();
        {
            let mut motor =
                MotorActuator::new(pwm.clone(), state.clone(), &cfg(0.0, 100.0)).unwrap();
            motor.set_speed(0.7).unwrap();
            motor.release().unwrap();
            assert!(motor.set_speed(0.3).is_err());
        }
        assert_eq!(pwm.duties().last(), Some(&0.0));
        assert_eq!(pwm.closes(), 1);
        assert_eq!(state.motor_speed().unwrap(), Some(0.0));
    }

    #[test]
    fn rejects_inverted_bounds() {
        let err = MotorActuator::new(
            RecordingPwm::default(),
            SharedState::in_memory(),
            &cfg(60.0, 40.0),
        )
        .err()
        .unwrap();
        assert!(format!("{err}").contains("invalid"));
    }
}
