//! PID controller over a percentage-of-target process variable.

use std::time::Instant;

use trickler_config::PidCfg;

use crate::SharedClock;

/// Default setpoint: the loop expresses weight as percent of target.
pub const SETPOINT_PERCENT: f64 = 100.0;

pub struct Pid {
    kp: f64,
    ki: f64,
    kd: f64,
    setpoint: f64,
    integral: f64,
    prev_error: f64,
    last_update: Option<Instant>,
    output: f64,
    output_min: f64,
    output_max: f64,
    /// Absolute bound on `integral`.
    windup_guard: f64,
    clock: SharedClock,
}

impl std::fmt::Debug for Pid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pid")
            .field("kp", &self.kp)
            .field("ki", &self.ki)
            .field("kd", &self.kd)
            .field("setpoint", &self.setpoint)
            .field("integral", &self.integral)
            .field("prev_error", &self.prev_error)
            .field("output", &self.output)
            .finish_non_exhaustive()
    }
}

impl Pid {
    pub fn new(kp: f64, ki: f64, kd: f64, clock: SharedClock) -> Self {
        Self {
            kp,
            ki,
            kd,
            setpoint: SETPOINT_PERCENT,
            integral: 0.0,
            prev_error: 0.0,
            last_update: None,
            output: 0.0,
            output_min: 0.0,
            output_max: 100.0,
            windup_guard: 20.0,
            clock,
        }
    }

    pub fn from_config(cfg: &PidCfg, clock: SharedClock) -> Self {
        Self::new(cfg.kp, cfg.ki, cfg.kd, clock)
            .with_output_limits(cfg.output_min, cfg.output_max)
            .with_windup_guard(cfg.windup_guard)
    }

    pub fn with_output_limits(mut self, min: f64, max: f64) -> Self {
        self.output_min = min;
        self.output_max = max;
        self
    }

    pub fn with_windup_guard(mut self, guard: f64) -> Self {
        self.windup_guard = guard.abs();
        self
    }

    pub fn set_setpoint(&mut self, setpoint: f64) {
        self.setpoint = setpoint;
    }

    pub fn setpoint(&self) -> f64 {
        self.setpoint
    }

    pub fn integral(&self) -> f64 {
        self.integral
    }

    /// Output of the most recent `update`, 0 after `clear`.
    pub fn output(&self) -> f64 {
        self.output
    }

    pub fn coefficients(&self) -> (f64, f64, f64) {
        (self.kp, self.ki, self.kd)
    }

    /// Feed one measurement and return the clamped control output.
    ///
    /// The first call after construction or `clear`, and any call where the
    /// clock did not move forward, uses `dt = 0`: no integration and no
    /// derivative kick.
    pub fn update(&mut self, process_variable: f64) -> f64 {
        let now = self.clock.now();
        let error = self.setpoint - process_variable;
        let dt = self
            .last_update
            .and_then(|prev| now.checked_duration_since(prev))
            .map_or(0.0, |d| d.as_secs_f64());

        self.integral =
            (self.integral + error * dt).clamp(-self.windup_guard, self.windup_guard);
        let derivative = if dt > 0.0 {
            (error - self.prev_error) / dt
        } else {
            0.0
        };

        let raw = self.kp * error + self.ki * self.integral + self.kd * derivative;
        self.output = raw.clamp(self.output_min, self.output_max);
        self.prev_error = error;
        self.last_update = Some(now);
        tracing::trace!(error, dt, integral = self.integral, derivative, output = self.output, "pid");
        self.output
    }

    /// Forget integral, derivative and timing history. Coefficients and
    /// setpoint are kept.
    pub fn clear(&mut self) {
        self.integral = 0.0;
        self.prev_error = 0.0;
        self.last_update = None;
        self.output = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use trickler_traits::TestClock;

    fn pid(kp: f64, ki: f64, kd: f64) -> (Pid, TestClock) {
        let clock = TestClock::new();
        (Pid::new(kp, ki, kd, Arc::new(clock.clone())), clock)
    }

    #[test]
    fn first_update_is_proportional_only() {
        let (mut p, _) = pid(2.0, 5.0, 7.0);
        // error = 100 - 95 = 5
        assert_eq!(p.update(95.0), 10.0);
        assert_eq!(p.integral(), 0.0);
    }

    #[test]
    fn integrates_over_elapsed_time() {
        let (mut p, clock) = pid(0.0, 1.0, 0.0);
        p.update(90.0);
        clock.advance(Duration::from_millis(500));
        // integral = 10 * 0.5
        assert_eq!(p.update(90.0), 5.0);
        assert_eq!(p.integral(), 5.0);
    }

    #[test]
    fn derivative_reacts_to_error_change() {
        let (mut p, clock) = pid(0.0, 0.0, 1.0);
        p.update(90.0);
        clock.advance(Duration::from_secs(1));
        // error 10 -> 20 over 1s; output would be +10
        assert_eq!(p.update(80.0), 10.0);
        clock.advance(Duration::from_secs(1));
        // error 20 -> 10; negative derivative clamps to 0
        assert_eq!(p.update(90.0), 0.0);
    }

    #[test]
    fn windup_guard_bounds_integral() {
        let (mut p, clock) = pid(0.0, 1.0, 0.0);
        let mut p2 = Pid::new(0.0, 1.0, 0.0, Arc::new(clock.clone())).with_windup_guard(3.0);
        p.update(0.0);
        p2.update(0.0);
        clock.advance(Duration::from_secs(10));
        p.update(0.0);
        p2.update(0.0);
        assert_eq!(p.integral(), 20.0);
        assert_eq!(p2.integral(), 3.0);
    }

    #[test]
    fn output_is_clamped() {
        let (mut p, _) = pid(10.0, 0.0, 0.0);
        assert_eq!(p.update(0.0), 100.0);
        assert_eq!(p.update(200.0), 0.0);
        let (p2, _) = pid(10.0, 0.0, 0.0);
        let mut p2 = p2.with_output_limits(15.0, 50.0);
        assert_eq!(p2.update(99.0), 15.0);
    }

    #[test]
    fn same_instant_updates_skip_derivative_and_integral() {
        let (mut p, clock) = pid(1.0, 1.0, 5.0);
        p.update(90.0);
        clock.advance(Duration::from_secs(1));
        p.update(90.0);
        let integral = p.integral();
        // error jumps 10 -> 40 with no time passing
        assert_eq!(p.update(60.0), 40.0 + integral);
        assert_eq!(p.update(60.0), 40.0 + integral);
        assert_eq!(p.integral(), integral);
    }

    #[test]
    fn clock_moving_backwards_is_treated_as_zero_dt() {
        let (mut p, clock) = pid(1.0, 1.0, 5.0);
        p.update(90.0);
        clock.advance(Duration::from_secs(2));
        p.update(90.0);
        let integral = p.integral();
        assert_eq!(integral, 20.0);
        clock.set_offset(Duration::from_secs(1));
        // error 10 -> 30; a negative dt must not produce a derivative term
        assert_eq!(p.update(70.0), 30.0 + integral);
        assert_eq!(p.integral(), integral);
    }

    #[test]
    fn clear_keeps_coefficients_and_setpoint() {
        let (mut p, clock) = pid(1.5, 2.0, 0.5);
        p.set_setpoint(80.0);
        p.update(10.0);
        clock.advance(Duration::from_secs(1));
        p.update(20.0);
        p.clear();
        assert_eq!(p.integral(), 0.0);
        assert_eq!(p.output(), 0.0);
        assert_eq!(p.coefficients(), (1.5, 2.0, 0.5));
        assert_eq!(p.setpoint(), 80.0);
    }
}
