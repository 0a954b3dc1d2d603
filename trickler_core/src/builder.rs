//! Assembles a `Trickler` from a loaded `Config` and its hardware seams.

use std::sync::Arc;

use trickler_config::Config;
use trickler_traits::{MonotonicClock, PwmOutput, SerialLink};

use crate::SharedClock;
use crate::error::{BuildError, Result};
use crate::motor::MotorActuator;
use crate::pid::Pid;
use crate::protocol::ScaleModel;
use crate::scale::ScaleController;
use crate::store::SharedState;
use crate::trickler::{LoopTiming, ShutdownFlag, Trickler};
use crate::tune::PidTuneLog;

pub struct TricklerBuilder<L, P> {
    link: Option<L>,
    pwm: Option<P>,
    state: Option<SharedState>,
    clock: Option<SharedClock>,
    shutdown: Option<ShutdownFlag>,
    tune_log: Option<PidTuneLog>,
}

impl<L, P> Default for TricklerBuilder<L, P> {
    fn default() -> Self {
        Self {
            link: None,
            pwm: None,
            state: None,
            clock: None,
            shutdown: None,
            tune_log: None,
        }
    }
}

impl<L: SerialLink, P: PwmOutput> TricklerBuilder<L, P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_link(mut self, link: L) -> Self {
        self.link = Some(link);
        self
    }

    pub fn with_pwm(mut self, pwm: P) -> Self {
        self.pwm = Some(pwm);
        self
    }

    pub fn with_state(mut self, state: SharedState) -> Self {
        self.state = Some(state);
        self
    }

    /// Defaults to `MonotonicClock`.
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_shutdown(mut self, flag: ShutdownFlag) -> Self {
        self.shutdown = Some(flag);
        self
    }

    pub fn with_tune_log(mut self, log: PidTuneLog) -> Self {
        self.tune_log = Some(log);
        self
    }

    pub fn build(self, cfg: &Config) -> Result<Trickler<L, P>> {
        let link = self.link.ok_or(BuildError::MissingLink)?;
        let pwm = self.pwm.ok_or(BuildError::MissingPwm)?;
        let state = self.state.ok_or(BuildError::MissingStore)?;
        if cfg.scale.stable_reading_length == 0 {
            return Err(BuildError::InvalidConfig("scale.stable_reading_length must be > 0").into());
        }
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(MonotonicClock::new()) as SharedClock);

        let model = ScaleModel::from(cfg.scale.model);
        let scale = ScaleController::new(link, model, state.clone(), clock.clone(), &cfg.scale)?;
        let motor = MotorActuator::new(pwm, state.clone(), &cfg.motor)?;
        let pid = Pid::from_config(&cfg.pid, clock.clone());

        let mut trickler = Trickler::new(scale, motor, pid, state, clock, LoopTiming::from(&cfg.control));
        if let Some(flag) = self.shutdown {
            trickler = trickler.with_shutdown(flag);
        }
        if let Some(log) = self.tune_log {
            trickler = trickler.with_tune_log(log);
        }
        Ok(trickler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{RecordingPwm, ScriptedLink};
    use trickler_traits::TestClock;

    #[test]
    fn missing_parts_are_build_errors() {
        let cfg = Config::default();
        let err = TricklerBuilder::<ScriptedLink, RecordingPwm>::new()
            .with_pwm(RecordingPwm::new())
            .with_state(SharedState::in_memory())
            .build(&cfg)
            .err()
            .unwrap();
        assert!(matches!(err.downcast_ref::<BuildError>(), Some(BuildError::MissingLink)));

        let err = TricklerBuilder::<ScriptedLink, RecordingPwm>::new()
            .with_link(ScriptedLink::new())
            .with_pwm(RecordingPwm::new())
            .build(&cfg)
            .err()
            .unwrap();
        assert!(matches!(err.downcast_ref::<BuildError>(), Some(BuildError::MissingStore)));
    }

    #[test]
    fn builds_with_config_model_and_motor_off() {
        let cfg = Config::default();
        let pwm = RecordingPwm::new();
        let state = SharedState::in_memory();
        let t = TricklerBuilder::new()
            .with_link(ScriptedLink::new())
            .with_pwm(pwm.clone())
            .with_state(state.clone())
            .with_clock(Arc::new(TestClock::new()))
            .build(&cfg)
            .unwrap();
        assert_eq!(t.scale().model(), ScaleModel::And);
        assert_eq!(pwm.last_duty(), Some(0.0));
        assert_eq!(state.motor_speed().unwrap(), Some(0.0));
    }
}
