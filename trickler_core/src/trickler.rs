//! Trickle control loop.
//!
//! Outer loop (IDLE): refresh the scale, reconcile its unit with the target
//! unit, and arm once the pan is on, stable, below target and auto mode is
//! on. ARMED waits a short delay, then DISPENSING drives the motor from the
//! PID output until one of the exit conditions holds. Every exit from
//! DISPENSING turns the motor off and clears the PID, whatever the cause.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use eyre::WrapErr;
use trickler_traits::{PwmOutput, SerialLink};

use crate::SharedClock;
use crate::decimal::Decimal;
use crate::error::{Result, TricklerError};
use crate::motor::MotorActuator;
use crate::pid::{Pid, SETPOINT_PERCENT};
use crate::reading::Unit;
use crate::scale::ScaleController;
use crate::store::{ControlState, SharedState};
use crate::tune::PidTuneLog;

/// Set from a signal handler to stop every loop at its next check.
pub type ShutdownFlag = Arc<AtomicBool>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Armed,
    Dispensing,
}

/// Why a dispensing cycle ended. None of these are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    AutoModeOff,
    UnitMismatch,
    PanRemoved,
    TargetReached,
    Shutdown,
}

impl ExitReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            ExitReason::AutoModeOff => "auto_mode_off",
            ExitReason::UnitMismatch => "unit_mismatch",
            ExitReason::PanRemoved => "pan_removed",
            ExitReason::TargetReached => "target_reached",
            ExitReason::Shutdown => "shutdown",
        }
    }
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LoopTiming {
    pub period: Duration,
    pub arm_delay: Duration,
    pub ready_poll: Duration,
}

/// Settings the run process writes at start-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitialSettings {
    pub auto_mode: bool,
    pub target_weight: Decimal,
    pub target_unit: Unit,
}

impl Default for InitialSettings {
    fn default() -> Self {
        Self {
            auto_mode: false,
            target_weight: Decimal::ZERO,
            target_unit: Unit::Grains,
        }
    }
}

pub struct Trickler<L: SerialLink, P: PwmOutput> {
    scale: ScaleController<L>,
    motor: MotorActuator<P>,
    pid: Pid,
    state: SharedState,
    clock: SharedClock,
    timing: LoopTiming,
    shutdown: ShutdownFlag,
    tune_log: Option<PidTuneLog>,
    phase: Phase,
}

impl<L: SerialLink, P: PwmOutput> Trickler<L, P> {
    pub fn new(
        scale: ScaleController<L>,
        motor: MotorActuator<P>,
        mut pid: Pid,
        state: SharedState,
        clock: SharedClock,
        timing: LoopTiming,
    ) -> Self {
        pid.set_setpoint(SETPOINT_PERCENT);
        Self {
            scale,
            motor,
            pid,
            state,
            clock,
            timing,
            shutdown: Arc::new(AtomicBool::new(false)),
            tune_log: None,
            phase: Phase::Idle,
        }
    }

    pub fn with_shutdown(mut self, flag: ShutdownFlag) -> Self {
        self.shutdown = flag;
        self
    }

    pub fn with_tune_log(mut self, log: PidTuneLog) -> Self {
        self.tune_log = Some(log);
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn scale(&self) -> &ScaleController<L> {
        &self.scale
    }

    pub fn motor(&self) -> &MotorActuator<P> {
        &self.motor
    }

    pub fn pid(&self) -> &Pid {
        &self.pid
    }

    fn stopping(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Sleep out whatever is left of one period since `started`.
    fn pace(&self, started: Instant) {
        let spent = self.clock.now().saturating_duration_since(started);
        if let Some(rest) = self.timing.period.checked_sub(spent) {
            self.clock.sleep(rest);
        }
    }

    pub fn publish_initial(&self, init: &InitialSettings) -> Result<()> {
        self.state.set_target_weight(init.target_weight)?;
        self.state.set_target_unit(init.target_unit)?;
        self.state.set_auto_mode(init.auto_mode)?;
        Ok(())
    }

    /// Poll the store until every setting is present. `None` if shutdown was
    /// requested first.
    pub fn wait_until_ready(&self) -> Result<Option<ControlState>> {
        loop {
            if self.stopping() {
                return Ok(None);
            }
            let cs = self.state.control_state()?;
            if cs.is_ready() {
                return Ok(Some(cs));
            }
            tracing::debug!("waiting for settings in shared state");
            self.clock.sleep(self.timing.ready_poll);
        }
    }

    /// One outer-loop iteration. Returns the exit reason when a dispensing
    /// cycle ran.
    pub fn tick(&mut self) -> Result<Option<ExitReason>> {
        let cs = self.state.control_state()?;
        let (Some(auto_mode), Some(target_weight), Some(target_unit)) =
            (cs.auto_mode, cs.target_weight, cs.target_unit)
        else {
            tracing::debug!("settings not ready");
            return Ok(None);
        };

        self.scale.update()?;
        if self.scale.unit() != target_unit {
            tracing::info!(scale_unit = %self.scale.unit(), %target_unit, "reconciling scale unit");
            self.scale.change_unit()?;
        }

        let weight = self.scale.weight();
        tracing::debug!(
            target = %target_weight,
            %target_unit,
            scale = %weight,
            scale_unit = %self.scale.unit(),
            auto_mode,
            "idle"
        );

        let armed = !weight.is_negative()
            && weight < target_weight
            && self.scale.unit() == target_unit
            && self.scale.is_stable()
            && auto_mode;
        if !armed {
            return Ok(None);
        }

        self.phase = Phase::Armed;
        tracing::info!(target = %target_weight, %target_unit, "armed");
        self.clock.sleep(self.timing.arm_delay);
        self.dispense(target_weight, target_unit).map(Some)
    }

    /// Run the dispensing phase to completion. Motor off and PID cleared on
    /// every exit, including errors.
    pub fn dispense(&mut self, target_weight: Decimal, target_unit: Unit) -> Result<ExitReason> {
        self.phase = Phase::Dispensing;
        tracing::info!(target = %target_weight, %target_unit, "starting trickling");
        let outcome = self.dispense_until_exit(target_weight, target_unit);

        let off = self.motor.off();
        self.pid.clear();
        self.phase = Phase::Idle;

        match &outcome {
            Ok(reason) => tracing::info!(reason = %reason, "trickling stopped"),
            Err(e) => {
                tracing::error!(error = %e, "trickling aborted");
                if let Err(off_err) = &off {
                    tracing::error!(error = %off_err, "motor off failed after abort");
                }
            }
        }
        let reason = outcome?;
        off.wrap_err("stopping motor")?;
        Ok(reason)
    }

    fn dispense_until_exit(&mut self, target_weight: Decimal, target_unit: Unit) -> Result<ExitReason> {
        loop {
            let started = self.clock.now();
            if self.stopping() {
                return Ok(ExitReason::Shutdown);
            }
            if self.state.auto_mode()? != Some(true) {
                tracing::debug!("auto mode disabled");
                return Ok(ExitReason::AutoModeOff);
            }

            self.scale.update()?;
            if self.scale.unit() != target_unit {
                tracing::debug!("target unit does not match scale unit");
                return Ok(ExitReason::UnitMismatch);
            }
            let weight = self.scale.weight();
            if weight.is_negative() {
                tracing::debug!("pan removed");
                return Ok(ExitReason::PanRemoved);
            }

            let remainder = target_weight.checked_sub(weight).ok_or_else(|| {
                TricklerError::State(format!("remainder of {target_weight} - {weight} overflows"))
            })?;
            let ratio = weight.ratio(target_weight).unwrap_or(1.0);

            if let Some(log) = self.tune_log.as_mut() {
                log.record(self.motor.speed(), ratio)?;
            }

            if remainder <= Decimal::ZERO {
                tracing::debug!("target reached");
                return Ok(ExitReason::TargetReached);
            }

            let output = self.pid.update(ratio * 100.0);
            self.motor.update(output)?;
            tracing::info!(
                remainder = %remainder,
                unit = %target_unit,
                scale = %weight,
                motor = self.motor.speed(),
                pid_output = output,
                "trickling"
            );
            self.pace(started);
        }
    }

    /// Run until shutdown. With `once`, return after the first dispensing
    /// cycle instead.
    pub fn run(&mut self, once: bool) -> Result<Option<ExitReason>> {
        let mut last = None;
        while !self.stopping() {
            let started = self.clock.now();
            if let Some(reason) = self.tick()? {
                last = Some(reason);
                if once {
                    break;
                }
            }
            self.pace(started);
        }
        Ok(last)
    }
}
