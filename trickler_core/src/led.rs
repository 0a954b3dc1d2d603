//! Status LED logic: derive a trickler status from shared state and show
//! the configured pattern for it.

use std::time::Duration;

use trickler_traits::{Indicator, LedMode};

use crate::SharedClock;
use crate::error::Result;
use crate::hw_error::to_report;
use crate::store::SharedState;
use crate::trickler::ShutdownFlag;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TricklerStatus {
    /// Auto mode off, motor off.
    Ready,
    /// Auto mode on, motor running.
    Running,
    /// Auto mode on, motor stopped.
    Done,
}

impl TricklerStatus {
    /// `None` for auto mode off with the motor still running: a transient
    /// state seen between two key updates.
    pub fn from_flags(auto_mode: bool, motor_on: bool) -> Option<Self> {
        match (auto_mode, motor_on) {
            (false, false) => Some(TricklerStatus::Ready),
            (true, true) => Some(TricklerStatus::Running),
            (true, false) => Some(TricklerStatus::Done),
            (false, true) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedPatterns {
    pub ready: LedMode,
    pub running: LedMode,
    pub done: LedMode,
}

impl LedPatterns {
    pub fn for_status(&self, status: TricklerStatus) -> LedMode {
        match status {
            TricklerStatus::Ready => self.ready,
            TricklerStatus::Running => self.running,
            TricklerStatus::Done => self.done,
        }
    }
}

const DEFAULT_READY_POLL: Duration = Duration::from_millis(100);

pub struct StatusLed<I: Indicator> {
    led: I,
    state: SharedState,
    patterns: LedPatterns,
    clock: SharedClock,
    poll: Duration,
    ready_poll: Duration,
    shutdown: ShutdownFlag,
    status: Option<TricklerStatus>,
    shown: Option<LedMode>,
}

impl<I: Indicator> StatusLed<I> {
    pub fn new(
        led: I,
        state: SharedState,
        patterns: LedPatterns,
        clock: SharedClock,
        poll: Duration,
        shutdown: ShutdownFlag,
    ) -> Self {
        Self {
            led,
            state,
            patterns,
            clock,
            poll,
            ready_poll: DEFAULT_READY_POLL,
            shutdown,
            status: None,
            shown: None,
        }
    }

    /// Interval between store reads while waiting for the first state.
    pub fn with_ready_poll(mut self, ready_poll: Duration) -> Self {
        self.ready_poll = ready_poll;
        self
    }

    pub fn status(&self) -> Option<TricklerStatus> {
        self.status
    }

    fn stopping(&self) -> bool {
        self.shutdown.load(std::sync::atomic::Ordering::SeqCst)
    }

    fn show(&mut self, mode: LedMode) -> Result<()> {
        if self.shown == Some(mode) {
            return Ok(());
        }
        self.led.apply(mode).map_err(to_report)?;
        self.shown = Some(mode);
        Ok(())
    }

    /// Read state once and update the LED if the status changed. Returns
    /// the current status, `None` until it can be determined.
    pub fn poll_once(&mut self) -> Result<Option<TricklerStatus>> {
        let auto_mode = self.state.auto_mode()?;
        let speed = self.state.motor_speed()?;
        let (Some(auto_mode), Some(speed)) = (auto_mode, speed) else {
            return Ok(self.status);
        };
        match TricklerStatus::from_flags(auto_mode, speed > 0.0) {
            Some(status) => {
                if self.status != Some(status) {
                    tracing::info!(?status, "trickler status");
                }
                self.status = Some(status);
                self.show(self.patterns.for_status(status))?;
            }
            None => tracing::debug!(auto_mode, speed, "partial state update, keeping LED"),
        }
        Ok(self.status)
    }

    /// Wait for `auto_mode` and `trickler_motor_speed`, then poll every
    /// `poll` until shutdown. The LED is off when this returns.
    pub fn run(&mut self) -> Result<()> {
        loop {
            if self.stopping() {
                return self.show(LedMode::Off);
            }
            let cs = self.state.control_state()?;
            if cs.auto_mode.is_some() && cs.motor_speed.is_some() {
                break;
            }
            self.clock.sleep(self.ready_poll);
        }
        tracing::info!("status led ready");
        let result = loop {
            if self.stopping() {
                break Ok(());
            }
            if let Err(e) = self.poll_once() {
                break Err(e);
            }
            self.clock.sleep(self.poll);
        };
        let off = self.show(LedMode::Off);
        result.and(off)
    }
}

impl<I: Indicator> Drop for StatusLed<I> {
    fn drop(&mut self) {
        if self.shown != Some(LedMode::Off) {
            if let Err(e) = self.led.apply(LedMode::Off).map_err(to_report) {
                tracing::warn!(error = %e, "could not turn status led off");
            }
        }
    }
}
