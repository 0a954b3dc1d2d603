//! Test and helper mocks for trickler_core.
//!
//! Every mock is a cheap handle over shared state: keep one clone to script
//! or inspect, give the other to the component under test.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use trickler_traits::{BoxError, Indicator, LedMode, PwmOutput, SerialLink};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct LinkScript {
    lines: VecDeque<Vec<u8>>,
    last: Option<Vec<u8>>,
    repeat_last: bool,
    writes: Vec<Vec<u8>>,
    clears: usize,
    fail_reads: bool,
}

/// Serial link that replays queued lines. When the queue runs dry it times
/// out (empty line), or repeats the last line if `repeat_last` is set.
#[derive(Debug, Clone, Default)]
pub struct ScriptedLink {
    inner: Arc<Mutex<LinkScript>>,
}

impl ScriptedLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep answering with the last line once the queue is empty, like a
    /// scale that streams continuously.
    pub fn repeating() -> Self {
        let link = Self::default();
        lock(&link.inner).repeat_last = true;
        link
    }

    pub fn push(&self, line: impl AsRef<[u8]>) {
        lock(&self.inner).lines.push_back(line.as_ref().to_vec());
    }

    /// Drop queued lines and make `line` the one repeated from now on.
    pub fn hold(&self, line: impl AsRef<[u8]>) {
        let mut s = lock(&self.inner);
        s.lines.clear();
        s.lines.push_back(line.as_ref().to_vec());
    }

    pub fn writes(&self) -> Vec<Vec<u8>> {
        lock(&self.inner).writes.clone()
    }

    pub fn clears(&self) -> usize {
        lock(&self.inner).clears
    }

    pub fn fail_reads(&self, fail: bool) {
        lock(&self.inner).fail_reads = fail;
    }
}

impl SerialLink for ScriptedLink {
    fn clear_input(&mut self) -> Result<(), BoxError> {
        lock(&self.inner).clears += 1;
        Ok(())
    }

    fn read_line(&mut self) -> Result<Vec<u8>, BoxError> {
        let mut s = lock(&self.inner);
        if s.fail_reads {
            return Err(Box::new(std::io::Error::other("scripted link failure")));
        }
        if let Some(line) = s.lines.pop_front() {
            s.last = Some(line.clone());
            return Ok(line);
        }
        if s.repeat_last {
            return Ok(s.last.clone().unwrap_or_default());
        }
        Ok(Vec::new())
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), BoxError> {
        lock(&self.inner).writes.push(bytes.to_vec());
        Ok(())
    }
}

#[derive(Debug, Default)]
struct PwmLog {
    duties: Vec<f32>,
    closes: usize,
}

/// PWM output that records every duty it is given.
#[derive(Debug, Clone, Default)]
pub struct RecordingPwm {
    inner: Arc<Mutex<PwmLog>>,
}

impl RecordingPwm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn duties(&self) -> Vec<f32> {
        lock(&self.inner).duties.clone()
    }

    pub fn last_duty(&self) -> Option<f32> {
        lock(&self.inner).duties.last().copied()
    }

    pub fn closes(&self) -> usize {
        lock(&self.inner).closes
    }
}

impl PwmOutput for RecordingPwm {
    fn set_duty(&mut self, duty: f32) -> Result<(), BoxError> {
        lock(&self.inner).duties.push(duty);
        Ok(())
    }

    fn close(&mut self) -> Result<(), BoxError> {
        lock(&self.inner).closes += 1;
        Ok(())
    }
}

/// Status LED that records the modes applied to it.
#[derive(Debug, Clone, Default)]
pub struct RecordingLed {
    modes: Arc<Mutex<Vec<LedMode>>>,
}

impl RecordingLed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn modes(&self) -> Vec<LedMode> {
        lock(&self.modes).clone()
    }
}

impl Indicator for RecordingLed {
    fn apply(&mut self, mode: LedMode) -> Result<(), BoxError> {
        lock(&self.modes).push(mode);
        Ok(())
    }
}
