//! Status LED driven by a background blinker thread.

use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use rppal::gpio::{Gpio, OutputPin};
use trickler_traits::{BoxError, Indicator, LedMode};

use crate::error::{HwError, Result};

const FAST_HALF_PERIOD: Duration = Duration::from_millis(750);
const SLOW_HALF_PERIOD: Duration = Duration::from_millis(1500);
const PULSE_STEP: Duration = Duration::from_millis(40);

pub struct GpioLed {
    tx: Option<Sender<LedMode>>,
    worker: Option<JoinHandle<()>>,
}

impl GpioLed {
    pub fn open(pin: u8, active_high: bool) -> Result<Self> {
        let gpio = Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
        let pin = gpio
            .get(pin)
            .map_err(|e| HwError::Gpio(e.to_string()))?
            .into_output();
        let (tx, rx) = crossbeam_channel::bounded(4);
        let worker = std::thread::Builder::new()
            .name("status-led".into())
            .spawn(move || blink(pin, active_high, rx))?;
        Ok(Self {
            tx: Some(tx),
            worker: Some(worker),
        })
    }
}

fn set(pin: &mut OutputPin, lit: bool, active_high: bool) {
    if lit == active_high {
        pin.set_high();
    } else {
        pin.set_low();
    }
}

fn blink(mut pin: OutputPin, active_high: bool, rx: Receiver<LedMode>) {
    let mut mode = LedMode::Off;
    let mut lit = false;
    let mut pulse_level: u8 = 0;
    loop {
        let wait = match mode {
            LedMode::Off | LedMode::On => None,
            LedMode::FastBlink => Some(FAST_HALF_PERIOD),
            LedMode::SlowBlink => Some(SLOW_HALF_PERIOD),
            LedMode::Pulse => Some(PULSE_STEP),
        };
        let next = match wait {
            Some(d) => rx.recv_timeout(d),
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match next {
            Ok(m) => {
                mode = m;
                lit = matches!(m, LedMode::On);
                pulse_level = 0;
                set(&mut pin, lit, active_high);
            }
            Err(RecvTimeoutError::Timeout) => {
                if mode == LedMode::Pulse {
                    // duty ramps 0..10 and back, rendered as on/off frames
                    pulse_level = (pulse_level + 1) % 20;
                    let duty = if pulse_level < 10 { pulse_level } else { 20 - pulse_level };
                    lit = duty >= 5;
                } else {
                    lit = !lit;
                }
                set(&mut pin, lit, active_high);
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    set(&mut pin, false, active_high);
}

impl Indicator for GpioLed {
    fn apply(&mut self, mode: LedMode) -> std::result::Result<(), BoxError> {
        let tx = self.tx.as_ref().ok_or(HwError::Closed)?;
        tx.send(mode).map_err(|_| HwError::Closed)?;
        Ok(())
    }
}

impl Drop for GpioLed {
    fn drop(&mut self) {
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::warn!("status led thread panicked");
            }
        }
    }
}
