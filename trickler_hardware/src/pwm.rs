//! Software PWM on a Raspberry Pi GPIO pin.

use rppal::gpio::{Gpio, OutputPin};
use trickler_traits::{BoxError, PwmOutput};

use crate::error::{HwError, Result};

pub struct GpioPwm {
    pin: Option<OutputPin>,
    frequency_hz: f64,
}

impl GpioPwm {
    pub fn open(pin: u8, frequency_hz: f64) -> Result<Self> {
        let gpio = Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
        let pin = gpio
            .get(pin)
            .map_err(|e| HwError::Gpio(e.to_string()))?
            .into_output_low();
        tracing::info!(pin = pin.pin(), frequency_hz, "motor pwm ready");
        Ok(Self {
            pin: Some(pin),
            frequency_hz,
        })
    }
}

impl PwmOutput for GpioPwm {
    fn set_duty(&mut self, duty: f32) -> std::result::Result<(), BoxError> {
        let pin = self.pin.as_mut().ok_or(HwError::Closed)?;
        if duty <= 0.0 {
            pin.clear_pwm().map_err(|e| HwError::Gpio(e.to_string()))?;
            pin.set_low();
        } else {
            pin.set_pwm_frequency(self.frequency_hz, f64::from(duty.min(1.0)))
                .map_err(|e| HwError::Gpio(e.to_string()))?;
        }
        Ok(())
    }

    fn close(&mut self) -> std::result::Result<(), BoxError> {
        if let Some(mut pin) = self.pin.take() {
            pin.clear_pwm().map_err(|e| HwError::Gpio(e.to_string()))?;
            pin.set_low();
        }
        Ok(())
    }
}
