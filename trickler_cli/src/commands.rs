//! The single-purpose subcommands: scale, motor, leds, settings, self-check.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use eyre::WrapErr;
use trickler_config::Config;
use trickler_core::ble::{self, BleBridge};
use trickler_core::error::{Result, TricklerError};
use trickler_core::{
    LedPatterns, MotorActuator, Reading, ScaleController, ScaleModel, Settings, SettingsUpdate,
    SharedClock, ShutdownFlag, StatusLed,
};
use trickler_traits::MonotonicClock;

use crate::backend;

/// Reads attempted before `scale --once` and `self-check` give up.
const MAX_READ_ATTEMPTS: usize = 50;

fn clock() -> SharedClock {
    Arc::new(MonotonicClock::new())
}

fn first_reading(scale: &mut ScaleController<backend::BoxLink>) -> Result<Reading> {
    for _ in 0..MAX_READ_ATTEMPTS {
        if scale.update()? {
            return Ok(scale.reading());
        }
    }
    Err(TricklerError::ScaleNotReady(format!(
        "no valid line in {MAX_READ_ATTEMPTS} reads"
    ))
    .into())
}

pub fn scale(cfg: &Config, once: bool, shutdown: &ShutdownFlag) -> Result<Option<Reading>> {
    let state = backend::open_state(&cfg.store)?;
    let link = backend::scale_link(cfg)?;
    let clock = clock();
    let mut scale = ScaleController::new(
        link,
        ScaleModel::from(cfg.scale.model),
        state,
        clock.clone(),
        &cfg.scale,
    )?;
    if once {
        return first_reading(&mut scale).map(Some);
    }
    let period = Duration::from_millis(cfg.control.period_ms);
    while !shutdown.load(Ordering::SeqCst) {
        scale.update()?;
        clock.sleep(period);
    }
    Ok(None)
}

pub fn motor(cfg: &Config, speed: f64, duration: Duration, shutdown: &ShutdownFlag) -> Result<()> {
    let state = backend::open_state(&cfg.store)?;
    let pwm = backend::motor_pwm(cfg)?;
    let mut motor = MotorActuator::new(pwm, state, &cfg.motor)?;
    motor.set_speed(speed)?;
    tracing::info!(speed = motor.speed(), duration_ms = duration.as_millis() as u64, "motor running");

    let clock = clock();
    let step = Duration::from_millis(cfg.control.period_ms);
    let start = clock.now();
    while !shutdown.load(Ordering::SeqCst) && clock.now().duration_since(start) < duration {
        clock.sleep(step.min(duration));
    }
    motor.release()
}

pub fn leds(cfg: &Config, shutdown: ShutdownFlag) -> Result<()> {
    if !cfg.leds.enabled {
        tracing::info!("status led disabled in config");
        return Ok(());
    }
    let state = backend::open_state(&cfg.store)?;
    let led = backend::status_led(cfg)?;
    let mut status = StatusLed::new(
        led,
        state,
        LedPatterns::from(&cfg.leds),
        clock(),
        Duration::from_millis(cfg.leds.poll_ms),
        shutdown,
    )
    .with_ready_poll(Duration::from_millis(cfg.control.ready_poll_ms));
    status.run()
}

pub fn settings_get(cfg: &Config) -> Result<Settings> {
    let state = backend::open_state(&cfg.store)?;
    Settings::read(&state)
}

pub fn settings_set(cfg: &Config, update: &SettingsUpdate) -> Result<Settings> {
    if update.is_empty() {
        return Err(TricklerError::InvalidSetting("nothing to change".into()).into());
    }
    update.validate()?;
    let state = backend::open_state(&cfg.store)?;
    update.apply(&state)
}

/// One line per check; the first failing check stops the run.
pub fn self_check(cfg: &Config) -> Result<Vec<String>> {
    let mut report = vec!["config ok".to_string()];

    let state = backend::open_state(&cfg.store).wrap_err("opening shared state")?;
    state.control_state().wrap_err("reading shared state")?;
    report.push(format!("store ok ({:?})", cfg.store.backend));

    let bridge = BleBridge::from_config(state.clone(), &cfg.bluetooth);
    report.push(format!(
        "ble ok ({} on {})",
        bridge.advertised_name(),
        ble::SERVICE_UUID
    ));

    let link = backend::scale_link(cfg)?;
    let mut scale = ScaleController::new(
        link,
        ScaleModel::from(cfg.scale.model),
        state,
        clock(),
        &cfg.scale,
    )?;
    let r = first_reading(&mut scale)?;
    report.push(format!("scale ok ({} {} {})", r.weight, r.unit, r.status.name()));
    Ok(report)
}
