//! The `run` subcommand: bootstrap shared state and drive the trickle loop.

use std::path::PathBuf;

use trickler_config::Config;
use trickler_core::error::Result;
use trickler_core::{
    Decimal, ExitReason, InitialSettings, PidTuneLog, ShutdownFlag, TricklerBuilder, Unit,
};

use crate::backend;
use crate::cli::RunArgs;

/// Tune log path used when `pid.tuner_mode` is on and `--pid-tune` is absent.
const DEFAULT_TUNE_LOG: &str = "pid_tune.csv";

pub fn run(cfg: &Config, args: &RunArgs, shutdown: ShutdownFlag) -> Result<Option<ExitReason>> {
    let state = backend::open_state(&cfg.store)?;
    let (link, pwm) = backend::scale_and_motor(cfg)?;

    let mut builder = TricklerBuilder::new()
        .with_link(link)
        .with_pwm(pwm)
        .with_state(state)
        .with_shutdown(shutdown);
    let tune_path = args
        .pid_tune
        .clone()
        .or_else(|| cfg.pid.tuner_mode.then(|| PathBuf::from(DEFAULT_TUNE_LOG)));
    if let Some(path) = tune_path {
        builder = builder.with_tune_log(PidTuneLog::create(&path)?);
    }
    let mut trickler = builder.build(cfg)?;

    let init = InitialSettings {
        auto_mode: args.auto_mode,
        target_weight: args.target_weight.unwrap_or(Decimal::ZERO),
        target_unit: args.target_unit.unwrap_or(Unit::Grains),
    };
    trickler.publish_initial(&init)?;
    tracing::info!(
        auto_mode = init.auto_mode,
        target = %init.target_weight,
        unit = %init.target_unit,
        "initial settings published"
    );
    if trickler.wait_until_ready()?.is_none() {
        return Ok(None);
    }
    let reason = trickler.run(args.once)?;
    tracing::info!(weight = %trickler.scale().weight(), unit = %trickler.scale().unit(), "trickler stopped");
    Ok(reason)
}
