mod backend;
mod cli;
mod commands;
mod error_fmt;
mod run;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use eyre::WrapErr;
use serde_json::json;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};
use trickler_config::{Config, Logging};
use trickler_core::error::{Result, TricklerError};
use trickler_core::{SettingsUpdate, ShutdownFlag};

use crate::cli::{Cli, Commands, DEFAULT_CONFIG, FILE_GUARD, JSON_MODE, SettingsCmd};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    let _ = color_eyre::install();
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(e) = try_main(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        std::process::exit(exit_code_for_error(&e));
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let cfg = match path {
        Some(p) => trickler_config::load_file(p)
            .map_err(|e| TricklerError::Config(format!("{e:#}")))?,
        None if Path::new(DEFAULT_CONFIG).exists() => {
            trickler_config::load_file(Path::new(DEFAULT_CONFIG))
                .map_err(|e| TricklerError::Config(format!("{e:#}")))?
        }
        None => Config::default(),
    };
    cfg.validate()
        .map_err(|e| TricklerError::Config(format!("{e:#}")))?;
    Ok(cfg)
}

fn init_tracing(json: bool, level: &str, logging: &Logging) -> Result<()> {
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let console = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(console_filter)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(console_filter)
            .boxed()
    };

    let file = match logging.file.as_deref() {
        Some(path) => {
            let path = Path::new(path);
            let dir = path
                .parent()
                .filter(|d| !d.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| TricklerError::Config(format!("logging.file {} has no file name", path.display())))?;
            let appender = match logging.rotation.as_deref().unwrap_or("never") {
                "daily" => tracing_appender::rolling::daily(dir, name),
                "hourly" => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            let level = logging.level.as_deref().unwrap_or("info");
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_filter(EnvFilter::new(level))
                    .boxed(),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init()
        .wrap_err("installing tracing subscriber")
}

fn install_shutdown() -> Result<ShutdownFlag> {
    let flag: ShutdownFlag = Arc::new(AtomicBool::new(false));
    let handler_flag = flag.clone();
    ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::SeqCst);
    })
    .wrap_err("installing signal handler")?;
    Ok(flag)
}

fn print(json_mode: bool, value: &serde_json::Value, human: &str) {
    if json_mode {
        println!("{value}");
    } else {
        println!("{human}");
    }
}

fn try_main(cli: Cli) -> Result<()> {
    let cfg = load_config(cli.config.as_deref())?;
    init_tracing(cli.json, &cli.log_level, &cfg.logging)?;
    let shutdown = install_shutdown()?;
    let json_mode = cli.json;

    match cli.cmd {
        Commands::Run(args) => {
            let reason = run::run(&cfg, &args, shutdown)?;
            let name = reason.map(|r| r.as_str());
            print(
                json_mode,
                &json!({ "exit_reason": name }),
                &format!("trickling stopped: {}", name.unwrap_or("shutdown")),
            );
        }
        Commands::Scale { once } => {
            if let Some(r) = commands::scale(&cfg, once, &shutdown)? {
                print(
                    json_mode,
                    &json!({
                        "weight": r.weight.to_string(),
                        "unit": r.unit.name(),
                        "status": r.status.name(),
                    }),
                    &format!("{} {} ({})", r.weight, r.unit, r.status),
                );
            }
        }
        Commands::Motor { speed, duration_ms } => {
            commands::motor(&cfg, speed, Duration::from_millis(duration_ms), &shutdown)?;
        }
        Commands::Leds => commands::leds(&cfg, shutdown)?,
        Commands::Settings { action } => {
            let settings = match action {
                SettingsCmd::Get => commands::settings_get(&cfg)?,
                SettingsCmd::Set {
                    auto_mode,
                    target_weight,
                    target_unit,
                } => commands::settings_set(
                    &cfg,
                    &SettingsUpdate {
                        auto_mode,
                        target_unit,
                        target_weight,
                    },
                )?,
            };
            let value = serde_json::to_value(settings).wrap_err("encoding settings")?;
            let human = serde_json::to_string_pretty(&value).wrap_err("encoding settings")?;
            print(json_mode, &value, &human);
        }
        Commands::SelfCheck => {
            let report = commands::self_check(&cfg)?;
            print(
                json_mode,
                &json!({ "ok": true, "checks": report }),
                &report.join("\n"),
            );
        }
    }
    Ok(())
}
