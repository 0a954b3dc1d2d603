//! CLI argument definitions and shared statics.

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

use trickler_core::{Decimal, Unit};

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

/// Config file used when `--config` is not given and the file exists.
pub const DEFAULT_CONFIG: &str = "etc/trickler.toml";

#[derive(Parser, Debug)]
#[command(name = "trickler", version, about = "OpenTrickler powder trickler")]
pub struct Cli {
    /// Path to config TOML (defaults to etc/trickler.toml when present)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log and report as JSON lines instead of pretty text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the trickle control loop
    Run(RunArgs),
    /// Read the scale and publish its readings to shared state
    Scale {
        /// Stop after the first valid reading and print it
        #[arg(long, action = ArgAction::SetTrue)]
        once: bool,
    },
    /// Drive the motor at a fixed speed for a while, then stop it
    Motor {
        /// Speed fraction in [0, 1]
        #[arg(long)]
        speed: f64,
        #[arg(long, value_name = "MS", default_value_t = 1000)]
        duration_ms: u64,
    },
    /// Show the trickler status on the LED
    Leds,
    /// Inspect or change the operator settings
    Settings {
        #[command(subcommand)]
        action: SettingsCmd,
    },
    /// Check config, shared state and the scale link
    SelfCheck,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Enable automatic trickling at start-up
    #[arg(long, action = ArgAction::SetTrue)]
    pub auto_mode: bool,
    /// Target weight in the target unit
    #[arg(long, value_name = "WEIGHT", value_parser = parse_decimal)]
    pub target_weight: Option<Decimal>,
    /// Target unit (g or GN)
    #[arg(long, value_name = "UNIT", value_parser = parse_unit)]
    pub target_unit: Option<Unit>,
    /// Write a PID tuning CSV to FILE while dispensing
    #[arg(long, value_name = "FILE")]
    pub pid_tune: Option<PathBuf>,
    /// Exit after the first dispensing cycle
    #[arg(long, action = ArgAction::SetTrue)]
    pub once: bool,
}

#[derive(Subcommand, Debug)]
pub enum SettingsCmd {
    /// Print the current settings
    Get,
    /// Change some settings; omitted ones stay as they are
    Set {
        #[arg(long, value_name = "BOOL")]
        auto_mode: Option<bool>,
        #[arg(long, value_name = "WEIGHT", value_parser = parse_decimal)]
        target_weight: Option<Decimal>,
        #[arg(long, value_name = "UNIT", value_parser = parse_unit)]
        target_unit: Option<Unit>,
    },
}

fn parse_decimal(s: &str) -> Result<Decimal, String> {
    s.parse::<Decimal>().map_err(|e| e.to_string())
}

fn parse_unit(s: &str) -> Result<Unit, String> {
    s.parse::<Unit>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_args_parse_wire_tokens() {
        let cli = Cli::try_parse_from([
            "trickler",
            "run",
            "--auto-mode",
            "--target-weight",
            "10.00",
            "--target-unit",
            "g",
        ])
        .unwrap();
        let Commands::Run(args) = cli.cmd else {
            panic!("expected run");
        };
        assert!(args.auto_mode);
        assert_eq!(args.target_unit, Some(Unit::Grams));
        assert_eq!(args.target_weight.unwrap().to_string(), "10.00");
    }

    #[test]
    fn rejects_bad_unit() {
        assert!(Cli::try_parse_from(["trickler", "run", "--target-unit", "oz"]).is_err());
    }
}
