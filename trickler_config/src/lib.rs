#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the trickler processes.
//!
//! Every section is optional in the TOML file; missing keys take the defaults
//! below. `Config::validate` rejects values the control loop cannot run with.
use serde::Deserialize;

/// Scale vendor selected in `[scale] model`.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScaleModelKind {
    #[default]
    #[serde(alias = "and-fx120")]
    And,
    Creedmoor,
    #[serde(alias = "us-solid")]
    Ussolid,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ScaleCfg {
    pub model: ScaleModelKind,
    pub port: String,
    pub baudrate: u32,
    /// Serial read timeout (ms); an expired read yields an empty line.
    pub timeout_ms: u64,
    /// Window length for vendors that infer stability from repeated lines.
    pub stable_reading_length: usize,
    /// Time the scale needs to switch units after a mode command.
    pub unit_settle_ms: u64,
}

impl Default for ScaleCfg {
    fn default() -> Self {
        Self {
            model: ScaleModelKind::And,
            port: "/dev/ttyUSB0".into(),
            baudrate: 19200,
            timeout_ms: 100,
            stable_reading_length: 5,
            unit_settle_ms: 1000,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct MotorCfg {
    /// BCM pin number of the PWM output.
    pub pin: u8,
    /// Lowest duty (0..=100) the motor is ever driven at while dispensing.
    pub min_pwm: f64,
    pub max_pwm: f64,
    pub pwm_frequency_hz: f64,
}

impl Default for MotorCfg {
    fn default() -> Self {
        Self {
            pin: 18,
            min_pwm: 15.0,
            max_pwm: 100.0,
            pwm_frequency_hz: 100.0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PidCfg {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    pub output_min: f64,
    pub output_max: f64,
    /// Absolute bound on the integral accumulator.
    pub windup_guard: f64,
    /// Write a PID tuning CSV while dispensing.
    pub tuner_mode: bool,
}

impl Default for PidCfg {
    fn default() -> Self {
        Self {
            kp: 10.0,
            ki: 2.25,
            kd: 3.75,
            output_min: 0.0,
            output_max: 100.0,
            windup_guard: 20.0,
            tuner_mode: false,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ControlCfg {
    /// Target duration of one control-loop iteration.
    pub period_ms: u64,
    /// Delay between arming and the first motor command.
    pub arm_delay_ms: u64,
    /// Poll interval while waiting for settings to appear in the store.
    pub ready_poll_ms: u64,
}

impl Default for ControlCfg {
    fn default() -> Self {
        Self {
            period_ms: 100,
            arm_delay_ms: 1000,
            ready_poll_ms: 100,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memcache,
    Memory,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StoreCfg {
    pub backend: StoreBackend,
    pub server: String,
    pub connect_timeout_ms: u64,
    pub timeout_ms: u64,
    /// Namespace prepended to every key.
    pub prefix: String,
}

impl Default for StoreCfg {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memcache,
            server: "127.0.0.1:11211".into(),
            connect_timeout_ms: 10_000,
            timeout_ms: 2_000,
            prefix: String::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LedPattern {
    Off,
    On,
    FastBlink,
    SlowBlink,
    Pulse,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LedsCfg {
    pub enabled: bool,
    pub pin: u8,
    pub active_high: bool,
    pub poll_ms: u64,
    pub ready: LedPattern,
    pub running: LedPattern,
    pub done: LedPattern,
}

impl Default for LedsCfg {
    fn default() -> Self {
        Self {
            enabled: true,
            pin: 12,
            active_high: true,
            poll_ms: 1000,
            ready: LedPattern::SlowBlink,
            running: LedPattern::FastBlink,
            done: LedPattern::On,
        }
    }
}

/// Longest name that fits a legacy advertising packet.
pub const MAX_BLE_NAME_LEN: usize = 29;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BluetoothCfg {
    /// Advertised device name.
    pub name: String,
}

impl Default for BluetoothCfg {
    fn default() -> Self {
        Self {
            name: "OpenTrickler".into(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub scale: ScaleCfg,
    pub motor: MotorCfg,
    pub pid: PidCfg,
    pub control: ControlCfg,
    pub store: StoreCfg,
    pub leds: LedsCfg,
    pub bluetooth: BluetoothCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read and parse a config file. Validation is left to the caller.
pub fn load_file(path: &std::path::Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {}: {}", path.display(), e))?;
    load_toml(&text).map_err(|e| eyre::eyre!("parse config {}: {}", path.display(), e))
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Scale
        if self.scale.port.trim().is_empty() {
            eyre::bail!("scale.port must not be empty");
        }
        if self.scale.baudrate == 0 {
            eyre::bail!("scale.baudrate must be > 0");
        }
        if self.scale.timeout_ms == 0 {
            eyre::bail!("scale.timeout_ms must be >= 1");
        }
        if self.scale.stable_reading_length == 0 {
            eyre::bail!("scale.stable_reading_length must be >= 1");
        }

        // Motor
        let m = &self.motor;
        if !m.min_pwm.is_finite() || !(0.0..=100.0).contains(&m.min_pwm) {
            eyre::bail!("motor.min_pwm must be within [0, 100]");
        }
        if !m.max_pwm.is_finite() || !(0.0..=100.0).contains(&m.max_pwm) {
            eyre::bail!("motor.max_pwm must be within [0, 100]");
        }
        if m.min_pwm > m.max_pwm {
            eyre::bail!(
                "motor.min_pwm ({}) must be <= motor.max_pwm ({})",
                m.min_pwm,
                m.max_pwm
            );
        }
        if !m.pwm_frequency_hz.is_finite() || m.pwm_frequency_hz <= 0.0 {
            eyre::bail!("motor.pwm_frequency_hz must be > 0");
        }

        // PID
        let p = &self.pid;
        for (name, v) in [("kp", p.kp), ("ki", p.ki), ("kd", p.kd)] {
            if !v.is_finite() {
                eyre::bail!("pid.{name} must be finite");
            }
        }
        if !(p.output_min.is_finite() && p.output_max.is_finite()) || p.output_min >= p.output_max
        {
            eyre::bail!("pid.output_min must be < pid.output_max");
        }
        if !p.windup_guard.is_finite() || p.windup_guard < 0.0 {
            eyre::bail!("pid.windup_guard must be >= 0");
        }

        // Control
        if self.control.period_ms == 0 {
            eyre::bail!("control.period_ms must be >= 1");
        }
        if self.control.ready_poll_ms == 0 {
            eyre::bail!("control.ready_poll_ms must be >= 1");
        }

        // Store
        if self.store.backend == StoreBackend::Memcache && self.store.server.trim().is_empty() {
            eyre::bail!("store.server must not be empty for the memcache backend");
        }
        if self.store.timeout_ms == 0 || self.store.connect_timeout_ms == 0 {
            eyre::bail!("store timeouts must be >= 1 ms");
        }
        if self
            .store
            .prefix
            .chars()
            .any(|c| c.is_whitespace() || c.is_control())
        {
            eyre::bail!("store.prefix must not contain whitespace or control characters");
        }

        // LEDs
        if self.leds.poll_ms == 0 {
            eyre::bail!("leds.poll_ms must be >= 1");
        }

        // Bluetooth
        let name_len = self.bluetooth.name.len();
        if self.bluetooth.name.trim().is_empty() || name_len > MAX_BLE_NAME_LEN {
            eyre::bail!(
                "bluetooth.name must be 1..={MAX_BLE_NAME_LEN} bytes, got {name_len}"
            );
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref() {
            if !matches!(rot, "never" | "daily" | "hourly") {
                eyre::bail!("logging.rotation must be one of never|daily|hourly, got {rot:?}");
            }
        }
        Ok(())
    }
}
