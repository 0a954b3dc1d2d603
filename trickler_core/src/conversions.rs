//! Bridges from `trickler_config` sections to core types.

use std::time::Duration;

use trickler_config::{ControlCfg, LedPattern, LedsCfg, ScaleModelKind};
use trickler_traits::LedMode;

use crate::led::LedPatterns;
use crate::protocol::ScaleModel;
use crate::trickler::LoopTiming;

// ── Scale ────────────────────────────────────────────────────────────────────

impl From<ScaleModelKind> for ScaleModel {
    fn from(k: ScaleModelKind) -> Self {
        match k {
            ScaleModelKind::And => ScaleModel::And,
            ScaleModelKind::Creedmoor => ScaleModel::Creedmoor,
            ScaleModelKind::Ussolid => ScaleModel::UsSolid,
        }
    }
}

// ── Control loop ─────────────────────────────────────────────────────────────

impl From<&ControlCfg> for LoopTiming {
    fn from(c: &ControlCfg) -> Self {
        Self {
            period: Duration::from_millis(c.period_ms),
            arm_delay: Duration::from_millis(c.arm_delay_ms),
            ready_poll: Duration::from_millis(c.ready_poll_ms),
        }
    }
}

// ── LEDs ─────────────────────────────────────────────────────────────────────

/// Both types are foreign to this crate, hence a function instead of `From`.
pub const fn led_mode(p: LedPattern) -> LedMode {
    match p {
        LedPattern::Off => LedMode::Off,
        LedPattern::On => LedMode::On,
        LedPattern::FastBlink => LedMode::FastBlink,
        LedPattern::SlowBlink => LedMode::SlowBlink,
        LedPattern::Pulse => LedMode::Pulse,
    }
}

impl From<&LedsCfg> for LedPatterns {
    fn from(c: &LedsCfg) -> Self {
        Self {
            ready: led_mode(c.ready),
            running: led_mode(c.running),
            done: led_mode(c.done),
        }
    }
}
