//! Canonical scale reading shared by every vendor decoder.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::decimal::Decimal;

/// Unit of weight. The discriminants are the wire ordinals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Unit {
    Grains = 0,
    Grams = 1,
}

impl Unit {
    pub const ALL: [Unit; 2] = [Unit::Grains, Unit::Grams];

    pub const fn ordinal(self) -> u8 {
        self as u8
    }

    pub fn from_ordinal(v: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|u| u.ordinal() == v)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Unit::Grains => "GRAINS",
            Unit::Grams => "GRAMS",
        }
    }

    /// Short token used on the command line and in settings requests.
    pub const fn symbol(self) -> &'static str {
        match self {
            Unit::Grains => "GN",
            Unit::Grams => "g",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Unit {
    type Err = String;

    /// Accepts `g`/`GN` symbols and canonical names (case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "g" | "G" => Ok(Unit::Grams),
            "GN" | "gn" | "gr" => Ok(Unit::Grains),
            other if other.eq_ignore_ascii_case("grams") => Ok(Unit::Grams),
            other if other.eq_ignore_ascii_case("grains") => Ok(Unit::Grains),
            other => Err(format!("unknown unit {other:?} (expected g or GN)")),
        }
    }
}

/// Scale status. The discriminants are the wire ordinals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScaleStatus {
    Stable = 0,
    Unstable = 1,
    Overload = 2,
    Error = 3,
    ModelInfo = 4,
    SerialInfo = 5,
    Ack = 6,
}

impl ScaleStatus {
    pub const ALL: [ScaleStatus; 7] = [
        ScaleStatus::Stable,
        ScaleStatus::Unstable,
        ScaleStatus::Overload,
        ScaleStatus::Error,
        ScaleStatus::ModelInfo,
        ScaleStatus::SerialInfo,
        ScaleStatus::Ack,
    ];

    pub const fn ordinal(self) -> u8 {
        self as u8
    }

    pub fn from_ordinal(v: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.ordinal() == v)
    }

    pub const fn name(self) -> &'static str {
        match self {
            ScaleStatus::Stable => "STABLE",
            ScaleStatus::Unstable => "UNSTABLE",
            ScaleStatus::Overload => "OVERLOAD",
            ScaleStatus::Error => "ERROR",
            ScaleStatus::ModelInfo => "MODEL_INFO",
            ScaleStatus::SerialInfo => "SERIAL_INFO",
            ScaleStatus::Ack => "ACK",
        }
    }
}

impl fmt::Display for ScaleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reading {
    pub weight: Decimal,
    pub unit: Unit,
    pub status: ScaleStatus,
}

impl Reading {
    pub fn is_stable(&self) -> bool {
        self.status == ScaleStatus::Stable
    }
}

impl Default for Reading {
    /// Placeholder until the first line arrives. Unstable, so nothing arms
    /// on it.
    fn default() -> Self {
        Self {
            weight: Decimal::ZERO,
            unit: Unit::Grains,
            status: ScaleStatus::Unstable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinals_are_stable() {
        assert_eq!(Unit::Grains.ordinal(), 0);
        assert_eq!(Unit::Grams.ordinal(), 1);
        assert_eq!(ScaleStatus::Ack.ordinal(), 6);
        assert_eq!(ScaleStatus::from_ordinal(4), Some(ScaleStatus::ModelInfo));
        assert_eq!(ScaleStatus::from_ordinal(7), None);
        assert_eq!(Unit::from_ordinal(2), None);
    }

    #[test]
    fn units_parse_from_symbols_and_names() {
        assert_eq!("g".parse::<Unit>().unwrap(), Unit::Grams);
        assert_eq!("GN".parse::<Unit>().unwrap(), Unit::Grains);
        assert_eq!("grains".parse::<Unit>().unwrap(), Unit::Grains);
        assert_eq!("GRAMS".parse::<Unit>().unwrap(), Unit::Grams);
        assert!("oz".parse::<Unit>().is_err());
    }

    #[test]
    fn serde_names_match_display() {
        assert_eq!(serde_json::to_string(&Unit::Grains).unwrap(), "\"GRAINS\"");
        assert_eq!(
            serde_json::to_string(&ScaleStatus::ModelInfo).unwrap(),
            "\"MODEL_INFO\""
        );
    }
}
