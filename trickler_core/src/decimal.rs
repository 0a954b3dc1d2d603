//! Exact decimal weights.
//!
//! Scale telemetry is decimal text with a vendor-fixed number of fraction
//! digits. `Decimal` stores the mantissa and the number of fraction digits
//! exactly as received, so `9.98` never turns into `9.979999`. Arithmetic
//! aligns scales with `i128` intermediates and reports overflow instead of
//! rounding.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Maximum number of fraction digits.
pub const MAX_SCALE: u8 = 9;

const POW10: [i128; 10] = [
    1,
    10,
    100,
    1_000,
    10_000,
    100_000,
    1_000_000,
    10_000_000,
    100_000_000,
    1_000_000_000,
];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseDecimalError {
    #[error("empty decimal")]
    Empty,
    #[error("invalid character in decimal")]
    InvalidDigit,
    #[error("more than {MAX_SCALE} fraction digits")]
    TooPrecise,
    #[error("decimal out of range")]
    Overflow,
}

#[derive(Debug, Clone, Copy)]
pub struct Decimal {
    mantissa: i64,
    scale: u8,
}

impl Decimal {
    pub const ZERO: Decimal = Decimal {
        mantissa: 0,
        scale: 0,
    };

    /// `mantissa * 10^-scale`. Returns `None` when `scale > MAX_SCALE`.
    pub const fn new(mantissa: i64, scale: u8) -> Option<Self> {
        if scale > MAX_SCALE {
            None
        } else {
            Some(Self { mantissa, scale })
        }
    }

    /// For compile-time constants; `scale` must not exceed `MAX_SCALE`.
    pub(crate) const fn lit(mantissa: i64, scale: u8) -> Self {
        assert!(scale <= MAX_SCALE);
        Self { mantissa, scale }
    }

    pub const fn mantissa(self) -> i64 {
        self.mantissa
    }

    pub const fn scale(self) -> u8 {
        self.scale
    }

    pub const fn is_negative(self) -> bool {
        self.mantissa < 0
    }

    pub const fn is_zero(self) -> bool {
        self.mantissa == 0
    }

    /// Mantissa expressed at `scale` (which must be >= self.scale).
    fn widened(self, scale: u8) -> i128 {
        i128::from(self.mantissa) * POW10[usize::from(scale - self.scale)]
    }

    fn from_i128(m: i128, scale: u8) -> Option<Self> {
        i64::try_from(m).ok().map(|mantissa| Self { mantissa, scale })
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        let s = self.scale.max(rhs.scale);
        Self::from_i128(self.widened(s) + rhs.widened(s), s)
    }

    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        let s = self.scale.max(rhs.scale);
        Self::from_i128(self.widened(s) - rhs.widened(s), s)
    }

    /// `self / rhs` as a float, for feeding ratios to the PID controller.
    /// Returns `None` when `rhs` is zero.
    pub fn ratio(self, rhs: Self) -> Option<f64> {
        if rhs.is_zero() {
            return None;
        }
        let s = self.scale.max(rhs.scale);
        Some(self.widened(s) as f64 / rhs.widened(s) as f64)
    }

    /// Lossy conversion for display and simulation only.
    pub fn to_f64(self) -> f64 {
        self.mantissa as f64 / POW10[usize::from(self.scale)] as f64
    }
}

impl Default for Decimal {
    fn default() -> Self {
        Self::ZERO
    }
}

impl PartialEq for Decimal {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Decimal {}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> Ordering {
        let s = self.scale.max(other.scale);
        self.widened(s).cmp(&other.widened(s))
    }
}

impl FromStr for Decimal {
    type Err = ParseDecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (negative, body) = match s.as_bytes().first() {
            Some(b'-') => (true, &s[1..]),
            Some(b'+') => (false, &s[1..]),
            Some(_) => (false, s),
            None => return Err(ParseDecimalError::Empty),
        };
        let (int_part, frac_part) = match body.split_once('.') {
            Some((i, f)) => (i, f),
            None => (body, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(ParseDecimalError::Empty);
        }
        if frac_part.len() > usize::from(MAX_SCALE) {
            return Err(ParseDecimalError::TooPrecise);
        }
        let mut m: i128 = 0;
        for b in int_part.bytes().chain(frac_part.bytes()) {
            if !b.is_ascii_digit() {
                return Err(ParseDecimalError::InvalidDigit);
            }
            m = m * 10 + i128::from(b - b'0');
            if m > i128::from(i64::MAX) {
                return Err(ParseDecimalError::Overflow);
            }
        }
        if negative {
            m = -m;
        }
        // frac_part.len() <= MAX_SCALE checked above
        let scale = frac_part.len() as u8;
        Self::from_i128(m, scale).ok_or(ParseDecimalError::Overflow)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.mantissa < 0 { "-" } else { "" };
        let mag = self.mantissa.unsigned_abs();
        if self.scale == 0 {
            return write!(f, "{sign}{mag}");
        }
        let div = POW10[usize::from(self.scale)] as u64;
        write!(
            f,
            "{sign}{}.{:0width$}",
            mag / div,
            mag % div,
            width = usize::from(self.scale)
        )
    }
}

impl Serialize for Decimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Decimal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
