//! Creedmoor line format: `+0012.34 GN`. No status header, so stability
//! comes from the window.

use super::{ScaleModel, chars, parse_unit, parse_weight, signed_line};
use crate::error::DecodeError;
use crate::reading::Reading;
use crate::stability::StabilityWindow;

pub(super) fn decode(raw: &[u8], window: &mut StabilityWindow) -> Result<Reading, DecodeError> {
    let line = signed_line(raw)?;
    let weight = parse_weight(chars(line, 0, 8))?;
    let unit = parse_unit(ScaleModel::Creedmoor, chars(line, 9, 11).trim())?;
    let status = window.observe(line);
    Ok(Reading {
        weight,
        unit,
        status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reading::{ScaleStatus, Unit};

    #[test]
    fn stable_after_window_fills() {
        let mut w = StabilityWindow::new(3);
        let line = b"+0012.34 GN\r\n";
        assert_eq!(decode(line, &mut w).unwrap().status, ScaleStatus::Unstable);
        assert_eq!(decode(line, &mut w).unwrap().status, ScaleStatus::Unstable);
        let r = decode(line, &mut w).unwrap();
        assert_eq!(r.status, ScaleStatus::Stable);
        assert_eq!(r.weight.to_string(), "12.34");
        assert_eq!(r.unit, Unit::Grains);
    }

    #[test]
    fn grams_and_negative() {
        let mut w = StabilityWindow::new(1);
        let r = decode(b"-00.0500 g\r\n", &mut w).unwrap();
        assert_eq!(r.weight.to_string(), "-0.0500");
        assert_eq!(r.unit, Unit::Grams);
        assert_eq!(r.status, ScaleStatus::Stable);
    }

    #[test]
    fn noise_does_not_enter_the_window() {
        let mut w = StabilityWindow::new(2);
        assert!(decode(b"G 12.34 GN\r\n", &mut w).is_err());
        assert!(decode(b"+0012.34 XX\r\n", &mut w).is_err());
        assert!(decode(b"\r\n", &mut w).is_err());
        assert!(w.is_empty());
    }
}
