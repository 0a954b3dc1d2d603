//! A&D line format: `ST,+00012.34 GN`.
//!
//! Two-character status header, comma, nine-character signed weight field
//! and a three-character unit field.

use super::{ScaleModel, chars, parse_unit, parse_weight};
use crate::error::DecodeError;
use crate::reading::{Reading, ScaleStatus};

pub(super) fn decode(raw: &[u8], previous: &Reading) -> Result<Reading, DecodeError> {
    let line = std::str::from_utf8(raw.trim_ascii()).map_err(|_| DecodeError::InvalidEncoding)?;
    if line.is_empty() {
        return Err(DecodeError::Empty);
    }
    let carry = |status| Reading {
        status,
        ..*previous
    };
    match chars(line, 0, 2) {
        "ST" => weighed(line, ScaleStatus::Stable),
        "US" => weighed(line, ScaleStatus::Unstable),
        "OL" => Ok(carry(ScaleStatus::Overload)),
        "EC" => Ok(carry(ScaleStatus::Error)),
        "AK" => Ok(carry(ScaleStatus::Ack)),
        "TN" => {
            tracing::info!(model_number = chars(line, 3, usize::MAX), "scale model number");
            Ok(carry(ScaleStatus::ModelInfo))
        }
        "SN" => {
            tracing::info!(serial_number = chars(line, 3, usize::MAX), "scale serial number");
            Ok(carry(ScaleStatus::SerialInfo))
        }
        other => Err(DecodeError::UnknownPrefix(other.to_owned())),
    }
}

fn weighed(line: &str, status: ScaleStatus) -> Result<Reading, DecodeError> {
    let weight = parse_weight(chars(line, 3, 12).trim())?;
    let unit = parse_unit(ScaleModel::And, chars(line, 12, 15).trim())?;
    Ok(Reading {
        weight,
        unit,
        status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Decimal;
    use crate::reading::Unit;
    use rstest::rstest;

    fn prev() -> Reading {
        Reading {
            weight: "9.50".parse().unwrap(),
            unit: Unit::Grams,
            status: ScaleStatus::Stable,
        }
    }

    #[rstest]
    #[case(b"ST,+00012.34 GN\r\n", "12.34", Unit::Grains, ScaleStatus::Stable)]
    #[case(b"US,+010.0000  g\r\n", "10.0000", Unit::Grams, ScaleStatus::Unstable)]
    #[case(b"ST,-000.0500  g\r\n", "-0.0500", Unit::Grams, ScaleStatus::Stable)]
    fn decodes_weight_lines(
        #[case] raw: &[u8],
        #[case] weight: &str,
        #[case] unit: Unit,
        #[case] status: ScaleStatus,
    ) {
        let r = decode(raw, &prev()).unwrap();
        assert_eq!(r.weight, weight.parse::<Decimal>().unwrap());
        assert_eq!(r.weight.to_string(), weight);
        assert_eq!((r.unit, r.status), (unit, status));
    }

    #[rstest]
    #[case(b"OL,+9999999 GN\r\n", ScaleStatus::Overload)]
    #[case(b"EC,E11\r\n", ScaleStatus::Error)]
    #[case(b"AK\r\n", ScaleStatus::Ack)]
    #[case(b"TN,FX-120i\r\n", ScaleStatus::ModelInfo)]
    #[case(b"SN,T1234567\r\n", ScaleStatus::SerialInfo)]
    fn status_lines_carry_weight_and_unit(#[case] raw: &[u8], #[case] status: ScaleStatus) {
        let r = decode(raw, &prev()).unwrap();
        assert_eq!(r.status, status);
        assert_eq!(r.weight.to_string(), "9.50");
        assert_eq!(r.unit, Unit::Grams);
    }

    #[rstest]
    #[case(b"", DecodeError::Empty)]
    #[case(b"  \r\n", DecodeError::Empty)]
    #[case(b"QT,+00012.34 GN\r\n", DecodeError::UnknownPrefix("QT".into()))]
    #[case(b"\xff\xfe,+00012.34 GN", DecodeError::InvalidEncoding)]
    #[case(b"ST,+000x2.34 GN", DecodeError::MalformedWeight("+000x2.34".into()))]
    #[case(b"ST,+00012.34 OZ", DecodeError::UnknownUnit("OZ".into()))]
    #[case(b"ST,", DecodeError::MalformedWeight(String::new()))]
    fn rejects_noise(#[case] raw: &[u8], #[case] err: DecodeError) {
        assert_eq!(decode(raw, &prev()).unwrap_err(), err);
    }
}
