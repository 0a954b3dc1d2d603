//! U.S. Solid line format: `+  12.345gn`. Spaces may pad the weight field,
//! and there is no status header.

use super::{ScaleModel, chars, parse_unit, parse_weight, signed_line};
use crate::error::DecodeError;
use crate::reading::Reading;
use crate::stability::StabilityWindow;

pub(super) fn decode(raw: &[u8], window: &mut StabilityWindow) -> Result<Reading, DecodeError> {
    let line = signed_line(raw)?;
    let field: String = chars(line, 0, 9).chars().filter(|c| *c != ' ').collect();
    let weight = parse_weight(&field)?;
    let unit = parse_unit(ScaleModel::UsSolid, chars(line, 9, 11).trim())?;
    let status = window.observe(line);
    Ok(Reading {
        weight,
        unit,
        status,
    })
}
