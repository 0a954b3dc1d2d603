//! Operator settings: read the current values, apply partial updates.
//!
//! An update only touches the fields it carries. `Some(false)` and a zero
//! weight are values, not "no change".
//!
//! The store has no transactions, so writes are ordered for the dispense
//! loop: turning auto mode off lands first, turning it on lands last. The
//! loop never sees `auto_mode = true` next to a target it is about to leave.

use serde::{Deserialize, Deserializer, Serialize};

use crate::decimal::Decimal;
use crate::error::{Result, TricklerError};
use crate::reading::Unit;
use crate::store::SharedState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Settings {
    pub auto_mode: Option<bool>,
    pub target_unit: Option<Unit>,
    pub target_weight: Option<Decimal>,
}

impl Settings {
    pub fn read(state: &SharedState) -> Result<Self> {
        Ok(Self {
            auto_mode: state.auto_mode()?,
            target_unit: state.target_unit()?,
            target_weight: state.target_weight()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsUpdate {
    #[serde(default)]
    pub auto_mode: Option<bool>,
    #[serde(default, deserialize_with = "de_unit")]
    pub target_unit: Option<Unit>,
    #[serde(default, deserialize_with = "de_weight")]
    pub target_weight: Option<Decimal>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WeightField {
    Text(String),
    Number(serde_json::Number),
}

/// Weights arrive as JSON strings or numbers. Both reparse through the
/// decimal text form, so `10.5` and `"10.5"` land identically.
fn de_weight<'de, D>(deserializer: D) -> std::result::Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<WeightField> = Option::deserialize(deserializer)?;
    opt.map(|field| {
        let text = match field {
            WeightField::Text(s) => s,
            WeightField::Number(n) => n.to_string(),
        };
        text.trim().parse::<Decimal>().map_err(serde::de::Error::custom)
    })
    .transpose()
}

/// Units arrive as `g`/`GN` tokens or canonical names.
fn de_unit<'de, D>(deserializer: D) -> std::result::Result<Option<Unit>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    opt.map(|s| s.parse::<Unit>().map_err(serde::de::Error::custom))
        .transpose()
}

impl SettingsUpdate {
    pub fn is_empty(&self) -> bool {
        self.auto_mode.is_none() && self.target_unit.is_none() && self.target_weight.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(w) = self.target_weight {
            if w.is_negative() {
                return Err(
                    TricklerError::InvalidSetting(format!("target_weight {w} is negative")).into(),
                );
            }
        }
        Ok(())
    }

    /// Validate, write the present fields, and return the settings as now
    /// stored.
    pub fn apply(&self, state: &SharedState) -> Result<Settings> {
        self.validate()?;
        if self.auto_mode == Some(false) {
            state.set_auto_mode(false)?;
        }
        if let Some(w) = self.target_weight {
            state.set_target_weight(w)?;
        }
        if let Some(u) = self.target_unit {
            state.set_target_unit(u)?;
        }
        if self.auto_mode == Some(true) {
            state.set_auto_mode(true)?;
        }
        tracing::info!(
            auto_mode = ?self.auto_mode,
            target_weight = ?self.target_weight.map(|w| w.to_string()),
            target_unit = ?self.target_unit,
            "settings updated"
        );
        Settings::read(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Key, MemoryStore, StateStore};
    use std::sync::{Arc, Mutex};

    fn seeded() -> SharedState {
        let state = SharedState::in_memory();
        state.set_auto_mode(true).unwrap();
        state.set_target_weight("24.50".parse().unwrap()).unwrap();
        state.set_target_unit(Unit::Grains).unwrap();
        state
    }

    #[test]
    fn absent_fields_are_left_alone() {
        let state = seeded();
        let upd: SettingsUpdate = serde_json::from_str(r#"{"target_unit": "g"}"#).unwrap();
        let s = upd.apply(&state).unwrap();
        assert_eq!(s.auto_mode, Some(true));
        assert_eq!(s.target_weight.unwrap().to_string(), "24.50");
        assert_eq!(s.target_unit, Some(Unit::Grams));
    }

    #[test]
    fn explicit_false_and_zero_are_values() {
        let state = seeded();
        let upd: SettingsUpdate =
            serde_json::from_str(r#"{"auto_mode": false, "target_weight": "0"}"#).unwrap();
        let s = upd.apply(&state).unwrap();
        assert_eq!(s.auto_mode, Some(false));
        assert_eq!(s.target_weight, Some(Decimal::ZERO));
        assert_eq!(s.target_unit, Some(Unit::Grains));
    }

    #[test]
    fn nulls_mean_no_change() {
        let state = seeded();
        let upd: SettingsUpdate =
            serde_json::from_str(r#"{"auto_mode": null, "target_unit": null}"#).unwrap();
        assert!(upd.is_empty());
        assert_eq!(upd.apply(&state).unwrap(), Settings::read(&state).unwrap());
    }

    #[test]
    fn negative_weight_is_rejected_without_writing() {
        let state = seeded();
        let upd = SettingsUpdate {
            auto_mode: Some(false),
            target_weight: Some("-1.0".parse().unwrap()),
            ..SettingsUpdate::default()
        };
        assert!(upd.apply(&state).is_err());
        assert_eq!(state.auto_mode().unwrap(), Some(true));
    }

    /// Records what a concurrent reader would see after every write.
    struct Snooper {
        inner: MemoryStore,
        views: Mutex<Vec<(Option<String>, Option<String>)>>,
    }

    impl StateStore for Snooper {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<()> {
            self.inner.set(key, value)?;
            let view = (
                self.inner.get(Key::AutoMode.name())?,
                self.inner.get(Key::TargetWeight.name())?,
            );
            self.views.lock().unwrap().push(view);
            Ok(())
        }
    }

    fn snooped(auto_mode: bool, weight: &str) -> (Arc<Snooper>, SharedState) {
        let snoop = Arc::new(Snooper {
            inner: MemoryStore::new(),
            views: Mutex::new(Vec::new()),
        });
        let state = SharedState::new(snoop.clone());
        state.set_auto_mode(auto_mode).unwrap();
        state.set_target_weight(weight.parse().unwrap()).unwrap();
        snoop.views.lock().unwrap().clear();
        (snoop, state)
    }

    #[test]
    fn enabling_auto_mode_never_exposes_the_old_target() {
        let (snoop, state) = snooped(false, "30.00");
        let upd: SettingsUpdate =
            serde_json::from_str(r#"{"auto_mode": true, "target_weight": "10.00"}"#).unwrap();
        upd.apply(&state).unwrap();
        let views = snoop.views.lock().unwrap().clone();
        assert!(!views.is_empty());
        for (auto_mode, weight) in &views {
            if auto_mode.as_deref() == Some("true") {
                assert_eq!(weight.as_deref(), Some(r#""10.00""#));
            }
        }
        assert_eq!(views.last().unwrap().0.as_deref(), Some("true"));
    }

    #[test]
    fn disabling_auto_mode_lands_before_the_new_target() {
        let (snoop, state) = snooped(true, "30.00");
        let upd: SettingsUpdate =
            serde_json::from_str(r#"{"auto_mode": false, "target_weight": "45.00"}"#).unwrap();
        upd.apply(&state).unwrap();
        let views = snoop.views.lock().unwrap().clone();
        assert_eq!(
            views.first().unwrap(),
            &(Some("false".to_owned()), Some(r#""30.00""#.to_owned()))
        );
        for (auto_mode, weight) in &views {
            if weight.as_deref() == Some(r#""45.00""#) {
                assert_eq!(auto_mode.as_deref(), Some("false"));
            }
        }
    }

    #[test]
    fn numeric_weights_parse_like_strings() {
        let from_number: SettingsUpdate =
            serde_json::from_str(r#"{"target_weight": 10.5}"#).unwrap();
        let from_text: SettingsUpdate =
            serde_json::from_str(r#"{"target_weight": "10.5"}"#).unwrap();
        assert_eq!(from_number, from_text);
        let int: SettingsUpdate = serde_json::from_str(r#"{"target_weight": 24}"#).unwrap();
        assert_eq!(int.target_weight.unwrap().to_string(), "24");
        assert!(serde_json::from_str::<SettingsUpdate>(r#"{"target_weight": true}"#).is_err());
    }

    #[test]
    fn negative_numeric_weight_fails_validation() {
        let upd: SettingsUpdate = serde_json::from_str(r#"{"target_weight": -2.5}"#).unwrap();
        assert!(upd.validate().is_err());
    }

    #[test]
    fn unknown_fields_and_units_fail_to_parse() {
        assert!(serde_json::from_str::<SettingsUpdate>(r#"{"speed": 1}"#).is_err());
        assert!(serde_json::from_str::<SettingsUpdate>(r#"{"target_unit": "oz"}"#).is_err());
    }

    #[test]
    fn settings_serialize_with_canonical_names() {
        let json = serde_json::to_string(&Settings::read(&seeded()).unwrap()).unwrap();
        assert_eq!(
            json,
            r#"{"auto_mode":true,"target_unit":"GRAINS","target_weight":"24.50"}"#
        );
    }
}
