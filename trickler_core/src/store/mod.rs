//! Shared-state channel between the trickler processes.
//!
//! Every process talks to the same external key-value store. Keys form a
//! fixed schema (`Key`); values are JSON. There are no transactions, so a
//! reader may see some keys updated and others not yet: every getter returns
//! `Option` and callers treat `None` as "not ready".

mod memcache;
mod memory;

pub use memcache::MemcacheStore;
pub use memory::MemoryStore;

use std::collections::BTreeMap;
use std::sync::Arc;

use eyre::WrapErr;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::decimal::Decimal;
use crate::error::{Result, TricklerError};
use crate::protocol::ScaleModel;
use crate::reading::{Reading, ScaleStatus, Unit};

/// Version of the key schema, published next to the reference tables.
pub const SCHEMA_VERSION: u32 = 1;

/// Raw string storage. Implementations must be usable from several threads.
pub trait StateStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

impl<T: StateStore + ?Sized> StateStore for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }
    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    AutoMode,
    TargetWeight,
    TargetUnit,
    ScaleStatus,
    ScaleWeight,
    ScaleUnit,
    ScaleResolution,
    ScaleIsStable,
    TricklerMotorSpeed,
    ScaleUnits,
    ScaleUnitMap,
    ScaleReverseUnitMap,
    ScaleResolutionMap,
    ScaleStatusMap,
    SchemaVersion,
}

impl Key {
    pub const ALL: [Key; 15] = [
        Key::AutoMode,
        Key::TargetWeight,
        Key::TargetUnit,
        Key::ScaleStatus,
        Key::ScaleWeight,
        Key::ScaleUnit,
        Key::ScaleResolution,
        Key::ScaleIsStable,
        Key::TricklerMotorSpeed,
        Key::ScaleUnits,
        Key::ScaleUnitMap,
        Key::ScaleReverseUnitMap,
        Key::ScaleResolutionMap,
        Key::ScaleStatusMap,
        Key::SchemaVersion,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Key::AutoMode => "auto_mode",
            Key::TargetWeight => "target_weight",
            Key::TargetUnit => "target_unit",
            Key::ScaleStatus => "scale_status",
            Key::ScaleWeight => "scale_weight",
            Key::ScaleUnit => "scale_unit",
            Key::ScaleResolution => "scale_resolution",
            Key::ScaleIsStable => "scale_is_stable",
            Key::TricklerMotorSpeed => "trickler_motor_speed",
            Key::ScaleUnits => "scale_units",
            Key::ScaleUnitMap => "scale_unit_map",
            Key::ScaleReverseUnitMap => "scale_reverse_unit_map",
            Key::ScaleResolutionMap => "scale_resolution_map",
            Key::ScaleStatusMap => "scale_status_map",
            Key::SchemaVersion => "schema_version",
        }
    }
}

/// Settings and motor fields of the shared state, as last observed.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ControlState {
    pub auto_mode: Option<bool>,
    pub target_weight: Option<Decimal>,
    pub target_unit: Option<Unit>,
    pub motor_speed: Option<f64>,
}

impl ControlState {
    /// All three operator settings have been observed.
    pub fn is_ready(&self) -> bool {
        self.auto_mode.is_some() && self.target_weight.is_some() && self.target_unit.is_some()
    }
}

/// Scale fields of the shared state, as last observed.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScaleSnapshot {
    pub status: Option<ScaleStatus>,
    pub weight: Option<Decimal>,
    pub unit: Option<Unit>,
    pub resolution: Option<Decimal>,
    pub is_stable: Option<bool>,
}

/// Typed access to the shared-state store.
#[derive(Clone)]
pub struct SharedState {
    store: Arc<dyn StateStore>,
    prefix: String,
}

impl std::fmt::Debug for SharedState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedState")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl SharedState {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self::with_prefix(store, "")
    }

    pub fn with_prefix(store: Arc<dyn StateStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    /// Convenience for tests and the simulator: a fresh in-process store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn key(&self, key: Key) -> String {
        format!("{}{}", self.prefix, key.name())
    }

    /// Read and decode one key. A value that does not decode as `T` is
    /// logged and reported as absent.
    pub fn get<T: DeserializeOwned>(&self, key: Key) -> Result<Option<T>> {
        let name = self.key(key);
        let Some(raw) = self
            .store
            .get(&name)
            .wrap_err_with(|| format!("reading {name}"))?
        else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(v) => Ok(Some(v)),
            Err(e) => {
                tracing::warn!(key = %name, raw = %raw, error = %e, "undecodable shared state value");
                Ok(None)
            }
        }
    }

    pub fn set<T: Serialize + ?Sized>(&self, key: Key, value: &T) -> Result<()> {
        let name = self.key(key);
        let raw = serde_json::to_string(value)
            .map_err(|e| TricklerError::State(format!("encode {name}: {e}")))?;
        self.store
            .set(&name, &raw)
            .wrap_err_with(|| format!("writing {name}"))
    }

    pub fn auto_mode(&self) -> Result<Option<bool>> {
        self.get(Key::AutoMode)
    }

    pub fn set_auto_mode(&self, on: bool) -> Result<()> {
        self.set(Key::AutoMode, &on)
    }

    pub fn target_weight(&self) -> Result<Option<Decimal>> {
        self.get(Key::TargetWeight)
    }

    pub fn set_target_weight(&self, weight: Decimal) -> Result<()> {
        self.set(Key::TargetWeight, &weight)
    }

    pub fn target_unit(&self) -> Result<Option<Unit>> {
        self.get(Key::TargetUnit)
    }

    pub fn set_target_unit(&self, unit: Unit) -> Result<()> {
        self.set(Key::TargetUnit, &unit)
    }

    pub fn motor_speed(&self) -> Result<Option<f64>> {
        self.get(Key::TricklerMotorSpeed)
    }

    pub fn set_motor_speed(&self, speed: f64) -> Result<()> {
        self.set(Key::TricklerMotorSpeed, &speed)
    }

    pub fn control_state(&self) -> Result<ControlState> {
        Ok(ControlState {
            auto_mode: self.auto_mode()?,
            target_weight: self.target_weight()?,
            target_unit: self.target_unit()?,
            motor_speed: self.motor_speed()?,
        })
    }

    pub fn scale_snapshot(&self) -> Result<ScaleSnapshot> {
        Ok(ScaleSnapshot {
            status: self.get(Key::ScaleStatus)?,
            weight: self.get(Key::ScaleWeight)?,
            unit: self.get(Key::ScaleUnit)?,
            resolution: self.get(Key::ScaleResolution)?,
            is_stable: self.get(Key::ScaleIsStable)?,
        })
    }

    /// Publish the canonical reading. Keys are written one at a time.
    pub fn publish_reading(&self, reading: &Reading, resolution: Decimal) -> Result<()> {
        self.set(Key::ScaleStatus, &reading.status)?;
        self.set(Key::ScaleWeight, &reading.weight)?;
        self.set(Key::ScaleUnit, &reading.unit)?;
        self.set(Key::ScaleResolution, &resolution)?;
        self.set(Key::ScaleIsStable, &reading.is_stable())
    }

    /// Publish the vendor reference tables consumers use to decode enum
    /// values without knowing the scale model.
    pub fn publish_reference(&self, model: ScaleModel) -> Result<()> {
        let tables = ReferenceTables::for_model(model);
        self.set(Key::ScaleUnits, &tables.units)?;
        self.set(Key::ScaleUnitMap, &tables.unit_map)?;
        self.set(Key::ScaleReverseUnitMap, &tables.reverse_unit_map)?;
        self.set(Key::ScaleResolutionMap, &tables.resolution_map)?;
        self.set(Key::ScaleStatusMap, &tables.status_map)?;
        self.set(Key::SchemaVersion, &SCHEMA_VERSION)
    }
}

/// Static lookup tables derived from a `ScaleModel`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct ReferenceTables {
    /// Unit name to ordinal.
    pub units: BTreeMap<String, u8>,
    /// Wire token to unit ordinal.
    pub unit_map: BTreeMap<String, u8>,
    /// Unit ordinal to wire token.
    pub reverse_unit_map: BTreeMap<u8, String>,
    /// Unit ordinal to resolution.
    pub resolution_map: BTreeMap<u8, Decimal>,
    /// Status name to ordinal.
    pub status_map: BTreeMap<String, u8>,
}

impl ReferenceTables {
    pub fn for_model(model: ScaleModel) -> Self {
        Self {
            units: Unit::ALL
                .iter()
                .map(|u| (u.name().to_owned(), u.ordinal()))
                .collect(),
            unit_map: model
                .unit_map()
                .iter()
                .map(|(t, u)| ((*t).to_owned(), u.ordinal()))
                .collect(),
            reverse_unit_map: model
                .unit_map()
                .iter()
                .map(|(t, u)| (u.ordinal(), (*t).to_owned()))
                .collect(),
            resolution_map: Unit::ALL
                .iter()
                .map(|u| (u.ordinal(), model.resolution(*u)))
                .collect(),
            status_map: ScaleStatus::ALL
                .iter()
                .map(|s| (s.name().to_owned(), s.ordinal()))
                .collect(),
        }
    }
}
