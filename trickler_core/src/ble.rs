//! BLE characteristic codec for the trickler GATT service.
//!
//! Maps each characteristic to a shared-state key and its byte encoding.
//! The GATT server itself lives outside this crate; it calls `read`/`write`
//! on request and `BleBridge::poll` to find values worth notifying.

use std::collections::HashMap;

use trickler_config::BluetoothCfg;

use crate::decimal::Decimal;
use crate::error::{Result, TricklerError};
use crate::reading::{ScaleStatus, Unit};
use crate::settings::SettingsUpdate;
use crate::store::{Key, SharedState};

pub const SERVICE_UUID: &str = "10000000-be5f-4b43-a49f-76f2d65c6e28";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flags {
    pub read: bool,
    pub write: bool,
    pub notify: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Characteristic {
    ScaleWeight,
    ScaleStatus,
    ScaleUnit,
    TargetWeight,
    AutoMode,
}

impl Characteristic {
    pub const ALL: [Characteristic; 5] = [
        Characteristic::ScaleWeight,
        Characteristic::ScaleStatus,
        Characteristic::ScaleUnit,
        Characteristic::TargetWeight,
        Characteristic::AutoMode,
    ];

    pub const fn uuid(self) -> &'static str {
        match self {
            Characteristic::ScaleWeight => "10000001-be5f-4b43-a49f-76f2d65c6e28",
            Characteristic::ScaleStatus => "10000002-be5f-4b43-a49f-76f2d65c6e28",
            Characteristic::ScaleUnit => "10000003-be5f-4b43-a49f-76f2d65c6e28",
            Characteristic::TargetWeight => "10000004-be5f-4b43-a49f-76f2d65c6e28",
            Characteristic::AutoMode => "10000005-be5f-4b43-a49f-76f2d65c6e28",
        }
    }

    pub fn from_uuid(uuid: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.uuid().eq_ignore_ascii_case(uuid))
    }

    pub const fn name(self) -> &'static str {
        match self {
            Characteristic::ScaleWeight => "scale_weight",
            Characteristic::ScaleStatus => "scale_status",
            Characteristic::ScaleUnit => "scale_unit",
            Characteristic::TargetWeight => "target_weight",
            Characteristic::AutoMode => "auto_mode",
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Characteristic::ScaleWeight => "Reads the current weight value of the scale",
            Characteristic::ScaleStatus => "Reads the current stability status of the scale",
            Characteristic::ScaleUnit => "Reads the current weight unit of the scale",
            Characteristic::TargetWeight => "Target powder weight",
            Characteristic::AutoMode => "Start/stop automatic trickle mode",
        }
    }

    pub const fn flags(self) -> Flags {
        let (read, write, notify) = match self {
            Characteristic::ScaleWeight | Characteristic::ScaleStatus => (true, false, true),
            Characteristic::ScaleUnit => (true, true, true),
            Characteristic::TargetWeight | Characteristic::AutoMode => (true, true, false),
        };
        Flags {
            read,
            write,
            notify,
        }
    }

    /// Key read for this characteristic. `ScaleUnit` writes go to
    /// `target_unit` instead.
    pub const fn key(self) -> Key {
        match self {
            Characteristic::ScaleWeight => Key::ScaleWeight,
            Characteristic::ScaleStatus => Key::ScaleStatus,
            Characteristic::ScaleUnit => Key::ScaleUnit,
            Characteristic::TargetWeight => Key::TargetWeight,
            Characteristic::AutoMode => Key::AutoMode,
        }
    }

    /// Current value, encoded. `None` while the key has not been published.
    pub fn read(self, state: &SharedState) -> Result<Option<Vec<u8>>> {
        Ok(match self {
            Characteristic::ScaleWeight | Characteristic::TargetWeight => state
                .get::<Decimal>(self.key())?
                .map(|d| encode_decimal(&d)),
            Characteristic::ScaleStatus => state
                .get::<ScaleStatus>(self.key())?
                .map(|s| vec![s.ordinal()]),
            Characteristic::ScaleUnit => state.get::<Unit>(self.key())?.map(|u| vec![u.ordinal()]),
            Characteristic::AutoMode => state.get::<bool>(self.key())?.map(|b| vec![u8::from(b)]),
        })
    }

    /// Decode a client write and apply it as a settings update.
    pub fn write(self, state: &SharedState, data: &[u8]) -> Result<()> {
        let update = match self {
            Characteristic::AutoMode => SettingsUpdate {
                auto_mode: Some(decode_bool(data)?),
                ..SettingsUpdate::default()
            },
            Characteristic::TargetWeight => SettingsUpdate {
                target_weight: Some(decode_decimal(data)?),
                ..SettingsUpdate::default()
            },
            Characteristic::ScaleUnit => SettingsUpdate {
                target_unit: Some(decode_unit(data)?),
                ..SettingsUpdate::default()
            },
            Characteristic::ScaleWeight | Characteristic::ScaleStatus => {
                return Err(invalid(format!("{} is read-only", self.name())));
            }
        };
        tracing::info!(characteristic = self.name(), ?data, "ble write");
        update.apply(state).map(|_| ())
    }
}

fn invalid(msg: String) -> eyre::Report {
    TricklerError::InvalidSetting(msg).into()
}

fn single_byte(data: &[u8]) -> Result<u8> {
    match data {
        [b] => Ok(*b),
        _ => Err(invalid(format!("expected 1 byte, got {}", data.len()))),
    }
}

pub fn decode_bool(data: &[u8]) -> Result<bool> {
    single_byte(data).map(|b| b != 0)
}

pub fn decode_unit(data: &[u8]) -> Result<Unit> {
    let b = single_byte(data)?;
    Unit::from_ordinal(b).ok_or_else(|| invalid(format!("unknown unit ordinal {b}")))
}

pub fn encode_decimal(d: &Decimal) -> Vec<u8> {
    d.to_string().into_bytes()
}

pub fn decode_decimal(data: &[u8]) -> Result<Decimal> {
    if data.is_empty() {
        return Err(invalid("empty decimal".into()));
    }
    let s = std::str::from_utf8(data).map_err(|_| invalid("decimal is not UTF-8".into()))?;
    s.parse::<Decimal>()
        .map_err(|e| invalid(format!("bad decimal {s:?}: {e}")))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub characteristic: Characteristic,
    pub value: Vec<u8>,
}

/// Tracks the last value sent for each notify-capable characteristic.
pub struct BleBridge {
    state: SharedState,
    name: String,
    last: HashMap<Characteristic, Vec<u8>>,
}

impl BleBridge {
    pub fn new(state: SharedState) -> Self {
        Self::from_config(state, &BluetoothCfg::default())
    }

    pub fn from_config(state: SharedState, cfg: &BluetoothCfg) -> Self {
        Self {
            state,
            name: cfg.name.clone(),
            last: HashMap::new(),
        }
    }

    /// Name the GATT server advertises for `SERVICE_UUID`.
    pub fn advertised_name(&self) -> &str {
        &self.name
    }

    /// Every characteristic has a value to serve.
    pub fn is_ready(&self) -> Result<bool> {
        for c in Characteristic::ALL {
            if c.read(&self.state)?.is_none() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn read(&self, c: Characteristic) -> Result<Option<Vec<u8>>> {
        c.read(&self.state)
    }

    pub fn write(&mut self, c: Characteristic, data: &[u8]) -> Result<()> {
        c.write(&self.state, data)
    }

    /// Notifications for notify-capable characteristics whose value changed
    /// since the previous poll.
    pub fn poll(&mut self) -> Result<Vec<Notification>> {
        let mut out = Vec::new();
        for c in Characteristic::ALL.into_iter().filter(|c| c.flags().notify) {
            let Some(value) = c.read(&self.state)? else {
                continue;
            };
            if self.last.get(&c) != Some(&value) {
                self.last.insert(c, value.clone());
                out.push(Notification {
                    characteristic: c,
                    value,
                });
            }
        }
        Ok(out)
    }
}
