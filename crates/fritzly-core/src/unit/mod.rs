// ── HAN-FUN units ──
//
// A HAN-FUN device is listed as a parent fragment plus one sibling fragment per
// unit; a unit's identifier extends the parent's (`"12345 0000001"` →
// `"12345 0000001-1"`). Each unit carries an ETSI identity block and one typed
// interface. Fields not modelled here stay reachable through `raw`.

use std::fmt;

use fritzly_api::{Client, FieldBag};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::aha;
use crate::error::{CoreError, DecodeError};
use crate::fields::{number, require_object, text, text_or_empty};

mod interface;

pub use interface::{Alert, InterfaceKind, UnitInterface, interface_name};

/// Keys never copied into [`Unit::raw`]: they are already represented by
/// named fields on the unit or its device.
pub const RAW_EXCLUDED_KEYS: [&str; 10] = [
    "-functionbitmask",
    "-fwversion",
    "-id",
    "-identifier",
    "-manufacturer",
    "-productname",
    "name",
    "present",
    "txbusy",
    "etsiunitinfo",
];

/// Documented name of an ETSI unit type code.
pub fn unit_type_name(code: u16) -> Option<&'static str> {
    Some(match code {
        273 => "SIMPLE_BUTTON",
        256 => "SIMPLE_ON_OFF_SWITCHABLE",
        257 => "SIMPLE_ON_OFF_SWITCH",
        262 => "AC_OUTLET",
        263 => "AC_OUTLET_SIMPLE_POWER_METERING",
        264 => "SIMPLE_LIGHT",
        265 => "DIMMABLE_LIGHT",
        266 => "DIMMER_SWITCH",
        277 => "COLOR_BULB",
        278 => "DIMMABLE_COLOR_BULB",
        281 => "BLIND",
        282 => "LAMELLAR",
        512 => "SIMPLE_DETECTOR",
        513 => "DOOR_OPEN_CLOSE_DETECTOR",
        514 => "WINDOW_OPEN_CLOSE_DETECTOR",
        515 => "MOTION_DETECTOR",
        518 => "FLOOD_DETECTOR",
        519 => "GLAS_BREAK_DETECTOR",
        520 => "VIBRATION_DETECTOR",
        640 => "SIREN",
        _ => return None,
    })
}

/// ETSI identity block (`etsiunitinfo`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EtsiUnitInfo {
    /// Router-internal id of the parent HAN-FUN device.
    pub device_id: String,
    /// Interface codes, in the order the router lists them.
    pub interfaces: Vec<u16>,
    pub unit_type: Option<u16>,
}

impl EtsiUnitInfo {
    fn decode(fragment: &FieldBag) -> Result<Self, DecodeError> {
        const PATH: &str = "etsiunitinfo";
        let info = require_object(fragment, PATH)?;
        let interfaces = text(info, "interfaces")
            .map(|raw| {
                raw.split(',')
                    .map(|code| {
                        code.trim().parse::<u16>().map_err(|_| {
                            DecodeError::new("etsiunitinfo.interfaces", format!("bad code {code:?}"))
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?
            .unwrap_or_default();
        Ok(Self {
            device_id: text_or_empty(info, "etsideviceid"),
            interfaces,
            unit_type: number(info, "unittype", PATH)?,
        })
    }

    pub fn unit_type_name(&self) -> Option<&'static str> {
        self.unit_type.and_then(unit_type_name)
    }

    /// Documented names of the listed interface codes; unknown codes are skipped.
    pub fn interface_names(&self) -> Vec<&'static str> {
        self.interfaces
            .iter()
            .filter_map(|c| interface_name(*c))
            .collect()
    }
}

/// One HAN-FUN unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Unit {
    /// The unit's own AIN.
    pub ain: String,
    /// AIN of the HAN-FUN device the unit belongs to.
    pub parent_ain: String,
    pub name: String,
    pub etsi: EtsiUnitInfo,
    pub interface: UnitInterface,
    /// Every other field of the unit fragment, untyped.
    pub raw: FieldBag,
}

impl Unit {
    /// Decode a unit from its own device fragment.
    pub fn decode(fragment: &FieldBag, parent_ain: &str) -> Result<Self, DecodeError> {
        let ain = text(fragment, "-identifier")
            .ok_or_else(|| DecodeError::missing("-identifier"))?
            .to_owned();
        let etsi = EtsiUnitInfo::decode(fragment)?;
        let interface = UnitInterface::decode(&etsi.interfaces, fragment)?;
        let raw = fragment
            .iter()
            .filter(|(k, _)| !RAW_EXCLUDED_KEYS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Ok(Self {
            ain,
            parent_ain: parent_ain.to_owned(),
            name: text_or_empty(fragment, "name"),
            etsi,
            interface,
            raw,
        })
    }

    pub fn kind(&self) -> InterfaceKind {
        self.interface.kind()
    }

    /// Deserialize a raw field into `T`.
    pub fn raw_property<T: DeserializeOwned>(&self, key: &str) -> Result<T, DecodeError> {
        let value = self
            .raw
            .get(key)
            .ok_or_else(|| DecodeError::missing(key))?;
        serde_json::from_value(value.clone()).map_err(|e| DecodeError::new(key, e.to_string()))
    }

    /// Re-read this unit from `getdeviceinfos`.
    pub async fn reload(&mut self, client: &Client) -> Result<(), CoreError> {
        let fragment = aha::device_infos(client, &self.ain).await?;
        *self = Self::decode(&fragment, &self.parent_ain)?;
        Ok(())
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.name, self.ain, self.interface)?;
        if let Some(t) = self.etsi.unit_type_name() {
            write!(f, " [{t}]")?;
        }
        Ok(())
    }
}
