// ── Capability registry ──
//
// A device advertises its feature set as one integer (`functionbitmask`).
// `FunctionBit` names every documented bit position; `CapabilityKind` is the
// subset this crate decodes. Bits without a decoder are kept on the device as
// plain `FunctionBit`s and never turned into capabilities.

use std::collections::BTreeMap;
use std::fmt;

use fritzly_api::FieldBag;
use serde::Serialize;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use crate::error::DecodeError;

pub mod button;
pub mod hanfun;
pub mod temperature;
pub mod thermostat;

pub use button::{Button, ButtonPress, PushButton};
pub use hanfun::HanFun;
pub use temperature::{Temperature, TemperatureStats};
pub use thermostat::{NextChange, Thermostat};

/// Documented bit positions of `functionbitmask`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FunctionBit {
    HanFun = 0,
    Light = 2,
    Alarm = 4,
    Button = 5,
    Thermostat = 6,
    EnergyMeter = 7,
    TemperatureSensor = 8,
    Outlet = 9,
    Repeater = 10,
    Microphone = 11,
    HanFunUnit = 13,
    Switchable = 15,
    Dimmable = 16,
    ColorLamp = 17,
    Blind = 18,
}

impl FunctionBit {
    /// Bit position, counted from the least significant bit.
    pub fn position(self) -> u32 {
        self as u32
    }

    pub fn from_position(position: u32) -> Option<Self> {
        Self::iter().find(|bit| bit.position() == position)
    }

    /// The decoded capability this bit turns into, if any.
    pub fn capability_kind(self) -> Option<CapabilityKind> {
        match self {
            Self::HanFun => Some(CapabilityKind::HanFun),
            Self::Button => Some(CapabilityKind::Button),
            Self::Thermostat => Some(CapabilityKind::Thermostat),
            Self::TemperatureSensor => Some(CapabilityKind::Temperature),
            _ => None,
        }
    }

    /// Human-readable description.
    pub fn description(self) -> &'static str {
        match self {
            Self::HanFun => "HAN-FUN device",
            Self::Light => "light / lamp",
            Self::Alarm => "alarm sensor",
            Self::Button => "AVM button",
            Self::Thermostat => "radiator thermostat",
            Self::EnergyMeter => "energy meter",
            Self::TemperatureSensor => "temperature sensor",
            Self::Outlet => "switchable outlet",
            Self::Repeater => "DECT repeater",
            Self::Microphone => "microphone",
            Self::HanFunUnit => "HAN-FUN unit",
            Self::Switchable => "on/off switchable device",
            Self::Dimmable => "dimmable / level-controlled device",
            Self::ColorLamp => "lamp with adjustable colour",
            Self::Blind => "blind",
        }
    }
}

/// Capability kinds with a decoder.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum CapabilityKind {
    HanFun,
    Button,
    Thermostat,
    Temperature,
}

impl CapabilityKind {
    /// The bitmask position that announces this kind.
    pub fn function_bit(self) -> FunctionBit {
        match self {
            Self::HanFun => FunctionBit::HanFun,
            Self::Button => FunctionBit::Button,
            Self::Thermostat => FunctionBit::Thermostat,
            Self::Temperature => FunctionBit::TemperatureSensor,
        }
    }

    /// An empty capability of this kind, not yet bound to a device.
    pub fn placeholder(self) -> Capability {
        match self {
            Self::HanFun => Capability::HanFun(HanFun::default()),
            Self::Button => Capability::Button(Button::default()),
            Self::Thermostat => Capability::Thermostat(Thermostat::default()),
            Self::Temperature => Capability::Temperature(Temperature::default()),
        }
    }
}

/// A decoded capability. Each variant records the AIN of its device.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Capability {
    HanFun(HanFun),
    Button(Button),
    Thermostat(Thermostat),
    Temperature(Temperature),
}

impl Capability {
    pub fn kind(&self) -> CapabilityKind {
        match self {
            Self::HanFun(_) => CapabilityKind::HanFun,
            Self::Button(_) => CapabilityKind::Button,
            Self::Thermostat(_) => CapabilityKind::Thermostat,
            Self::Temperature(_) => CapabilityKind::Temperature,
        }
    }

    /// AIN of the owning device (empty for an unbound placeholder).
    pub fn ain(&self) -> &str {
        match self {
            Self::HanFun(c) => &c.ain,
            Self::Button(c) => &c.ain,
            Self::Thermostat(c) => &c.ain,
            Self::Temperature(c) => &c.ain,
        }
    }

    /// Decode a capability of `kind` from a device fragment.
    ///
    /// HAN-FUN units live in sibling fragments, so a HAN-FUN capability comes
    /// back without units; the device assembler attaches them.
    pub fn decode(
        kind: CapabilityKind,
        fragment: &FieldBag,
        ain: &str,
    ) -> Result<Self, DecodeError> {
        Ok(match kind {
            CapabilityKind::HanFun => Self::HanFun(HanFun::new(ain)),
            CapabilityKind::Button => Self::Button(Button::decode(fragment, ain)?),
            CapabilityKind::Thermostat => Self::Thermostat(Thermostat::decode(fragment, ain)?),
            CapabilityKind::Temperature => Self::Temperature(Temperature::decode(fragment, ain)?),
        })
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HanFun(c) => write!(f, "{c}"),
            Self::Button(c) => write!(f, "{c}"),
            Self::Thermostat(c) => write!(f, "{c}"),
            Self::Temperature(c) => write!(f, "{c}"),
        }
    }
}

/// Capabilities of one device, keyed by kind.
pub type Capabilities = BTreeMap<CapabilityKind, Capability>;

/// Every documented bit set in `bitmask`, in ascending position order.
///
/// A missing or non-numeric bitmask yields no bits.
pub fn function_bits(bitmask: &str) -> Vec<FunctionBit> {
    let Ok(mask) = bitmask.trim().parse::<u64>() else {
        return Vec::new();
    };
    (0..u64::BITS)
        .filter(|i| mask & (1_u64 << i) != 0)
        .filter_map(FunctionBit::from_position)
        .collect()
}

/// Empty capability placeholders for every decodable bit set in `bitmask`.
///
/// Unknown positions and bits without a decoder are skipped. A malformed
/// bitmask yields an empty map, never an error.
pub fn capabilities_from_bitmask(bitmask: &str) -> Capabilities {
    function_bits(bitmask)
        .into_iter()
        .filter_map(FunctionBit::capability_kind)
        .map(|kind| (kind, kind.placeholder()))
        .collect()
}
