// ── HAN-FUN unit interfaces ──
//
// The closed set of interfaces the router exposes for HAN-FUN units, selected
// by ETSI interface code. Codes outside the table decode to `Unrecognized`;
// the unit's raw field bag still carries whatever the router sent.

use std::fmt;

use chrono::{DateTime, Utc};
use fritzly_api::FieldBag;
use serde::Serialize;
use strum::{Display, EnumDiscriminants, EnumIter, IntoEnumIterator};

use crate::error::DecodeError;
use crate::fields::{number, require_object, timestamp};

/// State of an alert interface (door/window contacts, smoke, water).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Alert {
    /// Raw alert state; non-zero means at least one alert is raised.
    pub state: Option<u8>,
    pub last_change: Option<DateTime<Utc>>,
}

impl Alert {
    fn decode(fragment: &FieldBag) -> Result<Self, DecodeError> {
        let alert = require_object(fragment, "alert")?;
        Ok(Self {
            state: number(alert, "state", "alert")?,
            last_change: timestamp(alert, "lastalertchgtimestamp", "alert")?,
        })
    }

    pub fn is_active(&self) -> bool {
        self.state.is_some_and(|s| s != 0)
    }
}

/// Typed interface of a HAN-FUN unit.
#[derive(Debug, Clone, PartialEq, Serialize, EnumDiscriminants)]
#[strum_discriminants(name(InterfaceKind), derive(Hash, Display, EnumIter))]
#[strum_discriminants(strum(serialize_all = "SCREAMING_SNAKE_CASE"))]
#[serde(tag = "interface", rename_all = "snake_case")]
pub enum UnitInterface {
    KeepAlive,
    Alert(Alert),
    OnOff,
    LevelControl,
    ColorControl,
    OpenClose,
    OpenCloseConfig,
    SimpleButton,
    SuotaUpdate,
    /// None of the unit's interface codes is in the table.
    Unrecognized { codes: Vec<u16> },
}

impl InterfaceKind {
    /// ETSI interface code (`None` for `Unrecognized`).
    pub fn code(self) -> Option<u16> {
        match self {
            Self::KeepAlive => Some(277),
            Self::Alert => Some(256),
            Self::OnOff => Some(512),
            Self::LevelControl => Some(513),
            Self::ColorControl => Some(514),
            Self::OpenClose => Some(516),
            Self::OpenCloseConfig => Some(517),
            Self::SimpleButton => Some(772),
            Self::SuotaUpdate => Some(1024),
            Self::Unrecognized => None,
        }
    }

    pub fn from_code(code: u16) -> Option<Self> {
        Self::iter().find(|kind| kind.code() == Some(code))
    }
}

/// Documented name of an ETSI interface code.
pub fn interface_name(code: u16) -> Option<&'static str> {
    Some(match code {
        277 => "KEEP_ALIVE",
        256 => "ALERT",
        512 => "ON_OFF",
        513 => "LEVEL_CTRL",
        514 => "COLOR_CTRL",
        516 => "OPEN_CLOSE",
        517 => "OPEN_CLOSE_CONFIG",
        772 => "SIMPLE_BUTTON",
        1024 => "SUOTA-Update",
        _ => return None,
    })
}

impl UnitInterface {
    /// Pick the first code with a known interface and decode it from the
    /// unit fragment.
    pub fn decode(codes: &[u16], fragment: &FieldBag) -> Result<Self, DecodeError> {
        let Some(kind) = codes.iter().copied().find_map(InterfaceKind::from_code) else {
            return Ok(Self::Unrecognized {
                codes: codes.to_vec(),
            });
        };
        Ok(match kind {
            InterfaceKind::KeepAlive => Self::KeepAlive,
            InterfaceKind::Alert => Self::Alert(Alert::decode(fragment)?),
            InterfaceKind::OnOff => Self::OnOff,
            InterfaceKind::LevelControl => Self::LevelControl,
            InterfaceKind::ColorControl => Self::ColorControl,
            InterfaceKind::OpenClose => Self::OpenClose,
            InterfaceKind::OpenCloseConfig => Self::OpenCloseConfig,
            InterfaceKind::SimpleButton => Self::SimpleButton,
            InterfaceKind::SuotaUpdate => Self::SuotaUpdate,
            InterfaceKind::Unrecognized => Self::Unrecognized {
                codes: codes.to_vec(),
            },
        })
    }

    pub fn kind(&self) -> InterfaceKind {
        InterfaceKind::from(self)
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized { .. })
    }
}

impl fmt::Display for UnitInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alert(alert) => {
                write!(f, "ALERT ({})", if alert.is_active() { "active" } else { "idle" })?;
                if let Some(t) = alert.last_change {
                    write!(f, ", last change {t}")?;
                }
                Ok(())
            }
            Self::Unrecognized { codes } => write!(f, "unrecognized {codes:?}"),
            other => write!(f, "{}", other.kind()),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    use super::*;

    fn bag(v: Value) -> FieldBag {
        let Value::Object(m) = v else { unreachable!() };
        m
    }

    #[test]
    fn codes_map_to_kinds() {
        assert_eq!(InterfaceKind::from_code(256), Some(InterfaceKind::Alert));
        assert_eq!(InterfaceKind::from_code(772), Some(InterfaceKind::SimpleButton));
        assert_eq!(InterfaceKind::from_code(1), None);
        for kind in InterfaceKind::iter().filter(|k| *k != InterfaceKind::Unrecognized) {
            let code = kind.code().expect("has code");
            assert!(interface_name(code).is_some(), "{kind}");
        }
    }

    #[test]
    fn alert_reads_its_own_sub_key() {
        let f = bag(json!({"alert": {"state": "1", "lastalertchgtimestamp": "1700000000"}}));
        let iface = UnitInterface::decode(&[256], &f).expect("decodes");
        let UnitInterface::Alert(alert) = &iface else {
            panic!("expected alert, got {iface:?}")
        };
        assert!(alert.is_active());
        assert_eq!(alert.last_change.map(|t| t.timestamp()), Some(1_700_000_000));
        assert_eq!(iface.kind(), InterfaceKind::Alert);
    }

    #[test]
    fn first_known_code_wins() {
        let iface = UnitInterface::decode(&[9999, 512, 513], &FieldBag::new()).expect("decodes");
        assert_eq!(iface, UnitInterface::OnOff);
    }

    #[test]
    fn unknown_codes_are_unrecognized() {
        let iface = UnitInterface::decode(&[9999], &FieldBag::new()).expect("decodes");
        assert_eq!(iface, UnitInterface::Unrecognized { codes: vec![9999] });
        assert!(!iface.is_recognized());
    }

    #[test]
    fn kind_names() {
        assert_eq!(InterfaceKind::OpenCloseConfig.to_string(), "OPEN_CLOSE_CONFIG");
        assert_eq!(UnitInterface::KeepAlive.to_string(), "KEEP_ALIVE");
    }
}
