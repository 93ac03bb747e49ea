// ── Push buttons ──
//
// A button device reports one `<button>` element per physical event source.
// The press type is only encoded in the label: `"<device>: kurz"` for a short
// press, `"<device>: lang"` for a long one.

use std::fmt;

use chrono::{DateTime, Utc};
use fritzly_api::{Client, FieldBag, one_or_many};
use serde::Serialize;
use serde_json::Value;
use strum::{Display, EnumString};

use crate::aha;
use crate::error::{CoreError, DecodeError};
use crate::fields::{flag, number, text_or_empty, timestamp};

const KEY: &str = "button";

/// Press type, taken from the label suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(ascii_case_insensitive)]
pub enum ButtonPress {
    #[strum(to_string = "short", serialize = "kurz")]
    Short,
    #[strum(to_string = "long", serialize = "lang")]
    Long,
}

impl ButtonPress {
    /// Classify a label such as `"Taster Flur: kurz"`.
    ///
    /// The suffix after the last `": "` is matched against `kurz`/`short` and
    /// `lang`/`long`, ignoring case. Anything else is unclassified.
    pub fn from_label(label: &str) -> Option<Self> {
        let (_, suffix) = label.rsplit_once(": ")?;
        suffix.trim().parse().ok()
    }
}

/// One physical button event source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushButton {
    pub id: String,
    pub identifier: String,
    pub name: String,
    pub press: Option<ButtonPress>,
    pub last_pressed: Option<DateTime<Utc>>,
}

impl PushButton {
    fn decode(bag: &FieldBag, index: usize) -> Result<Self, DecodeError> {
        let path = format!("{KEY}[{index}]");
        let name = text_or_empty(bag, "name");
        Ok(Self {
            id: text_or_empty(bag, "-id"),
            identifier: text_or_empty(bag, "-identifier"),
            press: ButtonPress::from_label(&name),
            name,
            last_pressed: timestamp(bag, "lastpressedtimestamp", &path)?,
        })
    }
}

impl fmt::Display for PushButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.identifier)?;
        if let Some(press) = self.press {
            write!(f, " [{press}]")?;
        }
        match self.last_pressed {
            Some(t) => write!(f, ", last pressed {t}"),
            None => f.write_str(", never pressed"),
        }
    }
}

/// Button capability.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Button {
    /// AIN of the owning device.
    pub ain: String,
    pub battery: Option<u8>,
    pub battery_low: Option<bool>,
    /// Buttons in document order.
    pub buttons: Vec<PushButton>,
}

impl Button {
    /// Decode from a device fragment: the `button` list plus the device-level
    /// battery fields.
    pub fn decode(fragment: &FieldBag, ain: &str) -> Result<Self, DecodeError> {
        if !fragment.contains_key(KEY) {
            return Err(DecodeError::missing(KEY));
        }
        let buttons = one_or_many(fragment.get(KEY))
            .into_iter()
            .enumerate()
            .map(|(i, v)| match v {
                Value::Object(bag) => PushButton::decode(bag, i),
                _ => Err(DecodeError::new(format!("{KEY}[{i}]"), "not an element")),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            ain: ain.to_owned(),
            battery: number(fragment, "battery", "")?,
            battery_low: flag(fragment, "batterylow", "")?,
            buttons,
        })
    }

    /// Re-read everything from `getdeviceinfos`.
    pub async fn reload(&mut self, client: &Client) -> Result<(), CoreError> {
        let fragment = aha::device_infos(client, &self.ain).await?;
        *self = Self::decode(&fragment, &self.ain)?;
        Ok(())
    }

    /// The most recently pressed button, if any was ever pressed.
    pub fn last_pressed(&self) -> Option<&PushButton> {
        self.buttons
            .iter()
            .filter(|b| b.last_pressed.is_some())
            .max_by_key(|b| b.last_pressed)
    }
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("buttons: [")?;
        for (i, b) in self.buttons.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{b}")?;
        }
        f.write_str("]")?;
        if let Some(battery) = self.battery {
            write!(f, ", battery {battery}%")?;
        }
        Ok(())
    }
}
