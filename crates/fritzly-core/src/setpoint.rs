// ── Thermostat setpoint encoding ──
//
// Setpoints travel as half-degree integers (`42` = 21.0 °C) with two
// out-of-band codes: 253 (off, frost protection only) and 254 (fully open).
// Sensor readings use tenths of a degree instead; see `tenths_to_celsius`.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::error::CoreError;

/// Raw code for "radiator off".
pub const RAW_OFF: u16 = 253;
/// Raw code for "radiator fully open".
pub const RAW_MAX: u16 = 254;

/// Numeric stand-in for [`Setpoint::Off`].
pub const NUMERIC_OFF: f64 = -2.0;
/// Numeric stand-in for [`Setpoint::Max`].
pub const NUMERIC_MAX: f64 = -1.0;

/// Lowest settable temperature in °C.
pub const MIN_CELSIUS: f64 = 8.0;
/// Highest settable temperature in °C.
pub const MAX_CELSIUS: f64 = 28.0;

/// A thermostat setpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Setpoint {
    Off,
    Max,
    Celsius(f64),
}

impl Setpoint {
    pub fn from_raw(raw: u16) -> Self {
        match raw {
            RAW_OFF => Self::Off,
            RAW_MAX => Self::Max,
            half_degrees => Self::Celsius(f64::from(half_degrees) / 2.0),
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn to_raw(self) -> u16 {
        match self {
            Self::Off => RAW_OFF,
            Self::Max => RAW_MAX,
            Self::Celsius(c) => (c * 2.0).round().clamp(0.0, f64::from(u16::MAX)) as u16,
        }
    }

    /// °C for real temperatures, `-2` for off, `-1` for max.
    pub fn numeric(self) -> f64 {
        match self {
            Self::Off => NUMERIC_OFF,
            Self::Max => NUMERIC_MAX,
            Self::Celsius(c) => c,
        }
    }

    /// Inverse of [`Setpoint::numeric`].
    #[allow(clippy::float_cmp)]
    pub fn from_numeric(value: f64) -> Self {
        if value == NUMERIC_OFF {
            Self::Off
        } else if value == NUMERIC_MAX {
            Self::Max
        } else {
            Self::Celsius(value)
        }
    }

    /// A settable temperature: 8–28 °C inclusive, rounded to the nearest half degree.
    pub fn celsius(value: f64) -> Result<Self, CoreError> {
        if !(MIN_CELSIUS..=MAX_CELSIUS).contains(&value) {
            return Err(CoreError::InvalidTemperature { value });
        }
        Ok(Self::Celsius((value * 2.0).round() / 2.0))
    }
}

impl fmt::Display for Setpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Off => f.write_str("OFF"),
            Self::Max => f.write_str("MAX"),
            Self::Celsius(c) => write!(f, "{c:.1}"),
        }
    }
}

impl FromStr for Setpoint {
    type Err = CoreError;

    /// Accepts `OFF`, `MAX` (any case) or a temperature with `.` or `,` as
    /// decimal separator. Temperatures are range-checked.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("off") {
            return Ok(Self::Off);
        }
        if s.eq_ignore_ascii_case("max") {
            return Ok(Self::Max);
        }
        let value: f64 = s
            .replacen(',', ".", 1)
            .parse()
            .map_err(|_| CoreError::InvalidTemperature { value: f64::NAN })?;
        Self::celsius(value)
    }
}

impl Serialize for Setpoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Sensor readings and offsets are tenths of a degree.
pub fn tenths_to_celsius(tenths: i32) -> f64 {
    f64::from(tenths) / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_render_as_tokens() {
        assert_eq!(Setpoint::from_raw(253).to_string(), "OFF");
        assert_eq!(Setpoint::from_raw(254).to_string(), "MAX");
        assert_eq!(Setpoint::from_raw(253).numeric(), -2.0);
        assert_eq!(Setpoint::from_raw(254).numeric(), -1.0);
    }

    #[test]
    fn half_degrees_decode() {
        assert_eq!(Setpoint::from_raw(43), Setpoint::Celsius(21.5));
        assert_eq!(Setpoint::from_raw(43).to_string(), "21.5");
        assert_eq!(Setpoint::Celsius(21.5).to_raw(), 43);
        assert_eq!(Setpoint::Off.to_raw(), 253);
        assert_eq!(Setpoint::Max.to_raw(), 254);
    }

    #[test]
    fn string_and_numeric_round_trip_over_the_settable_range() {
        for half in 16..=56_u16 {
            let x = f64::from(half) / 2.0;
            let rendered = Setpoint::Celsius(x).to_string();
            let parsed: Setpoint = rendered.parse().expect("in range");
            assert_eq!(parsed.numeric(), x, "{rendered}");
        }
        for token in ["OFF", "MAX"] {
            let parsed: Setpoint = token.parse().expect("sentinel");
            assert_eq!(Setpoint::from_numeric(parsed.numeric()), parsed);
            assert_eq!(parsed.to_string(), token);
        }
    }

    #[test]
    fn range_is_inclusive() {
        assert!(Setpoint::celsius(8.0).is_ok());
        assert!(Setpoint::celsius(28.0).is_ok());
        assert!(matches!(
            Setpoint::celsius(7.9),
            Err(CoreError::InvalidTemperature { .. })
        ));
        assert!(matches!(
            Setpoint::celsius(28.1),
            Err(CoreError::InvalidTemperature { .. })
        ));
    }

    #[test]
    fn rounds_to_nearest_half_degree() {
        assert_eq!(Setpoint::celsius(21.2).expect("valid"), Setpoint::Celsius(21.0));
        assert_eq!(Setpoint::celsius(21.3).expect("valid"), Setpoint::Celsius(21.5));
        assert_eq!(Setpoint::celsius(27.8).expect("valid").to_raw(), 56);
    }

    #[test]
    fn parses_comma_decimal() {
        let sp: Setpoint = "19,5".parse().expect("valid");
        assert_eq!(sp, Setpoint::Celsius(19.5));
        assert!("warm".parse::<Setpoint>().is_err());
    }

    #[test]
    fn sensor_tenths() {
        assert_eq!(tenths_to_celsius(215), 21.5);
        assert_eq!(tenths_to_celsius(-15), -1.5);
    }
}
