// ── Temperature sensor ──
//
// `celsius` and `offset` are both tenths of a degree on the wire. `celsius`
// already has the offset applied.

use std::fmt;

use fritzly_api::{Client, FieldBag, one_or_many, root_field_bag};
use serde::Serialize;
use serde_json::Value;

use crate::aha;
use crate::error::{CoreError, DecodeError};
use crate::fields::{number, require_object, text};
use crate::setpoint::tenths_to_celsius;

const KEY: &str = "temperature";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Temperature {
    /// AIN of the owning device.
    pub ain: String,
    /// Measured temperature in °C, offset applied.
    pub celsius: Option<f64>,
    /// Calibration offset in °C.
    pub offset: Option<f64>,
}

/// Temperature history from `getbasicdevicestats`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TemperatureStats {
    /// Readings in °C, newest first. `None` where the device had no value.
    pub values: Vec<Option<f64>>,
    /// Number of readings the router reports.
    pub count: usize,
    /// Seconds between readings.
    pub grid_secs: u32,
}

impl TemperatureStats {
    /// Parse a `getbasicdevicestats` response.
    pub fn from_xml(body: &str) -> Result<Self, CoreError> {
        let stats = root_field_bag(body.as_bytes(), "devicestats")?;
        let temperature = require_object(&stats, KEY)?;
        // A device may report several series; the first one is the finest grid.
        let series = one_or_many(temperature.get("stats"))
            .into_iter()
            .find_map(Value::as_object)
            .ok_or_else(|| DecodeError::missing("devicestats.temperature.stats"))?;
        Ok(Self::from_series(series)?)
    }

    fn from_series(series: &FieldBag) -> Result<Self, DecodeError> {
        let path = "devicestats.temperature.stats";
        let values = text(series, fritzly_api::xml::TEXT_KEY)
            .map(|csv| {
                csv.split(',')
                    .map(|v| v.trim().parse::<i32>().ok().map(tenths_to_celsius))
                    .collect()
            })
            .unwrap_or_default();
        Ok(Self {
            values,
            count: number(series, "-count", path)?.unwrap_or(0),
            grid_secs: number(series, "-grid", path)?.unwrap_or(0),
        })
    }
}

impl fmt::Display for TemperatureStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} readings every {}s: [",
            self.count, self.grid_secs
        )?;
        for (i, v) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match v {
                Some(c) => write!(f, "{c:.1}")?,
                None => f.write_str("-")?,
            }
        }
        f.write_str("]")
    }
}

impl Temperature {
    /// Decode from a device fragment (reads only its `temperature` child).
    pub fn decode(fragment: &FieldBag, ain: &str) -> Result<Self, DecodeError> {
        let t = require_object(fragment, KEY)?;
        Ok(Self {
            ain: ain.to_owned(),
            celsius: number::<i32>(t, "celsius", KEY)?.map(tenths_to_celsius),
            offset: number::<i32>(t, "offset", KEY)?.map(tenths_to_celsius),
        })
    }

    /// Re-read everything from `getdeviceinfos`.
    pub async fn reload(&mut self, client: &Client) -> Result<(), CoreError> {
        let fragment = aha::device_infos(client, &self.ain).await?;
        *self = Self::decode(&fragment, &self.ain)?;
        Ok(())
    }

    /// Fetch the current reading (`gettemperature`) and store it.
    pub async fn fetch_celsius(&mut self, client: &Client) -> Result<f64, CoreError> {
        let body = client
            .aha("gettemperature", Some(self.ain.as_str()), &[])
            .await?;
        let tenths: i32 = body.parse().map_err(|_| CoreError::UnexpectedResponse {
            cmd: "gettemperature".into(),
            body: body.clone(),
        })?;
        let celsius = tenths_to_celsius(tenths);
        self.celsius = Some(celsius);
        Ok(celsius)
    }

    /// Fetch the temperature history (`getbasicdevicestats`).
    pub async fn fetch_stats(&self, client: &Client) -> Result<TemperatureStats, CoreError> {
        let body = client
            .aha("getbasicdevicestats", Some(self.ain.as_str()), &[])
            .await?;
        TemperatureStats::from_xml(&body)
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("temperature: ")?;
        match self.celsius {
            Some(c) => write!(f, "{c:.1} °C")?,
            None => f.write_str("-")?,
        }
        if let Some(o) = self.offset.filter(|o| *o != 0.0) {
            write!(f, " (offset {o:+.1})")?;
        }
        Ok(())
    }
}
