// ── Radiator thermostat (HKR) ──
//
// Decoded from the `hkr` element of a device fragment. Setpoints are
// half-degree encoded (see `setpoint`); `tist` is the measured temperature in
// the same encoding. Mutations go through the AHA interface and leave the
// local fields in sync with the router when they return.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use fritzly_api::{Client, FieldBag};
use serde::Serialize;
use tracing::debug;

use crate::aha;
use crate::error::{CoreError, DecodeError};
use crate::fields::{epoch_to_datetime, flag, number, object, require_object, timestamp};
use crate::setpoint::Setpoint;

/// Longest boost or window-open period the router accepts.
pub const MAX_TIMED_MODE: Duration = Duration::from_secs(24 * 60 * 60);

const KEY: &str = "hkr";

/// Next scheduled setpoint change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NextChange {
    pub at: DateTime<Utc>,
    pub setpoint: Setpoint,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Thermostat {
    /// AIN of the owning device.
    pub ain: String,
    /// Current target (`tsoll`).
    pub target: Option<Setpoint>,
    /// Comfort setpoint (`komfort`).
    pub comfort: Option<Setpoint>,
    /// Reduced / night setpoint (`absenk`).
    pub reduced: Option<Setpoint>,
    /// Measured temperature in °C (`tist`).
    pub measured: Option<f64>,
    /// Key lock set via UI or API.
    pub lock: Option<bool>,
    /// Key lock set on the device itself.
    pub device_lock: Option<bool>,
    pub error_code: Option<u8>,
    pub battery: Option<u8>,
    pub battery_low: Option<bool>,
    pub window_open: bool,
    pub window_open_end: Option<DateTime<Utc>>,
    pub boost_active: bool,
    pub boost_end: Option<DateTime<Utc>>,
    pub next_change: Option<NextChange>,
    pub summer_active: bool,
    pub holiday_active: bool,
}

/// Description of a thermostat error code.
pub fn error_description(code: u8) -> &'static str {
    match code {
        0 => "no error",
        1 => "no adaptation possible; is the device mounted correctly on the radiator?",
        2 => "valve stroke too short or battery too weak; open and close the valve tappet by hand several times or replace the batteries",
        3 => "no valve movement possible; is the valve tappet free?",
        4 => "installation is being prepared",
        5 => "installation mode: the thermostat can now be mounted on the valve",
        6 => "the thermostat is adapting to the valve stroke",
        _ => "unknown error",
    }
}

fn setpoint(bag: &FieldBag, key: &str) -> Result<Option<Setpoint>, DecodeError> {
    Ok(number::<u16>(bag, key, KEY)?.map(Setpoint::from_raw))
}

impl Thermostat {
    /// Decode from a device fragment (reads only its `hkr` child).
    pub fn decode(fragment: &FieldBag, ain: &str) -> Result<Self, DecodeError> {
        let hkr = require_object(fragment, KEY)?;

        let next_change = match object(hkr, "nextchange") {
            Some(nc) => {
                let path = "hkr.nextchange";
                let at = timestamp(nc, "endperiod", path)?;
                let setpoint = number::<u16>(nc, "tchange", path)?.map(Setpoint::from_raw);
                at.zip(setpoint)
                    .map(|(at, setpoint)| NextChange { at, setpoint })
            }
            None => None,
        };

        Ok(Self {
            ain: ain.to_owned(),
            target: setpoint(hkr, "tsoll")?,
            comfort: setpoint(hkr, "komfort")?,
            reduced: setpoint(hkr, "absenk")?,
            measured: number::<u16>(hkr, "tist", KEY)?.map(|raw| f64::from(raw) / 2.0),
            lock: flag(hkr, "lock", KEY)?,
            device_lock: flag(hkr, "devicelock", KEY)?,
            error_code: number(hkr, "errorcode", KEY)?,
            battery: number(hkr, "battery", KEY)?,
            battery_low: flag(hkr, "batterylow", KEY)?,
            // `windowopenactiv` is spelled that way on the wire.
            window_open: flag(hkr, "windowopenactiv", KEY)?.unwrap_or(false),
            window_open_end: timestamp(hkr, "windowopenactiveendtime", KEY)?,
            boost_active: flag(hkr, "boostactive", KEY)?.unwrap_or(false),
            boost_end: timestamp(hkr, "boostactiveendtime", KEY)?,
            next_change,
            summer_active: flag(hkr, "summeractive", KEY)?.unwrap_or(false),
            holiday_active: flag(hkr, "holidayactive", KEY)?.unwrap_or(false),
        })
    }

    /// Description of the current error code, if one is reported.
    pub fn error(&self) -> Option<&'static str> {
        self.error_code.map(error_description)
    }

    /// Re-read everything from `getdeviceinfos`.
    pub async fn reload(&mut self, client: &Client) -> Result<(), CoreError> {
        let fragment = aha::device_infos(client, &self.ain).await?;
        *self = Self::decode(&fragment, &self.ain)?;
        Ok(())
    }

    // ── Live getters ─────────────────────────────────────────────────

    /// Fetch the current target from the device and store it.
    pub async fn fetch_target(&mut self, client: &Client) -> Result<Setpoint, CoreError> {
        let sp = self.fetch_setpoint(client, "gethkrtsoll").await?;
        self.target = Some(sp);
        Ok(sp)
    }

    pub async fn fetch_comfort(&mut self, client: &Client) -> Result<Setpoint, CoreError> {
        let sp = self.fetch_setpoint(client, "gethkrkomfort").await?;
        self.comfort = Some(sp);
        Ok(sp)
    }

    pub async fn fetch_reduced(&mut self, client: &Client) -> Result<Setpoint, CoreError> {
        let sp = self.fetch_setpoint(client, "gethkrabsenk").await?;
        self.reduced = Some(sp);
        Ok(sp)
    }

    async fn fetch_setpoint(&self, client: &Client, cmd: &str) -> Result<Setpoint, CoreError> {
        let body = client.aha(cmd, Some(self.ain.as_str()), &[]).await?;
        parse_raw_setpoint(cmd, body)
    }

    // ── Setpoint ─────────────────────────────────────────────────────

    /// Set the target to `celsius` (8–28, rounded to half degrees).
    ///
    /// Out-of-range values fail with `InvalidTemperature` before any request.
    pub async fn set_target(
        &mut self,
        client: &Client,
        celsius: f64,
    ) -> Result<Setpoint, CoreError> {
        let sp = Setpoint::celsius(celsius)?;
        self.set_setpoint(client, sp).await
    }

    /// Turn the radiator off (frost protection only).
    pub async fn set_off(&mut self, client: &Client) -> Result<Setpoint, CoreError> {
        self.set_setpoint(client, Setpoint::Off).await
    }

    /// Open the valve fully.
    pub async fn set_max(&mut self, client: &Client) -> Result<Setpoint, CoreError> {
        self.set_setpoint(client, Setpoint::Max).await
    }

    /// Send `sethkrtsoll`. The router answers with the new raw target.
    pub async fn set_setpoint(
        &mut self,
        client: &Client,
        setpoint: Setpoint,
    ) -> Result<Setpoint, CoreError> {
        let setpoint = match setpoint {
            Setpoint::Celsius(c) => Setpoint::celsius(c)?,
            other => other,
        };
        let param = setpoint.to_raw().to_string();
        debug!(ain = %self.ain, %setpoint, "setting thermostat target");

        let body = client
            .aha("sethkrtsoll", Some(self.ain.as_str()), &[("param", param.as_str())])
            .await?;
        let applied = parse_raw_setpoint("sethkrtsoll", body)?;
        self.target = Some(applied);
        Ok(applied)
    }

    // ── Timed modes ──────────────────────────────────────────────────

    /// Boost for `duration` (at most 24h; zero deactivates). Returns the end time.
    pub async fn set_boost(
        &mut self,
        client: &Client,
        duration: Duration,
    ) -> Result<Option<DateTime<Utc>>, CoreError> {
        self.set_timed_mode(client, "sethkrboost", duration).await
    }

    pub async fn deactivate_boost(&mut self, client: &Client) -> Result<(), CoreError> {
        self.set_timed_mode(client, "sethkrboost", Duration::ZERO)
            .await
            .map(drop)
    }

    /// Window-open mode for `duration` (at most 24h; zero deactivates).
    pub async fn set_window_open(
        &mut self,
        client: &Client,
        duration: Duration,
    ) -> Result<Option<DateTime<Utc>>, CoreError> {
        self.set_timed_mode(client, "sethkrwindowopen", duration)
            .await
    }

    pub async fn deactivate_window_open(&mut self, client: &Client) -> Result<(), CoreError> {
        self.set_timed_mode(client, "sethkrwindowopen", Duration::ZERO)
            .await
            .map(drop)
    }

    async fn set_timed_mode(
        &mut self,
        client: &Client,
        cmd: &str,
        duration: Duration,
    ) -> Result<Option<DateTime<Utc>>, CoreError> {
        let end = end_timestamp(duration, Utc::now())?;
        debug!(ain = %self.ain, cmd, end, "setting timed mode");

        let end = end.to_string();
        let body = client
            .aha(cmd, Some(self.ain.as_str()), &[("endtimestamp", end.as_str())])
            .await?;
        // The response only echoes the end time; re-read the rest even when
        // the echo is unreadable, since the router may have applied the change.
        let applied = body.parse::<i64>();
        self.reload(client).await?;
        let applied = applied.map_err(|_| CoreError::UnexpectedResponse {
            cmd: cmd.to_owned(),
            body,
        })?;
        Ok(epoch_to_datetime(applied))
    }
}

/// Unix end time for a timed mode starting at `now`; `0` deactivates.
pub(crate) fn end_timestamp(duration: Duration, now: DateTime<Utc>) -> Result<i64, CoreError> {
    if duration > MAX_TIMED_MODE {
        return Err(CoreError::DurationTooLong {
            requested: duration,
        });
    }
    if duration.is_zero() {
        return Ok(0);
    }
    let delta = TimeDelta::from_std(duration).map_err(|_| CoreError::DurationTooLong {
        requested: duration,
    })?;
    Ok((now + delta).timestamp())
}

fn parse_raw_setpoint(cmd: &str, body: String) -> Result<Setpoint, CoreError> {
    match body.parse::<u16>() {
        Ok(raw) => Ok(Setpoint::from_raw(raw)),
        Err(_) => Err(CoreError::UnexpectedResponse {
            cmd: cmd.to_owned(),
            body,
        }),
    }
}

impl fmt::Display for Thermostat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn sp(s: Option<Setpoint>) -> String {
            s.map_or_else(|| "-".to_owned(), |s| s.to_string())
        }

        write!(
            f,
            "thermostat: target {}, comfort {}, reduced {}",
            sp(self.target),
            sp(self.comfort),
            sp(self.reduced)
        )?;
        if let Some(m) = self.measured {
            write!(f, ", measured {m:.1} °C")?;
        }
        if self.window_open {
            write!(f, ", window open")?;
            if let Some(end) = self.window_open_end {
                write!(f, " until {end}")?;
            }
        }
        if self.boost_active {
            write!(f, ", boost")?;
            if let Some(end) = self.boost_end {
                write!(f, " until {end}")?;
            }
        }
        if let Some(nc) = self.next_change {
            write!(f, ", next {} at {}", nc.setpoint, nc.at)?;
        }
        if let Some(b) = self.battery {
            write!(f, ", battery {b}%")?;
        }
        if self.battery_low == Some(true) {
            write!(f, " (low)")?;
        }
        if let Some(err) = self.error_code.filter(|c| *c != 0) {
            write!(f, ", error {err}: {}", error_description(err))?;
        }
        Ok(())
    }
}
