// ── Devices and the device list assembler ──
//
// Assembly is best-effort: a capability or unit that fails to decode is
// dropped from its device and recorded in `decode_failures`; the rest of the
// device and the rest of the list are still decoded. A fragment whose own
// header cannot be read is skipped and recorded on the list.

use std::fmt;

use fritzly_api::{Client, FieldBag, one_or_many, root_field_bag};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::aha;
use crate::capability::{
    Button, Capabilities, Capability, CapabilityKind, FunctionBit, HanFun, Temperature,
    Thermostat, capabilities_from_bitmask, function_bits,
};
use crate::error::{CoreError, DecodeError};
use crate::fields::{flag, number, text, text_or_empty};
use crate::unit::Unit;

/// A capability or unit that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodeFailure {
    /// Identifier of the fragment that failed.
    pub identifier: String,
    /// Capability being decoded; `None` for the device header itself.
    pub kind: Option<CapabilityKind>,
    pub error: DecodeError,
}

impl fmt::Display for DecodeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            Some(kind) => write!(f, "{} [{kind}]: {}", self.identifier, self.error),
            None => write!(f, "{}: {}", self.identifier, self.error),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Device {
    /// AIN, e.g. `"08761 0000434"`.
    pub identifier: String,
    /// Router-internal numeric id.
    pub id: String,
    pub firmware_version: String,
    pub manufacturer: String,
    pub product_name: String,
    pub name: String,
    pub present: bool,
    pub tx_busy: Option<bool>,
    pub battery: Option<u8>,
    pub battery_low: Option<bool>,
    /// Every documented bit of `functionbitmask`, decodable or not.
    pub function_bits: Vec<FunctionBit>,
    pub capabilities: Capabilities,
    pub decode_failures: Vec<DecodeFailure>,
}

impl Device {
    /// Decode a device from its own fragment. HAN-FUN units are not attached;
    /// see [`DeviceList::from_fragments`].
    pub fn decode(fragment: &FieldBag) -> Result<Self, DecodeError> {
        let identifier = text(fragment, "-identifier")
            .ok_or_else(|| DecodeError::missing("-identifier"))?
            .to_owned();
        let bitmask = text_or_empty(fragment, "-functionbitmask");

        // Only the identifier is mandatory; a malformed header field is
        // recorded and left unset.
        let mut header_errors = Vec::new();
        let mut device = Self {
            id: text_or_empty(fragment, "-id"),
            firmware_version: text_or_empty(fragment, "-fwversion"),
            manufacturer: text_or_empty(fragment, "-manufacturer"),
            product_name: text_or_empty(fragment, "-productname"),
            name: text_or_empty(fragment, "name"),
            present: lenient(flag(fragment, "present", ""), &mut header_errors).unwrap_or(false),
            tx_busy: lenient(flag(fragment, "txbusy", ""), &mut header_errors),
            battery: lenient(number(fragment, "battery", ""), &mut header_errors),
            battery_low: lenient(flag(fragment, "batterylow", ""), &mut header_errors),
            function_bits: function_bits(&bitmask),
            capabilities: Capabilities::new(),
            decode_failures: Vec::new(),
            identifier,
        };

        let ain = device.identifier.clone();
        for error in header_errors {
            device.record_failure(None, &ain, error);
        }

        // Every placeholder is replaced by its decoded value or removed.
        for kind in capabilities_from_bitmask(&bitmask).into_keys() {
            match Capability::decode(kind, fragment, &ain) {
                Ok(capability) => {
                    device.capabilities.insert(kind, capability);
                }
                Err(error) => device.record_failure(Some(kind), &ain, error),
            }
        }
        Ok(device)
    }

    fn record_failure(&mut self, kind: Option<CapabilityKind>, identifier: &str, error: DecodeError) {
        warn!(
            ain = %self.identifier,
            kind = kind.map(<&'static str>::from).unwrap_or("device"),
            field = %error.field,
            "decode failed"
        );
        self.decode_failures.push(DecodeFailure {
            identifier: identifier.to_owned(),
            kind,
            error,
        });
    }

    /// Attach every sibling whose identifier extends this device's, in
    /// source order.
    fn attach_units<'a>(&mut self, siblings: impl IntoIterator<Item = &'a FieldBag>) {
        if !self.capabilities.contains_key(&CapabilityKind::HanFun) {
            return;
        }
        let parent = self.identifier.clone();
        let mut units = Vec::new();
        for fragment in siblings {
            let Some(id) = text(fragment, "-identifier") else {
                continue;
            };
            if !is_unit_of(id, &parent) {
                continue;
            }
            match Unit::decode(fragment, &parent) {
                Ok(unit) => units.push(unit),
                Err(error) => self.record_failure(Some(CapabilityKind::HanFun), id, error),
            }
        }
        debug!(ain = %parent, units = units.len(), "attached han-fun units");
        if let Some(hf) = self.hanfun_mut() {
            hf.units = units;
        }
    }

    // ── Capability access ────────────────────────────────────────────

    pub fn has_capability(&self, kind: CapabilityKind) -> bool {
        self.capabilities.contains_key(&kind)
    }

    pub fn capability(&self, kind: CapabilityKind) -> Option<&Capability> {
        self.capabilities.get(&kind)
    }

    pub fn thermostat(&self) -> Option<&Thermostat> {
        match self.capabilities.get(&CapabilityKind::Thermostat)? {
            Capability::Thermostat(t) => Some(t),
            _ => None,
        }
    }

    pub fn thermostat_mut(&mut self) -> Option<&mut Thermostat> {
        match self.capabilities.get_mut(&CapabilityKind::Thermostat)? {
            Capability::Thermostat(t) => Some(t),
            _ => None,
        }
    }

    pub fn temperature(&self) -> Option<&Temperature> {
        match self.capabilities.get(&CapabilityKind::Temperature)? {
            Capability::Temperature(t) => Some(t),
            _ => None,
        }
    }

    pub fn temperature_mut(&mut self) -> Option<&mut Temperature> {
        match self.capabilities.get_mut(&CapabilityKind::Temperature)? {
            Capability::Temperature(t) => Some(t),
            _ => None,
        }
    }

    pub fn button(&self) -> Option<&Button> {
        match self.capabilities.get(&CapabilityKind::Button)? {
            Capability::Button(b) => Some(b),
            _ => None,
        }
    }

    pub fn hanfun(&self) -> Option<&HanFun> {
        match self.capabilities.get(&CapabilityKind::HanFun)? {
            Capability::HanFun(h) => Some(h),
            _ => None,
        }
    }

    pub fn hanfun_mut(&mut self) -> Option<&mut HanFun> {
        match self.capabilities.get_mut(&CapabilityKind::HanFun)? {
            Capability::HanFun(h) => Some(h),
            _ => None,
        }
    }

    // ── Device-level operations ──────────────────────────────────────

    /// Fetch the name (`getswitchname`) and store it.
    pub async fn fetch_name(&mut self, client: &Client) -> Result<&str, CoreError> {
        self.name = client
            .aha("getswitchname", Some(self.identifier.as_str()), &[])
            .await?;
        Ok(&self.name)
    }

    /// Rename the device (`setname`).
    pub async fn set_name(&mut self, client: &Client, name: &str) -> Result<(), CoreError> {
        debug!(ain = %self.identifier, name, "renaming device");
        client
            .aha("setname", Some(self.identifier.as_str()), &[("name", name)])
            .await?;
        name.clone_into(&mut self.name);
        Ok(())
    }

    /// Fetch connection state (`getswitchpresent`) and store it.
    pub async fn fetch_present(&mut self, client: &Client) -> Result<bool, CoreError> {
        let cmd = "getswitchpresent";
        let body = client.aha(cmd, Some(self.identifier.as_str()), &[]).await?;
        self.present = match body.as_str() {
            "1" => true,
            "0" => false,
            _ => {
                return Err(CoreError::UnexpectedResponse {
                    cmd: cmd.to_owned(),
                    body,
                });
            }
        };
        Ok(self.present)
    }

    /// Re-read the device from `getdeviceinfos`.
    ///
    /// `getdeviceinfos` does not list HAN-FUN units, so known units are
    /// carried over and reloaded one by one.
    pub async fn reload(&mut self, client: &Client) -> Result<(), CoreError> {
        let fragment = aha::device_infos(client, &self.identifier).await?;
        let mut fresh = Self::decode(&fragment)?;
        if let (Some(old), Some(new)) = (self.hanfun(), fresh.hanfun_mut()) {
            new.units.clone_from(&old.units);
            new.reload(client).await?;
        }
        *self = fresh;
        Ok(())
    }
}

/// Unwrap an optional header field, collecting the error instead of failing.
fn lenient<T>(result: Result<Option<T>, DecodeError>, errors: &mut Vec<DecodeError>) -> Option<T> {
    result.unwrap_or_else(|error| {
        errors.push(error);
        None
    })
}

/// A unit's identifier extends its parent's and is never equal to it.
fn is_unit_of(candidate: &str, parent: &str) -> bool {
    !parent.is_empty() && candidate.len() > parent.len() && candidate.starts_with(parent)
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) {} {}",
            self.name, self.identifier, self.manufacturer, self.product_name
        )?;
        if !self.present {
            f.write_str(" [absent]")?;
        }
        for capability in self.capabilities.values() {
            write!(f, "\n  {capability}")?;
        }
        for failure in &self.decode_failures {
            write!(f, "\n  ! {failure}")?;
        }
        Ok(())
    }
}

// ── Device list ─────────────────────────────────────────────────────

/// Decoded `getdevicelistinfos` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeviceList {
    pub version: String,
    pub firmware_version: String,
    /// Devices in the order the router listed them.
    pub devices: Vec<Device>,
    /// Fragments whose header could not be decoded.
    pub skipped: Vec<DecodeFailure>,
}

impl DeviceList {
    /// Parse a `getdevicelistinfos` body.
    pub fn from_xml(body: &str) -> Result<Self, CoreError> {
        let root = root_field_bag(body.as_bytes(), "devicelist")?;
        let fragments: Vec<&FieldBag> = one_or_many(root.get("device"))
            .into_iter()
            .filter_map(Value::as_object)
            .collect();

        let mut list = Self::from_fragments(&fragments);
        list.version = text_or_empty(&root, "-version");
        list.firmware_version = text_or_empty(&root, "-fwversion");
        Ok(list)
    }

    /// Assemble devices from their fragments, attaching HAN-FUN units found
    /// among the siblings.
    pub fn from_fragments(fragments: &[&FieldBag]) -> Self {
        let mut list = Self::default();
        for fragment in fragments {
            match Device::decode(fragment) {
                Ok(mut device) => {
                    device.attach_units(fragments.iter().copied());
                    list.devices.push(device);
                }
                Err(error) => {
                    let identifier = text_or_empty(fragment, "-identifier");
                    warn!(ain = %identifier, field = %error.field, "skipping device fragment");
                    list.skipped.push(DecodeFailure {
                        identifier,
                        kind: None,
                        error,
                    });
                }
            }
        }
        list
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Device> {
        self.devices.iter()
    }

    pub fn get(&self, ain: &str) -> Option<&Device> {
        self.devices.iter().find(|d| d.identifier == ain)
    }

    pub fn get_mut(&mut self, ain: &str) -> Option<&mut Device> {
        self.devices.iter_mut().find(|d| d.identifier == ain)
    }

    /// Like [`get`](Self::get), but a missing device is an error.
    pub fn device(&self, ain: &str) -> Result<&Device, CoreError> {
        self.get(ain).ok_or_else(|| CoreError::DeviceNotFound {
            identifier: ain.to_owned(),
        })
    }

    pub fn device_mut(&mut self, ain: &str) -> Result<&mut Device, CoreError> {
        self.get_mut(ain).ok_or_else(|| CoreError::DeviceNotFound {
            identifier: ain.to_owned(),
        })
    }

    /// Take the device out of the list.
    pub fn into_device(self, ain: &str) -> Result<Device, CoreError> {
        self.devices
            .into_iter()
            .find(|d| d.identifier == ain)
            .ok_or_else(|| CoreError::DeviceNotFound {
                identifier: ain.to_owned(),
            })
    }

    /// Devices that have a capability of `kind`.
    pub fn with_capability(&self, kind: CapabilityKind) -> impl Iterator<Item = &Device> {
        self.devices.iter().filter(move |d| d.has_capability(kind))
    }

    /// Keep only devices that have a capability of `kind`.
    pub fn retain_capability(&mut self, kind: CapabilityKind) {
        self.devices.retain(|d| d.has_capability(kind));
    }

    /// Every decode failure in the list, device headers first.
    pub fn failures(&self) -> impl Iterator<Item = &DecodeFailure> {
        self.skipped
            .iter()
            .chain(self.devices.iter().flat_map(|d| d.decode_failures.iter()))
    }
}

impl<'a> IntoIterator for &'a DeviceList {
    type Item = &'a Device;
    type IntoIter = std::slice::Iter<'a, Device>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
