//! Capability-oriented model of FRITZ!Box smart-home devices.
//!
//! [`DeviceList::from_xml`] turns a `getdevicelistinfos` answer into
//! [`Device`]s. Each device's `functionbitmask` selects which
//! [`Capability`] decoders run; HAN-FUN composite devices additionally collect
//! their [`Unit`]s from sibling fragments. Assembly is best-effort: decode
//! failures are recorded per capability instead of failing the whole list.
//!
//! Mutating operations (setpoints, boost, window-open, renaming) take a
//! [`fritzly_api::Client`] and leave the local value in sync with the router.

pub mod aha;
pub mod capability;
pub mod device;
pub mod error;
pub(crate) mod fields;
pub mod setpoint;
pub mod unit;

pub use capability::{
    Button, ButtonPress, Capabilities, Capability, CapabilityKind, FunctionBit, HanFun,
    NextChange, PushButton, Temperature, TemperatureStats, Thermostat,
    capabilities_from_bitmask, function_bits,
};
pub use device::{DecodeFailure, Device, DeviceList};
pub use error::{CoreError, DecodeError};
pub use setpoint::Setpoint;
pub use unit::{Alert, EtsiUnitInfo, InterfaceKind, Unit, UnitInterface};

pub use fritzly_api::{Client, ClientConfig};
