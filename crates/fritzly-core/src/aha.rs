// ── AHA queries ──
//
// Reads that return whole device descriptions. Commands scoped to a single
// capability live on the capability itself.

use fritzly_api::{Client, FieldBag, root_field_bag};
use tracing::debug;

use crate::capability::CapabilityKind;
use crate::device::{Device, DeviceList};
use crate::error::CoreError;

/// Fetch one device fragment (`getdeviceinfos`).
pub async fn device_infos(client: &Client, ain: &str) -> Result<FieldBag, CoreError> {
    let body = client.aha("getdeviceinfos", Some(ain), &[]).await?;
    Ok(root_field_bag(body.as_bytes(), "device")?)
}

/// Fetch and assemble the full device list (`getdevicelistinfos`).
pub async fn device_list(client: &Client) -> Result<DeviceList, CoreError> {
    let body = client.aha("getdevicelistinfos", None, &[]).await?;
    let list = DeviceList::from_xml(&body)?;
    debug!(
        devices = list.len(),
        failures = list.failures().count(),
        "device list assembled"
    );
    Ok(list)
}

/// Fetch the device list, keeping only devices with a `kind` capability.
pub async fn device_list_with(
    client: &Client,
    kind: CapabilityKind,
) -> Result<DeviceList, CoreError> {
    let mut list = device_list(client).await?;
    list.retain_capability(kind);
    Ok(list)
}

/// Fetch a single device, HAN-FUN units included.
///
/// Goes through the full list because `getdeviceinfos` does not return a
/// composite device's units.
pub async fn device(client: &Client, ain: &str) -> Result<Device, CoreError> {
    device_list(client).await?.into_device(ain)
}
