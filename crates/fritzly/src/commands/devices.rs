//! Device command handlers.

use tabled::Tabled;

use fritzly_api::Client;
use fritzly_core::{Device, aha};

use crate::cli::{DevicesArgs, DevicesCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "AIN")]
    ain: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Product")]
    product: String,
    #[tabled(rename = "Present")]
    present: String,
    #[tabled(rename = "Capabilities")]
    capabilities: String,
    #[tabled(rename = "Battery")]
    battery: String,
}

impl From<&Device> for DeviceRow {
    fn from(d: &Device) -> Self {
        Self {
            ain: d.identifier.clone(),
            name: d.name.clone(),
            product: d.product_name.clone(),
            present: if d.present { "yes" } else { "no" }.into(),
            capabilities: d
                .capabilities
                .keys()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
            battery: d.battery.map(|b| format!("{b}%")).unwrap_or_default(),
        }
    }
}

fn detail(d: &Device) -> String {
    let mut lines = vec![
        format!("AIN:       {}", d.identifier),
        format!("Name:      {}", d.name),
        format!("Product:   {} {}", d.manufacturer, d.product_name),
        format!("Firmware:  {}", d.firmware_version),
        format!("Present:   {}", if d.present { "yes" } else { "no" }),
    ];
    if let Some(b) = d.battery {
        lines.push(format!(
            "Battery:   {b}%{}",
            if d.battery_low == Some(true) { " (low)" } else { "" }
        ));
    }
    let bits: Vec<&str> = d.function_bits.iter().map(|b| b.description()).collect();
    lines.push(format!("Functions: {}", bits.join(", ")));
    for capability in d.capabilities.values() {
        lines.push(String::new());
        lines.push(capability.to_string());
    }
    for failure in &d.decode_failures {
        lines.push(format!("! {failure}"));
    }
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(client: &Client, args: DevicesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        DevicesCommand::List { capability } => {
            let list = match capability {
                Some(kind) => aha::device_list_with(client, kind).await?,
                None => aha::device_list(client).await?,
            };
            let out = output::render_list(
                &global.output,
                &list.devices,
                |d| DeviceRow::from(d),
                |d| d.identifier.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Show { ain } => {
            let device = aha::device(client, &ain).await?;
            let out = output::render_single(&global.output, &device, detail, |d| {
                d.identifier.clone()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Rename { ain, name } => {
            let mut device = aha::device(client, &ain).await?;
            device.set_name(client, &name).await?;
            if !global.quiet {
                eprintln!("Renamed {ain} to {name:?}");
            }
            Ok(())
        }
    }
}
