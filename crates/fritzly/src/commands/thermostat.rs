//! Thermostat command handlers.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use fritzly_api::Client;
use fritzly_core::{CapabilityKind, Device, Thermostat, aha};

use crate::cli::{GlobalOpts, ThermostatArgs, ThermostatCommand};
use crate::error::CliError;
use crate::output;

fn thermostat_of(device: &mut Device) -> Result<&mut Thermostat, CliError> {
    let identifier = device.identifier.clone();
    device
        .thermostat_mut()
        .ok_or_else(|| CliError::MissingCapability {
            identifier,
            capability: CapabilityKind::Thermostat.to_string(),
        })
}

fn detail(t: &Thermostat) -> String {
    let mut out = t.to_string();
    if let Some(err) = t.error() {
        let _ = write!(out, "\nstatus: {err}");
    }
    out
}

fn report(what: &str, ain: &str, end: Option<DateTime<Utc>>) -> String {
    match end {
        None => format!("{what} ended on {ain}"),
        Some(end) => format!("{what} on {ain} until {}", end.format("%Y-%m-%d %H:%M:%S UTC")),
    }
}

pub async fn handle(
    client: &Client,
    args: ThermostatArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        ThermostatCommand::Show { ain } => {
            let mut device = aha::device(client, &ain).await?;
            let t = thermostat_of(&mut device)?;
            let out = output::render_single(&global.output, &*t, detail, |t| t.ain.clone());
            output::print_output(&out, global.quiet);
        }

        ThermostatCommand::Set { ain, target } => {
            let mut device = aha::device(client, &ain).await?;
            let applied = thermostat_of(&mut device)?
                .set_setpoint(client, target)
                .await?;
            output::print_output(&format!("Target of {ain} set to {applied}"), global.quiet);
        }

        ThermostatCommand::Boost { ain, duration } => {
            let mut device = aha::device(client, &ain).await?;
            let end = thermostat_of(&mut device)?
                .set_boost(client, duration)
                .await?;
            output::print_output(&report("Boost", &ain, end), global.quiet);
        }

        ThermostatCommand::WindowOpen { ain, duration } => {
            let mut device = aha::device(client, &ain).await?;
            let end = thermostat_of(&mut device)?
                .set_window_open(client, duration)
                .await?;
            output::print_output(
                &report("Window-open mode", &ain, end),
                global.quiet,
            );
        }
    }
    Ok(())
}
