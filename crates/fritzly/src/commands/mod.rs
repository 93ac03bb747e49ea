//! Command dispatch: bridges CLI args -> core operations -> output formatting.

pub mod devices;
pub mod thermostat;

use fritzly_api::Client;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a router-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, client: &Client, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Devices(args) => devices::handle(client, args, global).await,
        Command::Thermostat(args) => thermostat::handle(client, args, global).await,
        // Completions are handled before dispatch
        Command::Completions(_) => Ok(()),
    }
}
