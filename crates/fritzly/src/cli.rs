//! Clap derive structures for the `fritzly` CLI.
//!
//! Defines the command tree, global flags, and shared argument types.

use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use fritzly_core::capability::thermostat::MAX_TIMED_MODE;
use fritzly_core::{CapabilityKind, Setpoint};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// fritzly -- smart-home control for the FRITZ!Box
#[derive(Debug, Parser)]
#[command(
    name = "fritzly",
    version,
    about = "Control FRITZ!Box smart-home devices from the command line",
    long_about = "Lists DECT and HAN-FUN devices known to a FRITZ!Box and controls\n\
        radiator thermostats through the AHA home-automation interface.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Router profile to use
    #[arg(long, short = 'p', env = "FRITZLY_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Router URL (overrides profile)
    #[arg(long, short = 'u', env = "FRITZLY_URL", global = true)]
    pub url: Option<String>,

    /// Login name (overrides profile)
    #[arg(long, env = "FRITZLY_USERNAME", global = true)]
    pub username: Option<String>,

    /// Login password
    #[arg(long, env = "FRITZLY_PASSWORD", global = true, hide_env_values = true)]
    pub password: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "FRITZLY_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept the router's self-signed TLS certificate
    #[arg(long, short = 'k', env = "FRITZLY_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, env = "FRITZLY_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// Plain text, one identifier per line (scripting)
    Plain,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List and inspect smart-home devices
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// Control radiator thermostats
    #[command(alias = "hkr", alias = "t")]
    Thermostat(ThermostatArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Devices ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    pub command: DevicesCommand,
}

#[derive(Debug, Subcommand)]
pub enum DevicesCommand {
    /// List devices
    #[command(alias = "ls")]
    List {
        /// Only devices with this capability (han_fun, button, thermostat, temperature)
        #[arg(long, short = 'c')]
        capability: Option<CapabilityKind>,
    },

    /// Show one device with all decoded capabilities
    Show {
        /// Device AIN, e.g. "08761 0000434"
        ain: String,
    },

    /// Rename a device
    Rename {
        /// Device AIN
        ain: String,
        /// New name
        name: String,
    },
}

// ── Thermostat ───────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ThermostatArgs {
    #[command(subcommand)]
    pub command: ThermostatCommand,
}

#[derive(Debug, Subcommand)]
pub enum ThermostatCommand {
    /// Show thermostat state
    Show {
        /// Device AIN
        ain: String,
    },

    /// Set the target temperature
    Set {
        /// Device AIN
        ain: String,
        /// 8–28 °C in half degrees, or OFF / MAX
        target: Setpoint,
    },

    /// Boost heating for a while ("0s" ends boost)
    Boost {
        /// Device AIN
        ain: String,
        /// Duration, e.g. "30m" or "2h" (at most 24h)
        #[arg(value_parser = parse_timed_duration)]
        duration: Duration,
    },

    /// Pause heating for an open window ("0s" ends it)
    WindowOpen {
        /// Device AIN
        ain: String,
        /// Duration, e.g. "15m" (at most 24h)
        #[arg(value_parser = parse_timed_duration)]
        duration: Duration,
    },
}

/// Parse a humantime duration and apply the 24h cap up front.
fn parse_timed_duration(s: &str) -> Result<Duration, String> {
    let duration = humantime::parse_duration(s).map_err(|e| e.to_string())?;
    if duration > MAX_TIMED_MODE {
        return Err(format!(
            "{} exceeds the 24h limit",
            humantime::format_duration(duration)
        ));
    }
    Ok(duration)
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn timed_durations_are_capped() {
        assert_eq!(parse_timed_duration("24h"), Ok(MAX_TIMED_MODE));
        assert_eq!(parse_timed_duration("0s"), Ok(Duration::ZERO));
        assert!(parse_timed_duration("24h 1s").is_err());
        assert!(parse_timed_duration("soon").is_err());
    }
}
