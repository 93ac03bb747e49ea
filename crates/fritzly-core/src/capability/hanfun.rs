// ── HAN-FUN composite devices ──
//
// The parent fragment of a HAN-FUN device carries nothing capability-specific;
// the units arrive as sibling fragments and are attached by the device list
// assembler in source order.

use std::fmt;

use fritzly_api::Client;
use serde::Serialize;
use tracing::debug;

use crate::error::CoreError;
use crate::unit::{InterfaceKind, Unit, UnitInterface};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HanFun {
    /// AIN of the parent device.
    pub ain: String,
    /// Units in the order the router listed them.
    pub units: Vec<Unit>,
}

impl HanFun {
    pub fn new(ain: &str) -> Self {
        Self {
            ain: ain.to_owned(),
            units: Vec::new(),
        }
    }

    /// Whether any unit exposes `kind`.
    pub fn has_interface(&self, kind: InterfaceKind) -> bool {
        self.units.iter().any(|u| u.kind() == kind)
    }

    /// The first unit interface of `kind`.
    pub fn interface(&self, kind: InterfaceKind) -> Option<&UnitInterface> {
        self.units
            .iter()
            .map(|u| &u.interface)
            .find(|i| i.kind() == kind)
    }

    pub fn unit(&self, ain: &str) -> Option<&Unit> {
        self.units.iter().find(|u| u.ain == ain)
    }

    /// Re-read every unit. Stops at the first failure; units already
    /// reloaded keep their new state.
    pub async fn reload(&mut self, client: &Client) -> Result<(), CoreError> {
        debug!(ain = %self.ain, units = self.units.len(), "reloading han-fun units");
        for unit in &mut self.units {
            unit.reload(client).await?;
        }
        Ok(())
    }
}

impl fmt::Display for HanFun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "han-fun: {} unit(s)", self.units.len())?;
        for unit in &self.units {
            write!(f, "\n  {unit}")?;
        }
        Ok(())
    }
}
