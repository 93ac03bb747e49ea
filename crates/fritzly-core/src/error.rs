// ── Core error types ──
//
// `CoreError` wraps `fritzly_api::Error` without translating it, so a failed
// re-authentication reaches the caller as the exact variant the session
// produced. Domain validation errors are raised before any request is sent.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// A malformed or missing field in a device fragment.
///
/// `Clone` so the assembler can keep a copy per failed capability.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("Cannot decode `{field}`: {reason}")]
pub struct DecodeError {
    /// Dotted path of the offending field, e.g. `hkr.tsoll`.
    pub field: String,
    pub reason: String,
}

impl DecodeError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn missing(field: impl Into<String>) -> Self {
        Self::new(field, "missing")
    }
}

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Session / transport (passed through) ─────────────────────────
    #[error(transparent)]
    Api(#[from] fritzly_api::Error),

    // ── Domain validation ────────────────────────────────────────────
    #[error("Invalid temperature {value}: setpoints must be between 8 and 28 °C")]
    InvalidTemperature { value: f64 },

    #[error("Duration {} exceeds the 24h limit", human(.requested))]
    DurationTooLong { requested: Duration },

    // ── Data errors ──────────────────────────────────────────────────
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("Device not found: {identifier}")]
    DeviceNotFound { identifier: String },

    #[error("Unexpected response to `{cmd}`: {body:?}")]
    UnexpectedResponse { cmd: String, body: String },
}

fn human(d: &Duration) -> humantime::FormattedDuration {
    humantime::format_duration(*d)
}

impl CoreError {
    /// The wrapped API error, if this came from the session or transport.
    pub fn api(&self) -> Option<&fritzly_api::Error> {
        match self {
            Self::Api(e) => Some(e),
            _ => None,
        }
    }
}
