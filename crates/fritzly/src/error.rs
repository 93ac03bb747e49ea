//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with actionable
//! help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use fritzly_config::ConfigError;
use fritzly_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the router")]
    #[diagnostic(
        code(fritzly::connection_failed),
        help(
            "Check that the router is reachable: {reason}\n\
             Try: fritzly devices list --url http://192.168.178.1"
        )
    )]
    ConnectionFailed { reason: String },

    #[error("TLS setup failed: {reason}")]
    #[diagnostic(
        code(fritzly::tls_error),
        help(
            "The router uses a self-signed certificate.\n\
             Use --insecure (-k) to accept it, or configure ca_cert in your profile."
        )
    )]
    TlsError { reason: String },

    #[error("Request timed out")]
    #[diagnostic(
        code(fritzly::timeout),
        help("Increase the timeout with --timeout or check the router's responsiveness.")
    )]
    Timeout,

    // ── Authentication ───────────────────────────────────────────────
    #[error("Login rejected by the router")]
    #[diagnostic(
        code(fritzly::auth_failed),
        help(
            "Verify username and password. The router blocks further logins for {block_time_secs}s."
        )
    )]
    AuthFailed { block_time_secs: u64 },

    #[error("No password configured for profile '{profile}'")]
    #[diagnostic(
        code(fritzly::no_credentials),
        help(
            "Set password_env or password in the profile, store it in the system keyring,\n\
             or set the FRITZLY_PASSWORD environment variable."
        )
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(fritzly::not_found),
        help("Run: fritzly {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("Device '{identifier}' has no {capability} capability")]
    #[diagnostic(
        code(fritzly::missing_capability),
        help("Run: fritzly devices list --capability {capability}")
    )]
    MissingCapability {
        identifier: String,
        capability: String,
    },

    // ── Router ───────────────────────────────────────────────────────
    #[error("Router error ({code}): {message}")]
    #[diagnostic(code(fritzly::api_error))]
    ApiError { code: String, message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(fritzly::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(fritzly::profile_not_found),
        help("Available profiles: {available}")
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No router configured")]
    #[diagnostic(
        code(fritzly::no_config),
        help(
            "Pass --url, set FRITZLY_URL, or create a profile.\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(fritzly::config))]
    Config(Box<ConfigError>),

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::TlsError { .. } => exit_code::CONNECTION,
            Self::Timeout => exit_code::TIMEOUT,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } | Self::MissingCapability { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::ProfileNotFound { .. } | Self::NoConfig { .. } => {
                exit_code::USAGE
            }
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<fritzly_api::Error> for CliError {
    fn from(err: fritzly_api::Error) -> Self {
        use fritzly_api::Error as Api;
        match err {
            Api::InvalidCredentials { block_time_secs } => Self::AuthFailed { block_time_secs },
            Api::ChallengeFetch { reason } => Self::ConnectionFailed { reason },
            Api::Transport(e) if e.is_timeout() => Self::Timeout,
            Api::Transport(e) => Self::ConnectionFailed {
                reason: e.to_string(),
            },
            Api::Tls(reason) => Self::TlsError { reason },
            Api::UnexpectedStatus { code, body } => Self::ApiError {
                code: code.to_string(),
                message: body,
            },
            Api::InvalidUrl(e) => Self::Validation {
                field: "url".into(),
                reason: e.to_string(),
            },
            other => Self::ApiError {
                code: "protocol".into(),
                message: other.to_string(),
            },
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Api(e) => e.into(),

            CoreError::DeviceNotFound { identifier } => Self::NotFound {
                resource_type: "device".into(),
                identifier,
                list_command: "devices list".into(),
            },

            e @ (CoreError::InvalidTemperature { .. } | CoreError::DurationTooLong { .. }) => {
                Self::Validation {
                    field: "input".into(),
                    reason: e.to_string(),
                }
            }

            CoreError::Decode(e) => Self::ApiError {
                code: "decode".into(),
                message: e.to_string(),
            },

            CoreError::UnexpectedResponse { cmd, body } => Self::ApiError {
                code: cmd,
                message: format!("unexpected response {body:?}"),
            },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => Self::NoCredentials { profile },
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(Box::new(other)),
        }
    }
}
