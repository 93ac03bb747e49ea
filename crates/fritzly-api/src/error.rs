use thiserror::Error;

/// Top-level error type for the `fritzly-api` crate.
///
/// Covers the login handshake, the HTTP transport, and response decoding.
/// `fritzly-core` wraps these without flattening them, so a caller can still
/// tell an `InvalidCredentials` apart from a dropped connection.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The unauthenticated `login_sid.lua` request failed or returned
    /// something that is not a `SessionInfo` document.
    #[error("Failed to fetch login challenge: {reason}")]
    ChallengeFetch { reason: String },

    /// The router answered the challenge response with the all-zero SID.
    #[error("Invalid credentials (login blocked for {block_time_secs}s)")]
    InvalidCredentials { block_time_secs: u64 },

    /// No challenge-response could be computed (no challenge on record).
    #[error("Cannot encode challenge response: {reason}")]
    AuthEncoding { reason: String },

    // ── Transport ───────────────────────────────────────────────────
    /// Non-2xx status, surfaced verbatim.
    #[error("Unexpected HTTP status {code}: {body}")]
    UnexpectedStatus { code: u16, body: String },

    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Data ────────────────────────────────────────────────────────
    /// The response body is not well-formed XML.
    #[error("XML error: {0}")]
    Xml(String),

    /// A structured response did not have the expected shape.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` for failures of the login handshake itself.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Self::ChallengeFetch { .. } | Self::InvalidCredentials { .. } | Self::AuthEncoding { .. }
        )
    }

    /// Returns `true` if this is a transient error worth retrying at a higher level.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::UnexpectedStatus { code, .. } => *code >= 500,
            _ => false,
        }
    }

    /// The HTTP status code, if the error carries one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::UnexpectedStatus { code, .. } => Some(*code),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failures_are_classified() {
        assert!(Error::InvalidCredentials { block_time_secs: 0 }.is_auth_failure());
        assert!(
            Error::ChallengeFetch {
                reason: "boom".into()
            }
            .is_auth_failure()
        );
        assert!(
            !Error::UnexpectedStatus {
                code: 403,
                body: String::new()
            }
            .is_auth_failure()
        );
    }

    #[test]
    fn server_errors_are_transient() {
        let err = Error::UnexpectedStatus {
            code: 503,
            body: "busy".into(),
        };
        assert!(err.is_transient());
        assert_eq!(err.status_code(), Some(503));
    }
}
