// Raw HTTP transport for the FRITZ!Box.
//
// Builds the `reqwest::Client` from TLS/timeout settings and exposes the two
// request shapes the router speaks: form/query-encoded (login, AHA) and JSON.
// No session logic lives here; the caller decides which parameters to send.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Method;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;

/// TLS verification mode.
#[derive(Debug, Clone)]
pub enum TlsMode {
    /// Use the system certificate store.
    System,
    /// Use a custom CA certificate from the given PEM file.
    CustomCa(PathBuf),
    /// Accept any certificate (the router ships a self-signed one).
    DangerAcceptInvalid,
}

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::DangerAcceptInvalid,
            timeout: Duration::from_secs(30),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("fritzly/", env!("CARGO_PKG_VERSION")));

        match &self.tls {
            TlsMode::System => {}
            TlsMode::CustomCa(path) => {
                let cert_pem = std::fs::read(path)
                    .map_err(|e| Error::Tls(format!("failed to read CA cert: {e}")))?;
                let cert = reqwest::Certificate::from_pem(&cert_pem)
                    .map_err(|e| Error::Tls(format!("invalid CA cert: {e}")))?;
                builder = builder.add_root_certificate(cert);
            }
            TlsMode::DangerAcceptInvalid => {
                builder = builder.danger_accept_invalid_certs(true);
            }
        }

        builder
            .build()
            .map_err(|e| Error::Tls(format!("failed to build HTTP client: {e}")))
    }
}

/// Status code and body of a completed exchange.
///
/// The transport never interprets the status; [`RawResponse::into_body`]
/// is where non-2xx turns into [`Error::UnexpectedStatus`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Return the body for a 2xx response, or the status and body as an error.
    pub fn into_body(self) -> Result<String, Error> {
        if self.is_success() {
            Ok(self.body)
        } else {
            Err(Error::UnexpectedStatus {
                code: self.status,
                body: self.body,
            })
        }
    }
}

/// HTTP transport bound to the router's base URL.
#[derive(Debug, Clone)]
pub struct Transport {
    http: reqwest::Client,
    base_url: Url,
}

impl Transport {
    pub fn new(base_url: Url, config: &TransportConfig) -> Result<Self, Error> {
        let http = config.build_client()?;
        Ok(Self { http, base_url })
    }

    /// Wrap a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// The router base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve a relative path (e.g. `login_sid.lua`) against the base URL.
    pub fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    /// Send form-encoded parameters: query string for GET, body for everything else.
    pub async fn send_form(
        &self,
        method: Method,
        path: &str,
        params: &[(String, String)],
    ) -> Result<RawResponse, Error> {
        let url = self.url(path)?;
        debug!("{method} {}", url.path());

        let builder = if method == Method::GET {
            self.http.get(url).query(params)
        } else {
            self.http.request(method, url).form(params)
        };

        let resp = builder.send().await.map_err(Error::Transport)?;
        Self::collect(resp).await
    }

    /// Send an optional JSON body. `sid` goes into the `Authorization` header.
    pub async fn send_json(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
        sid: Option<&str>,
    ) -> Result<RawResponse, Error> {
        let url = self.url(path)?;
        debug!("{method} {} (json)", url.path());

        let mut builder = self
            .http
            .request(method, url)
            .header(ACCEPT, "application/json");
        if let Some(sid) = sid {
            builder = builder.header(AUTHORIZATION, format!("AVM-SID {sid}"));
        }
        if let Some(body) = body {
            builder = builder.header(CONTENT_TYPE, "application/json").json(body);
        }

        let resp = builder.send().await.map_err(Error::Transport)?;
        Self::collect(resp).await
    }

    async fn collect(resp: reqwest::Response) -> Result<RawResponse, Error> {
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(Error::Transport)?;
        trace!(status, len = body.len(), "response received");
        Ok(RawResponse { status, body })
    }
}
