// Authenticated FRITZ!Box client
//
// Owns a `Session` and the stored credentials. Every call first checks the
// session lazily and logs in once if it is missing or expired; the business
// request itself is never retried. The SID rides along as the `sid` form
// parameter (login and AHA family) or as an `AVM-SID` header (JSON family).

use std::sync::RwLock;
use std::time::Duration;

use reqwest::Method;
use secrecy::SecretString;
use tracing::{debug, info};
use url::Url;

use crate::auth::{Credentials, LOGIN_PATH, Right};
use crate::error::Error;
use crate::session::{DEFAULT_SESSION_TIMEOUT, Session, SessionState};
use crate::transport::{Transport, TransportConfig};

/// Path of the home-automation (AHA) endpoint.
pub const AHA_PATH: &str = "webservices/homeautoswitch.lua";

/// Everything needed to build a [`Client`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Router root, e.g. `http://fritz.box/`.
    pub base_url: Url,
    pub username: String,
    pub password: SecretString,
    pub transport: TransportConfig,
    /// Inactivity window after a successful login. Defaults to 10 minutes.
    pub session_timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: Url, username: impl Into<String>, password: SecretString) -> Self {
        Self {
            base_url,
            username: username.into(),
            password,
            transport: TransportConfig::default(),
            session_timeout: DEFAULT_SESSION_TIMEOUT,
        }
    }
}

/// Client for the router's login and home-automation endpoints.
///
/// Session refresh is check-then-act: two concurrent calls on an expired
/// session may both log in, and the later SID wins.
pub struct Client {
    transport: Transport,
    credentials: Credentials,
    session: RwLock<Session>,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        let transport = Transport::new(config.base_url, &config.transport)?;
        Ok(Self::with_transport(
            transport,
            Credentials::new(config.username, config.password),
            config.session_timeout,
        ))
    }

    /// Build a client on top of an existing transport (tests, shared `reqwest::Client`).
    pub fn with_transport(
        transport: Transport,
        credentials: Credentials,
        session_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            credentials,
            session: RwLock::new(Session::new(session_timeout)),
        }
    }

    /// The router base URL.
    pub fn base_url(&self) -> &Url {
        self.transport.base_url()
    }

    pub fn username(&self) -> &str {
        &self.credentials.username
    }

    /// Current SID (the sentinel when not logged in).
    pub fn sid(&self) -> String {
        self.read_session().sid().to_owned()
    }

    pub fn session_state(&self) -> SessionState {
        self.read_session().state()
    }

    /// Rights granted by the last successful login.
    pub fn rights(&self) -> Vec<Right> {
        self.read_session().rights().to_vec()
    }

    // ── Session lifecycle ────────────────────────────────────────────

    /// Log in now instead of on the first request.
    pub async fn connect(&self) -> Result<(), Error> {
        self.login().await
    }

    /// Ask the router to drop the SID, then close the local session.
    ///
    /// A session that never logged in is only closed locally.
    pub async fn logout(&self) -> Result<(), Error> {
        let sid = {
            let session = self.read_session();
            session.is_authenticated().then(|| session.sid().to_owned())
        };
        if let Some(sid) = sid {
            debug!("logging out");
            let params = [
                ("logout".to_owned(), "1".to_owned()),
                ("sid".to_owned(), sid),
            ];
            self.transport
                .send_form(Method::GET, LOGIN_PATH, &params)
                .await?
                .into_body()?;
        }
        self.close();
        Ok(())
    }

    /// Reset the local session without contacting the router. Idempotent.
    pub fn close(&self) {
        self.session
            .write()
            .expect("session lock poisoned")
            .close();
    }

    /// Return a valid SID, logging in first if the session is missing or expired.
    async fn ensure_session(&self) -> Result<String, Error> {
        let needs_login = {
            let session = self.read_session();
            !session.is_authenticated() || session.is_expired()
        };
        if needs_login {
            self.login().await?;
        }
        Ok(self.sid())
    }

    /// One `open()` + `authenticate()` pair. The lock is never held across an
    /// await; the updated session is written back on success and failure alike
    /// so the fetched challenge and block time stay observable.
    async fn login(&self) -> Result<(), Error> {
        let mut session = self.read_session().clone();
        info!(username = %self.credentials.username, "logging in");

        let result = match session.open(&self.transport).await {
            Ok(()) => {
                session
                    .authenticate(&self.transport, &self.credentials)
                    .await
            }
            Err(e) => Err(e),
        };

        *self.session.write().expect("session lock poisoned") = session;
        result
    }

    fn read_session(&self) -> std::sync::RwLockReadGuard<'_, Session> {
        self.session.read().expect("session lock poisoned")
    }

    // ── Requests ─────────────────────────────────────────────────────

    /// Send a form/query request with the SID attached as the `sid` parameter.
    ///
    /// Non-2xx responses become [`Error::UnexpectedStatus`]. A failed
    /// re-authentication is returned as-is.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<String, Error> {
        let sid = self.ensure_session().await?;

        let mut form: Vec<(String, String)> = params
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        form.push(("sid".to_owned(), sid));

        self.transport
            .send_form(method, path, &form)
            .await?
            .into_body()
    }

    /// Send a JSON request with the SID in the `Authorization: AVM-SID` header.
    pub async fn send_json(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<String, Error> {
        let sid = self.ensure_session().await?;
        self.transport
            .send_json(method, path, body, Some(sid.as_str()))
            .await?
            .into_body()
    }

    /// Run one AHA command and return the trimmed response body.
    pub async fn aha(
        &self,
        switchcmd: &str,
        ain: Option<&str>,
        extra: &[(&str, &str)],
    ) -> Result<String, Error> {
        debug!(cmd = switchcmd, ain = ain.unwrap_or(""), "aha command");

        let mut params: Vec<(&str, &str)> = Vec::with_capacity(extra.len() + 2);
        params.push(("switchcmd", switchcmd));
        if let Some(ain) = ain {
            params.push(("ain", ain));
        }
        params.extend_from_slice(extra);

        let body = self.send(Method::GET, AHA_PATH, &params).await?;
        Ok(body.trim().to_owned())
    }
}
