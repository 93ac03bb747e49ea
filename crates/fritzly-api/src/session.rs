// Login session state machine
//
// A `Session` owns the SID, the last challenge, the block-time hint and the
// inactivity deadline. It performs exactly two network calls (`open` and
// `authenticate`); expiry is checked lazily by the caller, there are no timers.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use reqwest::Method;
use secrecy::ExposeSecret;
use serde_json::Value;
use tracing::{debug, warn};

use crate::auth::{Credentials, LOGIN_PATH, Right, SENTINEL_SID, compute_response};
use crate::error::Error;
use crate::transport::Transport;
use crate::xml::{FieldBag, one_or_many, root_field_bag};

/// Inactivity window after which the router drops a session.
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Observable lifecycle state of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No challenge fetched yet.
    Unauthenticated,
    /// Challenge on record, not yet answered successfully.
    Challenged,
    /// Valid SID within the inactivity window.
    Authenticated,
    /// SID present but the inactivity window has elapsed.
    Expired,
    /// Explicitly closed; SID reset to the sentinel.
    Closed,
}

/// Parsed `<SessionInfo>` document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub sid: String,
    pub challenge: String,
    pub block_time: Duration,
    pub rights: Vec<Right>,
}

impl SessionInfo {
    pub fn from_xml(body: &str) -> Result<Self, Error> {
        let bag = root_field_bag(body.as_bytes(), "SessionInfo")?;
        let sid = text(&bag, "SID").ok_or_else(|| Error::Deserialization {
            message: "SessionInfo without SID".into(),
            body: body.to_owned(),
        })?;
        let challenge = text(&bag, "Challenge").unwrap_or_default();
        let block_secs = text(&bag, "BlockTime")
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(0);

        Ok(Self {
            sid,
            challenge,
            block_time: Duration::from_secs(block_secs),
            rights: parse_rights(bag.get("Rights")),
        })
    }
}

fn text(bag: &FieldBag, key: &str) -> Option<String> {
    bag.get(key).and_then(Value::as_str).map(str::to_owned)
}

/// `<Rights>` interleaves `<Name>` and `<Access>` elements; pair them up by position.
fn parse_rights(rights: Option<&Value>) -> Vec<Right> {
    let Some(Value::Object(rights)) = rights else {
        return Vec::new();
    };
    let names = one_or_many(rights.get("Name"));
    let access = one_or_many(rights.get("Access"));
    names
        .into_iter()
        .zip(access)
        .filter_map(|(name, access)| {
            Some(Right {
                name: name.as_str()?.to_owned(),
                access: access.as_str()?.parse().ok()?,
            })
        })
        .collect()
}

/// A FRITZ!Box login session.
#[derive(Debug, Clone)]
pub struct Session {
    sid: String,
    challenge: String,
    block_time: Duration,
    rights: Vec<Right>,
    expires_at: Option<DateTime<Utc>>,
    inactivity_window: Duration,
    closed: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_TIMEOUT)
    }
}

impl Session {
    /// Create an unauthenticated session with the given inactivity window.
    pub fn new(inactivity_window: Duration) -> Self {
        Self {
            sid: SENTINEL_SID.to_owned(),
            challenge: String::new(),
            block_time: Duration::ZERO,
            rights: Vec::new(),
            expires_at: None,
            inactivity_window,
            closed: false,
        }
    }

    pub fn sid(&self) -> &str {
        &self.sid
    }

    pub fn challenge(&self) -> &str {
        &self.challenge
    }

    /// Block-time hint from the last `SessionInfo` (non-zero after failed logins).
    pub fn block_time(&self) -> Duration {
        self.block_time
    }

    pub fn rights(&self) -> &[Right] {
        &self.rights
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn is_authenticated(&self) -> bool {
        self.sid != SENTINEL_SID
    }

    /// `now >= expires_at`. A session that never authenticated is expired.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|deadline| now >= deadline)
    }

    pub fn state(&self) -> SessionState {
        if self.closed {
            SessionState::Closed
        } else if self.is_authenticated() {
            if self.is_expired() {
                SessionState::Expired
            } else {
                SessionState::Authenticated
            }
        } else if self.challenge.is_empty() {
            SessionState::Unauthenticated
        } else {
            SessionState::Challenged
        }
    }

    /// Fetch a fresh challenge from the login endpoint.
    pub async fn open(&mut self, transport: &Transport) -> Result<(), Error> {
        debug!("fetching login challenge");
        let resp = transport
            .send_form(Method::GET, LOGIN_PATH, &[])
            .await
            .map_err(|e| Error::ChallengeFetch {
                reason: e.to_string(),
            })?;
        let body = resp.into_body().map_err(|e| Error::ChallengeFetch {
            reason: e.to_string(),
        })?;
        let info = SessionInfo::from_xml(&body).map_err(|e| Error::ChallengeFetch {
            reason: e.to_string(),
        })?;

        self.challenge = info.challenge;
        self.block_time = info.block_time;
        self.closed = false;
        Ok(())
    }

    /// Answer the stored challenge. On success the SID, rights and inactivity
    /// deadline are recorded; on failure the session stays challenged.
    pub async fn authenticate(
        &mut self,
        transport: &Transport,
        credentials: &Credentials,
    ) -> Result<(), Error> {
        if self.challenge.is_empty() {
            return Err(Error::AuthEncoding {
                reason: "no challenge on record; open the session first".into(),
            });
        }

        let response = compute_response(&self.challenge, credentials.password.expose_secret());
        let params = [
            ("username".to_owned(), credentials.username.clone()),
            ("response".to_owned(), response),
        ];

        debug!(username = %credentials.username, "answering login challenge");
        let body = transport
            .send_form(Method::POST, LOGIN_PATH, &params)
            .await?
            .into_body()?;
        let info = SessionInfo::from_xml(&body)?;

        self.block_time = info.block_time;
        if info.sid == SENTINEL_SID {
            warn!(
                block_time_secs = info.block_time.as_secs(),
                "login rejected"
            );
            return Err(Error::InvalidCredentials {
                block_time_secs: info.block_time.as_secs(),
            });
        }

        self.sid = info.sid;
        self.rights = info.rights;
        self.expires_at = Some(Utc::now() + self.window());
        debug!("login successful");
        Ok(())
    }

    /// Reset the SID to the sentinel. Idempotent; the challenge is kept.
    pub fn close(&mut self) {
        self.sid = SENTINEL_SID.to_owned();
        self.expires_at = None;
        self.closed = true;
    }

    fn window(&self) -> TimeDelta {
        TimeDelta::from_std(self.inactivity_window).unwrap_or_else(|_| {
            warn!(
                window = ?self.inactivity_window,
                "session window out of range, using the default"
            );
            TimeDelta::minutes(10)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHALLENGE_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<SessionInfo><SID>0000000000000000</SID><Challenge>1234567z</Challenge><BlockTime>0</BlockTime><Rights></Rights></SessionInfo>"#;

    const AUTHED_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<SessionInfo><SID>9c8ab0f9ad0a1f76</SID><Challenge>1234567z</Challenge><BlockTime>0</BlockTime>
<Rights><Name>NAS</Name><Access>2</Access><Name>HomeAuto</Name><Access>2</Access><Name>Dial</Name><Access>1</Access></Rights></SessionInfo>"#;

    #[test]
    fn parses_challenge_document() {
        let info = SessionInfo::from_xml(CHALLENGE_XML).expect("parses");
        assert_eq!(info.sid, SENTINEL_SID);
        assert_eq!(info.challenge, "1234567z");
        assert_eq!(info.block_time, Duration::ZERO);
        assert!(info.rights.is_empty());
    }

    #[test]
    fn pairs_rights_by_position() {
        let info = SessionInfo::from_xml(AUTHED_XML).expect("parses");
        assert_eq!(info.sid, "9c8ab0f9ad0a1f76");
        assert_eq!(
            info.rights,
            vec![
                Right {
                    name: "NAS".into(),
                    access: 2
                },
                Right {
                    name: "HomeAuto".into(),
                    access: 2
                },
                Right {
                    name: "Dial".into(),
                    access: 1
                },
            ]
        );
    }

    #[test]
    fn single_right_is_not_an_array() {
        let xml = "<SessionInfo><SID>abc</SID><Rights><Name>HomeAuto</Name><Access>2</Access></Rights></SessionInfo>";
        let info = SessionInfo::from_xml(xml).expect("parses");
        assert_eq!(info.rights.len(), 1);
    }

    #[test]
    fn missing_sid_is_rejected() {
        assert!(SessionInfo::from_xml("<SessionInfo><Challenge>x</Challenge></SessionInfo>").is_err());
    }

    #[test]
    fn fresh_session_is_unauthenticated_and_expired() {
        let session = Session::default();
        assert_eq!(session.sid(), SENTINEL_SID);
        assert!(!session.is_authenticated());
        assert!(session.is_expired());
        assert_eq!(session.state(), SessionState::Unauthenticated);
    }

    #[test]
    fn expiry_is_inclusive_of_the_deadline() {
        let mut session = Session::default();
        let deadline = Utc::now();
        session.sid = "9c8ab0f9ad0a1f76".into();
        session.expires_at = Some(deadline);
        assert!(session.is_expired_at(deadline));
        assert!(!session.is_expired_at(deadline - TimeDelta::seconds(1)));
    }

    #[test]
    fn oversized_window_falls_back_to_default() {
        assert_eq!(Session::new(Duration::MAX).window(), TimeDelta::minutes(10));
        assert_eq!(
            Session::new(Duration::from_secs(90)).window(),
            TimeDelta::seconds(90)
        );
    }

    #[test]
    fn close_is_idempotent_and_keeps_challenge() {
        let mut session = Session::default();
        session.challenge = "1234567z".into();
        session.sid = "9c8ab0f9ad0a1f76".into();
        session.close();
        session.close();
        assert_eq!(session.sid(), SENTINEL_SID);
        assert_eq!(session.challenge(), "1234567z");
        assert_eq!(session.state(), SessionState::Closed);
    }
}
