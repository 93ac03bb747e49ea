//! Async client for the FRITZ!Box login and home-automation HTTP interfaces.
//!
//! [`Client`] wraps the challenge-response login ([`auth::compute_response`]),
//! keeps the [`Session`] alive lazily and attaches the SID to every request.
//! [`xml::xml_to_field_bag`] turns the router's XML answers into the
//! JSON-shaped field bags consumed by `fritzly-core`.

pub mod auth;
pub mod client;
pub mod error;
pub mod session;
pub mod transport;
pub mod xml;

pub use auth::{Credentials, Right, SENTINEL_SID, compute_response};
pub use client::{AHA_PATH, Client, ClientConfig};
pub use error::Error;
pub use session::{DEFAULT_SESSION_TIMEOUT, Session, SessionInfo, SessionState};
pub use transport::{RawResponse, TlsMode, Transport, TransportConfig};
pub use xml::{FieldBag, one_or_many, root_field_bag, xml_to_field_bag};

pub use reqwest::Method;
