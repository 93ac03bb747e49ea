use md5::{Digest, Md5};
use secrecy::SecretString;

/// The SID the router hands out for "no session". A session holding this
/// value is unauthenticated; any other value denotes a live session.
pub const SENTINEL_SID: &str = "0000000000000000";

/// Login endpoint for both the challenge fetch and the response.
pub const LOGIN_PATH: &str = "login_sid.lua";

/// Username/password pair used for every (re-)authentication.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }
}

/// One entry of the `<Rights>` block of a `SessionInfo` response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Right {
    /// Permission area, e.g. `HomeAuto`, `Dial`, `BoxAdmin`.
    pub name: String,
    /// 0 = none, 1 = read, 2 = read/write.
    pub access: u8,
}

/// Compute the MD5 challenge response for `challenge` and `secret`.
///
/// The text `<challenge>-<secret>` is encoded as UTF-16LE code units; every
/// code unit above 255 is replaced with `.` (0x2e) before hashing. The result
/// is `<challenge>-<32 lowercase hex digits>`.
pub fn compute_response(challenge: &str, secret: &str) -> String {
    let bytes: Vec<u8> = format!("{challenge}-{secret}")
        .encode_utf16()
        .map(|unit| if unit > 0xff { 0x2e } else { unit })
        .flat_map(u16::to_le_bytes)
        .collect();
    let digest = Md5::digest(&bytes);
    format!("{challenge}-{}", hex::encode(digest))
}
