//! Cookie-backed session management
//!
//! Sessions live entirely in a signed cookie: a JSON key/value payload plus
//! a max-age, HMAC-SHA256 signed with the configured key. The server keeps
//! no session state of its own.

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::header::{HeaderMap, HeaderValue, COOKIE};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::Sha256;

use crate::error::{Error, Result};

/// Cookie name the session travels under
pub const SESSION_COOKIE: &str = "logserver";

/// Session key the authenticated user's ID is stored under
pub const USER_ID_KEY: &str = "user_id";

type HmacSha256 = Hmac<Sha256>;

/// A decoded session: a string-keyed value map and a max-age in seconds.
/// A negative max-age means the session is no longer valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    values: HashMap<String, serde_json::Value>,
    max_age: i64,
}

impl Session {
    fn new(max_age: i64) -> Self {
        Self {
            values: HashMap::new(),
            max_age,
        }
    }

    pub fn max_age(&self) -> i64 {
        self.max_age
    }

    pub fn set_user_id(&mut self, user_id: u64) {
        self.values.insert(USER_ID_KEY.to_string(), json!(user_id));
    }

    pub fn user_id(&self) -> Option<u64> {
        self.values.get(USER_ID_KEY)?.as_u64()
    }

    pub fn clear_user_id(&mut self) {
        self.values.remove(USER_ID_KEY);
    }
}

/// Issues, loads and serializes signed session cookies
#[derive(Clone)]
pub struct SessionStore {
    key: Arc<Vec<u8>>,
    max_age: i64,
}

impl SessionStore {
    pub fn new(key: &str, max_age: i64) -> Self {
        Self {
            key: Arc::new(key.as_bytes().to_vec()),
            max_age,
        }
    }

    /// A fresh session with the configured max-age
    pub fn issue(&self) -> Session {
        Session::new(self.max_age)
    }

    /// Extract and verify the session from the request headers. `Ok(None)`
    /// means no session cookie was presented; a cookie that fails signature
    /// verification or decoding is an error, not merely absent.
    pub fn load(&self, headers: &HeaderMap) -> Result<Option<Session>> {
        let Some(raw) = find_cookie(headers, SESSION_COOKIE) else {
            return Ok(None);
        };

        let (payload_b64, sig_b64) = raw
            .split_once('.')
            .ok_or_else(|| Error::Session("malformed session cookie".into()))?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| Error::Session("malformed session payload".into()))?;
        let sig = URL_SAFE_NO_PAD
            .decode(sig_b64)
            .map_err(|_| Error::Session("malformed session signature".into()))?;

        let mut mac = self.mac()?;
        mac.update(&payload);
        mac.verify_slice(&sig)
            .map_err(|_| Error::Session("session signature mismatch".into()))?;

        let session = serde_json::from_slice(&payload)
            .map_err(|e| Error::Session(format!("session decode error: {}", e)))?;

        Ok(Some(session))
    }

    /// Serialize and sign a session into a `Set-Cookie` header value
    pub fn cookie(&self, session: &Session) -> Result<HeaderValue> {
        let payload = serde_json::to_vec(session)?;

        let mut mac = self.mac()?;
        mac.update(&payload);
        let sig = mac.finalize().into_bytes();

        let value = format!(
            "{}={}.{}; Path=/; Max-Age={}",
            SESSION_COOKIE,
            URL_SAFE_NO_PAD.encode(&payload),
            URL_SAFE_NO_PAD.encode(sig),
            session.max_age.max(0),
        );

        HeaderValue::from_str(&value).map_err(|e| Error::Session(e.to_string()))
    }

    fn mac(&self) -> Result<HmacSha256> {
        HmacSha256::new_from_slice(&self.key)
            .map_err(|_| Error::Session("invalid session key".into()))
    }
}

/// Find a cookie value by name across all Cookie headers
fn find_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let prefix = format!("{}=", name);

    for header in headers.get_all(COOKIE) {
        let Ok(cookies) = header.to_str() else {
            continue;
        };
        for cookie in cookies.split(';') {
            if let Some(value) = cookie.trim().strip_prefix(&prefix) {
                return Some(value.to_string());
            }
        }
    }

    None
}
