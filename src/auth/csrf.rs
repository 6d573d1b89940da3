//! Synchronizer-token CSRF protection.
//!
//! A random secret lives in the session. Tokens handed to pages are
//! `<salt>.<mac>` where `mac` is HMAC-SHA256(secret, salt), so every render
//! can issue a fresh token while any of them stays valid for the session.

use axum::http::{HeaderMap, Method};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;

use super::session::Session;
use crate::error::{AppError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Form and query field carrying the token
pub const CSRF_FIELD: &str = "_csrf";

/// Headers checked for a token when the body has none
pub const CSRF_HEADERS: [&str; 4] = ["csrf-token", "xsrf-token", "x-csrf-token", "x-xsrf-token"];

/// Per-request CSRF state, inserted by the CSRF stage
#[derive(Debug, Clone)]
pub struct CsrfGuard {
    secret: String,
}

impl CsrfGuard {
    /// Load the session's secret, creating one on first use
    pub fn for_session(session: &Session) -> Self {
        let secret = match session.csrf_secret() {
            Some(secret) => secret,
            None => {
                let secret = generate_secret();
                session.set_csrf_secret(&secret);
                secret
            }
        };
        Self { secret }
    }

    /// Issue a new token for the page being rendered
    pub fn token(&self) -> String {
        let salt_bytes: [u8; 8] = rand::thread_rng().gen();
        let salt = URL_SAFE_NO_PAD.encode(salt_bytes);
        format!("{}.{}", salt, self.mac(&salt))
    }

    /// Check a submitted token against the session secret
    pub fn verify(&self, token: &str) -> bool {
        let Some((salt, mac)) = token.split_once('.') else {
            return false;
        };
        let Ok(expected) = URL_SAFE_NO_PAD.decode(mac) else {
            return false;
        };
        match HmacSha256::new_from_slice(self.secret.as_bytes()) {
            Ok(mut hmac) => {
                hmac.update(salt.as_bytes());
                hmac.verify_slice(&expected).is_ok()
            }
            Err(_) => false,
        }
    }

    fn mac(&self, salt: &str) -> String {
        // HMAC accepts keys of any length
        let mut hmac = match HmacSha256::new_from_slice(self.secret.as_bytes()) {
            Ok(hmac) => hmac,
            Err(_) => return String::new(),
        };
        hmac.update(salt.as_bytes());
        URL_SAFE_NO_PAD.encode(hmac.finalize().into_bytes())
    }
}

fn generate_secret() -> String {
    let bytes: [u8; 18] = rand::thread_rng().gen();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Methods that never change state and so skip verification
pub fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Find the submitted token: body field, then query, then headers
pub fn find_token(
    form: &[(String, String)],
    query: Option<&str>,
    headers: &HeaderMap,
) -> Option<String> {
    if let Some((_, value)) = form.iter().find(|(k, _)| k == CSRF_FIELD) {
        return Some(value.clone());
    }

    if let Some(query) = query {
        if let Some((_, value)) =
            url::form_urlencoded::parse(query.as_bytes()).find(|(k, _)| k == CSRF_FIELD)
        {
            return Some(value.into_owned());
        }
    }

    CSRF_HEADERS.iter().find_map(|name| {
        headers
            .get(*name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    })
}

/// Verify the token of a state-changing request
pub fn check_request(
    guard: &CsrfGuard,
    method: &Method,
    form: &[(String, String)],
    query: Option<&str>,
    headers: &HeaderMap,
) -> Result<()> {
    if is_safe_method(method) {
        return Ok(());
    }

    match find_token(form, query, headers) {
        Some(token) if guard.verify(&token) => Ok(()),
        _ => Err(AppError::InvalidCsrfToken),
    }
}
