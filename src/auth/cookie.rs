//! Cookie signing.
//!
//! Session cookies carry `<session id>.<signature>` where the signature is an
//! HMAC-SHA256 of the id keyed by the configured session secret.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{AppError, Result};

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct CookieSigner {
    mac: HmacSha256,
}

impl CookieSigner {
    pub fn new(secret: &str) -> Result<Self> {
        let mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| AppError::Config(format!("Invalid session secret: {}", e)))?;
        Ok(Self { mac })
    }

    /// Append a signature to `value`.
    pub fn sign(&self, value: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(value.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        format!("{}.{}", value, signature)
    }

    /// Return the original value if the signature matches.
    pub fn unsign(&self, signed: &str) -> Option<String> {
        let (value, signature) = signed.rsplit_once('.')?;
        let signature = URL_SAFE_NO_PAD.decode(signature).ok()?;

        let mut mac = self.mac.clone();
        mac.update(value.as_bytes());
        mac.verify_slice(&signature).ok()?;

        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_unsign() {
        let signer = CookieSigner::new("my secret").unwrap();
        let signed = signer.sign("abc123");
        assert!(signed.starts_with("abc123."));
        assert_eq!(signer.unsign(&signed).as_deref(), Some("abc123"));
    }

    #[test]
    fn test_tampered_value_rejected() {
        let signer = CookieSigner::new("my secret").unwrap();
        let signed = signer.sign("abc123");
        let tampered = signed.replacen("abc123", "abc124", 1);
        assert!(signer.unsign(&tampered).is_none());
        assert!(signer.unsign("abc123").is_none());
    }

    #[test]
    fn test_other_secret_rejected() {
        let signed = CookieSigner::new("one").unwrap().sign("abc123");
        assert!(CookieSigner::new("two").unwrap().unsign(&signed).is_none());
    }
}
