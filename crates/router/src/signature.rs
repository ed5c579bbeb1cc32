//! Signed urls.
//!
//! A signed url carries a `signature` query field, the signed form of its own path and query
//! string. Verifying rebuilds that payload from the request and compares it with what the
//! signature holds, so changing any part of the url breaks it.

use crate::error::UrlError;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::digest::InvalidLength;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::trace;

type HmacSha256 = Hmac<Sha256>;

/// Query field holding the signature of a signed url.
pub const SIGNATURE_FIELD: &str = "signature";

/// Signs and verifies opaque string payloads.
pub trait Encryption: Send + Sync {
    fn sign(&self, payload: &str, expires_in: Option<Duration>, purpose: Option<&str>) -> String;

    /// The signed payload, when `signature` is intact, unexpired and made for `purpose`.
    fn verify(&self, signature: &str, purpose: Option<&str>) -> Option<String>;
}

#[derive(Debug, Clone, Default)]
pub struct SignedUrlOptions {
    pub expires_in: Option<Duration>,
    pub purpose: Option<String>,
}

impl SignedUrlOptions {
    #[must_use]
    pub fn expires_in(mut self, expires_in: Duration) -> Self {
        self.expires_in = Some(expires_in);
        self
    }

    #[must_use]
    pub fn purpose(mut self, purpose: &str) -> Self {
        self.purpose = Some(purpose.to_owned());
        self
    }
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_at: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    purpose: Option<String>,
}

/// HMAC-SHA256 [`Encryption`] keyed by the application secret.
///
/// Signatures read `{payload}.{mac}`, both parts base64 url-safe without padding.
#[derive(Clone)]
pub struct MessageVerifier {
    keyed: HmacSha256,
}

impl MessageVerifier {
    /// # Errors
    ///
    /// Fails when `secret` cannot key the mac.
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self, InvalidLength> {
        let keyed = HmacSha256::new_from_slice(secret.as_ref())?;
        Ok(Self { keyed })
    }

    fn mac(&self) -> HmacSha256 {
        self.keyed.clone()
    }
}

impl fmt::Debug for MessageVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageVerifier").finish_non_exhaustive()
    }
}

impl Encryption for MessageVerifier {
    fn sign(&self, payload: &str, expires_in: Option<Duration>, purpose: Option<&str>) -> String {
        let envelope = Envelope {
            message: payload.to_owned(),
            expires_at: expires_in.map(|expires_in| now_secs().saturating_add(expires_in.as_secs())),
            purpose: purpose.map(str::to_owned),
        };
        let encoded = URL_SAFE_NO_PAD.encode(serde_json::json!(envelope).to_string());

        let mut mac = self.mac();
        mac.update(encoded.as_bytes());
        let digest = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        format!("{encoded}.{digest}")
    }

    fn verify(&self, signature: &str, purpose: Option<&str>) -> Option<String> {
        let (encoded, digest) = signature.rsplit_once('.')?;
        let digest = URL_SAFE_NO_PAD.decode(digest).ok()?;

        let mut mac = self.mac();
        mac.update(encoded.as_bytes());
        if mac.verify_slice(&digest).is_err() {
            trace!("signature mac mismatch");
            return None;
        }

        let decoded = URL_SAFE_NO_PAD.decode(encoded).ok()?;
        let envelope: Envelope = serde_json::from_slice(&decoded).ok()?;
        if envelope.expires_at.is_some_and(|expires_at| expires_at < now_secs()) {
            trace!("signature expired");
            return None;
        }
        if envelope.purpose.as_deref() != purpose {
            trace!("signature purpose mismatch");
            return None;
        }
        Some(envelope.message)
    }
}

fn now_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |elapsed| elapsed.as_secs())
}

/// The string a signed url signs: its path followed by its query string.
///
/// # Errors
///
/// Fails when `query` cannot be url encoded.
pub fn signed_payload(path: &str, query: &[(String, String)]) -> Result<String, UrlError> {
    if query.is_empty() {
        return Ok(path.to_owned());
    }
    let encoded = serde_urlencoded::to_string(query).map_err(UrlError::invalid_query_string)?;
    Ok(format!("{path}?{encoded}"))
}

/// Whether the `signature` field of `query` signs `path` together with the rest of `query`.
pub fn verify_signed_url(signer: &dyn Encryption, path: &str, query: Option<&str>, purpose: Option<&str>) -> bool {
    let Ok(pairs) = serde_urlencoded::from_str::<Vec<(String, String)>>(query.unwrap_or_default()) else {
        return false;
    };
    let (signatures, rest): (Vec<_>, Vec<_>) = pairs.into_iter().partition(|(key, _)| key == SIGNATURE_FIELD);
    let Some((_, signature)) = signatures.into_iter().next() else {
        return false;
    };
    let Ok(payload) = signed_payload(path, &rest) else {
        return false;
    };
    signer.verify(&signature, purpose).is_some_and(|message| message == payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let verifier = MessageVerifier::new("app-secret").unwrap();
        let signature = verifier.sign("/unsubscribe/1", None, None);

        assert_eq!(verifier.verify(&signature, None).as_deref(), Some("/unsubscribe/1"));
        assert!(MessageVerifier::new("other-secret").unwrap().verify(&signature, None).is_none());
    }

    #[test]
    fn test_any_key_length() {
        for secret in [&b""[..], &[7_u8; 128][..]] {
            let verifier = MessageVerifier::new(secret).unwrap();
            let signature = verifier.sign("/posts", None, None);
            assert_eq!(verifier.verify(&signature, None).as_deref(), Some("/posts"));
        }
    }

    #[test]
    fn test_purpose_must_match() {
        let verifier = MessageVerifier::new("app-secret").unwrap();
        let signature = verifier.sign("/login", Some(Duration::from_secs(60)), Some("login"));

        assert!(verifier.verify(&signature, Some("login")).is_some());
        assert!(verifier.verify(&signature, Some("reset")).is_none());
        assert!(verifier.verify(&signature, None).is_none());
    }

    #[test]
    fn test_tampered_payload() {
        let verifier = MessageVerifier::new("app-secret").unwrap();
        let signature = verifier.sign("/unsubscribe/1", None, None);
        let (_, digest) = signature.rsplit_once('.').unwrap();
        let forged = URL_SAFE_NO_PAD.encode(r#"{"message":"/unsubscribe/2"}"#);

        assert!(verifier.verify(&format!("{forged}.{digest}"), None).is_none());
        assert!(verifier.verify("garbage", None).is_none());
    }

    #[test]
    fn test_verify_signed_url() {
        let verifier = MessageVerifier::new("app-secret").unwrap();
        let query = vec![("page".to_owned(), "2".to_owned())];
        let payload = signed_payload("/unsubscribe/1", &query).unwrap();
        let signature = verifier.sign(&payload, None, None);
        let signed = format!("page=2&signature={signature}");

        assert!(verify_signed_url(&verifier, "/unsubscribe/1", Some(&signed), None));
        assert!(!verify_signed_url(&verifier, "/unsubscribe/2", Some(&signed), None));
        assert!(!verify_signed_url(&verifier, "/unsubscribe/1", Some(&format!("page=3&signature={signature}")), None));
        assert!(!verify_signed_url(&verifier, "/unsubscribe/1", Some("page=2"), None));
    }
}
