//! GitHub webhook signature verification (`x-hub-signature-256`).

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_PREFIX: &str = "sha256=";

/// Compute the `x-hub-signature-256` header value for `body`.
pub fn sign_payload(body: &[u8], secret: &str) -> String {
    format!("{}{}", SIGNATURE_PREFIX, hex::encode(hmac_sha256(secret.as_bytes(), body)))
}

/// Raw HMAC-SHA256 of `message` under `key`.
pub fn hmac_sha256(key: &[u8], message: &[u8]) -> Vec<u8> {
    // HMAC accepts keys of any length.
    let mut mac = match HmacSha256::new_from_slice(key) {
        Ok(mac) => mac,
        Err(_) => return Vec::new(),
    };
    mac.update(message);
    mac.finalize().into_bytes().to_vec()
}

/// Verify a webhook body against its signature header.
///
/// `body` must be the untouched request bytes. Missing or empty inputs yield
/// `false`; this function never panics.
pub fn verify_signature(body: &[u8], signature: Option<&str>, secret: &str) -> bool {
    let Some(signature) = signature.filter(|s| !s.is_empty()) else {
        return false;
    };
    if body.is_empty() || secret.is_empty() {
        return false;
    }

    let expected = sign_payload(body, secret);

    if expected.len() != signature.len() {
        warn!(
            expected_len = expected.len(),
            received_len = signature.len(),
            "Webhook signature length mismatch"
        );
        return false;
    }

    let valid: bool = expected.as_bytes().ct_eq(signature.as_bytes()).into();
    if !valid {
        warn!(
            expected_len = expected.len(),
            received_len = signature.len(),
            "Webhook signature mismatch"
        );
    }
    valid
}
