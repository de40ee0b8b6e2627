//! VanityCert webhook signature verification.
//!
//! VanityCert signs each webhook body with HMAC-SHA256 using the shared
//! webhook secret and sends the result as
//! `X-VanityCert-Signature: sha256=<hex digest>`.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the webhook signature.
pub const SIGNATURE_HEADER: &str = "X-VanityCert-Signature";

/// Prefix of the signature header value.
pub const SIGNATURE_PREFIX: &str = "sha256=";

/// Compute the signature header value for `payload`.
pub fn sign_payload(secret: &str, payload: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(payload);
    Some(format!(
        "{}{}",
        SIGNATURE_PREFIX,
        hex::encode(mac.finalize().into_bytes())
    ))
}

/// Verify a VanityCert webhook signature over the raw request body.
///
/// # Arguments
///
/// * `secret` - The webhook secret shared with VanityCert
/// * `payload` - The exact request body bytes, before any parsing
/// * `signature` - The `X-VanityCert-Signature` header value, if present
///
/// # Returns
///
/// `true` only when the header is present and matches the expected value.
pub fn verify_signature(secret: &str, payload: &[u8], signature: Option<&str>) -> bool {
    let Some(signature) = signature else {
        warn!("webhook_signature_missing");
        return false;
    };

    let Some(expected) = sign_payload(secret, payload) else {
        warn!("webhook_signature_invalid_key");
        return false;
    };

    // Constant-time comparison to prevent timing attacks
    let valid: bool = expected.as_bytes().ct_eq(signature.as_bytes()).into();

    if !valid {
        warn!(
            expected_length = expected.len(),
            actual_length = signature.len(),
            "webhook_signature_mismatch"
        );
    }

    valid
}
