//! `X-Signature` scheme for inbound payment webhooks: lowercase hex
//! HMAC-SHA-256 of the raw request body under the tenant's events secret.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::app_error::{AppError, AppResult};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the hex digest. Header names are case-insensitive.
pub const SIGNATURE_HEADER: &str = "x-signature";

/// Hex HMAC-SHA-256 of `body` under `secret`.
pub fn sign_payload(secret: &str, body: &[u8]) -> AppResult<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| AppError::Internal("HMAC error".into()))?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Accepts a bare hex digest or a `sha256=<hex>` value.
///
/// SECURITY: the digest comparison is constant-time; callers must pass the
/// raw body bytes exactly as received, before any JSON parsing.
pub fn verify_signature(secret: &str, body: &[u8], header_value: &str) -> AppResult<()> {
    let provided = header_value.trim();
    let provided = provided.strip_prefix("sha256=").unwrap_or(provided);
    if provided.is_empty() {
        return Err(AppError::SignatureInvalid);
    }

    let expected = sign_payload(secret, body)?;
    if constant_time_compare(expected.as_bytes(), provided.to_ascii_lowercase().as_bytes()) {
        Ok(())
    } else {
        Err(AppError::SignatureInvalid)
    }
}

fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
