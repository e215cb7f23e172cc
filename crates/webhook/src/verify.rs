//! Request signature verification.

use {
    hmac::{Hmac, Mac},
    sha2::Sha256,
};

type HmacSha256 = Hmac<Sha256>;

/// Verify a hex-encoded HMAC-SHA256 `signature` over `body`.
///
/// The comparison goes through `Mac::verify_slice`, which is constant-time.
/// A signature that is not valid hex, or a `sha256=`-prefixed variant with
/// garbage after the prefix, simply fails verification.
pub fn verify_signature(secret: &str, signature: &str, body: &[u8]) -> bool {
    let signature = signature.strip_prefix("sha256=").unwrap_or(signature);
    let Ok(expected) = hex::decode(signature) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// Canonical signing input for platforms that sign timestamp and nonce
/// along with the body: `timestamp ‖ "." ‖ nonce ‖ "." ‖ body`.
pub fn signing_input(timestamp: &str, nonce: &str, body: &[u8]) -> Vec<u8> {
    let mut input = Vec::with_capacity(timestamp.len() + nonce.len() + body.len() + 2);
    input.extend_from_slice(timestamp.as_bytes());
    input.push(b'.');
    input.extend_from_slice(nonce.as_bytes());
    input.push(b'.');
    input.extend_from_slice(body);
    input
}
