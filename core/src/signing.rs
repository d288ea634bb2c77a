//! HMAC-SHA256 helpers shared by the vault and the platform adapters.
//!
//! Adapters validate provider webhook signatures with these directly so
//! they never need a reference to the credential vault.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub fn hmac_sha256(secret: &[u8], data: &[u8]) -> Vec<u8> {
    // HMAC accepts keys of any length.
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC key of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

pub fn hmac_sha256_hex(secret: &[u8], data: &[u8]) -> String {
    hex::encode(hmac_sha256(secret, data))
}

pub fn hmac_sha256_base64(secret: &[u8], data: &[u8]) -> String {
    BASE64.encode(hmac_sha256(secret, data))
}

/// Constant-time verification of a raw HMAC-SHA256 tag.
pub fn verify_hmac_sha256(secret: &[u8], data: &[u8], tag: &[u8]) -> bool {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC key of any length");
    mac.update(data);
    mac.verify_slice(tag).is_ok()
}

/// Verify a hex-encoded HMAC-SHA256 signature in constant time.
pub fn verify_hmac_sha256_hex(secret: &[u8], data: &[u8], signature: &str) -> bool {
    match hex::decode(signature.trim()) {
        Ok(tag) => verify_hmac_sha256(secret, data, &tag),
        Err(_) => false,
    }
}

/// Verify a base64-encoded HMAC-SHA256 signature in constant time.
pub fn verify_hmac_sha256_base64(secret: &[u8], data: &[u8], signature: &str) -> bool {
    match BASE64.decode(signature.trim()) {
        Ok(tag) => verify_hmac_sha256(secret, data, &tag),
        Err(_) => false,
    }
}
