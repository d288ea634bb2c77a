//! Credential vault — authenticated encryption for provider credentials.
//!
//! Blob layout (base64-encoded):
//!   version byte (0x01) || 12-byte nonce || 16-byte Poly1305 tag || ciphertext
//!
//! The version byte makes future algorithm rotation explicit and
//! backward-decryptable. There is no fallback cipher: if the AEAD path
//! cannot run, the vault fails loudly instead of degrading.

use crate::error::{EngineError, EngineResult};
use crate::signing;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chacha20poly1305::aead::{Aead, Payload};
use chacha20poly1305::{ChaCha20Poly1305, KeyInit, Nonce};
use rand::RngCore;
use sha2::{Digest, Sha256};

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const BLOB_VERSION: u8 = 0x01;

/// Associated data bound into every ciphertext. A blob decrypts only in
/// this application context.
const AAD: &[u8] = b"ledgersync.credentials.v1";

/// Salt for deriving a key from an arbitrary passphrase. Fixed so the
/// same passphrase always yields the same key across restarts.
const KDF_SALT: &[u8] = b"ledgersync.credential-vault.v1";
const KDF_ITERATIONS: u32 = 100_000;

#[derive(Debug)]
pub struct CredentialVault {
    key: [u8; KEY_LEN],
}

impl CredentialVault {
    /// Build a vault from the configured secret.
    ///
    /// The secret is accepted as a 32-byte base64 value, a 32-byte hex
    /// value, or an arbitrary passphrase that is stretched with
    /// PBKDF2-HMAC-SHA256.
    pub fn new(secret: &str) -> EngineResult<Self> {
        if secret.is_empty() {
            return Err(EngineError::Configuration(
                "encryption key is required".to_string(),
            ));
        }
        Ok(Self {
            key: resolve_key(secret),
        })
    }

    /// Build a vault from an optional secret, failing the same way the
    /// encrypt/decrypt paths would if none is configured.
    pub fn from_secret(secret: Option<&str>) -> EngineResult<Self> {
        match secret {
            Some(s) if !s.is_empty() => Self::new(s),
            _ => Err(EngineError::Configuration(
                "encryption key is required".to_string(),
            )),
        }
    }

    /// Encrypt arbitrary structured data into an opaque blob.
    ///
    /// Probabilistic: a fresh random nonce is drawn per call, so two
    /// encryptions of identical input never produce the same blob.
    pub fn encrypt(&self, data: &serde_json::Value) -> EngineResult<String> {
        let plaintext = serde_json::to_vec(data)?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let aead = ChaCha20Poly1305::new_from_slice(&self.key)
            .map_err(|_| EngineError::Configuration("invalid encryption key length".to_string()))?;
        let sealed = aead
            .encrypt(
                nonce,
                Payload {
                    msg: &plaintext,
                    aad: AAD,
                },
            )
            .map_err(|_| EngineError::CredentialEncryption)?;

        // AEAD output is ciphertext || tag; the blob stores tag first.
        let split = sealed.len() - TAG_LEN;
        let (ciphertext, tag) = sealed.split_at(split);

        let mut blob = Vec::with_capacity(1 + NONCE_LEN + TAG_LEN + ciphertext.len());
        blob.push(BLOB_VERSION);
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(tag);
        blob.extend_from_slice(ciphertext);
        Ok(BASE64.encode(blob))
    }

    /// Decrypt a blob produced by [`encrypt`](Self::encrypt).
    ///
    /// Every failure mode — malformed input, truncation, tag mismatch,
    /// wrong key — collapses into the same generic error so callers
    /// cannot be used as a decryption oracle.
    pub fn decrypt(&self, blob: &str) -> EngineResult<serde_json::Value> {
        self.decrypt_inner(blob)
            .ok_or(EngineError::CredentialDecryption)
    }

    fn decrypt_inner(&self, blob: &str) -> Option<serde_json::Value> {
        let raw = BASE64.decode(blob.trim()).ok()?;
        if raw.len() < 1 + NONCE_LEN + TAG_LEN || raw[0] != BLOB_VERSION {
            return None;
        }
        let nonce = Nonce::from_slice(&raw[1..1 + NONCE_LEN]);
        let tag = &raw[1 + NONCE_LEN..1 + NONCE_LEN + TAG_LEN];
        let ciphertext = &raw[1 + NONCE_LEN + TAG_LEN..];

        // Reassemble ciphertext || tag for the AEAD API.
        let mut sealed = Vec::with_capacity(ciphertext.len() + TAG_LEN);
        sealed.extend_from_slice(ciphertext);
        sealed.extend_from_slice(tag);

        let aead = ChaCha20Poly1305::new_from_slice(&self.key).ok()?;
        let plaintext = aead
            .decrypt(
                nonce,
                Payload {
                    msg: &sealed,
                    aad: AAD,
                },
            )
            .ok()?;
        serde_json::from_slice(&plaintext).ok()
    }

    /// Deterministic one-way digest for equality comparisons.
    /// Not suitable for credential storage.
    pub fn hash(&self, text: &str) -> String {
        hex::encode(Sha256::digest(text.as_bytes()))
    }

    /// HMAC-SHA256 signature, hex-encoded.
    pub fn create_hmac(&self, data: &[u8], secret: &str) -> String {
        signing::hmac_sha256_hex(secret.as_bytes(), data)
    }

    /// Constant-time verification of a signature from [`create_hmac`](Self::create_hmac).
    pub fn verify_hmac(&self, data: &[u8], secret: &str, signature: &str) -> bool {
        signing::verify_hmac_sha256_hex(secret.as_bytes(), data, signature)
    }

    /// Generate fresh random key material, base64-encoded, ready for
    /// direct use as the vault secret.
    pub fn generate_key() -> String {
        let mut key = [0u8; KEY_LEN];
        rand::thread_rng().fill_bytes(&mut key);
        BASE64.encode(key)
    }
}

/// Resolve the configured secret into raw key bytes.
///
/// Exact-length base64 and hex encodings are used directly; anything
/// else is treated as a passphrase and stretched.
fn resolve_key(secret: &str) -> [u8; KEY_LEN] {
    if let Ok(bytes) = BASE64.decode(secret) {
        if bytes.len() == KEY_LEN {
            let mut key = [0u8; KEY_LEN];
            key.copy_from_slice(&bytes);
            return key;
        }
    }
    if let Ok(bytes) = hex::decode(secret) {
        if bytes.len() == KEY_LEN {
            let mut key = [0u8; KEY_LEN];
            key.copy_from_slice(&bytes);
            return key;
        }
    }
    let mut key = [0u8; KEY_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(secret.as_bytes(), KDF_SALT, KDF_ITERATIONS, &mut key);
    key
}
