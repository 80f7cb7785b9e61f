pub mod password;

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{
    alphabet,
    engine::{general_purpose::GeneralPurposeConfig, DecodePaddingMode, GeneralPurpose},
    Engine,
};
use rand::RngCore;
use thiserror::Error;

use crate::config;
use crate::integrity;

pub use password::{unwrap_with_password, wrap_with_password};

/// Base64url without padding on encode; decode accepts padded or unpadded input.
pub(crate) const WIRE_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Raw 256-bit channel key.
pub type Key = [u8; config::KEY_SIZE];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CryptoError {
    #[error("key must be {expected} bytes, got {0}", expected = config::KEY_SIZE)]
    InvalidKeySize(usize),
    #[error("IV must be {expected} bytes, got {0}", expected = config::IV_SIZE)]
    InvalidIvSize(usize),
    #[error("encryption failed")]
    EncryptionFailed,
    #[error("authentication failed")]
    AuthenticationFailed,
    #[error("decrypted data is not valid UTF-8")]
    InvalidUtf8,
    #[error("encrypted blob is malformed")]
    MalformedBlob,
    #[error("key encoding invalid: {0}")]
    KeyEncoding(String),
}

/// IV and ciphertext (GCM tag appended) produced by one [`encrypt`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedPayload {
    pub iv: [u8; config::IV_SIZE],
    pub ciphertext: Vec<u8>,
}

impl EncryptedPayload {
    pub fn iv_base64(&self) -> String {
        WIRE_BASE64.encode(self.iv)
    }

    pub fn ciphertext_base64(&self) -> String {
        WIRE_BASE64.encode(&self.ciphertext)
    }
}

/// Generate a random 256-bit channel key.
pub fn generate_key() -> Key {
    let mut key = [0u8; config::KEY_SIZE];
    rand::thread_rng().fill_bytes(&mut key);
    key
}

fn cipher_for(key: &[u8]) -> Result<Aes256Gcm, CryptoError> {
    Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::InvalidKeySize(key.len()))
}

/// Encrypt a UTF-8 message with AES-256-GCM under a fresh random 96-bit IV.
pub fn encrypt(plaintext: &str, key: &[u8]) -> Result<EncryptedPayload, CryptoError> {
    let cipher = cipher_for(key)?;

    let mut iv = [0u8; config::IV_SIZE];
    rand::thread_rng().fill_bytes(&mut iv);

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&iv), plaintext.as_bytes())
        .map_err(|_| CryptoError::EncryptionFailed)?;

    Ok(EncryptedPayload { iv, ciphertext })
}

/// Verify the GCM tag and decrypt. Wrong key and tampered input both yield
/// [`CryptoError::AuthenticationFailed`].
pub fn decrypt(ciphertext: &[u8], key: &[u8], iv: &[u8]) -> Result<String, CryptoError> {
    let cipher = cipher_for(key)?;
    if iv.len() != config::IV_SIZE {
        return Err(CryptoError::InvalidIvSize(iv.len()));
    }

    let plaintext = cipher
        .decrypt(Nonce::from_slice(iv), ciphertext)
        .map_err(|_| CryptoError::AuthenticationFailed)?;

    String::from_utf8(plaintext).map_err(|_| CryptoError::InvalidUtf8)
}

/// Decrypt from base64url-encoded ciphertext, key and IV.
pub fn decrypt_base64(ciphertext_b64: &str, key_b64: &str, iv_b64: &str) -> Result<String, CryptoError> {
    let ciphertext = WIRE_BASE64
        .decode(ciphertext_b64)
        .map_err(|_| CryptoError::MalformedBlob)?;
    let iv = WIRE_BASE64.decode(iv_b64).map_err(|_| CryptoError::MalformedBlob)?;
    let key = key_from_base64(key_b64)?;
    decrypt(&ciphertext, &key, &iv)
}

/// Derive the 4-hex-char channel fingerprint from a channel name.
pub fn derive_fingerprint(name: &str) -> String {
    integrity::short_digest_hex(name.as_bytes(), config::FINGERPRINT_BYTES)
}

pub fn key_to_base64(key: &[u8]) -> String {
    WIRE_BASE64.encode(key)
}

pub fn key_from_base64(encoded: &str) -> Result<Key, CryptoError> {
    let bytes = WIRE_BASE64
        .decode(encoded.trim())
        .map_err(|e| CryptoError::KeyEncoding(e.to_string()))?;
    let len = bytes.len();
    bytes.try_into().map_err(|_| CryptoError::InvalidKeySize(len))
}

/// Securely zero a key buffer.
pub fn secure_zero(buf: &mut [u8]) {
    for byte in buf.iter_mut() {
        unsafe {
            std::ptr::write_volatile(byte, 0);
        }
    }
    std::sync::atomic::fence(std::sync::atomic::Ordering::SeqCst);
}
