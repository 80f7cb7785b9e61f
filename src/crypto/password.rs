//! Password-based wrapping for keyring backups.
//!
//! Blob layout before base64: `salt (16) || iv (12) || ciphertext + tag`.
//! The wrapping key is PBKDF2-HMAC-SHA256 over the password with a fresh
//! salt per call.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use rand::RngCore;
use sha2::Sha256;

use super::{secure_zero, CryptoError};
use crate::config;

fn derive_wrapping_key(password: &str, salt: &[u8]) -> [u8; config::KEY_SIZE] {
    let mut key = [0u8; config::KEY_SIZE];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, config::PBKDF2_ITERATIONS, &mut key);
    key
}

/// Encrypt `plaintext` under a key derived from `password`. Returns standard base64.
pub fn wrap_with_password(plaintext: &str, password: &str) -> Result<String, CryptoError> {
    let mut rng = rand::thread_rng();
    let mut salt = [0u8; config::SALT_SIZE];
    rng.fill_bytes(&mut salt);
    let mut iv = [0u8; config::IV_SIZE];
    rng.fill_bytes(&mut iv);

    let mut key = derive_wrapping_key(password, &salt);
    let result = Aes256Gcm::new_from_slice(&key)
        .map_err(|_| CryptoError::InvalidKeySize(key.len()))
        .and_then(|cipher| {
            cipher
                .encrypt(Nonce::from_slice(&iv), plaintext.as_bytes())
                .map_err(|_| CryptoError::EncryptionFailed)
        });
    secure_zero(&mut key);
    let ciphertext = result?;

    let mut combined = Vec::with_capacity(config::SALT_SIZE + config::IV_SIZE + ciphertext.len());
    combined.extend_from_slice(&salt);
    combined.extend_from_slice(&iv);
    combined.extend_from_slice(&ciphertext);
    Ok(STANDARD.encode(combined))
}

/// Reverse [`wrap_with_password`]. A wrong password and a corrupted blob are
/// both reported as [`CryptoError::AuthenticationFailed`].
pub fn unwrap_with_password(blob: &str, password: &str) -> Result<String, CryptoError> {
    let combined = STANDARD
        .decode(blob.trim())
        .map_err(|_| CryptoError::MalformedBlob)?;
    if combined.len() < config::SALT_SIZE + config::IV_SIZE + config::AUTH_TAG_SIZE {
        return Err(CryptoError::MalformedBlob);
    }

    let (salt, rest) = combined.split_at(config::SALT_SIZE);
    let (iv, ciphertext) = rest.split_at(config::IV_SIZE);

    let mut key = derive_wrapping_key(password, salt);
    let result = Aes256Gcm::new_from_slice(&key)
        .map_err(|_| CryptoError::InvalidKeySize(key.len()))
        .and_then(|cipher| {
            cipher
                .decrypt(Nonce::from_slice(iv), ciphertext)
                .map_err(|_| CryptoError::AuthenticationFailed)
        });
    secure_zero(&mut key);

    String::from_utf8(result?).map_err(|_| CryptoError::InvalidUtf8)
}
