//! Password-protected keyring backup.
//!
//! The bundle is a JSON array of channel entries wrapped with
//! [`crypto::wrap_with_password`]. Where the blob is stored is up to the caller.

use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::{self, CryptoError};

use super::keyring::{ChannelKey, Keyring};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum BackupError {
    #[error("wrong password or corrupted backup")]
    WrongPasswordOrCorrupt,
    #[error("could not serialize keyring: {0}")]
    Serialize(String),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BackupEntry {
    key_id: String,
    channel_name: String,
    aes_key_base64: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cover_message: Option<String>,
}

pub fn export_keyring(keyring: &Keyring, password: &str) -> Result<String, BackupError> {
    let entries: Vec<BackupEntry> = keyring
        .channels()
        .into_iter()
        .map(|channel| BackupEntry {
            key_id: channel.fingerprint(),
            channel_name: channel.channel_name.clone(),
            aes_key_base64: crypto::key_to_base64(&channel.key),
            cover_message: channel.cover_message.clone(),
        })
        .collect();

    let json = serde_json::to_string(&entries).map_err(|e| BackupError::Serialize(e.to_string()))?;
    let blob = crypto::wrap_with_password(&json, password)?;
    info!("exported {} channel keys", entries.len());
    Ok(blob)
}

pub fn import_keyring(blob: &str, password: &str) -> Result<Keyring, BackupError> {
    let json = crypto::unwrap_with_password(blob, password).map_err(|_| BackupError::WrongPasswordOrCorrupt)?;
    let entries: Vec<BackupEntry> =
        serde_json::from_str(&json).map_err(|_| BackupError::WrongPasswordOrCorrupt)?;

    let mut keyring = Keyring::new();
    for entry in entries {
        let key =
            crypto::key_from_base64(&entry.aes_key_base64).map_err(|_| BackupError::WrongPasswordOrCorrupt)?;
        let mut channel = ChannelKey::new(&entry.channel_name, key);
        channel.cover_message = entry.cover_message;
        keyring.insert(channel);
    }
    info!("imported {} channel keys", keyring.len());
    Ok(keyring)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_keyring() -> Keyring {
        let mut keyring = Keyring::new();
        keyring.insert(ChannelKey::new("family", [7u8; 32]).with_cover("Noted 👍"));
        keyring.insert(ChannelKey::new("work", [9u8; 32]));
        keyring
    }

    #[test]
    fn test_export_import_roundtrip() {
        let blob = export_keyring(&sample_keyring(), "hunter2").unwrap();
        let restored = import_keyring(&blob, "hunter2").unwrap();

        assert_eq!(restored.len(), 2);
        let family = restored.channel("family").unwrap();
        assert_eq!(family.key, [7u8; 32]);
        assert_eq!(family.cover_message.as_deref(), Some("Noted 👍"));
        let work = restored.channel("work").unwrap();
        assert_eq!(work.key, [9u8; 32]);
        assert_eq!(work.cover_message, None);
    }

    #[test]
    fn test_wrong_password() {
        let blob = export_keyring(&sample_keyring(), "hunter2").unwrap();
        let err = import_keyring(&blob, "hunter3").unwrap_err();
        assert_eq!(err, BackupError::WrongPasswordOrCorrupt);
        assert_eq!(err.to_string(), "wrong password or corrupted backup");
    }

    #[test]
    fn test_corrupted_blob() {
        assert!(import_keyring("not base64 at all!", "pw").is_err());
        assert!(import_keyring("", "pw").is_err());

        // Valid wrap, but not a keyring inside.
        let wrapped = crypto::wrap_with_password("{\"hello\":1}", "pw").unwrap();
        assert_eq!(import_keyring(&wrapped, "pw").unwrap_err(), BackupError::WrongPasswordOrCorrupt);
    }

    #[test]
    fn test_bundle_field_names() {
        let mut keyring = Keyring::new();
        keyring.insert(ChannelKey::new("family", [7u8; 32]));
        let blob = export_keyring(&keyring, "pw").unwrap();
        let json = crypto::unwrap_with_password(&blob, "pw").unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        let entry = &parsed[0];
        assert_eq!(entry["keyId"], crypto::derive_fingerprint("family"));
        assert_eq!(entry["channelName"], "family");
        assert_eq!(entry["aesKeyBase64"], crypto::key_to_base64(&[7u8; 32]));
        assert!(entry.get("coverMessage").is_none());
    }

    #[test]
    fn test_export_errors_are_not_mislabelled() {
        let serialize = BackupError::Serialize("key must be a string".into());
        assert_eq!(serialize.to_string(), "could not serialize keyring: key must be a string");
        let crypto = BackupError::from(CryptoError::EncryptionFailed);
        assert_eq!(crypto.to_string(), "encryption failed");
        assert_ne!(serialize, crypto);
    }

    #[test]
    fn test_empty_keyring() {
        let blob = export_keyring(&Keyring::new(), "pw").unwrap();
        assert!(import_keyring(&blob, "pw").unwrap().is_empty());
    }
}
