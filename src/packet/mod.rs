use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::config;
use crate::crypto::{EncryptedPayload, WIRE_BASE64};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PacketError {
    #[error("malformed packet: {0}")]
    MalformedPacket(String),
}

/// The wire packet: `{"v":1,"kid":"8f3a","iv":"...","ct":"..."}`.
///
/// `iv` and `ct` hold base64url (no padding) text; use [`GhostPacket::iv_bytes`]
/// and [`GhostPacket::ciphertext_bytes`] for the raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GhostPacket {
    #[serde(rename = "v")]
    pub version: u32,
    #[serde(rename = "kid")]
    pub key_fingerprint: String,
    pub iv: String,
    #[serde(rename = "ct")]
    pub ciphertext: String,
}

/// Lenient read shape: `v` may be missing or of any type.
#[derive(Deserialize)]
struct WirePacket {
    #[serde(default)]
    v: Option<Value>,
    kid: Option<Value>,
    iv: Option<Value>,
    ct: Option<Value>,
}

fn required_string(value: Option<Value>, key: &str) -> Result<String, PacketError> {
    match value {
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(PacketError::MalformedPacket(format!("`{key}` is not a string"))),
        None => Err(PacketError::MalformedPacket(format!("missing `{key}`"))),
    }
}

impl GhostPacket {
    pub fn new(key_fingerprint: &str, iv: &str, ciphertext: &str) -> Self {
        Self {
            version: config::PACKET_VERSION,
            key_fingerprint: key_fingerprint.to_string(),
            iv: iv.to_string(),
            ciphertext: ciphertext.to_string(),
        }
    }

    /// Wrap a fresh encryption result for the channel with `key_fingerprint`.
    pub fn seal(key_fingerprint: &str, payload: &EncryptedPayload) -> Self {
        Self::new(key_fingerprint, &payload.iv_base64(), &payload.ciphertext_base64())
    }

    pub fn to_json(&self) -> String {
        // Four plain fields; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn from_json(json: &str) -> Result<Self, PacketError> {
        let wire: WirePacket = serde_json::from_str(json)
            .map_err(|e| PacketError::MalformedPacket(e.to_string()))?;

        let version = wire
            .v
            .as_ref()
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(config::PACKET_VERSION);

        Ok(Self {
            version,
            key_fingerprint: required_string(wire.kid, "kid")?,
            iv: required_string(wire.iv, "iv")?,
            ciphertext: required_string(wire.ct, "ct")?,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_json().into_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PacketError> {
        let json = std::str::from_utf8(bytes)
            .map_err(|_| PacketError::MalformedPacket("not UTF-8".into()))?;
        Self::from_json(json)
    }

    pub fn iv_bytes(&self) -> Result<Vec<u8>, PacketError> {
        WIRE_BASE64
            .decode(&self.iv)
            .map_err(|e| PacketError::MalformedPacket(format!("iv: {e}")))
    }

    pub fn ciphertext_bytes(&self) -> Result<Vec<u8>, PacketError> {
        WIRE_BASE64
            .decode(&self.ciphertext)
            .map_err(|e| PacketError::MalformedPacket(format!("ct: {e}")))
    }
}
