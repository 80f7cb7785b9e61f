use std::collections::HashMap;

use crate::crypto::{self, Key};

/// A channel's shared key, as handed over by whatever owns key storage.
#[derive(Clone)]
pub struct ChannelKey {
    pub channel_name: String,
    pub key: Key,
    /// Visible text used when a text carrier is sealed with an empty cover.
    pub cover_message: Option<String>,
}

impl ChannelKey {
    pub fn new(channel_name: &str, key: Key) -> Self {
        Self {
            channel_name: channel_name.to_string(),
            key,
            cover_message: None,
        }
    }

    pub fn with_cover(mut self, cover: &str) -> Self {
        self.cover_message = Some(cover.to_string());
        self
    }

    pub fn fingerprint(&self) -> String {
        crypto::derive_fingerprint(&self.channel_name)
    }
}

impl std::fmt::Debug for ChannelKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelKey")
            .field("channel_name", &self.channel_name)
            .field("key", &"<redacted>")
            .field("cover_message", &self.cover_message)
            .finish()
    }
}

impl Drop for ChannelKey {
    fn drop(&mut self) {
        crypto::secure_zero(&mut self.key);
    }
}

/// Key lookup consulted once per reveal attempt.
///
/// Returning `None` is not an error: the carrier is simply treated as holding
/// nothing for us.
///
/// # Example
///
/// ```rust
/// use ghostwhisper::{ChannelKey, KeyStore};
///
/// struct SingleChannel(ChannelKey);
///
/// impl KeyStore for SingleChannel {
///     fn key_for(&self, fingerprint: &str) -> Option<&ChannelKey> {
///         (self.0.fingerprint() == fingerprint).then_some(&self.0)
///     }
/// }
/// ```
pub trait KeyStore {
    fn key_for(&self, fingerprint: &str) -> Option<&ChannelKey>;
}

/// In-memory key store indexed by channel fingerprint.
///
/// Two channel names can share a fingerprint; the later insert wins.
#[derive(Debug, Default, Clone)]
pub struct Keyring {
    keys: HashMap<String, ChannelKey>,
}

impl Keyring {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a channel key, returning the entry it displaced, if any.
    pub fn insert(&mut self, channel: ChannelKey) -> Option<ChannelKey> {
        self.keys.insert(channel.fingerprint(), channel)
    }

    /// Generate and store a fresh key for `channel_name`.
    pub fn create_channel(&mut self, channel_name: &str) -> &ChannelKey {
        let channel = ChannelKey::new(channel_name, crypto::generate_key());
        let fingerprint = channel.fingerprint();
        self.keys.insert(fingerprint.clone(), channel);
        &self.keys[&fingerprint]
    }

    pub fn remove(&mut self, channel_name: &str) -> Option<ChannelKey> {
        self.keys.remove(&crypto::derive_fingerprint(channel_name))
    }

    pub fn channel(&self, channel_name: &str) -> Option<&ChannelKey> {
        self.keys
            .get(&crypto::derive_fingerprint(channel_name))
            .filter(|c| c.channel_name == channel_name)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Channels ordered by name.
    pub fn channels(&self) -> Vec<&ChannelKey> {
        let mut channels: Vec<&ChannelKey> = self.keys.values().collect();
        channels.sort_by(|a, b| a.channel_name.cmp(&b.channel_name));
        channels
    }
}

impl KeyStore for Keyring {
    fn key_for(&self, fingerprint: &str) -> Option<&ChannelKey> {
        self.keys.get(fingerprint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_fingerprint() {
        let mut keyring = Keyring::new();
        let key = crypto::generate_key();
        assert!(keyring.insert(ChannelKey::new("family", key)).is_none());

        let fp = crypto::derive_fingerprint("family");
        let found = keyring.key_for(&fp).unwrap();
        assert_eq!(found.channel_name, "family");
        assert_eq!(found.key, key);
        assert!(keyring.key_for("zzzz").is_none());
    }

    #[test]
    fn test_insert_replaces_same_channel() {
        let mut keyring = Keyring::new();
        keyring.insert(ChannelKey::new("work", [1u8; 32]));
        let old = keyring.insert(ChannelKey::new("work", [2u8; 32])).unwrap();
        assert_eq!(old.key, [1u8; 32]);
        assert_eq!(keyring.len(), 1);
        assert_eq!(keyring.channel("work").unwrap().key, [2u8; 32]);
    }

    #[test]
    fn test_create_and_remove_channel() {
        let mut keyring = Keyring::new();
        let fp = keyring.create_channel("book club").fingerprint();
        assert_eq!(fp, crypto::derive_fingerprint("book club"));
        assert!(keyring.channel("book club").is_some());
        assert!(keyring.channel("chess club").is_none());

        assert!(keyring.remove("book club").is_some());
        assert!(keyring.is_empty());
    }

    #[test]
    fn test_channels_sorted() {
        let mut keyring = Keyring::new();
        for name in ["zulu", "alpha", "mike"] {
            keyring.create_channel(name);
        }
        let names: Vec<&str> = keyring.channels().iter().map(|c| c.channel_name.as_str()).collect();
        assert_eq!(names, ["alpha", "mike", "zulu"]);
    }

    #[test]
    fn test_debug_redacts_key() {
        let channel = ChannelKey::new("secret", [0xAB; 32]).with_cover("hi");
        let shown = format!("{channel:?}");
        assert!(shown.contains("<redacted>"));
        assert!(!shown.contains("171"));
    }
}
