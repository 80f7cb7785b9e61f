use sha2::{Digest, Sha256};

/// SHA-256 digest type.
pub type Sha256Digest = [u8; 32];

/// Compute SHA-256 hash of a byte slice.
pub fn sha256(data: &[u8]) -> Sha256Digest {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Lowercase hex of the first `prefix_len` bytes of SHA-256(data).
pub fn short_digest_hex(data: &[u8], prefix_len: usize) -> String {
    sha256(data)
        .iter()
        .take(prefix_len)
        .map(|b| format!("{:02x}", b))
        .collect()
}
