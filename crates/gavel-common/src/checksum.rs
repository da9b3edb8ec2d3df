//! SHA-256 helpers for content digests
//!
//! The export publisher identifies a snapshot by the digest of its assembled
//! files; these helpers keep that hashing in one place.

use sha2::{Digest, Sha256};
use std::io::Read;

/// Hex-encoded SHA-256 of an in-memory byte slice.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Hex-encoded SHA-256 of any readable source, streamed in 8 KiB chunks.
pub fn sha256_reader<R: Read>(reader: &mut R) -> std::io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Incremental SHA-256 over multiple parts, for digesting a file set in a
/// defined order without concatenating it in memory.
#[derive(Default)]
pub struct DigestBuilder {
    hasher: Sha256,
}

impl DigestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one named part. The name participates in the digest so that
    /// renaming a part changes the result even when bytes do not.
    pub fn add_part(&mut self, name: &str, data: &[u8]) -> &mut Self {
        self.hasher.update(name.as_bytes());
        self.hasher.update([0u8]);
        self.hasher.update(data);
        self.hasher.update([0u8]);
        self
    }

    pub fn finish(self) -> String {
        hex::encode(self.hasher.finalize())
    }
}
