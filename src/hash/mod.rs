//! Content hashing for cache keys
//!
//! Provides the pluggable per-file [`ContentHasher`], the deterministic
//! directory walk in [`hash_dir`], and the SHA-256 helpers everything else
//! builds on. All digests are lowercase hex.

pub mod content;
pub mod dir;

pub use content::{CacheHasher, ContentHasher, FullHasher, HasherKind, MtimeHasher};
pub use dir::hash_dir;

use sha2::{Digest, Sha256};
use std::io::Read;

/// SHA-256 of a byte stream, hex encoded
pub fn sha256_hex(mut reader: impl Read) -> std::io::Result<String> {
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

/// SHA-256 of a byte slice, hex encoded
pub fn hash_bytes(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
