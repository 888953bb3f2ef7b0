//! Digest helpers shared by the package writer and reader.
//!
//! The package format keys duplicate lookups on a 32-bit truncation of the
//! SHA-1 of a note's sort field, and records a full SHA-1 for each media file.

use sha1::{Digest, Sha1};

/// SHA-1 digest of arbitrary bytes.
pub fn sha1_digest(bytes: &[u8]) -> [u8; 20] {
    let mut hasher = Sha1::new();
    hasher.update(bytes);
    let mut out = [0u8; 20];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// Note checksum: the first four digest bytes read as a big-endian `i32`.
pub fn field_checksum(text: &str) -> i32 {
    let digest = sha1_digest(text.as_bytes());
    i32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
}

/// Positive identifier derived from a name, stable across runs.
///
/// Kept below 2^53 so JSON consumers that parse numbers as doubles see the
/// exact value. Never returns 1, which the format reserves for the default
/// deck.
pub fn stable_id(name: &str) -> i64 {
    let digest = sha1_digest(name.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    let id = (u64::from_be_bytes(bytes) & ((1u64 << 53) - 1)) as i64;
    id.max(2)
}
