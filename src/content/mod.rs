//! Content handling: fingerprinting, classification, scrubbing, and
//! duplicate suppression.
//!
//! Everything here is pure text logic; persistence of the resulting
//! registry entries lives behind the `storage::Store` trait.

pub mod classifier;
pub mod dedup;
pub mod scrubber;

use sha2::{Digest, Sha256};

/// Normalize message text before hashing or keyword matching:
/// lowercase and collapse runs of whitespace to single spaces.
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Content fingerprint: SHA-256 hex digest of the normalized text.
/// Two messages that differ only in case or spacing share a fingerprint.
pub fn fingerprint(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize(text).as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}
