//! Content fingerprinting for change detection and dedup.
//!
//! A fingerprint is the SHA-256 digest of the raw content bytes, rendered
//! as lowercase hex so it can live in a TEXT column. It is used purely for
//! equality testing; no adversarial-collision guarantee is claimed or needed.

use sha2::{Digest, Sha256};

/// Deterministic content digest. Equal content always yields equal
/// fingerprints; that equality is the version store's dedup criterion.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Computes the fingerprint of a content blob. Pure; no failure modes.
pub fn fingerprint(content: &[u8]) -> Fingerprint {
    let digest = Sha256::digest(content);
    Fingerprint(hex::encode(digest))
}
