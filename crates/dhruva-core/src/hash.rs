use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// SHA-256 digest of a reference data set, stored as 64 hex chars.
///
/// Two catalogs with the same questions, templates and trigger configs
/// always produce the same fingerprint regardless of file layout.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn hash(data: &[u8]) -> Self {
        let digest = Sha256::digest(data);
        Self(hex::encode(digest))
    }

    /// Parse a full 64-char hex string.
    pub fn parse(hex_str: &str) -> Option<Self> {
        let hex_str = hex_str.trim();
        if hex_str.len() != 64 || !hex_str.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        Some(Self(hex_str.to_lowercase()))
    }

    pub fn hex(&self) -> &str {
        &self.0
    }

    /// First 12 chars, used for display.
    pub fn short(&self) -> &str {
        &self.0[..12]
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.short())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short())
    }
}
