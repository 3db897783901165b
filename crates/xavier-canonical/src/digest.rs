use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest as Sha2Digest, Sha256};
use std::fmt;

use crate::validation::ValidationError;

const HASH_ANCHOR_PATTERN: &str = r"^[0-9a-f]{64}$";

/// Lowercase hex SHA-256 digest of a receipt's canonical payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HashAnchor(String);

impl HashAnchor {
    /// Hashes `bytes` with SHA-256.
    pub fn compute(bytes: &[u8]) -> Self {
        let digest = Sha256::digest(bytes);
        Self(hex::encode(digest))
    }

    /// Parses a stored anchor, requiring 64 lowercase hex characters.
    pub fn parse(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let re = Regex::new(HASH_ANCHOR_PATTERN).map_err(|e| ValidationError::Pattern {
            field: "hash_anchor",
            reason: e.to_string(),
        })?;
        if !re.is_match(&value) {
            return Err(ValidationError::PatternMismatch {
                field: "hash_anchor",
                value,
            });
        }
        Ok(Self(value))
    }

    /// Returns the hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for HashAnchor {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HashAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
