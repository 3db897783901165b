//! Pubkey resolution against a trust mapping.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ed25519_dalek::{VerifyingKey, PUBLIC_KEY_LENGTH};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

use crate::errors::{ReceiptError, SetupError};

/// Read-only mapping of `pubkey_ref` to base64 Ed25519 public keys.
///
/// Values are kept encoded; a malformed key only fails the records that
/// resolve to it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrustMapping {
    keys: BTreeMap<String, String>,
}

impl TrustMapping {
    /// Builds a mapping from `(pubkey_ref, base64 key)` pairs.
    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            keys: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Parses a trust mapping document: one JSON object of string values.
    pub fn from_json_str(text: &str, origin: &str) -> Result<Self, SetupError> {
        let document: Value =
            serde_json::from_str(text).map_err(|e| SetupError::TrustMappingUnreadable {
                path: origin.to_string(),
                reason: e.to_string(),
            })?;
        let object = document
            .as_object()
            .ok_or_else(|| SetupError::TrustMappingInvalid {
                path: origin.to_string(),
                reason: "expected a JSON object".to_string(),
            })?;

        let mut keys = BTreeMap::new();
        for (reference, key) in object {
            let key = key.as_str().ok_or_else(|| SetupError::TrustMappingInvalid {
                path: origin.to_string(),
                reason: format!("value for {} is not a string", reference),
            })?;
            keys.insert(reference.clone(), key.trim().to_string());
        }
        Ok(Self { keys })
    }

    /// Reads a trust mapping file.
    pub fn load(path: &Path) -> Result<Self, SetupError> {
        let origin = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|e| SetupError::TrustMappingUnreadable {
            path: origin.clone(),
            reason: e.to_string(),
        })?;
        let mapping = Self::from_json_str(&text, &origin)?;
        tracing::debug!(trust_mapping = %origin, entries = mapping.len(), "loaded trust mapping");
        Ok(mapping)
    }

    /// Looks up the base64 public key for `reference`.
    pub fn resolve(&self, reference: &str) -> Result<&str, ReceiptError> {
        self.keys
            .get(reference)
            .map(String::as_str)
            .ok_or_else(|| ReceiptError::UnknownKeyRef(reference.to_string()))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the mapping has no entries.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Where public keys come from during signature verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PubkeyResolver {
    /// Resolve each record's `pubkey_ref` against a trust mapping.
    Mapping(TrustMapping),
    /// Use one out-of-band key for every record; references are ignored.
    Override(String),
}

impl PubkeyResolver {
    /// Returns the base64 public key to verify a record signed under
    /// `reference`.
    ///
    /// In [`PubkeyResolver::Override`] mode this never fails.
    pub fn resolve(&self, reference: &str) -> Result<&str, ReceiptError> {
        match self {
            PubkeyResolver::Mapping(mapping) => mapping.resolve(reference),
            PubkeyResolver::Override(key) => Ok(key.as_str()),
        }
    }
}

/// Decodes a base64 32-byte Ed25519 public key.
pub fn decode_public_key(encoded: &str) -> Result<VerifyingKey, ReceiptError> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| ReceiptError::MalformedSignature(format!("public key is not base64: {e}")))?;
    let bytes: [u8; PUBLIC_KEY_LENGTH] = bytes.as_slice().try_into().map_err(|_| {
        ReceiptError::MalformedSignature(format!(
            "public key must be {} bytes (got {})",
            PUBLIC_KEY_LENGTH,
            bytes.len()
        ))
    })?;
    VerifyingKey::from_bytes(&bytes)
        .map_err(|e| ReceiptError::MalformedSignature(format!("public key rejected: {e}")))
}
