//! Payload extraction for hash anchoring and signing.
//!
//! The hash anchor covers `canonical(receipt - signature - hash_anchor)`,
//! since an anchor cannot cover itself. The Ed25519 signature covers
//! `canonical(receipt - signature)`, so an embedded anchor is signed too.

use crate::{Canonicalizer, HashAnchor};
use serde_json::Value;

/// Field holding the signature envelope.
pub const SIGNATURE_FIELD: &str = "signature";
/// Field holding the hex SHA-256 hash anchor.
pub const HASH_ANCHOR_FIELD: &str = "hash_anchor";

/// Error while extracting or encoding a receipt payload.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    /// The receipt document is not a JSON object.
    #[error("receipt must be a JSON object")]
    NotAnObject,
    /// Canonicalization failed.
    #[error("canonicalization failed: {0}")]
    Canonicalization(#[from] crate::CanonicalizationError),
}

/// Returns a copy of `receipt` without the `signature` field: the document
/// the Ed25519 signature covers.
///
/// # Example
///
/// ```rust
/// use xavier_canonical::signing_payload;
/// use serde_json::json;
///
/// let receipt = json!({
///     "corridor": "USDC-Base↔USDC-Base",
///     "hash_anchor": "00",
///     "signature": {"alg": "ed25519", "pubkey_ref": "k1", "sig": "AA=="}
/// });
/// let payload = signing_payload(&receipt)?;
/// assert_eq!(payload, json!({"corridor": "USDC-Base↔USDC-Base", "hash_anchor": "00"}));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn signing_payload(receipt: &Value) -> Result<Value, PayloadError> {
    strip_fields(receipt, &[SIGNATURE_FIELD])
}

/// Returns a copy of `receipt` without the `signature` and `hash_anchor`
/// fields: the document the hash anchor covers.
pub fn anchor_payload(receipt: &Value) -> Result<Value, PayloadError> {
    strip_fields(receipt, &[SIGNATURE_FIELD, HASH_ANCHOR_FIELD])
}

fn strip_fields(receipt: &Value, fields: &[&str]) -> Result<Value, PayloadError> {
    let mut payload = receipt.clone();
    let map = payload.as_object_mut().ok_or(PayloadError::NotAnObject)?;
    for field in fields {
        map.remove(*field);
    }
    Ok(payload)
}

/// Canonical bytes the signature covers.
pub fn payload_bytes(
    receipt: &Value,
    canonicalizer: &Canonicalizer,
) -> Result<Vec<u8>, PayloadError> {
    let payload = signing_payload(receipt)?;
    Ok(canonicalizer.canonicalize(&payload)?)
}

/// Computes the hash anchor of `receipt`.
///
/// Formula: `sha256(canonical(receipt - signature - hash_anchor))`, rendered
/// as lowercase hex.
pub fn compute_hash_anchor(
    receipt: &Value,
    canonicalizer: &Canonicalizer,
) -> Result<HashAnchor, PayloadError> {
    let payload = anchor_payload(receipt)?;
    let bytes = canonicalizer.canonicalize(&payload)?;
    Ok(HashAnchor::compute(&bytes))
}
