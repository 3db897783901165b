//! Hash-anchor and Ed25519 signature verification.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ed25519_dalek::{Signature, SIGNATURE_LENGTH};
use serde_json::Value;
use xavier_canonical::payload::HASH_ANCHOR_FIELD;
use xavier_canonical::{compute_hash_anchor, payload_bytes, Canonicalizer, HashAnchor};

use crate::errors::ReceiptError;
use crate::receipt::{SignatureEnvelope, ED25519_ALG};
use crate::trust::{decode_public_key, PubkeyResolver};

/// Verifies the cryptographic bindings of a receipt document.
///
/// The hash anchor is recomputed over `canonical(receipt - signature -
/// hash_anchor)`; the signature is checked over `canonical(receipt -
/// signature)`, which covers the stored anchor. Neither check mutates the
/// document. Results are binary: there is no partial trust.
#[derive(Debug, Clone, Copy, Default)]
pub struct Verifier {
    canonicalizer: Canonicalizer,
}

impl Verifier {
    /// Creates a verifier over the given canonicalizer.
    pub fn new(canonicalizer: Canonicalizer) -> Self {
        Self { canonicalizer }
    }

    /// Recomputes the hash anchor and compares it byte-for-byte with the
    /// stored one.
    ///
    /// # Errors
    ///
    /// - [`ReceiptError::MissingHashAnchor`] if the receipt carries no anchor
    /// - [`ReceiptError::MalformedHashAnchor`] if it is not 64 lowercase hex
    ///   characters
    /// - [`ReceiptError::HashMismatch`] if the stored anchor differs
    pub fn verify_hash_anchor(&self, receipt: &Value) -> Result<(), ReceiptError> {
        let stored = match receipt.get(HASH_ANCHOR_FIELD) {
            None | Some(Value::Null) => return Err(ReceiptError::MissingHashAnchor),
            Some(Value::String(s)) => HashAnchor::parse(s.as_str())
                .map_err(|e| ReceiptError::MalformedHashAnchor(e.to_string()))?,
            Some(other) => {
                return Err(ReceiptError::MalformedHashAnchor(format!(
                    "expected a string, got {}",
                    other
                )))
            }
        };
        let computed = compute_hash_anchor(receipt, &self.canonicalizer)?;
        if computed.as_str().as_bytes() == stored.as_str().as_bytes() {
            Ok(())
        } else {
            tracing::debug!(stored = %stored, computed = %computed, "hash anchor mismatch");
            Err(ReceiptError::HashMismatch)
        }
    }

    /// Verifies the Ed25519 signature envelope of `receipt`.
    ///
    /// The key is resolved from `signature.pubkey_ref`. Because the envelope
    /// is not itself signed, that reference must agree with the signed
    /// top-level `pubkey_ref` whenever the receipt has one. With
    /// [`PubkeyResolver::Override`] references are ignored entirely.
    ///
    /// # Errors
    ///
    /// - [`ReceiptError::MalformedSignature`] for a missing or ill-shaped
    ///   envelope, an unsupported `alg`, a reference mismatch, or undecodable
    ///   signature/key bytes
    /// - [`ReceiptError::UnknownKeyRef`] if the reference cannot be resolved
    /// - [`ReceiptError::InvalidSignature`] if verification fails
    pub fn verify_signature(
        &self,
        receipt: &Value,
        resolver: &PubkeyResolver,
    ) -> Result<(), ReceiptError> {
        let envelope = SignatureEnvelope::from_receipt(receipt)?;
        if envelope.alg != ED25519_ALG {
            return Err(ReceiptError::MalformedSignature(format!(
                "unsupported alg {}",
                envelope.alg
            )));
        }
        let signed_ref = receipt.get("pubkey_ref").and_then(Value::as_str);
        if let (PubkeyResolver::Mapping(_), Some(signed_ref)) = (resolver, signed_ref) {
            if signed_ref != envelope.pubkey_ref {
                return Err(ReceiptError::MalformedSignature(format!(
                    "signature.pubkey_ref {} does not match receipt pubkey_ref {}",
                    envelope.pubkey_ref, signed_ref
                )));
            }
        }

        let key = decode_public_key(resolver.resolve(&envelope.pubkey_ref)?)?;
        let signature = decode_signature(&envelope.sig)?;
        let payload = payload_bytes(receipt, &self.canonicalizer)?;

        key.verify_strict(&payload, &signature).map_err(|_| {
            tracing::debug!(pubkey_ref = %envelope.pubkey_ref, "ed25519 verification failed");
            ReceiptError::InvalidSignature
        })
    }
}

fn decode_signature(encoded: &str) -> Result<Signature, ReceiptError> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| ReceiptError::MalformedSignature(format!("sig is not base64: {e}")))?;
    let bytes: [u8; SIGNATURE_LENGTH] = bytes.as_slice().try_into().map_err(|_| {
        ReceiptError::MalformedSignature(format!(
            "sig must be {} bytes (got {})",
            SIGNATURE_LENGTH,
            bytes.len()
        ))
    })?;
    Ok(Signature::from_bytes(&bytes))
}
