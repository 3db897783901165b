//! Receipt issuance: derived fields, hash anchor, Ed25519 signature.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ed25519_dalek::{Signer as _, SigningKey, KEYPAIR_LENGTH, SECRET_KEY_LENGTH};
use serde_json::{json, Map, Value};
use std::fmt;
use std::path::Path;
use xavier_canonical::payload::{HASH_ANCHOR_FIELD, SIGNATURE_FIELD};
use xavier_canonical::{compute_hash_anchor, payload_bytes, Canonicalizer};
use zeroize::Zeroizing;

use crate::errors::SigningError;
use crate::receipt::{parse_instant, ED25519_ALG};

/// 32-byte Ed25519 seed, zeroed when dropped.
pub struct SecretSeed(Zeroizing<[u8; SECRET_KEY_LENGTH]>);

impl fmt::Debug for SecretSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretSeed(<redacted>)")
    }
}

impl SecretSeed {
    /// Wraps raw seed bytes.
    pub fn from_bytes(seed: [u8; SECRET_KEY_LENGTH]) -> Self {
        Self(Zeroizing::new(seed))
    }

    /// Decodes base64 key material: either a 32-byte seed or a 64-byte
    /// `seed || public key` pair, whose public half must match the seed.
    pub fn from_base64(encoded: &str) -> Result<Self, SigningError> {
        let bytes = Zeroizing::new(
            STANDARD
                .decode(encoded.trim())
                .map_err(|e| SigningError::MalformedSecretKey(format!("not base64: {e}")))?,
        );
        match bytes.len() {
            SECRET_KEY_LENGTH => {
                let mut seed = Zeroizing::new([0u8; SECRET_KEY_LENGTH]);
                seed.copy_from_slice(&bytes);
                Ok(Self(seed))
            }
            KEYPAIR_LENGTH => {
                let mut pair = Zeroizing::new([0u8; KEYPAIR_LENGTH]);
                pair.copy_from_slice(&bytes);
                let key = SigningKey::from_keypair_bytes(&pair)
                    .map_err(|e| SigningError::MalformedSecretKey(e.to_string()))?;
                Ok(Self(Zeroizing::new(key.to_bytes())))
            }
            n => Err(SigningError::MalformedSecretKey(format!(
                "expected {} or {} bytes, got {}",
                SECRET_KEY_LENGTH, KEYPAIR_LENGTH, n
            ))),
        }
    }

    /// Reads a base64 secret key file.
    pub fn load(path: &Path) -> Result<Self, SigningError> {
        let text = Zeroizing::new(std::fs::read_to_string(path).map_err(|e| {
            SigningError::SecretKeyUnreadable {
                path: path.display().to_string(),
                reason: e.to_string(),
            }
        })?);
        Self::from_base64(&text)
    }

    /// Base64 public key matching this seed, as stored in a trust mapping.
    pub fn public_key_base64(&self) -> String {
        let key = SigningKey::from_bytes(&self.0);
        STANDARD.encode(key.verifying_key().to_bytes())
    }
}

/// Options controlling issuance.
#[derive(Debug, Clone, Copy)]
pub struct SigningOptions {
    /// Embed `hash_anchor` alongside the signature.
    pub embed_hash_anchor: bool,
}

impl Default for SigningOptions {
    fn default() -> Self {
        Self {
            embed_hash_anchor: true,
        }
    }
}

/// Turns draft receipts into signed, immutable receipts.
#[derive(Debug, Clone, Copy, Default)]
pub struct Signer {
    canonicalizer: Canonicalizer,
    options: SigningOptions,
}

impl Signer {
    /// Creates a signer.
    pub fn new(canonicalizer: Canonicalizer, options: SigningOptions) -> Self {
        Self {
            canonicalizer,
            options,
        }
    }

    /// Signs a draft receipt and returns the signed document.
    ///
    /// Steps:
    /// 1. drop any previous `signature` and `hash_anchor`
    /// 2. derive `receipt_emission_ms` from the timestamps if it is absent
    /// 3. settle `pubkey_ref` (argument or draft field; they must agree)
    /// 4. optionally embed `hash_anchor`, the SHA-256 of the canonical
    ///    receipt without it
    /// 5. sign `canonical(receipt - signature)`, anchor included, and attach
    ///    `{alg, pubkey_ref, sig}`
    ///
    /// The signing key lives only for the duration of this call.
    pub fn sign(
        &self,
        draft: &Value,
        seed: &SecretSeed,
        pubkey_ref: Option<&str>,
    ) -> Result<Value, SigningError> {
        let mut receipt = draft.clone();
        let map = map_mut(&mut receipt)?;
        map.remove(SIGNATURE_FIELD);
        map.remove(HASH_ANCHOR_FIELD);

        derive_emission_ms(map)?;
        let pubkey_ref = settle_pubkey_ref(map, pubkey_ref)?;

        if self.options.embed_hash_anchor {
            let anchor = compute_hash_anchor(&receipt, &self.canonicalizer)?;
            map_mut(&mut receipt)?.insert(HASH_ANCHOR_FIELD.to_string(), json!(anchor));
        }

        let payload = payload_bytes(&receipt, &self.canonicalizer)?;
        let signature = {
            let key = SigningKey::from_bytes(&seed.0);
            key.sign(&payload)
        };

        let map = map_mut(&mut receipt)?;
        map.insert(
            SIGNATURE_FIELD.to_string(),
            json!({
                "alg": ED25519_ALG,
                "pubkey_ref": pubkey_ref,
                "sig": STANDARD.encode(signature.to_bytes()),
            }),
        );
        tracing::debug!(pubkey_ref = %pubkey_ref, "receipt signed");
        Ok(receipt)
    }
}

fn map_mut(receipt: &mut Value) -> Result<&mut Map<String, Value>, SigningError> {
    receipt.as_object_mut().ok_or(SigningError::NotAnObject)
}

fn derive_emission_ms(map: &mut Map<String, Value>) -> Result<(), SigningError> {
    if !matches!(map.get("receipt_emission_ms"), None | Some(Value::Null)) {
        return Ok(());
    }
    let Some(timestamps) = map.get("timestamps") else {
        return Ok(());
    };
    let finality = timestamps.get("finality_at").and_then(Value::as_str);
    let emitted = timestamps.get("receipt_emitted_at").and_then(Value::as_str);
    let (Some(finality), Some(emitted)) = (finality, emitted) else {
        return Ok(());
    };

    let finality = parse_instant(finality).map_err(|e| SigningError::Timestamp {
        field: "finality_at",
        reason: e.to_string(),
    })?;
    let emitted = parse_instant(emitted).map_err(|e| SigningError::Timestamp {
        field: "receipt_emitted_at",
        reason: e.to_string(),
    })?;
    let delta = (emitted - finality).num_milliseconds();
    map.insert("receipt_emission_ms".to_string(), json!(delta));
    Ok(())
}

fn settle_pubkey_ref(
    map: &mut Map<String, Value>,
    requested: Option<&str>,
) -> Result<String, SigningError> {
    let existing = match map.get("pubkey_ref") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => return Err(SigningError::InvalidPubkeyRef),
    };
    let settled = match (existing, requested) {
        (Some(existing), Some(requested)) if existing != requested => {
            return Err(SigningError::PubkeyRefMismatch {
                receipt: existing,
                requested: requested.to_string(),
            })
        }
        (Some(existing), _) => existing,
        (None, Some(requested)) => requested.to_string(),
        (None, None) => return Err(SigningError::MissingPubkeyRef),
    };
    map.insert("pubkey_ref".to_string(), json!(settled));
    Ok(settled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_accepts_keypair_bytes() {
        let key = SigningKey::from_bytes(&[9u8; 32]);
        let pair = STANDARD.encode(key.to_keypair_bytes());
        let seed = SecretSeed::from_base64(&pair).unwrap();
        assert_eq!(
            seed.public_key_base64(),
            STANDARD.encode(key.verifying_key().to_bytes())
        );
    }

    #[test]
    fn seed_rejects_wrong_length() {
        let err = SecretSeed::from_base64(&STANDARD.encode([1u8; 16])).unwrap_err();
        assert!(matches!(err, SigningError::MalformedSecretKey(_)));
    }

    #[test]
    fn seed_debug_is_redacted() {
        let seed = SecretSeed::from_bytes([3u8; 32]);
        assert_eq!(format!("{:?}", seed), "SecretSeed(<redacted>)");
    }

    #[test]
    fn base64_seed_matches_raw_seed() {
        let raw = SecretSeed::from_bytes([5u8; 32]);
        let decoded = SecretSeed::from_base64(&format!("{}\n", STANDARD.encode([5u8; 32]))).unwrap();
        assert_eq!(decoded.public_key_base64(), raw.public_key_base64());
        assert_eq!(&decoded.0[..], &[5u8; 32]);
    }

    #[test]
    fn emission_ms_is_derived_only_when_absent() {
        let mut map = json!({
            "timestamps": {
                "finality_at": "2025-01-01T00:00:01Z",
                "receipt_emitted_at": "2025-01-01T00:00:01.250Z"
            }
        })
        .as_object()
        .cloned()
        .unwrap();
        derive_emission_ms(&mut map).unwrap();
        assert_eq!(map["receipt_emission_ms"], json!(250));

        map.insert("receipt_emission_ms".to_string(), json!(7));
        derive_emission_ms(&mut map).unwrap();
        assert_eq!(map["receipt_emission_ms"], json!(7));
    }

    #[test]
    fn pubkey_ref_must_agree() {
        let mut map = Map::new();
        map.insert("pubkey_ref".to_string(), json!("a"));
        let err = settle_pubkey_ref(&mut map, Some("b")).unwrap_err();
        assert!(matches!(err, SigningError::PubkeyRefMismatch { .. }));
        assert_eq!(settle_pubkey_ref(&mut map, None).unwrap(), "a");

        let mut empty = Map::new();
        assert!(matches!(
            settle_pubkey_ref(&mut empty, None),
            Err(SigningError::MissingPubkeyRef)
        ));
    }
}
