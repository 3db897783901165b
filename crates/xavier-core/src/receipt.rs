//! Typed view over a receipt document.
//!
//! The raw `serde_json::Value` remains the source of truth for hashing and
//! signing; these types only exist so invariants can be evaluated without
//! poking at untyped JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use xavier_canonical::payload::SIGNATURE_FIELD;

use crate::errors::ReceiptError;

/// Directional separator that joins the two corridor endpoints.
pub const CORRIDOR_SEPARATOR: char = '↔';
/// The only signature algorithm receipts may carry.
pub const ED25519_ALG: &str = "ed25519";

/// One side of a settlement.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Participant {
    /// Identifier, unique within the receipt.
    pub entity_id: String,
    /// Settled amount in cents.
    pub notional_cents: i64,
    /// Fee in basis points, `0..=100`.
    pub fee_bps: f64,
}

/// Lifecycle instants of the settlement, all UTC.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Timestamps {
    /// When the settlement was first observed.
    #[serde(deserialize_with = "deserialize_instant")]
    pub observed_at: DateTime<Utc>,
    /// When the settlement reached finality.
    #[serde(deserialize_with = "deserialize_instant")]
    pub finality_at: DateTime<Utc>,
    /// When the receipt was emitted.
    #[serde(deserialize_with = "deserialize_instant")]
    pub receipt_emitted_at: DateTime<Utc>,
}

impl Timestamps {
    /// Milliseconds between finality and receipt emission.
    pub fn emission_delta_ms(&self) -> i64 {
        (self.receipt_emitted_at - self.finality_at).num_milliseconds()
    }
}

/// Typed receipt fields that participate in invariant checking.
///
/// Fields not listed here are still covered by the hash anchor and the
/// signature because those are computed over the raw document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Receipt {
    /// Directional pairing of the two settlement endpoints.
    pub corridor: String,
    /// Exactly two participants on a valid receipt.
    pub participants: Vec<Participant>,
    /// Lifecycle instants.
    pub timestamps: Timestamps,
    /// Emission latency, supplied or derived at signing time.
    #[serde(default)]
    pub receipt_emission_ms: Option<i64>,
    /// Trust-mapping entry of the signing key.
    #[serde(default)]
    pub pubkey_ref: Option<String>,
    /// Lowercase hex SHA-256 of the canonical payload.
    #[serde(default)]
    pub hash_anchor: Option<String>,
    /// Present when the settlement had an incident.
    #[serde(default)]
    pub incident_code: Option<String>,
    /// Schema version the receipt was produced against.
    #[serde(default)]
    pub schema_version: Option<String>,
}

impl Receipt {
    /// Builds the typed view of a receipt document.
    ///
    /// # Errors
    ///
    /// Returns [`ReceiptError::SchemaViolation`] when a field has the wrong
    /// type or a timestamp is not RFC 3339.
    pub fn from_value(value: &Value) -> Result<Self, ReceiptError> {
        Receipt::deserialize(value).map_err(|e| ReceiptError::SchemaViolation(e.to_string()))
    }

    /// Whether the receipt counts as clean for coverage metrics.
    pub fn is_clean(&self) -> bool {
        self.incident_code.is_none()
    }
}

/// Signature envelope attached by the signer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureEnvelope {
    /// Always `ed25519` on receipts this crate issues.
    pub alg: String,
    /// Trust-mapping entry of the signing key.
    pub pubkey_ref: String,
    /// Base64 of the 64-byte Ed25519 signature.
    pub sig: String,
}

impl SignatureEnvelope {
    /// Extracts the envelope from a receipt document.
    ///
    /// # Errors
    ///
    /// Returns [`ReceiptError::MalformedSignature`] if the field is absent or
    /// does not have the `{alg, pubkey_ref, sig}` shape.
    pub fn from_receipt(receipt: &Value) -> Result<Self, ReceiptError> {
        let raw = receipt
            .get(SIGNATURE_FIELD)
            .ok_or_else(|| ReceiptError::MalformedSignature("signature missing".to_string()))?;
        SignatureEnvelope::deserialize(raw)
            .map_err(|e| ReceiptError::MalformedSignature(e.to_string()))
    }
}

/// Parses an RFC 3339 instant and normalizes it to UTC.
pub fn parse_instant(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value).map(|dt| dt.with_timezone(&Utc))
}

fn deserialize_instant<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_instant(&raw).map_err(|e| serde::de::Error::custom(format!("{raw}: {e}")))
}
