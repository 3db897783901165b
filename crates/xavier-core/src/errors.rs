//! Error taxonomy: per-record failures, run-level setup failures, issuance failures.

use thiserror::Error;
use xavier_canonical::PayloadError;

/// Business-rule violation found by the invariant checker.
///
/// Checks run in a fixed order and stop at the first failure, so the
/// variant reported is the field the auditor needs fixed first.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// `observed_at <= finality_at <= receipt_emitted_at` does not hold.
    #[error("timestamp order invalid")]
    TimestampOrder,
    /// `receipt_emission_ms` is negative or disagrees with the timestamps.
    #[error("receipt_emission_ms invalid: {0}")]
    EmissionLatency(String),
    /// Corridor is missing the directional separator or an endpoint.
    #[error("corridor must contain ↔ between two endpoints")]
    CorridorFormat,
    /// Receipt does not carry exactly two participants.
    #[error("participants must be length=2 (got {0})")]
    ParticipantCount(usize),
    /// Both participants share an `entity_id`.
    #[error("entity_ids must differ ({0})")]
    DuplicateParticipant(String),
    /// A participant has a negative `notional_cents`.
    #[error("notional_cents must be integer >= 0 ({0})")]
    NotionalRange(String),
    /// A participant's `fee_bps` lies outside `[0, 100]`.
    #[error("fee_bps out of range")]
    FeeRange,
}

impl InvariantViolation {
    /// Stable code for the violated rule.
    pub fn code(&self) -> &'static str {
        match self {
            InvariantViolation::TimestampOrder => "TimestampOrder",
            InvariantViolation::EmissionLatency(_) => "EmissionLatency",
            InvariantViolation::CorridorFormat => "CorridorFormat",
            InvariantViolation::ParticipantCount(_) => "ParticipantCount",
            InvariantViolation::DuplicateParticipant(_) => "DuplicateParticipant",
            InvariantViolation::NotionalRange(_) => "NotionalRange",
            InvariantViolation::FeeRange => "FeeRange",
        }
    }
}

/// Per-record verification failure.
///
/// The `Display` output is the reason printed on the record's status line.
/// None of these abort a batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReceiptError {
    /// The record could not be read from its source.
    #[error("unreadable: {0}")]
    Unreadable(String),
    /// Structural validation failed (unparseable JSON, schema, typed view).
    #[error("schema violation: {0}")]
    SchemaViolation(String),
    /// A business rule does not hold.
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
    /// Strict mode requires a hash anchor and none is present.
    #[error("hash_anchor missing")]
    MissingHashAnchor,
    /// The stored hash anchor is not 64 lowercase hex characters.
    #[error("hash_anchor malformed: {0}")]
    MalformedHashAnchor(String),
    /// The stored hash anchor differs from the recomputed digest.
    #[error("hash_anchor mismatch")]
    HashMismatch,
    /// Signature envelope, signature bytes or public key cannot be decoded.
    #[error("malformed signature: {0}")]
    MalformedSignature(String),
    /// Ed25519 verification rejected the signature.
    #[error("signature invalid")]
    InvalidSignature,
    /// The trust mapping has no entry for the reference.
    #[error("pubkey_ref {0} not found")]
    UnknownKeyRef(String),
}

impl ReceiptError {
    /// Stable taxonomy code for machine-readable reports.
    pub fn code(&self) -> &'static str {
        match self {
            ReceiptError::Unreadable(_) => "Unreadable",
            ReceiptError::SchemaViolation(_) => "SchemaViolation",
            ReceiptError::Invariant(violation) => violation.code(),
            ReceiptError::MissingHashAnchor
            | ReceiptError::MalformedHashAnchor(_)
            | ReceiptError::HashMismatch => "HashMismatch",
            ReceiptError::MalformedSignature(_) => "MalformedSignature",
            ReceiptError::InvalidSignature => "InvalidSignature",
            ReceiptError::UnknownKeyRef(_) => "UnknownKeyRef",
        }
    }
}

impl From<PayloadError> for ReceiptError {
    fn from(err: PayloadError) -> Self {
        ReceiptError::SchemaViolation(err.to_string())
    }
}

/// Run-level failure. Raised before any record enters the pipeline and
/// aborts the whole run.
#[derive(Error, Debug)]
pub enum SetupError {
    /// Schema document could not be read or parsed.
    #[error("schema {path} unreadable: {reason}")]
    SchemaUnreadable {
        /// Location of the schema document.
        path: String,
        /// Underlying failure.
        reason: String,
    },
    /// Schema document is not a valid JSON Schema.
    #[error("schema {path} invalid: {reason}")]
    SchemaInvalid {
        /// Location of the schema document.
        path: String,
        /// Compiler message.
        reason: String,
    },
    /// Trust mapping file could not be read or parsed.
    #[error("trust mapping {path} unreadable: {reason}")]
    TrustMappingUnreadable {
        /// Location of the trust mapping.
        path: String,
        /// Underlying failure.
        reason: String,
    },
    /// Trust mapping is not an object of string values.
    #[error("trust mapping {path} invalid: {reason}")]
    TrustMappingInvalid {
        /// Location of the trust mapping.
        path: String,
        /// What is wrong with it.
        reason: String,
    },
    /// Signature checking was requested without a key source.
    #[error("no pubkey provided; use --pubkey or --pubkeys-file or --skip-sig")]
    MissingTrustSource,
    /// The input path expanded to zero receipts.
    #[error("no receipts found in {0}")]
    NoReceipts(String),
    /// The bounded worker pool could not be created.
    #[error("worker pool: {0}")]
    WorkerPool(String),
}

/// Issuance failure.
#[derive(Error, Debug)]
pub enum SigningError {
    /// Secret key file could not be read.
    #[error("secret key {path} unreadable: {reason}")]
    SecretKeyUnreadable {
        /// Location of the secret key file.
        path: String,
        /// Underlying failure.
        reason: String,
    },
    /// Secret key material is not base64 of a 32-byte seed or 64-byte keypair.
    #[error("malformed secret key: {0}")]
    MalformedSecretKey(String),
    /// Draft receipt is not a JSON object.
    #[error("receipt must be a JSON object")]
    NotAnObject,
    /// Neither the caller nor the draft names a pubkey_ref.
    #[error("pubkey_ref missing; pass --pubkey-ref or set it in the receipt")]
    MissingPubkeyRef,
    /// The draft's pubkey_ref is not a string.
    #[error("pubkey_ref must be a string")]
    InvalidPubkeyRef,
    /// The draft names a different pubkey_ref than the caller.
    #[error("pubkey_ref mismatch: receipt has {receipt}, signing as {requested}")]
    PubkeyRefMismatch {
        /// Reference already embedded in the draft.
        receipt: String,
        /// Reference requested by the caller.
        requested: String,
    },
    /// A timestamp needed to derive `receipt_emission_ms` is malformed.
    #[error("timestamp {field} invalid: {reason}")]
    Timestamp {
        /// Timestamp field name.
        field: &'static str,
        /// Parser message.
        reason: String,
    },
    /// Canonicalization failed.
    #[error("canonicalization failed: {0}")]
    Canonicalization(#[from] PayloadError),
}
