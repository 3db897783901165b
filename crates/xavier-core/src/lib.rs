//! Receipt integrity engine for Xavier settlement receipts.
//!
//! This crate provides:
//! - A typed view over receipt documents and the schema gate
//! - Business-invariant checks (timestamps, corridor, participants, fees)
//! - Hash-anchor recomputation and Ed25519 signature verification
//! - Receipt issuance with the same canonical payload
//! - Batch orchestration with coverage and emission-latency metrics
//!
//! Core invariants:
//! - Hash anchor and signature both cover
//!   `canonical(receipt - signature - hash_anchor)`
//! - Verification never mutates a receipt
//! - A record failure never aborts a batch; setup failures abort before any
//!   record is read
//!
#![deny(missing_docs)]

/// Batch orchestration and summary metrics.
pub mod batch;
/// Error types for verification, setup and signing.
pub mod errors;
/// Business invariants over the typed receipt view.
pub mod invariants;
/// Typed receipt fields and the signature envelope.
pub mod receipt;
/// JSON Schema gate.
pub mod schema;
/// Receipt issuance.
pub mod signer;
/// Trust mapping and public key resolution.
pub mod trust;
/// Hash-anchor and signature verification.
pub mod verification;

pub use batch::{
    percentile_nearest_rank, run_batch, BatchOptions, BatchSummary, InMemoryReceipt,
    ReceiptSource, RecordStatus, SignatureCheck, VerificationContext, VerifiedReceipt,
};
pub use errors::{InvariantViolation, ReceiptError, SetupError, SigningError};
pub use receipt::{Participant, Receipt, SignatureEnvelope, Timestamps};
pub use schema::ReceiptSchema;
pub use signer::{SecretSeed, Signer, SigningOptions};
pub use trust::{decode_public_key, PubkeyResolver, TrustMapping};
pub use verification::Verifier;
