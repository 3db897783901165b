//! Canonical data primitives for Xavier settlement receipts.
//!
//! Every byte that is hashed or signed passes through this crate. Signers and
//! verifiers must share it verbatim: a divergence in key ordering, number
//! rendering or string escaping breaks every signature ever issued.
//!
#![deny(missing_docs)]

/// Canonical encoder for JSON value trees.
pub mod canonicalizer;
/// SHA-256 hash anchors.
pub mod digest;
/// Extraction of the signed/anchored payload from a receipt document.
pub mod payload;
/// Validation helpers used by canonical types.
pub mod validation;

pub use canonicalizer::{canonicalize, CanonicalizationError, Canonicalizer};
pub use digest::HashAnchor;
pub use payload::{
    anchor_payload, compute_hash_anchor, payload_bytes, signing_payload, PayloadError,
};
pub use validation::ValidationError;
