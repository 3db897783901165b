//! Batch verification orchestrator.
//!
//! The context (schema, key source, strictness) is built once per run and
//! shared read-only by every record. Records are verified independently;
//! a record failure produces a status and the batch continues.

use rayon::prelude::*;
use serde_json::Value;
use std::path::PathBuf;
use xavier_canonical::Canonicalizer;

use crate::errors::{ReceiptError, SetupError};
use crate::invariants;
use crate::receipt::Receipt;
use crate::schema::ReceiptSchema;
use crate::trust::PubkeyResolver;
use crate::verification::Verifier;

/// Percentile reported for emission latency.
pub const EMISSION_PERCENTILE: u32 = 95;

/// Whether and how signatures are checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureCheck {
    /// Verify hash anchor (strict mode) and signature with keys from the resolver.
    Verify(PubkeyResolver),
    /// Schema and invariants only.
    Skip,
}

/// Immutable per-run verification context.
#[derive(Debug)]
pub struct VerificationContext {
    schema: ReceiptSchema,
    signatures: SignatureCheck,
    strict: bool,
    verifier: Verifier,
}

/// Outcome of a record that passed every stage.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedReceipt {
    /// Supplied `receipt_emission_ms`, if any.
    pub emission_ms: Option<i64>,
    /// Whether the receipt has no incident code.
    pub clean: bool,
}

impl VerificationContext {
    /// Builds the context. `strict` enables hash-anchor recomputation; it has
    /// no effect when signatures are skipped.
    pub fn new(schema: ReceiptSchema, signatures: SignatureCheck, strict: bool) -> Self {
        Self {
            schema,
            signatures,
            strict,
            verifier: Verifier::new(Canonicalizer::new()),
        }
    }

    /// Runs parse, schema, invariants, hash anchor and signature over raw
    /// record bytes.
    pub fn verify_bytes(&self, bytes: &[u8]) -> Result<VerifiedReceipt, ReceiptError> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| ReceiptError::SchemaViolation(format!("invalid JSON: {e}")))?;
        self.verify_value(&value)
    }

    /// Runs schema, invariants, hash anchor and signature over a parsed
    /// record.
    pub fn verify_value(&self, value: &Value) -> Result<VerifiedReceipt, ReceiptError> {
        self.schema.validate(value)?;
        let receipt = Receipt::from_value(value)?;
        invariants::check(&receipt)?;
        tracing::trace!("schema and invariants passed");

        if let SignatureCheck::Verify(resolver) = &self.signatures {
            if self.strict {
                self.verifier.verify_hash_anchor(value)?;
            }
            self.verifier.verify_signature(value, resolver)?;
        }

        Ok(VerifiedReceipt {
            emission_ms: receipt.receipt_emission_ms,
            clean: receipt.is_clean(),
        })
    }
}

/// A record to verify.
pub trait ReceiptSource: Sync {
    /// Display name used on the status line.
    fn name(&self) -> String;
    /// Reads the raw record bytes.
    fn read(&self) -> std::io::Result<Vec<u8>>;
}

impl ReceiptSource for PathBuf {
    fn name(&self) -> String {
        self.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.display().to_string())
    }

    fn read(&self) -> std::io::Result<Vec<u8>> {
        std::fs::read(self)
    }
}

/// A record held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InMemoryReceipt {
    /// Display name.
    pub name: String,
    /// Raw JSON bytes.
    pub bytes: Vec<u8>,
}

impl InMemoryReceipt {
    /// Serializes `value` as a named record.
    pub fn from_value(name: impl Into<String>, value: &Value) -> Self {
        Self {
            name: name.into(),
            bytes: value.to_string().into_bytes(),
        }
    }
}

impl ReceiptSource for InMemoryReceipt {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn read(&self) -> std::io::Result<Vec<u8>> {
        Ok(self.bytes.clone())
    }
}

/// Verification status of one record.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordStatus {
    /// Record name.
    pub name: String,
    /// Verified outcome or the first failure.
    pub result: Result<VerifiedReceipt, ReceiptError>,
}

impl RecordStatus {
    /// Whether the record passed every stage.
    pub fn is_valid(&self) -> bool {
        self.result.is_ok()
    }

    /// `OK` or the human-readable failure reason.
    pub fn reason(&self) -> String {
        match &self.result {
            Ok(_) => "OK".to_string(),
            Err(e) => e.to_string(),
        }
    }
}

/// Batch knobs that do not affect per-record verification.
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Required number of valid records for the batch to pass.
    pub expected_valid: Option<usize>,
    /// Emission SLO in milliseconds, reported as a breach count only.
    pub slo_ms: Option<i64>,
    /// Worker pool size; `0` or `1` verifies sequentially.
    pub workers: usize,
}

/// Aggregate result of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSummary {
    /// Per-record statuses in input order.
    pub statuses: Vec<RecordStatus>,
    /// Records that passed.
    pub valid_count: usize,
    /// Records that failed.
    pub invalid_count: usize,
    /// Nearest-rank p95 of `receipt_emission_ms` over valid records.
    pub p95_emission_ms: Option<i64>,
    /// Valid records without an incident code.
    pub clean_count: usize,
    /// Valid records whose emission latency reached the SLO.
    pub slo_breaches: Option<usize>,
    /// Required valid count, if any.
    pub expected_valid: Option<usize>,
}

impl BatchSummary {
    /// Aggregates statuses. Counts and percentile depend only on the
    /// multiset of outcomes, not on their order.
    pub fn from_statuses(statuses: Vec<RecordStatus>, options: &BatchOptions) -> Self {
        let verified: Vec<&VerifiedReceipt> =
            statuses.iter().filter_map(|s| s.result.as_ref().ok()).collect();
        let latencies: Vec<i64> = verified.iter().filter_map(|v| v.emission_ms).collect();

        let valid_count = verified.len();
        let clean_count = verified.iter().filter(|v| v.clean).count();
        let slo_breaches = options
            .slo_ms
            .map(|slo| latencies.iter().filter(|&&ms| ms >= slo).count());

        Self {
            invalid_count: statuses.len() - valid_count,
            valid_count,
            p95_emission_ms: percentile_nearest_rank(&latencies, EMISSION_PERCENTILE),
            clean_count,
            slo_breaches,
            expected_valid: options.expected_valid,
            statuses,
        }
    }

    /// Total number of records.
    pub fn total(&self) -> usize {
        self.statuses.len()
    }

    /// Batch verdict: every record valid, or, when an expected count is
    /// given, exactly that many valid records.
    pub fn passed(&self) -> bool {
        match self.expected_valid {
            Some(expected) => self.valid_count == expected,
            None => self.invalid_count == 0,
        }
    }

    /// Share of valid records without an incident, in percent.
    pub fn coverage_pct(&self) -> Option<f64> {
        (self.valid_count > 0).then(|| 100.0 * self.clean_count as f64 / self.valid_count as f64)
    }
}

/// Nearest-rank percentile: the value at rank `ceil(pct/100 * n)` of the
/// sorted values. `pct` is clamped to `1..=100`.
pub fn percentile_nearest_rank(values: &[i64], pct: u32) -> Option<i64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let n = sorted.len();
    let pct = pct.clamp(1, 100) as usize;
    let rank = (pct * n).div_ceil(100).clamp(1, n);
    Some(sorted[rank - 1])
}

/// Verifies every record against `ctx` and aggregates the results.
///
/// # Errors
///
/// Only [`SetupError::WorkerPool`]; record failures are reported in the
/// summary.
pub fn run_batch<S: ReceiptSource>(
    sources: &[S],
    ctx: &VerificationContext,
    options: &BatchOptions,
) -> Result<BatchSummary, SetupError> {
    let statuses: Vec<RecordStatus> = if options.workers <= 1 {
        sources.iter().map(|s| verify_source(s, ctx)).collect()
    } else {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(options.workers)
            .build()
            .map_err(|e| SetupError::WorkerPool(e.to_string()))?;
        // indexed collect keeps input order
        pool.install(|| sources.par_iter().map(|s| verify_source(s, ctx)).collect())
    };

    let summary = BatchSummary::from_statuses(statuses, options);
    tracing::info!(
        valid = summary.valid_count,
        invalid = summary.invalid_count,
        p95_emission_ms = ?summary.p95_emission_ms,
        "batch verified"
    );
    Ok(summary)
}

fn verify_source<S: ReceiptSource>(source: &S, ctx: &VerificationContext) -> RecordStatus {
    let name = source.name();
    let result = source
        .read()
        .map_err(|e| ReceiptError::Unreadable(e.to_string()))
        .and_then(|bytes| ctx.verify_bytes(&bytes));
    match &result {
        Ok(_) => tracing::debug!(record = %name, "receipt verified"),
        Err(e) => tracing::warn!(record = %name, code = e.code(), reason = %e, "receipt rejected"),
    }
    RecordStatus { name, result }
}
