//! Verify command implementation.

use crate::error::CliError;
use crate::{output, path};
use clap::Args;
use std::path::PathBuf;
use xavier_core::{
    run_batch, BatchOptions, PubkeyResolver, ReceiptSchema, SetupError, SignatureCheck,
    TrustMapping, VerificationContext,
};

/// Default location of the receipt schema document.
pub const DEFAULT_SCHEMA: &str = "schemas/receipt.schema.v1.1.json";

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Receipt file or directory of receipts
    #[arg(long)]
    pub path: String,
    /// Base64 Ed25519 public key used for every receipt
    #[arg(long, conflicts_with = "skip_sig")]
    pub pubkey: Option<String>,
    /// JSON file mapping pubkey_ref to base64 public keys (ignored with --pubkey or --skip-sig)
    #[arg(long, env = "XAVIER_PUBKEYS_FILE")]
    pub pubkeys_file: Option<PathBuf>,
    /// Skip hash anchor and signature checks (schema + invariants only)
    #[arg(long)]
    pub skip_sig: bool,
    /// Require and recompute hash_anchor
    #[arg(long)]
    pub strict: bool,
    /// Pass only if exactly N receipts are valid
    #[arg(long, value_name = "N")]
    pub expect: Option<usize>,
    /// Append p95 emission latency and coverage to the summary line
    #[arg(long)]
    pub summary: bool,
    /// Report how many valid receipts reach this emission latency
    #[arg(long, value_name = "MS")]
    pub slo_ms: Option<i64>,
    /// Receipt schema document. The default is relative to the current
    /// directory, so pass --schema or set XAVIER_SCHEMA outside the repo root
    #[arg(long, env = "XAVIER_SCHEMA", default_value = DEFAULT_SCHEMA)]
    pub schema: PathBuf,
    /// Verify with N worker threads
    #[arg(long, value_name = "N", default_value_t = 1)]
    pub jobs: usize,
    /// Output a JSON report instead of status lines
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: VerifyArgs) -> Result<(), Box<dyn std::error::Error>> {
    // Setup failures abort before any receipt is read
    let signatures = signature_check(&args)?;
    let schema = ReceiptSchema::load(&args.schema)?;
    let files = path::expand_receipts(&args.path)?;
    let ctx = VerificationContext::new(schema, signatures, args.strict);

    let options = BatchOptions {
        expected_valid: args.expect,
        slo_ms: args.slo_ms,
        workers: args.jobs,
    };
    let summary = run_batch(&files, &ctx, &options)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&output::report_json(&summary))?);
    } else {
        for status in &summary.statuses {
            println!("{}", output::format_status(status));
        }
        println!(
            "{}",
            output::format_summary(&summary, args.summary || args.slo_ms.is_some())
        );
    }

    if summary.passed() {
        return Ok(());
    }
    let failure = match summary.expected_valid {
        Some(expected) => CliError::ExpectedCount {
            expected,
            valid: summary.valid_count,
        },
        None => CliError::InvalidReceipts {
            invalid: summary.invalid_count,
            total: summary.total(),
        },
    };
    Err(failure.into())
}

fn signature_check(args: &VerifyArgs) -> Result<SignatureCheck, SetupError> {
    if args.skip_sig {
        tracing::debug!("signature checks skipped");
        return Ok(SignatureCheck::Skip);
    }
    if let Some(key) = &args.pubkey {
        return Ok(SignatureCheck::Verify(PubkeyResolver::Override(
            key.trim().to_string(),
        )));
    }
    match &args.pubkeys_file {
        Some(file) => Ok(SignatureCheck::Verify(PubkeyResolver::Mapping(
            TrustMapping::load(file)?,
        ))),
        None => Err(SetupError::MissingTrustSource),
    }
}
