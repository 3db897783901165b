//! Sign command implementation.

use crate::error::CliError;
use crate::path;
use clap::Args;
use serde_json::Value;
use std::path::{Path, PathBuf};
use xavier_canonical::Canonicalizer;
use xavier_core::{SecretSeed, Signer, SigningOptions};

/// Default location of the coordinator secret key.
pub const DEFAULT_SECRET: &str = "keys/coordinator_v1_ed25519.secret";

#[derive(Args, Debug)]
pub struct SignArgs {
    /// Base64 Ed25519 secret key file (32-byte seed or 64-byte keypair)
    #[arg(long, env = "XAVIER_SECRET_KEY", default_value = DEFAULT_SECRET)]
    pub secret: PathBuf,
    /// Receipt file or directory of receipts, rewritten in place
    #[arg(long)]
    pub path: String,
    /// pubkey_ref to embed (defaults to the receipt's own pubkey_ref)
    #[arg(long)]
    pub pubkey_ref: Option<String>,
    /// Do not embed hash_anchor
    #[arg(long)]
    pub no_anchor: bool,
}

pub fn run(args: SignArgs) -> Result<(), Box<dyn std::error::Error>> {
    let files = path::expand_receipts(&args.path)?;
    let seed = SecretSeed::load(&args.secret)?;
    let signer = Signer::new(
        Canonicalizer::new(),
        SigningOptions {
            embed_hash_anchor: !args.no_anchor,
        },
    );

    let mut failed = 0;
    for file in &files {
        let name = path::display_name(file);
        match sign_file(file, &signer, &seed, args.pubkey_ref.as_deref()) {
            Ok(()) => println!("Signed {}", name),
            Err(e) => {
                failed += 1;
                eprintln!("FAIL: {} - {}", name, e);
            }
        }
    }

    if failed > 0 {
        return Err(CliError::SigningFailed {
            failed,
            total: files.len(),
        }
        .into());
    }
    Ok(())
}

fn sign_file(
    file: &Path,
    signer: &Signer,
    seed: &SecretSeed,
    pubkey_ref: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(file)?;
    let draft: Value = serde_json::from_str(&text).map_err(|e| format!("Invalid JSON: {}", e))?;
    let signed = signer.sign(&draft, seed, pubkey_ref)?;

    let mut rendered = serde_json::to_string_pretty(&signed)?;
    rendered.push('\n');
    std::fs::write(file, rendered)?;
    Ok(())
}
