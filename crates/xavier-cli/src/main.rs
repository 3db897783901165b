//! Xavier CLI - receipt verification, issuance, and canonical-form tooling.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod output;
mod path;

use commands::{canonicalize, hashes, sign, verify};

/// Environment variable consulted before `RUST_LOG`.
const LOG_ENV: &str = "XAVIER_LOG";

#[derive(Parser)]
#[command(name = "xavier")]
#[command(about = "Xavier settlement receipt verification and signing CLI")]
#[command(version)]
struct Cli {
    /// Log at debug level (overrides XAVIER_LOG / RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify receipts: schema, invariants, hash anchor, signature
    Verify(verify::VerifyArgs),
    /// Sign draft receipts in place
    Sign(sign::SignArgs),
    /// Show canonical bytes for input JSON
    Canonicalize {
        /// Input JSON file (or stdin if not provided)
        input: Option<String>,
        /// Print the signed payload: the document without `signature`
        #[arg(long)]
        payload: bool,
    },
    /// List the expected hash anchor of each receipt
    Hashes {
        /// Receipt file or directory of receipts
        path: String,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV)
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Verify(args) => verify::run(args),
        Commands::Sign(args) => sign::run(args),
        Commands::Canonicalize { input, payload } => canonicalize::run(input, payload),
        Commands::Hashes { path } => hashes::run(path),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
