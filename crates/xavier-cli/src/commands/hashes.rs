//! Hashes command implementation.

use crate::path;
use serde_json::Value;
use xavier_canonical::{compute_hash_anchor, Canonicalizer};

/// Prints `<name> <hash anchor>` for every receipt under `input`.
pub fn run(input: String) -> Result<(), Box<dyn std::error::Error>> {
    let canonicalizer = Canonicalizer::new();

    for file in path::expand_receipts(&input)? {
        let name = path::display_name(&file);
        let text = std::fs::read_to_string(&file)
            .map_err(|e| format!("Failed to read file {}: {}", name, e))?;
        let receipt: Value =
            serde_json::from_str(&text).map_err(|e| format!("Invalid JSON in {}: {}", name, e))?;
        let anchor = compute_hash_anchor(&receipt, &canonicalizer)
            .map_err(|e| format!("Failed to hash {}: {}", name, e))?;
        println!("{} {}", name, anchor);
    }
    Ok(())
}
