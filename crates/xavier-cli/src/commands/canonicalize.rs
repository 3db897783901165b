//! Canonicalize command implementation.

use serde_json::Value;
use std::io::{self, Read};
use xavier_canonical::{signing_payload, Canonicalizer};

pub fn run(input: Option<String>, payload: bool) -> Result<(), Box<dyn std::error::Error>> {
    let canonicalizer = Canonicalizer::new();

    // Read JSON from file or stdin
    let json_str = if let Some(path) = input {
        std::fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read file {}: {}", path, e))?
    } else {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    };

    let value: Value =
        serde_json::from_str(&json_str).map_err(|e| format!("Invalid JSON: {}", e))?;
    let value = if payload {
        signing_payload(&value)?
    } else {
        value
    };

    let bytes = canonicalizer
        .canonicalize(&value)
        .map_err(|e| format!("Canonicalization failed: {}", e))?;

    println!("{}", String::from_utf8(bytes)?);
    Ok(())
}
