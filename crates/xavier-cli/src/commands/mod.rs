//! Subcommand implementations.

pub mod canonicalize;
pub mod hashes;
pub mod sign;
pub mod verify;
