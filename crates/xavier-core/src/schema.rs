//! Adapter over the external JSON Schema engine.

use jsonschema::Validator;
use serde_json::Value;
use std::fmt;
use std::path::Path;

use crate::errors::{ReceiptError, SetupError};

/// Top-level schema key naming the schema version receipts may pin.
const SCHEMA_VERSION_KEY: &str = "version";
/// Receipt field that pins a schema version.
const RECEIPT_SCHEMA_VERSION_KEY: &str = "schema_version";

/// Compiled receipt schema, loaded once per run and never mutated.
pub struct ReceiptSchema {
    validator: Validator,
    version: Option<String>,
}

impl fmt::Debug for ReceiptSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReceiptSchema")
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

impl ReceiptSchema {
    /// Compiles a schema document.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::SchemaInvalid`] if the document is not a valid
    /// JSON Schema.
    pub fn from_value(document: &Value, origin: &str) -> Result<Self, SetupError> {
        let validator =
            jsonschema::validator_for(document).map_err(|e| SetupError::SchemaInvalid {
                path: origin.to_string(),
                reason: e.to_string(),
            })?;
        let version = document
            .get(SCHEMA_VERSION_KEY)
            .and_then(Value::as_str)
            .map(str::to_string);
        Ok(Self { validator, version })
    }

    /// Reads and compiles a schema document from disk.
    pub fn load(path: &Path) -> Result<Self, SetupError> {
        let origin = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|e| SetupError::SchemaUnreadable {
            path: origin.clone(),
            reason: e.to_string(),
        })?;
        let document: Value =
            serde_json::from_str(&text).map_err(|e| SetupError::SchemaUnreadable {
                path: origin.clone(),
                reason: e.to_string(),
            })?;
        tracing::debug!(schema = %origin, "loaded receipt schema");
        Self::from_value(&document, &origin)
    }

    /// Version declared by the schema document, if any.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Validates a receipt document, reporting the first failing constraint.
    ///
    /// A receipt that pins a `schema_version` must match the loaded schema's
    /// declared version.
    pub fn validate(&self, receipt: &Value) -> Result<(), ReceiptError> {
        if let Some(error) = self.validator.iter_errors(receipt).next() {
            let location = error.instance_path.to_string();
            let reason = if location.is_empty() {
                error.to_string()
            } else {
                format!("{} at {}", error, location)
            };
            return Err(ReceiptError::SchemaViolation(reason));
        }

        let pinned = receipt
            .get(RECEIPT_SCHEMA_VERSION_KEY)
            .and_then(Value::as_str);
        if let (Some(pinned), Some(loaded)) = (pinned, self.version()) {
            if pinned != loaded {
                return Err(ReceiptError::SchemaViolation(format!(
                    "schema_version {} does not match loaded schema {}",
                    pinned, loaded
                )));
            }
        }
        Ok(())
    }
}
