use serde_json::{Map, Number, Value};
use std::fmt;

/// Error returned when canonicalization fails.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CanonicalizationError {
    /// A number that has no exact canonical rendering.
    #[error("non-finite number detected at {0}")]
    NonFiniteNumber(String),
    /// A number that serde_json could not expose as an integer or float.
    #[error("unrepresentable number at {0}")]
    UnrepresentableNumber(String),
}

/// Helper for building JSON paths in error messages.
#[derive(Debug, Clone)]
struct Path {
    segments: Vec<String>,
}

impl Path {
    fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    fn push_field(&self, field: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(field.to_string());
        Self { segments }
    }

    fn push_index(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(format!("[{}]", index));
        Self { segments }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            write!(f, "root")
        } else {
            write!(f, "{}", self.segments.join("."))
        }
    }
}

/// Canonicalizer that emits deterministic bytes for a JSON value tree.
///
/// Encoding rules:
/// - object keys sorted by the byte order of their UTF-8 encoding
/// - no whitespace between tokens
/// - integers in plain decimal; floats with an integral value render as
///   integers, all other floats use the shortest round-trip decimal form
///   without exponent notation; `-0.0` renders as `0`
/// - strings are emitted raw as UTF-8, escaping only `"`, `\` and control
///   characters below U+0020
///
/// Two value trees that are logically equal produce identical bytes
/// regardless of the key order they were built with.
#[derive(Debug, Clone, Copy, Default)]
pub struct Canonicalizer;

impl Canonicalizer {
    /// Creates a new canonicalizer.
    pub fn new() -> Self {
        Self
    }

    /// Produces the canonical bytes for `value`.
    ///
    /// # Errors
    ///
    /// Returns [`CanonicalizationError::NonFiniteNumber`] if any number in the
    /// tree is NaN or infinite. Nothing is emitted in that case.
    pub fn canonicalize(&self, value: &Value) -> Result<Vec<u8>, CanonicalizationError> {
        let mut out = String::new();
        self.encode(value, Path::root(), &mut out)?;
        Ok(out.into_bytes())
    }

    #[allow(clippy::only_used_in_recursion)]
    fn encode(
        &self,
        value: &Value,
        path: Path,
        out: &mut String,
    ) -> Result<(), CanonicalizationError> {
        match value {
            Value::Null => out.push_str("null"),
            Value::Bool(true) => out.push_str("true"),
            Value::Bool(false) => out.push_str("false"),
            Value::Number(num) => encode_number(num, &path, out)?,
            Value::String(s) => encode_string(s, out),
            Value::Array(items) => {
                out.push('[');
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        out.push(',');
                    }
                    self.encode(item, path.push_index(idx), out)?;
                }
                out.push(']');
            }
            Value::Object(map) => {
                out.push('{');
                for (idx, (key, child)) in sorted_entries(map).into_iter().enumerate() {
                    if idx > 0 {
                        out.push(',');
                    }
                    encode_string(key, out);
                    out.push(':');
                    self.encode(child, path.push_field(key), out)?;
                }
                out.push('}');
            }
        }
        Ok(())
    }
}

/// Canonicalizes `value` with the default [`Canonicalizer`].
pub fn canonicalize(value: &Value) -> Result<Vec<u8>, CanonicalizationError> {
    Canonicalizer::new().canonicalize(value)
}

// serde_json may be built with `preserve_order` by another crate in the
// graph, so the map's own iteration order is never trusted.
fn sorted_entries(map: &Map<String, Value>) -> Vec<(&String, &Value)> {
    let mut entries: Vec<_> = map.iter().collect();
    entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
    entries
}

fn encode_number(num: &Number, path: &Path, out: &mut String) -> Result<(), CanonicalizationError> {
    if let Some(n) = num.as_u64() {
        out.push_str(&n.to_string());
    } else if let Some(n) = num.as_i64() {
        out.push_str(&n.to_string());
    } else if let Some(f) = num.as_f64() {
        if !f.is_finite() {
            return Err(CanonicalizationError::NonFiniteNumber(path.to_string()));
        }
        if f == 0.0 {
            out.push('0');
        } else {
            // f64's Display is the shortest round-trip form and never uses
            // an exponent; integral values print without a fraction.
            out.push_str(&f.to_string());
        }
    } else {
        return Err(CanonicalizationError::UnrepresentableNumber(
            path.to_string(),
        ));
    }
    Ok(())
}

fn encode_string(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn encode(value: Value) -> String {
        String::from_utf8(canonicalize(&value).unwrap()).unwrap()
    }

    #[test]
    fn empty_containers_are_minimal() {
        assert_eq!(encode(json!({})), "{}");
        assert_eq!(encode(json!([])), "[]");
    }

    #[test]
    fn floats_never_use_exponent() {
        assert_eq!(encode(json!(1e-7)), "0.0000001");
        assert_eq!(encode(json!(1.5e21)), "1500000000000000000000");
        assert_eq!(encode(json!(12.50)), "12.5");
    }

    #[test]
    fn integral_floats_drop_the_fraction() {
        assert_eq!(encode(json!(5.0)), "5");
        assert_eq!(encode(json!(-0.0)), "0");
        assert_eq!(encode(json!(100.0)), "100");
    }

    #[test]
    fn error_path_names_the_offending_field() {
        let err = CanonicalizationError::NonFiniteNumber(
            Path::root().push_field("participants").push_index(1).to_string(),
        );
        assert_eq!(
            err.to_string(),
            "non-finite number detected at participants.[1]"
        );
    }
}
