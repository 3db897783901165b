//! Receipt path expansion.

use std::io;
use std::path::{Path, PathBuf};
use xavier_core::SetupError;

/// Extension of receipt files picked up from a directory.
const RECEIPT_EXTENSION: &str = "json";

/// Expands `input` into receipt files.
///
/// A file is returned as-is. A directory yields its `*.json` entries
/// (non-recursive) sorted by file name.
pub fn expand_receipts(input: &str) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let path = Path::new(input);
    let metadata = std::fs::metadata(path)
        .map_err(|e| format!("Failed to access {}: {}", input, e))?;

    let files = if metadata.is_dir() {
        list_json_files(path).map_err(|e| format!("Failed to read directory {}: {}", input, e))?
    } else {
        vec![path.to_path_buf()]
    };

    if files.is_empty() {
        return Err(SetupError::NoReceipts(input.to_string()).into());
    }
    Ok(files)
}

fn list_json_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_json = path
            .extension()
            .map(|ext| ext == RECEIPT_EXTENSION)
            .unwrap_or(false);
        if is_json && entry.file_type()?.is_file() {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Display name of a receipt file.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn directory_expands_to_sorted_json_files() {
        let dir = TempDir::new().unwrap();
        for name in ["b.json", "a.json", "notes.txt"] {
            std::fs::write(dir.path().join(name), "{}").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.json")).unwrap();

        let files = expand_receipts(dir.path().to_str().unwrap()).unwrap();
        let names: Vec<String> = files.iter().map(|p| display_name(p)).collect();
        assert_eq!(names, vec!["a.json", "b.json"]);
    }

    #[test]
    fn empty_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = expand_receipts(dir.path().to_str().unwrap()).unwrap_err();
        assert!(err.to_string().starts_with("no receipts found"));
    }

    #[test]
    fn missing_path_is_an_error() {
        assert!(expand_receipts("/nonexistent/receipts").is_err());
    }
}
