//! Utility functions for Amble.
//!
//! Small helpers shared across modules: guarded file reads for the JSON
//! data files and the one-decimal rounding used in score breakdowns.

use std::fs;
use std::path::Path;

use crate::error::{AmbleError, Result};

/// Maximum data file size that can be read into memory (10 MB).
///
/// Per-user JSON files stay tiny in normal use; the limit guards against
/// reading an unexpectedly large or corrupted file into memory.
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024; // 10 MB

/// Read a file into a string with size limit protection.
///
/// # Errors
///
/// Returns an error if the file cannot be read or exceeds `MAX_FILE_SIZE`.
pub fn read_to_string_limited(path: &Path) -> Result<String> {
    let metadata = fs::metadata(path).map_err(|e| AmbleError::storage(path, e))?;

    let size = metadata.len();
    if size > MAX_FILE_SIZE {
        return Err(AmbleError::store(format!(
            "data file {} is too large ({} bytes, max {} bytes)",
            path.display(),
            size,
            MAX_FILE_SIZE
        )));
    }

    fs::read_to_string(path).map_err(|e| AmbleError::storage(path, e))
}

/// Round to one decimal place, for reported score components.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_to_string_limited_success() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("checkins.json");
        fs::write(&path, "{\"entries\":[]}").unwrap();

        let content = read_to_string_limited(&path).unwrap();
        assert_eq!(content, "{\"entries\":[]}");
    }

    #[test]
    fn test_read_to_string_limited_nonexistent() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("missing.json");

        let result = read_to_string_limited(&path);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("storage error"));
    }

    #[test]
    fn test_round1() {
        assert_eq!(round1(15.1666), 15.2);
        assert_eq!(round1(4.3333), 4.3);
        assert_eq!(round1(10.0), 10.0);
        // f64::round goes half away from zero.
        assert_eq!(round1(-8.25), -8.3);
    }
}
