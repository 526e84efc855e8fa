//! Readers for line-oriented and JSON artifacts.
//!
//! Text artifacts are decoded as UTF-8 with invalid bytes replaced, and
//! each line is trimmed; blank lines are dropped.

use crate::error::{FirmsimError, Result};
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::path::Path;

/// Trimmed, non-empty lines of a text file.
pub fn read_lines(path: &Path) -> Result<Vec<String>> {
    let bytes = std::fs::read(path).map_err(|e| FirmsimError::io(path, e))?;
    Ok(String::from_utf8_lossy(&bytes)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Distinct trimmed, non-empty lines of a text file.
pub fn read_line_set(path: &Path) -> Result<HashSet<String>> {
    read_lines(path).map(|lines| lines.into_iter().collect())
}

/// Like [`read_line_set`], but `None` when the file does not exist.
pub fn read_optional_line_set(path: &Path) -> Result<Option<HashSet<String>>> {
    if !path.is_file() {
        return Ok(None);
    }
    read_line_set(path).map(Some)
}

/// Deserialize a JSON artifact.
///
/// A missing file is a missing-artifact error and unparsable content a
/// malformed-artifact error; `what` names the artifact in messages.
pub fn load_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    if !path.is_file() {
        return Err(FirmsimError::missing_artifact(path, what));
    }
    let bytes = std::fs::read(path).map_err(|e| FirmsimError::io(path, e))?;
    serde_json::from_slice(&bytes).map_err(|e| FirmsimError::malformed_artifact(path, e.to_string()))
}
