//! Writing results to disk.
//!
//! Persistence happens after extraction, outside the page workers: one
//! pretty-printed JSON file per document and nothing else.

use std::fs;
use std::path::{Path, PathBuf};

use pdfgrid_core::{ExtractionResult, PdfError};

/// Whether `doc_id` is safe to use as a file stem.
///
/// ASCII letters, digits, `-`, `_` and `.`, not starting with `.`.
pub fn is_valid_doc_id(doc_id: &str) -> bool {
    !doc_id.is_empty()
        && !doc_id.starts_with('.')
        && doc_id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
}

/// The serialized result, pretty-printed.
pub fn to_json(result: &ExtractionResult) -> Result<String, PdfError> {
    serde_json::to_string_pretty(result)
        .map_err(|e| PdfError::IoError(format!("cannot serialize result: {e}")))
}

/// Write `result` to `<dir>/<doc_id>.json`, creating `dir` if needed.
///
/// # Errors
///
/// [`PdfError::Configuration`] for an unusable `doc_id`,
/// [`PdfError::IoError`] when the file cannot be written.
pub fn write_result(dir: &Path, doc_id: &str, result: &ExtractionResult) -> Result<PathBuf, PdfError> {
    if !is_valid_doc_id(doc_id) {
        return Err(PdfError::Configuration(format!(
            "document id {doc_id:?} may only contain ASCII letters, digits, '-', '_' and '.', and must not start with '.'"
        )));
    }
    let mut json = to_json(result)?;
    json.push('\n');

    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{doc_id}.json"));
    fs::write(&path, json)?;
    tracing::debug!(path = %path.display(), "result written");
    Ok(path)
}
