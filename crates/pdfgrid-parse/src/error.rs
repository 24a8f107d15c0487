//! Error types for the loader and interpreter layers.
//!
//! Uses [`thiserror`] for derivation. [`BackendError`] converts into
//! [`PdfError`]: document-level when the document is being loaded, page-level
//! via [`BackendError::for_page`] once a page is being interpreted.

use pdfgrid_core::PdfError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    /// Document structure could not be parsed or resolved.
    #[error("PDF parse error: {0}")]
    Parse(String),

    /// A content stream uses a filter the loader cannot decode.
    #[error("unsupported filter: {0}")]
    UnsupportedFilter(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Font or encoding information could not be resolved.
    #[error("font error: {0}")]
    Font(String),

    /// Malformed content stream.
    #[error("interpreter error: {0}")]
    Interpreter(String),

    #[error(transparent)]
    Core(#[from] PdfError),
}

impl BackendError {
    /// Classify an error raised while working on one page.
    ///
    /// Timeouts and cancellation pass through unchanged; everything else
    /// becomes a page-level extraction error.
    pub fn for_page(self, page: usize) -> PdfError {
        match self {
            BackendError::Core(e) => e,
            other => PdfError::PageExtraction {
                page,
                message: other.to_string(),
            },
        }
    }
}

impl From<BackendError> for PdfError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Parse(msg) | BackendError::Font(msg) | BackendError::Interpreter(msg) => {
                PdfError::ParseError(msg)
            }
            BackendError::UnsupportedFilter(name) => PdfError::UnsupportedFilter(name),
            BackendError::Io(e) => PdfError::IoError(e.to_string()),
            BackendError::Core(e) => e,
        }
    }
}
