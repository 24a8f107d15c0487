//! Error types for pdfgrid.
//!
//! [`PdfError`] covers every failure the pipeline can report. Some variants
//! are fatal to a whole document ([`PdfError::is_fatal`]), the rest are
//! isolated to a single page and recovered by the extraction coordinator.

use std::fmt;

/// Which deadline expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutScope {
    /// The per-page budget of one page.
    Page(usize),
    /// The whole-document budget.
    Document,
}

impl fmt::Display for TimeoutScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeoutScope::Page(index) => write!(f, "page {index}"),
            TimeoutScope::Document => f.write_str("document"),
        }
    }
}

/// Error types for PDF extraction.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfError {
    /// Malformed PDF structure or syntax.
    ParseError(String),
    /// The PDF is encrypted and no password was supplied.
    PasswordRequired,
    /// The supplied password does not open this encrypted PDF.
    InvalidPassword,
    /// A content stream uses a compression filter we cannot decode.
    UnsupportedFilter(String),
    /// A single page could not be extracted.
    PageExtraction {
        /// 0-based page index.
        page: usize,
        /// What went wrong.
        message: String,
    },
    /// A page or document deadline expired.
    Timeout(TimeoutScope),
    /// The caller cancelled the extraction.
    Cancelled,
    /// Invalid options, rejected before any work starts.
    Configuration(String),
    /// I/O error reading input or persisting output.
    IoError(String),
}

impl PdfError {
    /// Whether this error aborts the whole document.
    ///
    /// Page extraction failures and page timeouts are recoverable; every other
    /// variant ends extraction with no pages.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            PdfError::PageExtraction { .. } | PdfError::Timeout(TimeoutScope::Page(_))
        )
    }

    /// Short category label used in logs and CLI output.
    pub fn kind(&self) -> &'static str {
        match self {
            PdfError::ParseError(_)
            | PdfError::PasswordRequired
            | PdfError::InvalidPassword
            | PdfError::UnsupportedFilter(_) => "parse",
            PdfError::PageExtraction { .. } => "page",
            PdfError::Timeout(_) => "timeout",
            PdfError::Cancelled => "cancelled",
            PdfError::Configuration(_) => "configuration",
            PdfError::IoError(_) => "io",
        }
    }
}

impl fmt::Display for PdfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PdfError::ParseError(msg) => write!(f, "parse error: {msg}"),
            PdfError::PasswordRequired => write!(f, "PDF is encrypted and requires a password"),
            PdfError::InvalidPassword => write!(f, "the supplied password is incorrect"),
            PdfError::UnsupportedFilter(name) => {
                write!(f, "unsupported content stream filter: {name}")
            }
            PdfError::PageExtraction { page, message } => {
                write!(f, "page {page} extraction failed: {message}")
            }
            PdfError::Timeout(TimeoutScope::Document) => write!(f, "document timed out"),
            PdfError::Timeout(scope) => write!(f, "{scope} timed out"),
            PdfError::Cancelled => write!(f, "cancelled"),
            PdfError::Configuration(msg) => write!(f, "invalid configuration: {msg}"),
            PdfError::IoError(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl std::error::Error for PdfError {}

impl From<std::io::Error> for PdfError {
    fn from(err: std::io::Error) -> Self {
        PdfError::IoError(err.to_string())
    }
}
