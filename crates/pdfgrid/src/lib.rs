//! pdfgrid: text blocks and tables from PDF documents.
//!
//! This is the public API facade. It re-exports the model from
//! `pdfgrid-core`, loads and interprets documents with `pdfgrid-parse`, and
//! coordinates per-page extraction.
//!
//! # Architecture
//!
//! - **pdfgrid-core**: page model, line/word assembly, table detection, layout
//! - **pdfgrid-parse**: document loading and content stream interpretation
//! - **pdfgrid** (this crate): the parallel, failure-isolating coordinator
//!
//! ```no_run
//! use pdfgrid::{ExtractOptions, Extractor};
//!
//! let bytes = std::fs::read("report.pdf")?;
//! let extractor = Extractor::new(ExtractOptions::default())?;
//! let result = extractor.extract(&bytes);
//! for (page, rows) in result.tables() {
//!     println!("page {page}: {} rows", rows.len());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod extractor;
pub mod persist;

pub use extractor::{Extractor, extract};
pub use persist::{is_valid_doc_id, to_json, write_result};

pub use pdfgrid_core;
pub use pdfgrid_core::{
    BBox, Block, BlockKind, CancelToken, DocumentStatus, ExtractOptions, ExtractionResult,
    LayoutOptions, PageResult, PageWords, PdfError, SearchOptions, Table, TableSettings,
    TableStrategy, TextBlock, TextLine, TimeoutScope, Word, WordMatch, WordOptions, search_words,
};
pub use pdfgrid_parse;
