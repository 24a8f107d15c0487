//! pdfgrid-parse: document loading and content stream interpretation.
//!
//! [`load_document`] turns PDF bytes into an immutable [`Document`] of
//! [`PageSource`]s (content bytes, fonts and form XObjects resolved);
//! [`interpret_page`] turns one page source into a
//! [`Page`](pdfgrid_core::Page) of positioned primitives. The two stages are
//! separate so pages can be interpreted in parallel once loading succeeded.

pub mod cmap;
pub mod document;
pub mod error;
pub mod font;
pub mod font_metrics;
pub mod interpreter;
pub mod lopdf_backend;
pub mod tokenizer;

pub use document::{Document, FormXObject, PageSource, Resources};
pub use error::BackendError;
pub use font::FontInfo;
pub use interpreter::{InterpretOptions, interpret_page};
pub use lopdf_backend::{MAX_FORM_DEPTH, load_document};
pub use pdfgrid_core;
