//! pdfgrid-core: backend-independent model and algorithms.
//!
//! This crate holds the page model (chars, lines, rects, curves), text
//! assembly, table detection and layout reconstruction. It never touches PDF
//! bytes; `pdfgrid-parse` turns documents into [`Page`] values and `pdfgrid`
//! ties the two together.

pub mod alignment;
pub mod cancel;
pub mod dedupe;
pub mod edges;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod options;
pub mod path;
pub mod primitive;
pub mod result;
pub mod search;
pub mod shapes;
pub mod table;
pub mod text;
pub mod words;

pub use alignment::find_text_tables;
pub use cancel::{CancelToken, Deadline};
pub use dedupe::dedupe_chars;
pub use edges::{Edge, EdgeSource, Orientation, derive_edges};
pub use error::{PdfError, TimeoutScope};
pub use geometry::{BBox, Ctm, Point};
pub use layout::{Block, BlockKind, LayoutOptions, TextBlock, reconstruct};
pub use options::ExtractOptions;
pub use path::{PaintStyle, PaintedPath, Path, PathBuilder, PathSegment};
pub use primitive::{Page, Primitive};
pub use result::{DocumentStatus, ExtractionResult, PageResult};
pub use search::{PageWords, SearchOptions, WordMatch, search_words};
pub use shapes::{Curve, Line, LineOrientation, Rect, extract_shapes};
pub use table::{Cell, Table, TableFinder, TableSettings, TableStrategy};
pub use text::Char;
pub use words::{TextLine, Word, WordOptions, assemble_lines, extract_words};
