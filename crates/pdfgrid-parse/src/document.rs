//! The loaded document: everything the interpreter needs per page, resolved
//! up front so pages can be interpreted independently on any thread.

use std::collections::HashMap;
use std::sync::Arc;

use pdfgrid_core::Ctm;

use crate::font::FontInfo;

/// Decoded content bytes, or why they could not be decoded.
///
/// A decode failure belongs to the page that uses the stream, so it is kept
/// here rather than failing the load.
pub type Content = Result<Vec<u8>, String>;

/// Named resources visible to a content stream.
#[derive(Debug, Clone, Default)]
pub struct Resources {
    pub fonts: HashMap<String, Arc<FontInfo>>,
    pub xobjects: HashMap<String, Arc<FormXObject>>,
}

impl Resources {
    pub fn font(&self, name: &str) -> Option<&Arc<FontInfo>> {
        self.fonts.get(name)
    }

    pub fn xobject(&self, name: &str) -> Option<&Arc<FormXObject>> {
        self.xobjects.get(name)
    }
}

/// A form XObject with its own content and resources.
#[derive(Debug, Clone)]
pub struct FormXObject {
    /// `/Matrix`, mapping form space to the user space of the invoking stream.
    pub matrix: Ctm,
    pub content: Content,
    /// Own resources; `None` means the invoking stream's resources apply.
    pub resources: Option<Resources>,
}

/// One page ready for interpretation.
#[derive(Debug, Clone)]
pub struct PageSource {
    /// 0-based page index.
    pub index: usize,
    pub width: f64,
    pub height: f64,
    /// Normalised MediaBox `[x0, y0, x1, y1]` in PDF user space.
    pub media_box: [f64; 4],
    /// All `/Contents` streams, concatenated.
    pub content: Content,
    pub resources: Resources,
}

impl PageSource {
    /// User space to top-left page space.
    pub fn base_ctm(&self) -> Ctm {
        let [x0, _, _, y1] = self.media_box;
        Ctm::new(1.0, 0.0, 0.0, -1.0, -x0, y1)
    }
}

/// A loaded document. Immutable once built.
#[derive(Debug, Clone)]
pub struct Document {
    /// Pages in the document, including ones not loaded.
    pub page_count: usize,
    /// Loaded pages in document order.
    pub pages: Vec<PageSource>,
}

impl Document {
    /// Indices of pages left out by a page limit.
    pub fn skipped_pages(&self) -> Vec<usize> {
        (self.pages.len()..self.page_count).collect()
    }
}
