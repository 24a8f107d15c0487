//! Extraction results and their serialized shape.

use crate::layout::{Block, BlockKind};

/// Outcome of a whole-document extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentStatus {
    /// Every extracted page succeeded.
    Success,
    /// At least one page failed; the others carry their blocks.
    PartialFailure { failed_pages: Vec<usize> },
    /// Nothing usable: the document did not load, timed out, or was cancelled.
    Failure { reason: String },
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Success => "success",
            DocumentStatus::PartialFailure { .. } => "partial_failure",
            DocumentStatus::Failure { .. } => "failure",
        }
    }
}

/// Blocks of one page, or the error that stopped it.
#[derive(Debug, Clone, PartialEq)]
pub struct PageResult {
    /// 0-based page index.
    pub index: usize,
    pub width: f64,
    pub height: f64,
    /// Blocks in reading order. Empty when `error` is set.
    pub blocks: Vec<Block>,
    pub error: Option<String>,
}

impl PageResult {
    pub fn ok(index: usize, width: f64, height: f64, blocks: Vec<Block>) -> Self {
        Self {
            index,
            width,
            height,
            blocks,
            error: None,
        }
    }

    pub fn failed(index: usize, error: impl Into<String>) -> Self {
        Self {
            index,
            width: 0.0,
            height: 0.0,
            blocks: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// Result of one `extract` call.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionResult {
    pub status: DocumentStatus,
    /// One entry per extracted page, in page order.
    pub pages: Vec<PageResult>,
    /// Pages left out by the `max_pages` limit.
    pub skipped_pages: Vec<usize>,
    /// Serialize block bounding boxes.
    pub include_bbox: bool,
}

impl ExtractionResult {
    /// A document-level failure with no pages.
    pub fn failure(reason: impl Into<String>) -> Self {
        Self {
            status: DocumentStatus::Failure {
                reason: reason.into(),
            },
            pages: Vec::new(),
            skipped_pages: Vec::new(),
            include_bbox: false,
        }
    }

    /// Derive the status from per-page outcomes.
    pub fn from_pages(mut pages: Vec<PageResult>, skipped_pages: Vec<usize>) -> Self {
        pages.sort_by_key(|p| p.index);
        let failed_pages: Vec<usize> = pages
            .iter()
            .filter(|p| p.error.is_some())
            .map(|p| p.index)
            .collect();
        let status = if failed_pages.is_empty() {
            DocumentStatus::Success
        } else {
            DocumentStatus::PartialFailure { failed_pages }
        };
        Self {
            status,
            pages,
            skipped_pages,
            include_bbox: false,
        }
    }

    pub fn with_bbox(mut self, include_bbox: bool) -> Self {
        self.include_bbox = include_bbox;
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == DocumentStatus::Success
    }

    /// Rows of every table, page by page.
    pub fn tables(&self) -> impl Iterator<Item = (usize, Vec<Vec<Option<String>>>)> + '_ {
        self.pages.iter().flat_map(|p| {
            p.blocks.iter().filter_map(move |b| match &b.kind {
                BlockKind::Table { table, .. } => Some((p.index, table.texts())),
                BlockKind::Text(_) => None,
            })
        })
    }
}

#[cfg(feature = "serde")]
mod ser {
    use serde::Serialize;

    use super::*;
    use crate::geometry::BBox;

    fn bbox_array(bbox: BBox) -> [f64; 4] {
        [bbox.x0, bbox.top, bbox.x1, bbox.bottom]
    }

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct ResultView<'a> {
        status: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        failed_pages: Option<&'a [usize]>,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<&'a str>,
        #[serde(skip_serializing_if = "<[usize]>::is_empty")]
        skipped_pages: &'a [usize],
        pages: Vec<PageView<'a>>,
    }

    #[derive(Serialize)]
    struct PageView<'a> {
        blocks: Vec<BlockView>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<&'a str>,
    }

    #[derive(Serialize)]
    #[serde(tag = "type", rename_all = "lowercase")]
    enum BlockView {
        Text {
            lines: Vec<String>,
            #[serde(skip_serializing_if = "Option::is_none")]
            bbox: Option<[f64; 4]>,
        },
        Table {
            rows: Vec<Vec<Option<String>>>,
            #[serde(skip_serializing_if = "Option::is_none")]
            bbox: Option<[f64; 4]>,
        },
    }

    fn block_view(block: &Block, include_bbox: bool) -> BlockView {
        let bbox = include_bbox.then(|| bbox_array(block.bbox()));
        match &block.kind {
            BlockKind::Text(t) => BlockView::Text {
                lines: t.lines.iter().map(|l| l.text()).collect(),
                bbox,
            },
            BlockKind::Table { table, .. } => BlockView::Table {
                rows: table.texts(),
                bbox,
            },
        }
    }

    impl Serialize for ExtractionResult {
        fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let (failed_pages, reason) = match &self.status {
                DocumentStatus::Success => (None, None),
                DocumentStatus::PartialFailure { failed_pages } => {
                    (Some(failed_pages.as_slice()), None)
                }
                DocumentStatus::Failure { reason } => (None, Some(reason.as_str())),
            };
            ResultView {
                status: self.status.as_str(),
                failed_pages,
                reason,
                skipped_pages: &self.skipped_pages,
                pages: self
                    .pages
                    .iter()
                    .map(|p| PageView {
                        blocks: p
                            .blocks
                            .iter()
                            .map(|b| block_view(b, self.include_bbox))
                            .collect(),
                        error: p.error.as_deref(),
                    })
                    .collect(),
            }
            .serialize(serializer)
        }
    }
}
