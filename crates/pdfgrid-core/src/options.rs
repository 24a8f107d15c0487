//! Extraction options.
//!
//! One immutable value carries every tolerance and limit through the
//! pipeline. [`ExtractOptions::validate`] rejects bad values up front;
//! nothing is silently clamped.

use crate::error::PdfError;
use crate::layout::LayoutOptions;
use crate::table::{TableSettings, TableStrategy};
use crate::words::WordOptions;

/// Options for one `extract` call.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default, deny_unknown_fields)
)]
pub struct ExtractOptions {
    /// Table detection strategy for every page.
    #[cfg_attr(feature = "serde", serde(alias = "tableStrategy"))]
    pub table_strategy: TableStrategy,
    /// Pages past this count are skipped, not extracted.
    #[cfg_attr(feature = "serde", serde(alias = "maxPages"))]
    pub max_pages: Option<usize>,
    /// Budget for a single page, in milliseconds.
    #[cfg_attr(feature = "serde", serde(alias = "perPageTimeoutMs"))]
    pub per_page_timeout_ms: Option<u64>,
    /// Budget for the whole document, in milliseconds.
    #[cfg_attr(feature = "serde", serde(alias = "documentTimeoutMs"))]
    pub document_timeout_ms: Option<u64>,
    /// User password for encrypted documents.
    pub password: Option<String>,
    /// Page worker threads. Defaults to the number of CPU cores.
    pub workers: Option<usize>,
    /// Include block bounding boxes in serialized output.
    #[cfg_attr(feature = "serde", serde(alias = "includeBbox"))]
    pub include_bbox: bool,
    pub words: WordOptions,
    pub tables: TableSettings,
    pub layout: LayoutOptions,
}

fn check_tolerance(name: &str, value: f64) -> Result<(), PdfError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(PdfError::Configuration(format!(
            "{name} must be a finite, non-negative number (got {value})"
        )))
    }
}

fn check_positive<T: PartialEq + Default + Copy>(name: &str, value: Option<T>) -> Result<(), PdfError> {
    if value.is_some_and(|v| v == T::default()) {
        return Err(PdfError::Configuration(format!("{name} must be at least 1")));
    }
    Ok(())
}

impl ExtractOptions {
    /// Reject options that cannot be honoured.
    pub fn validate(&self) -> Result<(), PdfError> {
        check_positive("max_pages", self.max_pages)?;
        check_positive("per_page_timeout_ms", self.per_page_timeout_ms)?;
        check_positive("document_timeout_ms", self.document_timeout_ms)?;
        check_positive("workers", self.workers)?;

        let w = &self.words;
        check_tolerance("words.x_tolerance", w.x_tolerance)?;
        check_tolerance("words.x_tolerance_ratio", w.x_tolerance_ratio)?;
        check_tolerance("words.y_tolerance", w.y_tolerance)?;
        check_tolerance("words.column_gap", w.column_gap)?;

        let t = &self.tables;
        check_tolerance("tables.snap_tolerance", t.snap_tolerance)?;
        check_tolerance("tables.join_tolerance", t.join_tolerance)?;
        check_tolerance("tables.intersection_tolerance", t.intersection_tolerance)?;
        check_tolerance("tables.edge_min_length", t.edge_min_length)?;
        check_tolerance("tables.text_x_tolerance", t.text_x_tolerance)?;
        check_tolerance("tables.text_row_tolerance", t.text_row_tolerance)?;
        if t.min_rows < 2 || t.min_columns < 2 {
            return Err(PdfError::Configuration(
                "tables.min_rows and tables.min_columns must be at least 2".to_string(),
            ));
        }

        let gap = self.layout.paragraph_gap_ratio;
        if !(gap.is_finite() && gap > 0.0) {
            return Err(PdfError::Configuration(format!(
                "layout.paragraph_gap_ratio must be positive (got {gap})"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejects(options: ExtractOptions, needle: &str) {
        match options.validate() {
            Err(PdfError::Configuration(msg)) => assert!(msg.contains(needle), "{msg}"),
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[test]
    fn defaults_are_valid() {
        assert!(ExtractOptions::default().validate().is_ok());
        assert_eq!(ExtractOptions::default().table_strategy, TableStrategy::Auto);
    }

    #[test]
    fn zero_limits_are_rejected() {
        rejects(
            ExtractOptions {
                max_pages: Some(0),
                ..Default::default()
            },
            "max_pages",
        );
        rejects(
            ExtractOptions {
                per_page_timeout_ms: Some(0),
                ..Default::default()
            },
            "per_page_timeout_ms",
        );
        rejects(
            ExtractOptions {
                workers: Some(0),
                ..Default::default()
            },
            "workers",
        );
    }

    #[test]
    fn bad_tolerances_are_rejected() {
        let mut options = ExtractOptions::default();
        options.words.y_tolerance = -1.0;
        rejects(options, "words.y_tolerance");

        let mut options = ExtractOptions::default();
        options.tables.snap_tolerance = f64::NAN;
        rejects(options, "tables.snap_tolerance");

        let mut options = ExtractOptions::default();
        options.tables.min_rows = 1;
        rejects(options, "min_rows");

        let mut options = ExtractOptions::default();
        options.layout.paragraph_gap_ratio = 0.0;
        rejects(options, "paragraph_gap_ratio");
    }

    #[test]
    fn large_max_pages_is_fine() {
        let options = ExtractOptions {
            max_pages: Some(usize::MAX),
            ..Default::default()
        };
        assert!(options.validate().is_ok());
    }
}
