//! The extraction coordinator.
//!
//! A document is loaded once, then its pages run through
//! interpret -> assemble lines -> detect tables -> reconstruct layout on a
//! rayon pool. Each page task is isolated: an error or a panic fails that page
//! only. Cancellation and the document deadline fail the whole call.

use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use pdfgrid_core::{
    Block, CancelToken, Deadline, ExtractOptions, ExtractionResult, PageResult, PageWords,
    PdfError, TableFinder, TimeoutScope, assemble_lines, extract_words, reconstruct,
};
use pdfgrid_parse::{InterpretOptions, PageSource, interpret_page, load_document};
use rayon::prelude::*;
use tracing::{debug, info, warn};

/// Extracts text blocks and tables from PDF documents.
///
/// Options are validated once in [`Extractor::new`]; the extractor owns its
/// page worker pool and can be reused for any number of documents.
pub struct Extractor {
    options: ExtractOptions,
    finder: TableFinder,
    interpret: InterpretOptions,
    pool: rayon::ThreadPool,
}

impl std::fmt::Debug for Extractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extractor")
            .field("options", &self.options)
            .field("workers", &self.pool.current_num_threads())
            .finish_non_exhaustive()
    }
}

/// Extract with `options`, reporting invalid options as a failed result.
pub fn extract(bytes: &[u8], options: &ExtractOptions) -> ExtractionResult {
    match Extractor::new(options.clone()) {
        Ok(extractor) => extractor.extract(bytes),
        Err(e) => ExtractionResult::failure(e.to_string()).with_bbox(options.include_bbox),
    }
}

/// Text for a document-level failure.
fn failure_reason(err: &PdfError) -> String {
    match err {
        PdfError::Timeout(TimeoutScope::Document) => "document timed out".to_string(),
        PdfError::Cancelled => "cancelled".to_string(),
        other => other.to_string(),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Assemble the result once every page task returned.
///
/// A cancel that lands after the last page still counts. The document
/// deadline does not: every page already finished in time.
fn finish(
    pages: Vec<PageResult>,
    skipped_pages: Vec<usize>,
    token: &CancelToken,
) -> Result<ExtractionResult, PdfError> {
    if token.is_cancelled() {
        return Err(PdfError::Cancelled);
    }
    Ok(ExtractionResult::from_pages(pages, skipped_pages))
}

impl Extractor {
    /// Validate `options` and start the page worker pool.
    ///
    /// # Errors
    ///
    /// [`PdfError::Configuration`] for invalid options or when the pool
    /// cannot be started.
    pub fn new(options: ExtractOptions) -> Result<Self, PdfError> {
        options.validate()?;
        let mut builder =
            rayon::ThreadPoolBuilder::new().thread_name(|i| format!("pdfgrid-page-{i}"));
        if let Some(workers) = options.workers {
            builder = builder.num_threads(workers);
        }
        let pool = builder
            .build()
            .map_err(|e| PdfError::Configuration(format!("cannot start page workers: {e}")))?;
        Ok(Self {
            finder: TableFinder::new(options.tables.clone(), options.words.clone()),
            interpret: InterpretOptions::default(),
            options,
            pool,
        })
    }

    /// Extract every page (up to `max_pages`) of a document.
    pub fn extract(&self, bytes: &[u8]) -> ExtractionResult {
        self.extract_with_cancel(bytes, &CancelToken::new())
    }

    /// Like [`Extractor::extract`], stopping early once `token` is cancelled.
    pub fn extract_with_cancel(&self, bytes: &[u8], token: &CancelToken) -> ExtractionResult {
        let started = Instant::now();
        let document_deadline = self
            .options
            .document_timeout_ms
            .map(|ms| started + Duration::from_millis(ms));

        let result = match self.run(bytes, document_deadline, token) {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, kind = e.kind(), "extraction failed");
                ExtractionResult::failure(failure_reason(&e))
            }
        }
        .with_bbox(self.options.include_bbox);

        info!(
            status = result.status.as_str(),
            pages = result.pages.len(),
            skipped = result.skipped_pages.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "extraction finished"
        );
        result
    }

    fn run(
        &self,
        bytes: &[u8],
        document_deadline: Option<Instant>,
        token: &CancelToken,
    ) -> Result<ExtractionResult, PdfError> {
        let doc = load_document(bytes, self.options.password.as_deref(), self.options.max_pages)?;
        debug!(
            page_count = doc.page_count,
            loaded = doc.pages.len(),
            "document loaded"
        );
        Deadline::for_page(0, None, document_deadline, token.clone()).check()?;

        let outcomes: Vec<Result<PageResult, PdfError>> = self.pool.install(|| {
            doc.pages
                .par_iter()
                .map(|source| self.page_task(source, document_deadline, token))
                .collect()
        });
        let pages = outcomes.into_iter().collect::<Result<Vec<_>, _>>()?;
        finish(pages, doc.skipped_pages(), token)
    }

    /// One page, isolated. `Err` only for errors that end the document.
    fn page_task(
        &self,
        source: &PageSource,
        document_deadline: Option<Instant>,
        token: &CancelToken,
    ) -> Result<PageResult, PdfError> {
        let started = Instant::now();
        let budget = self.options.per_page_timeout_ms.map(Duration::from_millis);
        let deadline = Deadline::for_page(source.index, budget, document_deadline, token.clone());

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.process_page(source, &deadline)));
        let message = match outcome {
            Ok(Ok(blocks)) => {
                debug!(
                    page = source.index,
                    blocks = blocks.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "page extracted"
                );
                return Ok(PageResult::ok(source.index, source.width, source.height, blocks));
            }
            Ok(Err(e)) if e.is_fatal() => return Err(e),
            Ok(Err(e)) => e.to_string(),
            Err(payload) => format!("internal error: {}", panic_message(payload.as_ref())),
        };

        warn!(page = source.index, error = %message, "page failed");
        let mut failed = PageResult::failed(source.index, message);
        failed.width = source.width;
        failed.height = source.height;
        Ok(failed)
    }

    /// The per-page pipeline, polling the deadline between stages.
    fn process_page(&self, source: &PageSource, deadline: &Deadline) -> Result<Vec<Block>, PdfError> {
        let page = interpret_page(source, &self.interpret, deadline)?;
        deadline.check()?;
        let lines = assemble_lines(&page.chars(), &self.options.words);
        deadline.check()?;
        let tables = self
            .finder
            .find_tables(&page, &lines, self.options.table_strategy, deadline)?;
        deadline.check()?;
        Ok(reconstruct(lines, tables, &self.options.layout))
    }

    /// Positioned words of every page (up to `max_pages`), in page order.
    ///
    /// # Errors
    ///
    /// Any load error, and the first page error in page order.
    pub fn words(&self, bytes: &[u8]) -> Result<Vec<PageWords>, PdfError> {
        let doc = load_document(bytes, self.options.password.as_deref(), self.options.max_pages)?;
        let token = CancelToken::new();
        let budget = self.options.per_page_timeout_ms.map(Duration::from_millis);
        let document_deadline = self
            .options
            .document_timeout_ms
            .map(|ms| Instant::now() + Duration::from_millis(ms));

        self.pool.install(|| {
            doc.pages
                .par_iter()
                .map(|source| -> Result<PageWords, PdfError> {
                    let deadline =
                        Deadline::for_page(source.index, budget, document_deadline, token.clone());
                    let page = interpret_page(source, &self.interpret, &deadline)?;
                    Ok(PageWords {
                        page: source.index,
                        words: extract_words(&page.chars(), &self.options.words),
                    })
                })
                .collect()
        })
    }
}
