//! Cooperative cancellation and deadlines.
//!
//! Page tasks poll a [`Deadline`] between pipeline stages and periodically
//! while interpreting content, so a cancelled or timed-out page stops at its
//! next poll and drops its buffers.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::error::{PdfError, TimeoutScope};

/// Shared flag that cancels every in-flight page of one document.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Limits a single page task must respect.
#[derive(Debug, Clone)]
pub struct Deadline {
    page: usize,
    page_deadline: Option<Instant>,
    document_deadline: Option<Instant>,
    token: CancelToken,
}

impl Deadline {
    /// No limits and a token nobody else holds.
    pub fn unbounded(page: usize) -> Self {
        Self {
            page,
            page_deadline: None,
            document_deadline: None,
            token: CancelToken::new(),
        }
    }

    /// Deadline for `page`, starting its own budget now.
    pub fn for_page(
        page: usize,
        page_budget: Option<Duration>,
        document_deadline: Option<Instant>,
        token: CancelToken,
    ) -> Self {
        Self {
            page,
            page_deadline: page_budget.map(|b| Instant::now() + b),
            document_deadline,
            token,
        }
    }

    /// Fails with the first limit that has been hit.
    ///
    /// Cancellation wins over the document deadline, which wins over the
    /// page deadline.
    pub fn check(&self) -> Result<(), PdfError> {
        if self.token.is_cancelled() {
            return Err(PdfError::Cancelled);
        }
        let now = Instant::now();
        if self.document_deadline.is_some_and(|d| now >= d) {
            return Err(PdfError::Timeout(TimeoutScope::Document));
        }
        if self.page_deadline.is_some_and(|d| now >= d) {
            return Err(PdfError::Timeout(TimeoutScope::Page(self.page)));
        }
        Ok(())
    }
}
