//! Observer trait for pipeline progress and state events.
//!
//! Inject an [`Arc<dyn PipelineObserver>`] via
//! [`crate::config::ResumeConfigBuilder::observer`] (or
//! [`crate::controller::PipelineController::with_observer`]) to drive a
//! "page i of n" indicator, a status line, or a log.
//!
//! Events are delivered only for the current run: once a newer file
//! selection supersedes a run, that run's late completions are dropped
//! before they reach the observer. Callbacks are invoked after the session
//! lock is released, so an observer may call back into the controller.
//!
//! # Example
//!
//! ```rust
//! use resume2json::PipelineObserver;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct PageCounter(AtomicUsize);
//!
//! impl PipelineObserver for PageCounter {
//!     fn on_page_extracted(&self, page: usize, total: usize, _chars: usize) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("page {page} of {total}");
//!     }
//! }
//! ```

use crate::error::{Stage, StageError};
use crate::record::ResumeRecord;
use std::sync::Arc;

/// Receives pipeline events. All methods default to no-ops.
pub trait PipelineObserver: Send + Sync {
    /// The document opened; `total_pages` pages will be extracted.
    fn on_extraction_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Page `page` (1-indexed) of `total_pages` finished extracting.
    fn on_page_extracted(&self, page: usize, total_pages: usize, chars: usize) {
        let _ = (page, total_pages, chars);
    }

    /// All pages are extracted and the structuring request is about to go out.
    fn on_structuring_start(&self, text_chars: usize) {
        let _ = text_chars;
    }

    /// The run produced a record and the session is `Ready`.
    fn on_ready(&self, record: &ResumeRecord) {
        let _ = record;
    }

    /// The run failed; the session is `Failed`.
    fn on_failed(&self, stage: Stage, error: &StageError) {
        let _ = (stage, error);
    }

    /// A selected file was not a PDF and was rejected.
    fn on_rejected(&self, file_name: &str, message: &str) {
        let _ = (file_name, message);
    }
}

/// A no-op observer, used when none is configured.
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {}

/// Convenience alias for the type stored in [`crate::config::ResumeConfig`].
pub type ProgressCallback = Arc<dyn PipelineObserver>;
