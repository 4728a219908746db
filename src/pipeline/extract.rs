//! Page text extraction: open a PDF from bytes and yield each page's text.
//!
//! ## Why spawn_blocking?
//!
//! pdfium is a C++ library with thread-local state; its calls are blocking
//! and must not run on a Tokio worker. The whole document lifetime (open,
//! per-page text, release) happens on one blocking-pool thread, and results
//! cross back to async code through a oneshot (page count) and a bounded
//! channel (page texts). The bound keeps at most a few pages in flight when
//! the consumer is slower than pdfium.
//!
//! The decoding engine sits behind [`DocumentEngine`] so the pipeline can be
//! driven without a pdfium library present.

use crate::config::ResumeConfig;
use crate::error::ExtractError;
use futures::Stream;
use std::future::Future;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinError, JoinHandle};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info};

/// Separator appended after every page in [`ExtractedText`].
pub const PAGE_SEPARATOR: &str = "\n\n";

/// Pages buffered between the blocking extractor and the consumer.
const PAGE_CHANNEL_CAPACITY: usize = 4;

/// An opened document. Valid only inside [`DocumentEngine::open`].
pub trait DocumentHandle {
    fn page_count(&self) -> usize;

    /// Text runs of page `page` (1-based), in reading order.
    fn page_runs(&self, page: usize) -> Result<Vec<String>, String>;
}

/// Black-box PDF decoder.
///
/// `open` decodes `bytes` and hands the document to `visit`; the handle is
/// released when `open` returns, on success and on failure alike.
pub trait DocumentEngine: Send + Sync {
    fn open(
        &self,
        bytes: &[u8],
        visit: &mut dyn FnMut(&dyn DocumentHandle) -> Result<(), ExtractError>,
    ) -> Result<(), ExtractError>;
}

// ── pdfium ───────────────────────────────────────────────────────────────────

/// [`DocumentEngine`] backed by pdfium.
///
/// Library lookup order: explicit path, `PDFIUM_LIB_PATH`, the platform
/// library name in the working directory, then the system library.
#[derive(Debug, Clone, Default)]
pub struct PdfiumEngine {
    library_path: Option<PathBuf>,
    password: Option<String>,
}

impl PdfiumEngine {
    pub fn new(library_path: Option<PathBuf>, password: Option<String>) -> Self {
        Self {
            library_path,
            password,
        }
    }

    pub fn from_config(config: &ResumeConfig) -> Self {
        Self::new(config.pdfium_library_path.clone(), config.password.clone())
    }

    fn bind(&self) -> Result<Pdfium, ExtractError> {
        let explicit = self.library_path.clone().or_else(|| {
            std::env::var("PDFIUM_LIB_PATH")
                .ok()
                .filter(|p| !p.is_empty())
                .map(PathBuf::from)
        });

        let bindings = match explicit {
            Some(path) => Pdfium::bind_to_library(path.as_path()).map_err(|e| {
                ExtractError::EngineUnavailable(format!("{}: {e}", path.display()))
            })?,
            None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(
                Path::new("./"),
            ))
            .or_else(|_| Pdfium::bind_to_system_library())
            .map_err(|e| ExtractError::EngineUnavailable(e.to_string()))?,
        };

        Ok(Pdfium::new(bindings))
    }
}

struct PdfiumDocument<'a> {
    document: PdfDocument<'a>,
}

impl DocumentHandle for PdfiumDocument<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn page_runs(&self, page: usize) -> Result<Vec<String>, String> {
        let index = page
            .checked_sub(1)
            .ok_or_else(|| "page numbers start at 1".to_string())?;
        let page = self
            .document
            .pages()
            .get(index as u16)
            .map_err(|e| format!("{e:?}"))?;
        let text = page.text().map_err(|e| format!("{e:?}"))?;
        let runs = text.segments().iter().map(|segment| segment.text()).collect();
        Ok(runs)
    }
}

impl DocumentEngine for PdfiumEngine {
    fn open(
        &self,
        bytes: &[u8],
        visit: &mut dyn FnMut(&dyn DocumentHandle) -> Result<(), ExtractError>,
    ) -> Result<(), ExtractError> {
        let pdfium = self.bind()?;
        let document = pdfium
            .load_pdf_from_byte_slice(bytes, self.password.as_deref())
            .map_err(|e| {
                let detail = format!("{e:?}");
                if detail.contains("Password") || detail.contains("password") {
                    ExtractError::PasswordRequired
                } else {
                    ExtractError::MalformedDocument { detail }
                }
            })?;

        // Bound first: the handle borrows `pdfium`, which drops before a tail temporary.
        let visited = visit(&PdfiumDocument { document });
        visited
    }
}

// ── Extractor ────────────────────────────────────────────────────────────────

/// Text of one page. `index` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    pub index: usize,
    pub text: String,
}

/// All page texts concatenated, each followed by [`PAGE_SEPARATOR`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedText {
    text: String,
    page_ends: Vec<usize>,
}

impl ExtractedText {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the next page. Pages must arrive in increasing order.
    pub fn push_page(&mut self, page_text: &str) {
        self.text.push_str(page_text);
        self.text.push_str(PAGE_SEPARATOR);
        self.page_ends.push(self.text.len());
    }

    /// Per-page texts, without the separator.
    pub fn pages(&self) -> impl Iterator<Item = &str> + '_ {
        let mut start = 0;
        self.page_ends.iter().map(move |&end| {
            let page = &self.text[start..end - PAGE_SEPARATOR.len()];
            start = end;
            page
        })
    }

    pub fn page_count(&self) -> usize {
        self.page_ends.len()
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

/// Lazily produced page texts of one opened document.
///
/// The page count is known up front; items arrive in page order and the
/// stream ends after the last page or right after the first error. If the
/// extraction task stops before the last page (a panic inside the engine),
/// the stream yields [`ExtractError::PageExtractionFailed`] for the first
/// missing page instead of ending early.
pub struct PageTextStream {
    page_count: usize,
    pages: ReceiverStream<Result<PageText, ExtractError>>,
    worker: Option<JoinHandle<()>>,
    next_page: usize,
    finished: bool,
}

impl PageTextStream {
    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Drain the stream into one [`ExtractedText`].
    pub async fn collect_text(mut self) -> Result<ExtractedText, ExtractError> {
        use futures::StreamExt;

        let mut extracted = ExtractedText::new();
        while let Some(page) = self.next().await {
            extracted.push_page(&page?.text);
        }
        if extracted.page_count() != self.page_count {
            return Err(ExtractError::Internal(format!(
                "extracted {} of {} pages",
                extracted.page_count(),
                self.page_count
            )));
        }
        Ok(extracted)
    }
}

impl Stream for PageTextStream {
    type Item = Result<PageText, ExtractError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }

        match Pin::new(&mut this.pages).poll_next(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Some(Ok(page))) => {
                this.next_page = page.index + 1;
                Poll::Ready(Some(Ok(page)))
            }
            Poll::Ready(Some(Err(e))) => {
                this.finished = true;
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) if this.next_page > this.page_count => {
                this.finished = true;
                Poll::Ready(None)
            }
            Poll::Ready(None) => {
                // The channel closed with pages missing: the task is gone.
                let cause = match this.worker.as_mut() {
                    Some(worker) => match Pin::new(worker).poll(cx) {
                        Poll::Pending => return Poll::Pending,
                        Poll::Ready(Ok(())) => "extraction stopped before this page".to_string(),
                        Poll::Ready(Err(e)) => task_failure(e),
                    },
                    None => "extraction stopped before this page".to_string(),
                };
                this.worker = None;
                this.finished = true;
                error!("Page {} of {}: {}", this.next_page, this.page_count, cause);
                Poll::Ready(Some(Err(ExtractError::PageExtractionFailed {
                    page: this.next_page,
                    cause,
                })))
            }
        }
    }
}

/// Describe a failed extraction task, keeping the panic message if any.
fn task_failure(error: JoinError) -> String {
    if !error.is_panic() {
        return format!("extraction task failed: {error}");
    }
    let payload = error.into_panic();
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".to_string());
    format!("extraction panicked: {message}")
}

/// Opens documents through a [`DocumentEngine`] and streams their text.
#[derive(Clone)]
pub struct PageTextExtractor {
    engine: Arc<dyn DocumentEngine>,
}

impl PageTextExtractor {
    pub fn new(engine: Arc<dyn DocumentEngine>) -> Self {
        Self { engine }
    }

    /// Open `bytes` and start extracting pages `1..=page_count`.
    ///
    /// Returns once the document is open, so an unreadable buffer fails
    /// here with [`ExtractError::MalformedDocument`]. Page failures arrive
    /// through the stream as [`ExtractError::PageExtractionFailed`] and end
    /// it; no partial document is produced.
    pub async fn extract(&self, bytes: Vec<u8>) -> Result<PageTextStream, ExtractError> {
        let engine = Arc::clone(&self.engine);
        let (count_tx, count_rx) = oneshot::channel::<Result<usize, ExtractError>>();
        let (page_tx, page_rx) = mpsc::channel(PAGE_CHANNEL_CAPACITY);

        let mut worker = tokio::task::spawn_blocking(move || {
            let mut count_tx = Some(count_tx);
            let opened = engine.open(&bytes, &mut |document: &dyn DocumentHandle| {
                let total = document.page_count();
                if let Some(tx) = count_tx.take() {
                    let _ = tx.send(Ok(total));
                }
                for page in 1..=total {
                    let item = document
                        .page_runs(page)
                        .map(|runs| PageText {
                            index: page,
                            text: runs.join(" "),
                        })
                        .map_err(|cause| ExtractError::PageExtractionFailed { page, cause });
                    let failed = item.is_err();
                    // A closed channel means the run was abandoned.
                    if page_tx.blocking_send(item).is_err() || failed {
                        break;
                    }
                }
                Ok(())
            });

            if let Err(e) = opened {
                match count_tx.take() {
                    Some(tx) => {
                        let _ = tx.send(Err(e));
                    }
                    None => {
                        let _ = page_tx.blocking_send(Err(e));
                    }
                }
            }
        });

        let page_count = match count_rx.await {
            Ok(opened) => opened?,
            Err(_) => {
                let cause = match (&mut worker).await {
                    Err(e) => task_failure(e),
                    Ok(()) => "extraction task ended before the document opened".to_string(),
                };
                error!("{}", cause);
                return Err(ExtractError::Internal(cause));
            }
        };
        info!("PDF opened: {} pages", page_count);

        Ok(PageTextStream {
            page_count,
            pages: ReceiverStream::new(page_rx),
            worker: Some(worker),
            next_page: 1,
            finished: false,
        })
    }

    /// Extract every page into one text blob.
    pub async fn extract_all(&self, bytes: Vec<u8>) -> Result<ExtractedText, ExtractError> {
        let stream = self.extract(bytes).await?;
        let extracted = stream.collect_text().await?;
        debug!(
            "Extracted {} chars from {} pages",
            extracted.len(),
            extracted.page_count()
        );
        Ok(extracted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    struct FakeDocument {
        pages: Vec<Result<Vec<String>, String>>,
    }

    impl DocumentHandle for FakeDocument {
        fn page_count(&self) -> usize {
            self.pages.len()
        }

        fn page_runs(&self, page: usize) -> Result<Vec<String>, String> {
            self.pages[page - 1].clone()
        }
    }

    /// `pages` pages; reading page `at` panics.
    struct PanickingDocument {
        pages: usize,
        at: usize,
    }

    impl DocumentHandle for PanickingDocument {
        fn page_count(&self) -> usize {
            self.pages
        }

        fn page_runs(&self, page: usize) -> Result<Vec<String>, String> {
            if page == self.at {
                panic!("glyph table corrupt on page {page}");
            }
            Ok(vec![format!("page{page}")])
        }
    }

    enum FakeEngine {
        Pages(Vec<Result<Vec<String>, String>>),
        Broken,
        PanicsAt { pages: usize, at: usize },
        PanicsOnOpen,
    }

    impl DocumentEngine for FakeEngine {
        fn open(
            &self,
            _bytes: &[u8],
            visit: &mut dyn FnMut(&dyn DocumentHandle) -> Result<(), ExtractError>,
        ) -> Result<(), ExtractError> {
            match self {
                FakeEngine::Pages(pages) => visit(&FakeDocument {
                    pages: pages.clone(),
                }),
                FakeEngine::Broken => Err(ExtractError::MalformedDocument {
                    detail: "no header".into(),
                }),
                FakeEngine::PanicsAt { pages, at } => visit(&PanickingDocument {
                    pages: *pages,
                    at: *at,
                }),
                FakeEngine::PanicsOnOpen => panic!("decoder crashed"),
            }
        }
    }

    fn extractor(engine: FakeEngine) -> PageTextExtractor {
        PageTextExtractor::new(Arc::new(engine))
    }

    fn runs(items: &[&str]) -> Result<Vec<String>, String> {
        Ok(items.iter().map(|s| s.to_string()).collect())
    }

    #[tokio::test]
    async fn pages_concatenate_in_order() {
        let ex = extractor(FakeEngine::Pages(vec![
            runs(&["Alice\nEngineer"]),
            runs(&["Skills:", "Go, Rust"]),
        ]));
        let text = ex.extract_all(b"%PDF".to_vec()).await.unwrap();
        assert_eq!(text.as_str(), "Alice\nEngineer\n\nSkills: Go, Rust\n\n");
        assert_eq!(text.page_count(), 2);
        let pages: Vec<&str> = text.pages().collect();
        assert_eq!(pages, vec!["Alice\nEngineer", "Skills: Go, Rust"]);
    }

    #[tokio::test]
    async fn zero_pages_give_empty_text() {
        let ex = extractor(FakeEngine::Pages(vec![]));
        let stream = ex.extract(Vec::new()).await.unwrap();
        assert_eq!(stream.page_count(), 0);
        let text = stream.collect_text().await.unwrap();
        assert!(text.is_empty());
        assert_eq!(text.page_count(), 0);
    }

    #[tokio::test]
    async fn malformed_document_fails_on_open() {
        let ex = extractor(FakeEngine::Broken);
        let err = ex.extract(b"junk".to_vec()).await.err().unwrap();
        assert!(matches!(err, ExtractError::MalformedDocument { .. }));
    }

    #[tokio::test]
    async fn page_failure_ends_the_stream() {
        let ex = extractor(FakeEngine::Pages(vec![
            runs(&["one"]),
            Err("bad glyphs".into()),
            runs(&["three"]),
        ]));
        let mut stream = ex.extract(Vec::new()).await.unwrap();
        assert_eq!(stream.page_count(), 3);

        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first, PageText { index: 1, text: "one".into() });
        match stream.next().await.unwrap() {
            Err(ExtractError::PageExtractionFailed { page, cause }) => {
                assert_eq!(page, 2);
                assert_eq!(cause, "bad glyphs");
            }
            other => panic!("expected PageExtractionFailed, got {other:?}"),
        }
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn collect_text_surfaces_page_failure() {
        let ex = extractor(FakeEngine::Pages(vec![Err("boom".into())]));
        let err = ex.extract_all(Vec::new()).await.unwrap_err();
        assert_eq!(
            err,
            ExtractError::PageExtractionFailed {
                page: 1,
                cause: "boom".into()
            }
        );
    }

    #[test]
    fn empty_page_still_gets_a_separator() {
        let mut text = ExtractedText::new();
        text.push_page("");
        text.push_page("b");
        assert_eq!(text.as_str(), "\n\nb\n\n");
        assert_eq!(text.pages().collect::<Vec<_>>(), vec!["", "b"]);
    }

    #[tokio::test]
    async fn panic_mid_document_is_a_page_failure() {
        let ex = extractor(FakeEngine::PanicsAt { pages: 3, at: 2 });
        let mut stream = ex.extract(Vec::new()).await.unwrap();
        assert_eq!(stream.page_count(), 3);

        assert_eq!(stream.next().await.unwrap().unwrap().index, 1);
        match stream.next().await.unwrap() {
            Err(ExtractError::PageExtractionFailed { page, cause }) => {
                assert_eq!(page, 2);
                assert!(cause.contains("glyph table corrupt"), "cause: {cause}");
            }
            other => panic!("expected PageExtractionFailed, got {other:?}"),
        }
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn panic_mid_document_never_collects_partial_text() {
        let ex = extractor(FakeEngine::PanicsAt { pages: 3, at: 2 });
        let err = ex.extract_all(Vec::new()).await.unwrap_err();
        assert!(matches!(err, ExtractError::PageExtractionFailed { page: 2, .. }));
    }

    #[tokio::test]
    async fn panic_while_opening_is_internal() {
        let ex = extractor(FakeEngine::PanicsOnOpen);
        match ex.extract(Vec::new()).await {
            Err(ExtractError::Internal(cause)) => assert!(cause.contains("decoder crashed")),
            Err(other) => panic!("expected Internal, got {other:?}"),
            Ok(_) => panic!("expected an error"),
        }
    }
}
