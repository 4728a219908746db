//! The pipeline controller: one session, one state machine.
//!
//! ```text
//!            select (not a PDF)
//!        ┌──────────────────────┐
//!        ▼                      │
//!      Idle ──select (PDF)──▶ ExtractingText{0,0} ──open──▶ ExtractingText{0,n}
//!                                                               │ page i done
//!                                                               ▼
//!      Failed{Extract} ◀──────error───────────────── ExtractingText{i,n}
//!                                                               │ all pages
//!                                                               ▼
//!      Failed{Structure} ◀──────error──────────────────── Structuring
//!                                                               │
//!                                                               ▼
//!                                                          Ready{record}
//! ```
//!
//! Any state accepts a new selection, which discards the previous record or
//! error. Each selection bumps a generation counter and every later update
//! of that run is applied only while its generation is still current, so a
//! superseded run can never overwrite the state of the run that replaced it.
//! The session lock is never held across an `.await`.

use crate::error::{ExtractError, Resume2JsonError, Stage, StageError};
use crate::pipeline::export::{self, Artifact};
use crate::pipeline::extract::{ExtractedText, PageTextExtractor};
use crate::pipeline::input::SelectedFile;
use crate::pipeline::structure::ResumeStructurer;
use crate::progress::{PipelineObserver, ProgressCallback};
use crate::record::ResumeRecord;
use futures::StreamExt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, info, warn};

/// Notice shown when a selection is not a PDF.
pub const INVALID_FILE_MESSAGE: &str = "Please select a valid PDF file.";

/// Session-wide pipeline state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PipelineState {
    #[default]
    Idle,
    /// `current_page` pages of `total_pages` are done. `{0, 0}` means the
    /// document is still being opened.
    ExtractingText {
        current_page: usize,
        total_pages: usize,
    },
    Structuring,
    Ready {
        record: ResumeRecord,
    },
    Failed {
        stage: Stage,
        error: StageError,
    },
}

impl PipelineState {
    pub fn is_ready(&self) -> bool {
        matches!(self, PipelineState::Ready { .. })
    }

    /// True while a run is between selection and its final state.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            PipelineState::ExtractingText { .. } | PipelineState::Structuring
        )
    }

    /// User-facing status line for this state.
    pub fn status_message(&self) -> String {
        match self {
            PipelineState::Idle => String::new(),
            PipelineState::ExtractingText {
                total_pages: 0, ..
            } => "Processing your PDF...".to_string(),
            PipelineState::ExtractingText {
                current_page,
                total_pages,
            } => format!(
                "Extracting text from page {} of {}...",
                (current_page + 1).min(*total_pages),
                total_pages
            ),
            PipelineState::Structuring => {
                "Text extracted. Asking AI to structure the data...".to_string()
            }
            PipelineState::Ready { .. } => {
                "\u{2705} AI processing complete! Ready to download.".to_string()
            }
            PipelineState::Failed {
                error: StageError::Extract(e),
                ..
            } => format!("\u{274c} Error: Could not process the PDF file. {e}"),
            PipelineState::Failed {
                error: StageError::Structure(e),
                ..
            } => format!("\u{274c} Error: AI could not process the text. {e}"),
        }
    }
}

/// How one [`PipelineController::select_file`] call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Ready(ResumeRecord),
    Failed(StageError),
    /// The selection was not a PDF; the session is `Idle`.
    Rejected(String),
    /// A newer selection took over before this run finished; its results
    /// were discarded.
    Superseded,
}

#[derive(Default)]
struct Session {
    generation: u64,
    state: PipelineState,
    file_name: Option<String>,
    notice: Option<String>,
}

pub struct PipelineController {
    extractor: PageTextExtractor,
    structurer: ResumeStructurer,
    observer: Option<ProgressCallback>,
    session: Mutex<Session>,
}

impl PipelineController {
    pub fn new(extractor: PageTextExtractor, structurer: ResumeStructurer) -> Self {
        Self {
            extractor,
            structurer,
            observer: None,
            session: Mutex::new(Session::default()),
        }
    }

    pub fn with_observer(mut self, observer: ProgressCallback) -> Self {
        self.observer = Some(observer);
        self
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, event: impl FnOnce(&dyn PipelineObserver)) {
        if let Some(observer) = &self.observer {
            event(observer.as_ref());
        }
    }

    /// A snapshot of the current state.
    pub fn state(&self) -> PipelineState {
        self.session().state.clone()
    }

    /// Status line for the current state, or the pending rejection notice.
    pub fn status_message(&self) -> String {
        let session = self.session();
        match (&session.state, &session.notice) {
            (PipelineState::Idle, Some(notice)) => notice.clone(),
            (state, _) => state.status_message(),
        }
    }

    /// Name of the file behind the current run, if any.
    pub fn file_name(&self) -> Option<String> {
        self.session().file_name.clone()
    }

    /// The ready record as a JSON artifact; `None` in any other state.
    pub fn export(&self) -> Result<Option<Artifact>, Resume2JsonError> {
        let (record, file_name) = {
            let session = self.session();
            match &session.state {
                PipelineState::Ready { record } => (
                    record.clone(),
                    session.file_name.clone().unwrap_or_default(),
                ),
                _ => {
                    debug!("Export requested with no ready record");
                    return Ok(None);
                }
            }
        };
        export::export(&record, &file_name).map(Some)
    }

    /// Start a run for `file`, superseding any run in flight, and drive it
    /// to completion.
    pub async fn select_file(&self, file: SelectedFile) -> RunOutcome {
        let accepted = file.is_pdf();
        let generation = {
            let mut session = self.session();
            session.generation += 1;
            if session.state.is_busy() {
                warn!("Run {} superseded by a new selection", session.generation - 1);
            }
            if accepted {
                session.state = PipelineState::ExtractingText {
                    current_page: 0,
                    total_pages: 0,
                };
                session.file_name = Some(file.name.clone());
                session.notice = None;
            } else {
                session.state = PipelineState::Idle;
                session.file_name = None;
                session.notice = Some(INVALID_FILE_MESSAGE.to_string());
            }
            session.generation
        };

        if !accepted {
            warn!(
                "Rejected '{}': MIME type {:?} is not a PDF",
                file.name, file.mime_type
            );
            self.notify(|o| o.on_rejected(&file.name, INVALID_FILE_MESSAGE));
            return RunOutcome::Rejected(INVALID_FILE_MESSAGE.to_string());
        }

        info!("Run {}: processing '{}' ({} bytes)", generation, file.name, file.bytes.len());
        self.run(generation, file.bytes).await
    }

    /// Apply `state` if `generation` is still current.
    fn advance(&self, generation: u64, state: PipelineState) -> bool {
        let mut session = self.session();
        if session.generation != generation {
            return false;
        }
        session.state = state;
        true
    }

    fn fail(&self, generation: u64, error: StageError) -> RunOutcome {
        let stage = error.stage();
        error!("Run {} failed during {}: {}", generation, stage, error);
        let state = PipelineState::Failed {
            stage,
            error: error.clone(),
        };
        if !self.advance(generation, state) {
            return RunOutcome::Superseded;
        }
        self.notify(|o| o.on_failed(stage, &error));
        RunOutcome::Failed(error)
    }

    async fn run(&self, generation: u64, bytes: Vec<u8>) -> RunOutcome {
        let mut pages = match self.extractor.extract(bytes).await {
            Ok(pages) => pages,
            Err(e) => return self.fail(generation, e.into()),
        };

        let total_pages = pages.page_count();
        let opened = PipelineState::ExtractingText {
            current_page: 0,
            total_pages,
        };
        if !self.advance(generation, opened) {
            return RunOutcome::Superseded;
        }
        self.notify(|o| o.on_extraction_start(total_pages));

        let mut text = ExtractedText::new();
        while let Some(page) = pages.next().await {
            let page = match page {
                Ok(page) => page,
                Err(e) => return self.fail(generation, e.into()),
            };
            text.push_page(&page.text);
            let progress = PipelineState::ExtractingText {
                current_page: page.index,
                total_pages,
            };
            if !self.advance(generation, progress) {
                return RunOutcome::Superseded;
            }
            debug!("Page {}/{}: {} chars", page.index, total_pages, page.text.len());
            self.notify(|o| o.on_page_extracted(page.index, total_pages, page.text.len()));
        }

        if text.page_count() != total_pages {
            let missing = ExtractError::PageExtractionFailed {
                page: text.page_count() + 1,
                cause: "extraction ended before the last page".into(),
            };
            return self.fail(generation, missing.into());
        }

        if !self.advance(generation, PipelineState::Structuring) {
            return RunOutcome::Superseded;
        }
        info!(
            "Run {}: extracted {} chars from {} pages; structuring via {}",
            generation,
            text.len(),
            total_pages,
            self.structurer.service_name()
        );
        self.notify(|o| o.on_structuring_start(text.len()));

        let record = match self.structurer.structure(text.as_str()).await {
            Ok(record) => record,
            Err(e) => return self.fail(generation, e.into()),
        };

        let ready = PipelineState::Ready {
            record: record.clone(),
        };
        if !self.advance(generation, ready) {
            warn!("Run {} finished after being superseded; result dropped", generation);
            return RunOutcome::Superseded;
        }
        info!("Run {}: ready", generation);
        self.notify(|o| o.on_ready(&record));
        RunOutcome::Ready(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StructureError;

    #[test]
    fn status_messages() {
        assert_eq!(PipelineState::Idle.status_message(), "");
        assert_eq!(
            PipelineState::ExtractingText {
                current_page: 0,
                total_pages: 0
            }
            .status_message(),
            "Processing your PDF..."
        );
        assert_eq!(
            PipelineState::ExtractingText {
                current_page: 1,
                total_pages: 3
            }
            .status_message(),
            "Extracting text from page 2 of 3..."
        );
        assert_eq!(
            PipelineState::ExtractingText {
                current_page: 3,
                total_pages: 3
            }
            .status_message(),
            "Extracting text from page 3 of 3..."
        );
        assert!(PipelineState::Ready {
            record: ResumeRecord::default()
        }
        .status_message()
        .contains("Ready to download"));
    }

    #[test]
    fn failure_messages_carry_the_cause() {
        let extract = PipelineState::Failed {
            stage: Stage::Extract,
            error: StageError::Extract(ExtractError::PasswordRequired),
        };
        assert!(extract
            .status_message()
            .starts_with("\u{274c} Error: Could not process the PDF file."));

        let structure = PipelineState::Failed {
            stage: Stage::Structure,
            error: StageError::Structure(StructureError::CredentialUnavailable {
                reason: "GEMINI_API_KEY unset".into(),
            }),
        };
        let msg = structure.status_message();
        assert!(msg.contains("AI could not process the text"));
        assert!(msg.contains("CredentialUnavailable"));
    }

    #[test]
    fn busy_and_ready_flags() {
        assert!(PipelineState::Structuring.is_busy());
        assert!(!PipelineState::Idle.is_busy());
        assert!(PipelineState::Ready {
            record: ResumeRecord::default()
        }
        .is_ready());
    }
}
