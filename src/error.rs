//! Error types for the resume2json library.
//!
//! Errors are split by pipeline stage:
//!
//! * [`ExtractError`] — the PDF could not be opened or a page could not be
//!   read. Any page failure aborts the whole extraction; there is no
//!   partial-document fallback.
//!
//! * [`StructureError`] — the structuring service could not turn the text
//!   into a resume record (missing credential, transport failure, reply of
//!   the wrong shape, invalid JSON).
//!
//! * [`StageError`] — one of the two above, tagged with the stage that
//!   failed. This is what [`crate::controller::PipelineState::Failed`] holds,
//!   so the underlying cause survives for diagnostics.
//!
//! * [`Resume2JsonError`] — everything the convenience entry points in
//!   [`crate::convert`] can return, including input resolution and output
//!   I/O failures.
//!
//! Stage errors are `Clone + PartialEq` because they live inside the
//! session state snapshot handed to observers and callers.

use std::path::PathBuf;
use thiserror::Error;

/// Failures while turning PDF bytes into page text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    /// The buffer is not a document the PDF engine can open.
    #[error("malformed document: {detail}")]
    MalformedDocument { detail: String },

    /// The document is encrypted and no (or a wrong) password was supplied.
    #[error("document is encrypted and requires a password\nProvide it with --password <PASSWORD>.")]
    PasswordRequired,

    /// Reading the text of one page failed; the run is aborted.
    #[error("text extraction failed on page {page}: {cause}")]
    PageExtractionFailed { page: usize, cause: String },

    /// The pdfium library could not be located or bound.
    #[error(
        "failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium, place the library next to the binary,\n\
or install it system-wide."
    )]
    EngineUnavailable(String),

    /// Unexpected internal error (task panicked, channel closed early).
    #[error("internal extraction error: {0}")]
    Internal(String),
}

/// Failures while structuring extracted text into a resume record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructureError {
    /// The structuring credential could not be obtained. Raised before any
    /// request reaches the structuring service.
    #[error("CredentialUnavailable: {reason}")]
    CredentialUnavailable { reason: String },

    /// Network or HTTP-level failure: non-success status, timeout, or a
    /// reply body that is not a valid envelope.
    #[error("{}", transport_message(.status, .detail))]
    TransportFailure {
        status: Option<u16>,
        body: Option<String>,
        detail: String,
    },

    /// The envelope decoded but holds no candidate with textual content.
    #[error("unexpected reply shape from structuring service: {detail}")]
    UnexpectedReplyShape { detail: String },

    /// The candidate text is not valid JSON.
    #[error("structuring service returned invalid JSON: {detail}")]
    InvalidJson { raw: String, detail: String },

    /// The reply parsed, but a field has a JSON type the resume schema
    /// does not allow.
    #[error("reply does not match the resume schema at {path}: expected {expected}, found {found}")]
    SchemaMismatch {
        path: String,
        expected: String,
        found: String,
    },
}

fn transport_message(status: &Option<u16>, detail: &str) -> String {
    match status {
        Some(code) => format!("structuring request failed with HTTP {code}: {detail}"),
        None => format!("structuring request failed: {detail}"),
    }
}

impl StructureError {
    /// Shorthand for a transport failure without an HTTP status.
    pub fn transport(detail: impl Into<String>) -> Self {
        StructureError::TransportFailure {
            status: None,
            body: None,
            detail: detail.into(),
        }
    }
}

/// The pipeline stage a run failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Extract,
    Structure,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Extract => f.write_str("extract"),
            Stage::Structure => f.write_str("structure"),
        }
    }
}

/// A terminal failure of one pipeline run, tagged by stage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StageError {
    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Structure(#[from] StructureError),
}

impl StageError {
    pub fn stage(&self) -> Stage {
        match self {
            StageError::Extract(_) => Stage::Extract,
            StageError::Structure(_) => Stage::Structure,
        }
    }
}

/// All errors returned by the convenience conversion API.
#[derive(Debug, Error)]
pub enum Resume2JsonError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The selected file is not a PDF. Non-fatal for a session: the
    /// controller stays `Idle`.
    #[error("'{name}' is not a PDF file ({detail})\nPlease select a valid PDF file.")]
    InvalidFileType { name: String, detail: String },

    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Pipeline errors ───────────────────────────────────────────────────
    #[error("Could not process the PDF file. {0}")]
    Extract(#[from] ExtractError),

    #[error("Could not structure the resume text. {0}")]
    Structure(#[from] StructureError),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output JSON file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StageError> for Resume2JsonError {
    fn from(e: StageError) -> Self {
        match e {
            StageError::Extract(e) => Resume2JsonError::Extract(e),
            StageError::Structure(e) => Resume2JsonError::Structure(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_display_with_status() {
        let e = StructureError::TransportFailure {
            status: Some(500),
            body: Some("{\"error\":\"boom\"}".into()),
            detail: "Internal Server Error".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("HTTP 500"), "got: {msg}");
        assert!(!msg.contains("boom"), "body must stay out of the status line");
    }

    #[test]
    fn transport_display_without_status() {
        let e = StructureError::transport("timed out after 120s");
        assert_eq!(e.to_string(), "structuring request failed: timed out after 120s");
    }

    #[test]
    fn credential_unavailable_names_the_kind() {
        let e = StructureError::CredentialUnavailable {
            reason: "GEMINI_API_KEY not set".into(),
        };
        assert!(e.to_string().starts_with("CredentialUnavailable"));
    }

    #[test]
    fn page_failure_display() {
        let e = ExtractError::PageExtractionFailed {
            page: 3,
            cause: "bad text object".into(),
        };
        assert!(e.to_string().contains("page 3"));
    }

    #[test]
    fn stage_error_reports_stage() {
        let e: StageError = ExtractError::PasswordRequired.into();
        assert_eq!(e.stage(), Stage::Extract);
        let e: StageError = StructureError::transport("x").into();
        assert_eq!(e.stage(), Stage::Structure);
    }

    #[test]
    fn stage_error_converts_to_crate_error() {
        let e: Resume2JsonError = StageError::Structure(StructureError::UnexpectedReplyShape {
            detail: "no candidates".into(),
        })
        .into();
        assert!(matches!(e, Resume2JsonError::Structure(_)));
        assert!(e.to_string().contains("no candidates"));
    }
}
