//! # resume2json
//!
//! Convert PDF resumes into structured JSON.
//!
//! The text of every page is extracted with pdfium, sent once to a
//! schema-constrained structuring service (Gemini by default, or any
//! `edgequake-llm` provider), validated against a fixed resume schema, and
//! returned as a [`ResumeRecord`] plus a pretty-printed JSON artifact.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input      resolve local file or download from URL, sniff type
//!  ├─ 2. Extract    page texts via pdfium (blocking pool, streamed)
//!  ├─ 3. Structure  one request: instruction + text + response schema
//!  ├─ 4. Validate   parse reply, shape-check against the resume schema
//!  └─ 5. Export     pretty JSON, `<name>.json`
//! ```
//!
//! [`PipelineController`] owns the session state machine
//! (`Idle → ExtractingText → Structuring → Ready | Failed`) and guards it
//! with a generation counter so a newer selection always wins.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use resume2json::{convert, ResumeConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Key read from GEMINI_API_KEY / API_KEY
//!     let config = ResumeConfig::default();
//!     let output = convert("cv.pdf", &config).await?;
//!     println!("{}", String::from_utf8_lossy(&output.artifact.bytes));
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `cli`    | on      | Enables the `resume2json` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `server` | off     | Enables [`server`] and the `resume2json-server` binary (axum) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! resume2json = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod controller;
pub mod convert;
pub mod credentials;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod record;
pub mod schema;
#[cfg(feature = "server")]
pub mod server;
pub mod service;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ResumeConfig, ResumeConfigBuilder};
pub use controller::{PipelineController, PipelineState, RunOutcome};
pub use convert::{
    build_controller, convert, convert_bytes, convert_file, convert_sync, convert_to_file,
    extract_text, write_artifact, ConversionOutput,
};
pub use credentials::{ApiKey, CredentialProvider, EnvCredentials, RemoteCredentials, StaticCredentials};
pub use error::{ExtractError, Resume2JsonError, Stage, StageError, StructureError};
pub use pipeline::export::{export, Artifact};
pub use pipeline::extract::{
    DocumentEngine, DocumentHandle, ExtractedText, PageText, PageTextExtractor, PageTextStream,
    PdfiumEngine,
};
pub use pipeline::input::SelectedFile;
pub use pipeline::structure::{parse_record, ResumeStructurer};
pub use progress::{NoopObserver, PipelineObserver, ProgressCallback};
pub use record::ResumeRecord;
pub use schema::{SchemaNode, RESUME_SCHEMA};
pub use service::{GeminiService, LlmProviderService, ReplyEnvelope, StructuringRequest, StructuringService};
