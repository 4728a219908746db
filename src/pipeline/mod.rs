//! Pipeline stages for PDF-to-JSON conversion.
//!
//! Each submodule implements exactly one transformation step. The
//! [`crate::controller`] composes them and owns all session state; the stages
//! themselves are stateless apart from their injected collaborators.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ structure ──▶ export
//! (path/URL) (pdfium)   (service)     (JSON bytes)
//!                           ▲
//!                      postprocess
//!                  (free-text replies)
//! ```
//!
//! 1. [`input`]   — resolve a path or URL into a [`input::SelectedFile`]
//! 2. [`extract`] — open the PDF on the blocking pool and stream page texts
//! 3. [`structure`] — one schema-constrained request, reply validated
//!    against the resume schema; the only stage with network I/O
//! 4. [`postprocess`] — strip fences and noise from prompt-only replies
//! 5. [`export`]  — pretty-printed JSON artifact with a derived file name

pub mod export;
pub mod extract;
pub mod input;
pub mod postprocess;
pub mod structure;
