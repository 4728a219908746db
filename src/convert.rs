//! Conversion entry points.
//!
//! Each call builds a fresh [`PipelineController`] from the config (a fresh
//! session), feeds it one selection, and maps the run outcome onto
//! [`Resume2JsonError`]. Embedders that want the session itself, with its
//! state and status line, call [`build_controller`] directly.

use crate::config::ResumeConfig;
use crate::controller::{PipelineController, RunOutcome};
use crate::credentials::{CredentialProvider, EnvCredentials, RemoteCredentials, StaticCredentials};
use crate::error::Resume2JsonError;
use crate::pipeline::export::Artifact;
use crate::pipeline::extract::{DocumentEngine, ExtractedText, PageTextExtractor, PdfiumEngine};
use crate::pipeline::input::{self, SelectedFile};
use crate::pipeline::structure::ResumeStructurer;
use crate::record::ResumeRecord;
use crate::service::{GeminiService, LlmProviderService, StructuringService};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Result of a successful conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionOutput {
    pub record: ResumeRecord,
    pub artifact: Artifact,
}

/// Convert a PDF file or URL to a resume record.
///
/// # Arguments
/// * `input` — Local file path or HTTP/HTTPS URL to a PDF
/// * `config` — Conversion configuration
///
/// # Errors
/// - File not found / permission denied / download failure
/// - [`Resume2JsonError::InvalidFileType`] when the input is not a PDF
/// - [`Resume2JsonError::Extract`] / [`Resume2JsonError::Structure`] when a
///   pipeline stage fails
pub async fn convert(
    input_str: impl AsRef<str>,
    config: &ResumeConfig,
) -> Result<ConversionOutput, Resume2JsonError> {
    let input_str = input_str.as_ref();
    info!("Starting conversion: {}", input_str);
    let file = input::resolve_input(input_str, config.download_timeout_secs).await?;
    convert_file(file, config).await
}

/// Convert in-memory PDF bytes. `name` only feeds the artifact file name.
///
/// # Example
/// ```rust,no_run
/// use resume2json::{convert_bytes, ResumeConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes = std::fs::read("cv.pdf")?;
/// let output = convert_bytes("cv.pdf", bytes, &ResumeConfig::default()).await?;
/// println!("{}", String::from_utf8_lossy(&output.artifact.bytes));
/// # Ok(())
/// # }
/// ```
pub async fn convert_bytes(
    name: impl Into<String>,
    bytes: Vec<u8>,
    config: &ResumeConfig,
) -> Result<ConversionOutput, Resume2JsonError> {
    convert_file(SelectedFile::from_bytes(name, bytes), config).await
}

/// Convert an already-resolved selection.
pub async fn convert_file(
    file: SelectedFile,
    config: &ResumeConfig,
) -> Result<ConversionOutput, Resume2JsonError> {
    let start = Instant::now();
    let controller = build_controller(config)?;
    let name = file.name.clone();
    let mime_type = file.mime_type.clone();

    match controller.select_file(file).await {
        RunOutcome::Ready(record) => {
            let artifact = controller.export()?.ok_or_else(|| {
                Resume2JsonError::Internal("run finished ready but nothing to export".into())
            })?;
            info!(
                "Conversion complete: '{}' → '{}' in {}ms",
                name,
                artifact.file_name,
                start.elapsed().as_millis()
            );
            Ok(ConversionOutput { record, artifact })
        }
        RunOutcome::Failed(error) => Err(error.into()),
        RunOutcome::Rejected(_) => Err(Resume2JsonError::InvalidFileType {
            name,
            detail: match mime_type {
                Some(m) => format!("type {m}"),
                None => "no PDF header".into(),
            },
        }),
        RunOutcome::Superseded => Err(Resume2JsonError::Internal(
            "conversion superseded on a private session".into(),
        )),
    }
}

/// Convert and write the pretty-printed JSON to `output_path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn convert_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &ResumeConfig,
) -> Result<ConversionOutput, Resume2JsonError> {
    let output = convert(input_str, config).await?;
    write_artifact(&output.artifact, output_path.as_ref()).await?;
    Ok(output)
}

/// Write `artifact` to `path` atomically, creating parent directories.
pub async fn write_artifact(artifact: &Artifact, path: &Path) -> Result<(), Resume2JsonError> {
    let write_failed = |source| Resume2JsonError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_failed)?;
    }

    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, &artifact.bytes)
        .await
        .map_err(write_failed)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_failed)?;

    debug!("Wrote {} bytes to {}", artifact.bytes.len(), path.display());
    Ok(())
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    input_str: impl AsRef<str>,
    config: &ResumeConfig,
) -> Result<ConversionOutput, Resume2JsonError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Resume2JsonError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(input_str, config))
}

/// Extract the text of a PDF without structuring it.
///
/// Does not require a credential or network access (beyond a URL input).
pub async fn extract_text(
    input_str: impl AsRef<str>,
    config: &ResumeConfig,
) -> Result<ExtractedText, Resume2JsonError> {
    let file = input::resolve_input(input_str.as_ref(), config.download_timeout_secs).await?;
    if !file.is_pdf() {
        return Err(Resume2JsonError::InvalidFileType {
            name: file.name,
            detail: "no PDF header".into(),
        });
    }
    let extractor = PageTextExtractor::new(resolve_engine(config));
    Ok(extractor.extract_all(file.bytes).await?)
}

/// Assemble a controller (one session) from `config`.
pub fn build_controller(config: &ResumeConfig) -> Result<PipelineController, Resume2JsonError> {
    let extractor = PageTextExtractor::new(resolve_engine(config));

    let service = resolve_service(config)?;
    let credentials = if service.requires_credential() {
        Some(resolve_credentials(config)?)
    } else {
        None
    };
    debug!("Structuring backend: {}", service.name());

    let mut structurer = ResumeStructurer::new(service, credentials);
    if let Some(instruction) = &config.instruction {
        structurer = structurer.with_instruction(instruction.clone());
    }

    let controller = PipelineController::new(extractor, structurer);
    Ok(match &config.observer {
        Some(observer) => controller.with_observer(Arc::clone(observer)),
        None => controller,
    })
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn resolve_engine(config: &ResumeConfig) -> Arc<dyn DocumentEngine> {
    match &config.engine {
        Some(engine) => Arc::clone(engine),
        None => Arc::new(PdfiumEngine::from_config(config)),
    }
}

/// Resolve the structuring backend, from most-specific to least-specific:
///
/// 1. **Pre-built service** (`config.service`)
/// 2. **Pre-built provider** (`config.provider`) wrapped for prompt-carried
///    schemas
/// 3. **Named provider** (`config.provider_name` + `config.model`) via the
///    `edgequake-llm` factory
/// 4. **Native Gemini** call, the default
fn resolve_service(config: &ResumeConfig) -> Result<Arc<dyn StructuringService>, Resume2JsonError> {
    if let Some(service) = &config.service {
        return Ok(Arc::clone(service));
    }

    if let Some(provider) = &config.provider {
        let label = format!("custom/{}", config.effective_model());
        return Ok(Arc::new(LlmProviderService::new(
            Arc::clone(provider),
            label,
            config,
        )));
    }

    if let Some(name) = &config.provider_name {
        let model = config.model.as_deref().ok_or_else(|| {
            Resume2JsonError::InvalidConfig(format!("provider '{name}' needs a model name"))
        })?;
        return Ok(Arc::new(LlmProviderService::from_name(name, model, config)?));
    }

    Ok(Arc::new(GeminiService::new(config)?))
}

/// Resolve the credential source: pre-built, explicit key, key endpoint,
/// then environment variables.
fn resolve_credentials(
    config: &ResumeConfig,
) -> Result<Arc<dyn CredentialProvider>, Resume2JsonError> {
    if let Some(credentials) = &config.credentials {
        return Ok(Arc::clone(credentials));
    }
    if let Some(key) = &config.api_key {
        return Ok(Arc::new(StaticCredentials::new(key.clone())));
    }
    if let Some(url) = &config.key_url {
        return Ok(Arc::new(RemoteCredentials::new(
            url.clone(),
            config.api_timeout_secs,
        )?));
    }
    Ok(Arc::new(EnvCredentials::new(config.api_key_vars.clone())))
}
