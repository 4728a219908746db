//! CLI binary for resume2json.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ResumeConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use resume2json::{
    convert, extract_text, write_artifact, PipelineObserver, ProgressCallback, ResumeConfig,
    ResumeRecord, Stage, StageError,
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI observer using indicatif ─────────────────────────────────────────────

/// Terminal observer: a spinner while the PDF opens, a page bar during
/// extraction, and a spinner again while the structuring call is out.
struct CliObserver {
    bar: ProgressBar,
}

impl CliObserver {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(Self::spinner_style());
        bar.set_prefix("Preparing");
        bar.set_message("Processing your PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS)
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] page {pos:>3} of {len}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS)
    }
}

impl PipelineObserver for CliObserver {
    fn on_extraction_start(&self, total_pages: usize) {
        self.bar.set_length(total_pages as u64);
        self.bar.set_style(Self::bar_style());
        self.bar.set_prefix("Extracting");
    }

    fn on_page_extracted(&self, page: usize, total_pages: usize, chars: usize) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            green("✓"),
            page,
            total_pages,
            dim(&format!("{chars:>5} chars")),
        ));
        self.bar.set_position(page as u64);
    }

    fn on_structuring_start(&self, text_chars: usize) {
        self.bar.set_style(Self::spinner_style());
        self.bar.set_prefix("Structuring");
        self.bar
            .set_message(format!("asking the model to shape {text_chars} chars…"));
    }

    fn on_ready(&self, record: &ResumeRecord) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} Structured resume{}",
            green("✔"),
            record
                .name()
                .map(|n| format!(" for {}", bold(n)))
                .unwrap_or_default()
        );
    }

    fn on_failed(&self, stage: Stage, error: &StageError) {
        self.bar.finish_and_clear();
        eprintln!("{} {} failed: {}", red("✘"), stage, error);
    }

    fn on_rejected(&self, file_name: &str, message: &str) {
        self.bar.finish_and_clear();
        eprintln!("{} {}: {}", red("✘"), file_name, message);
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Basic conversion (JSON on stdout)
  resume2json cv.pdf

  # Write next to other results; the file is named cv.json
  resume2json cv.pdf -o out/

  # Convert from URL
  resume2json https://example.com/jane_doe.pdf -o jane_doe.json

  # Only extract the text (no API key needed)
  resume2json --text-only cv.pdf

  # Structure through another provider via edgequake-llm
  resume2json --provider openai --model gpt-4.1-mini cv.pdf

CREDENTIALS (first match wins):
  --api-key / RESUME2JSON_API_KEY   explicit key
  --key-url / RESUME2JSON_KEY_URL   endpoint answering {"apiKey": "..."}
  GEMINI_API_KEY, API_KEY           environment lookup

  With --provider, the provider reads its own key (OPENAI_API_KEY, ...).

ENVIRONMENT VARIABLES:
  GEMINI_MODEL            Model ID (default gemini-2.5-flash)
  PDFIUM_LIB_PATH         Path to an existing libpdfium
  RUST_LOG                Log filter override (e.g. resume2json=debug)
"#;

/// Convert PDF resumes to structured JSON.
#[derive(Parser, Debug)]
#[command(
    name = "resume2json",
    version,
    about = "Convert PDF resumes to structured JSON",
    long_about = "Extract the text of a PDF resume (local file or URL) and let a \
schema-constrained model shape it into JSON: personal details, skills, education, \
experience, projects, achievements, certifications and profiles.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Write JSON to this file, or into this directory as `<name>.json`.
    #[arg(short, long, env = "RESUME2JSON_OUTPUT")]
    output: Option<PathBuf>,

    /// Model ID (e.g. gemini-2.5-flash, gpt-4.1-mini).
    #[arg(long, env = "GEMINI_MODEL")]
    model: Option<String>,

    /// Route through an edgequake-llm provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "RESUME2JSON_PROVIDER")]
    provider: Option<String>,

    /// Gemini REST base URL.
    #[arg(long, env = "RESUME2JSON_BASE_URL")]
    base_url: Option<String>,

    /// Structuring API key.
    #[arg(long, env = "RESUME2JSON_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Endpoint returning {"apiKey": "..."}.
    #[arg(long, env = "RESUME2JSON_KEY_URL")]
    key_url: Option<String>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "RESUME2JSON_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Path to the pdfium shared library.
    #[arg(long, env = "RESUME2JSON_PDFIUM_LIB")]
    pdfium_lib: Option<PathBuf>,

    /// Path to a text file replacing the default structuring instruction.
    #[arg(long, env = "RESUME2JSON_INSTRUCTION")]
    instruction: Option<PathBuf>,

    /// Max output tokens of the structuring call.
    #[arg(long, env = "RESUME2JSON_MAX_TOKENS", default_value_t = 8192)]
    max_tokens: usize,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, env = "RESUME2JSON_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Print the extracted text instead of structuring it.
    #[arg(long)]
    text_only: bool,

    /// Disable progress bar.
    #[arg(long, env = "RESUME2JSON_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "RESUME2JSON_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "RESUME2JSON_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "RESUME2JSON_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Structuring call timeout in seconds.
    #[arg(long, env = "RESUME2JSON_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Library INFO logs would tear the progress bar; keep them at error
    // level unless asked for.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.text_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let observer: Option<ProgressCallback> = if show_progress {
        Some(CliObserver::new() as Arc<dyn PipelineObserver>)
    } else {
        None
    };
    let config = build_config(&cli, observer).await?;

    // ── Text-only mode ───────────────────────────────────────────────────
    if cli.text_only {
        let text = extract_text(&cli.input, &config)
            .await
            .context("Text extraction failed")?;
        match &cli.output {
            Some(path) => tokio::fs::write(path, text.as_str())
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?,
            None => io::stdout()
                .lock()
                .write_all(text.as_str().as_bytes())
                .context("Failed to write to stdout")?,
        }
        if !cli.quiet {
            eprintln!(
                "Extracted {} chars from {} pages",
                text.len(),
                text.page_count()
            );
        }
        return Ok(());
    }

    // ── Run conversion ───────────────────────────────────────────────────
    let start = Instant::now();
    let output = convert(&cli.input, &config)
        .await
        .context("Conversion failed")?;

    match &cli.output {
        Some(path) => {
            let target = output_target(path, &output.artifact.file_name);
            write_artifact(&output.artifact, &target)
                .await
                .context("Failed to write output")?;
            if !cli.quiet {
                eprintln!(
                    "{}  {}ms  →  {}",
                    green("✔"),
                    start.elapsed().as_millis(),
                    bold(&target.display().to_string()),
                );
            }
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(&output.artifact.bytes)
                .context("Failed to write to stdout")?;
            handle.write_all(b"\n").ok();
            if !cli.quiet && !show_progress {
                eprintln!(
                    "{} Converted in {}ms",
                    cyan("◆"),
                    start.elapsed().as_millis()
                );
            }
        }
    }

    Ok(())
}

/// A directory (existing, or spelled with a trailing separator) receives
/// `<name>.json`; anything else is the file itself.
fn output_target(path: &Path, artifact_name: &str) -> PathBuf {
    let spelled_as_dir = path
        .as_os_str()
        .to_string_lossy()
        .ends_with(std::path::MAIN_SEPARATOR);
    if path.is_dir() || spelled_as_dir {
        path.join(artifact_name)
    } else {
        path.to_path_buf()
    }
}

/// Map CLI args to `ResumeConfig`.
async fn build_config(cli: &Cli, observer: Option<ProgressCallback>) -> Result<ResumeConfig> {
    let mut builder = ResumeConfig::builder()
        .max_output_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .download_timeout_secs(cli.download_timeout)
        .api_timeout_secs(cli.api_timeout);

    if let Some(ref path) = cli.instruction {
        let instruction = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read instruction from {:?}", path))?;
        builder = builder.instruction(instruction.trim().to_string());
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(ref url) = cli.base_url {
        builder = builder.base_url(url.clone());
    }
    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key.clone());
    }
    if let Some(ref url) = cli.key_url {
        builder = builder.key_url(url.clone());
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password.clone());
    }
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_library_path(lib.clone());
    }
    if let Some(observer) = observer {
        builder = builder.observer(observer);
    }

    builder.build().context("Invalid configuration")
}
