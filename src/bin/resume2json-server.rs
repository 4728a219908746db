//! HTTP server binary for resume2json.
//!
//! Serves `POST /convert` and `GET /ping` (see `resume2json::server`).

use anyhow::{Context, Result};
use clap::Parser;
use resume2json::server::{serve, ServerState};
use resume2json::ResumeConfig;
use std::io;
use std::net::SocketAddr;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Serve PDF-resume-to-JSON conversion over HTTP.
#[derive(Parser, Debug)]
#[command(name = "resume2json-server", version, about)]
struct Args {
    /// Address to bind.
    #[arg(long, env = "RESUME2JSON_ADDR", default_value = "0.0.0.0:3000")]
    addr: SocketAddr,

    /// Shared secret expected in `/ping?token=…`. Unset: `/ping` always answers 403.
    #[arg(long, env = "PING_SECRET", hide_env_values = true)]
    ping_secret: Option<String>,

    /// Model ID.
    #[arg(long, env = "GEMINI_MODEL")]
    model: Option<String>,

    /// Route through an edgequake-llm provider instead of the native Gemini call.
    #[arg(long, env = "RESUME2JSON_PROVIDER")]
    provider: Option<String>,

    /// Structuring API key. Else GEMINI_API_KEY / API_KEY.
    #[arg(long, env = "RESUME2JSON_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Path to the pdfium shared library.
    #[arg(long, env = "RESUME2JSON_PDFIUM_LIB")]
    pdfium_lib: Option<std::path::PathBuf>,

    /// Structuring call timeout in seconds.
    #[arg(long, env = "RESUME2JSON_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "RESUME2JSON_VERBOSE")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let mut builder = ResumeConfig::builder().api_timeout_secs(args.api_timeout);
    if let Some(model) = args.model {
        builder = builder.model(model);
    }
    if let Some(provider) = args.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(key) = args.api_key {
        builder = builder.api_key(key);
    }
    if let Some(lib) = args.pdfium_lib {
        builder = builder.pdfium_library_path(lib);
    }
    let config = builder.build().context("Invalid configuration")?;

    if args.ping_secret.as_deref().map_or(true, str::is_empty) {
        info!("PING_SECRET unset; /ping will answer 403");
    }

    serve(args.addr, ServerState::new(config, args.ping_secret))
        .await
        .with_context(|| format!("Server on {} stopped", args.addr))
}
