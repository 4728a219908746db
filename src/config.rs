//! Configuration types for PDF-to-JSON conversion.
//!
//! All conversion behaviour is controlled through [`ResumeConfig`], built via
//! its [`ResumeConfigBuilder`]. Every knob lives in one cloneable struct so a
//! server can share one config across requests and build a fresh controller
//! (a fresh session) per upload.

use crate::credentials::CredentialProvider;
use crate::error::Resume2JsonError;
use crate::pipeline::extract::DocumentEngine;
use crate::progress::ProgressCallback;
use crate::service::gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::service::StructuringService;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Environment variables searched for the structuring API key, in order.
pub const DEFAULT_API_KEY_VARS: &[&str] = &["GEMINI_API_KEY", "API_KEY"];

/// Configuration for a PDF-to-JSON conversion.
///
/// Built via [`ResumeConfig::builder()`] or using [`ResumeConfig::default()`].
///
/// # Example
/// ```rust
/// use resume2json::ResumeConfig;
///
/// let config = ResumeConfig::builder()
///     .model("gemini-2.5-flash")
///     .api_timeout_secs(60)
///     .build()
///     .unwrap();
/// assert_eq!(config.api_timeout_secs, 60);
/// ```
#[derive(Clone)]
pub struct ResumeConfig {
    /// Model identifier. Default: `gemini-2.5-flash` for the native backend;
    /// required alongside `provider_name`.
    pub model: Option<String>,

    /// REST base of the Gemini API. Default: the public v1beta endpoint.
    pub base_url: String,

    /// Route structuring through a named `edgequake-llm` provider
    /// (e.g. "openai", "anthropic", "ollama") instead of the native call.
    pub provider_name: Option<String>,

    /// Pre-constructed `edgequake-llm` provider. Takes precedence over
    /// `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Pre-built structuring backend. Takes precedence over everything above.
    pub service: Option<Arc<dyn StructuringService>>,

    /// Pre-built PDF decoder. Default: pdfium.
    pub engine: Option<Arc<dyn DocumentEngine>>,

    /// Pre-built credential source. Takes precedence over `api_key`,
    /// `key_url` and `api_key_vars`.
    pub credentials: Option<Arc<dyn CredentialProvider>>,

    /// Explicit API key. Never printed by `Debug`.
    pub api_key: Option<String>,

    /// Environment variables searched for the key when neither `api_key`
    /// nor `key_url` is set. Default: `GEMINI_API_KEY`, `API_KEY`.
    pub api_key_vars: Vec<String>,

    /// Endpoint answering `{"apiKey": "..."}` with the key.
    pub key_url: Option<String>,

    /// Sampling temperature. Range 0–2. Default: 0.1.
    ///
    /// Structuring is transcription, not writing: a low temperature keeps
    /// values copied from the text instead of paraphrased.
    pub temperature: f32,

    /// Maximum tokens the service may generate. Default: 8192.
    ///
    /// A dense two-page resume serialises to roughly 2–3k tokens of JSON; a
    /// truncated reply fails as `InvalidJson`, so the cap errs high.
    pub max_output_tokens: usize,

    /// Timeout of one structuring call in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Path to the pdfium shared library. Else `PDFIUM_LIB_PATH`, `./`, then
    /// the system library.
    pub pdfium_library_path: Option<PathBuf>,

    /// Instruction placed before the resume text. If None, uses the built-in
    /// default.
    pub instruction: Option<String>,

    /// Receives progress and state events.
    pub observer: Option<ProgressCallback>,
}

impl Default for ResumeConfig {
    fn default() -> Self {
        Self {
            model: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            provider_name: None,
            provider: None,
            service: None,
            engine: None,
            credentials: None,
            api_key: None,
            api_key_vars: DEFAULT_API_KEY_VARS.iter().map(|v| v.to_string()).collect(),
            key_url: None,
            temperature: 0.1,
            max_output_tokens: 8192,
            api_timeout_secs: 120,
            download_timeout_secs: 120,
            password: None,
            pdfium_library_path: None,
            instruction: None,
            observer: None,
        }
    }
}

impl fmt::Debug for ResumeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResumeConfig")
            .field("model", &self.effective_model())
            .field("base_url", &self.base_url)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("service", &self.service.as_ref().map(|s| s.name().to_string()))
            .field("engine", &self.engine.as_ref().map(|_| "<dyn DocumentEngine>"))
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_key_vars", &self.api_key_vars)
            .field("key_url", &self.key_url)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("pdfium_library_path", &self.pdfium_library_path)
            .finish()
    }
}

impl ResumeConfig {
    /// Create a new builder for `ResumeConfig`.
    pub fn builder() -> ResumeConfigBuilder {
        ResumeConfigBuilder {
            config: Self::default(),
        }
    }

    /// The configured model, or the native default.
    pub fn effective_model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }
}

/// Builder for [`ResumeConfig`].
#[derive(Debug)]
pub struct ResumeConfigBuilder {
    config: ResumeConfig,
}

impl ResumeConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn service(mut self, service: Arc<dyn StructuringService>) -> Self {
        self.config.service = Some(service);
        self
    }

    pub fn engine(mut self, engine: Arc<dyn DocumentEngine>) -> Self {
        self.config.engine = Some(engine);
        self
    }

    pub fn credentials(mut self, credentials: Arc<dyn CredentialProvider>) -> Self {
        self.config.credentials = Some(credentials);
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn api_key_vars<I, S>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.api_key_vars = vars.into_iter().map(Into::into).collect();
        self
    }

    pub fn key_url(mut self, url: impl Into<String>) -> Self {
        self.config.key_url = Some(url.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_output_tokens(mut self, n: usize) -> Self {
        self.config.max_output_tokens = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pdfium_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library_path = Some(path.into());
        self
    }

    pub fn instruction(mut self, instruction: impl Into<String>) -> Self {
        self.config.instruction = Some(instruction.into());
        self
    }

    pub fn observer(mut self, observer: ProgressCallback) -> Self {
        self.config.observer = Some(observer);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ResumeConfig, Resume2JsonError> {
        let c = &self.config;
        if c.api_timeout_secs == 0 {
            return Err(Resume2JsonError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        if c.download_timeout_secs == 0 {
            return Err(Resume2JsonError::InvalidConfig(
                "Download timeout must be ≥ 1 second".into(),
            ));
        }
        if c.max_output_tokens == 0 {
            return Err(Resume2JsonError::InvalidConfig(
                "max_output_tokens must be ≥ 1".into(),
            ));
        }
        if !is_http_url(&c.base_url) {
            return Err(Resume2JsonError::InvalidConfig(format!(
                "base_url must be an http(s) URL, got '{}'",
                c.base_url
            )));
        }
        if let Some(url) = &c.key_url {
            if !is_http_url(url) {
                return Err(Resume2JsonError::InvalidConfig(format!(
                    "key_url must be an http(s) URL, got '{url}'"
                )));
            }
        }
        if c.instruction.as_deref().is_some_and(|i| i.trim().is_empty()) {
            return Err(Resume2JsonError::InvalidConfig(
                "instruction must not be blank".into(),
            ));
        }
        Ok(self.config)
    }
}

fn is_http_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ResumeConfig::default();
        assert_eq!(config.effective_model(), "gemini-2.5-flash");
        assert_eq!(config.temperature, 0.1);
        assert_eq!(config.max_output_tokens, 8192);
        assert_eq!(config.api_timeout_secs, 120);
        assert_eq!(config.api_key_vars, vec!["GEMINI_API_KEY", "API_KEY"]);
        assert!(config.base_url.starts_with("https://generativelanguage.googleapis.com"));
    }

    #[test]
    fn temperature_is_clamped() {
        let config = ResumeConfig::builder().temperature(9.0).build().unwrap();
        assert_eq!(config.temperature, 2.0);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = ResumeConfig::builder().api_timeout_secs(0).build().unwrap_err();
        assert!(matches!(err, Resume2JsonError::InvalidConfig(_)));
    }

    #[test]
    fn bad_urls_are_rejected() {
        assert!(ResumeConfig::builder().base_url("ftp://x").build().is_err());
        assert!(ResumeConfig::builder().key_url("/api-key").build().is_err());
        assert!(ResumeConfig::builder()
            .key_url("http://localhost:3000/api-key")
            .build()
            .is_ok());
    }

    #[test]
    fn blank_instruction_is_rejected() {
        assert!(ResumeConfig::builder().instruction("  ").build().is_err());
    }

    #[test]
    fn debug_redacts_secrets() {
        let config = ResumeConfig::builder()
            .api_key("AIzaSecretValue")
            .password("hunter2")
            .build()
            .unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("AIzaSecretValue"));
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }
}
