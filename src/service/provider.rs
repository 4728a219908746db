//! Structuring through any `edgequake-llm` provider.
//!
//! Providers reached this way cannot take a response schema natively, so the
//! schema travels inside the system prompt and the free-text reply is
//! cleaned by [`crate::pipeline::postprocess::clean_reply_text`] before it is
//! wrapped into a [`ReplyEnvelope`]. Provider credentials are resolved by the
//! provider itself from its usual environment variables.

use super::{ReplyEnvelope, StructuringRequest, StructuringService};
use crate::config::ResumeConfig;
use crate::credentials::ApiKey;
use crate::error::StructureError;
use crate::pipeline::postprocess::clean_reply_text;
use crate::prompts::schema_system_prompt;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub struct LlmProviderService {
    provider: Arc<dyn LLMProvider>,
    label: String,
    options: CompletionOptions,
    timeout_secs: u64,
}

impl LlmProviderService {
    /// Wrap a pre-built provider.
    pub fn new(provider: Arc<dyn LLMProvider>, label: impl Into<String>, config: &ResumeConfig) -> Self {
        Self {
            provider,
            label: label.into(),
            options: build_options(config),
            timeout_secs: config.api_timeout_secs,
        }
    }

    /// Instantiate a named provider (`"openai"`, `"anthropic"`, `"gemini"`,
    /// ...) via [`ProviderFactory::create_llm_provider`].
    pub fn from_name(name: &str, model: &str, config: &ResumeConfig) -> Result<Self, StructureError> {
        let provider = ProviderFactory::create_llm_provider(name, model).map_err(|e| {
            StructureError::CredentialUnavailable {
                reason: format!("provider '{name}' is not configured: {e}"),
            }
        })?;
        Ok(Self::new(provider, format!("{name}/{model}"), config))
    }

    fn system_prompt(request: &StructuringRequest<'_>) -> String {
        let schema = request.schema.to_json();
        let pretty = serde_json::to_string_pretty(&schema).unwrap_or_else(|_| schema.to_string());
        schema_system_prompt(&pretty)
    }

    fn messages(request: &StructuringRequest<'_>) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(Self::system_prompt(request)),
            ChatMessage::user(request.prompt()),
        ]
    }
}

#[async_trait]
impl StructuringService for LlmProviderService {
    fn name(&self) -> &str {
        &self.label
    }

    fn requires_credential(&self) -> bool {
        false
    }

    async fn generate(
        &self,
        request: &StructuringRequest<'_>,
        _api_key: Option<&ApiKey>,
    ) -> Result<ReplyEnvelope, StructureError> {
        let start = Instant::now();
        let messages = Self::messages(request);

        let call = self.provider.chat(&messages, Some(&self.options));
        let response = tokio::time::timeout(Duration::from_secs(self.timeout_secs), call)
            .await
            .map_err(|_| StructureError::transport(format!("timed out after {}s", self.timeout_secs)))?
            .map_err(|e| {
                warn!("{}: chat request failed: {}", self.label, e);
                StructureError::transport(e.to_string())
            })?;

        debug!(
            "{}: {} input tokens, {} output tokens, {:?}",
            self.label,
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );

        Ok(ReplyEnvelope::from_text(clean_reply_text(&response.content)))
    }
}

fn build_options(config: &ResumeConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_output_tokens),
        ..Default::default()
    }
}
