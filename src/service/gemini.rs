//! Native Gemini `generateContent` backend.
//!
//! The schema is passed as `generationConfig.responseSchema` with
//! `responseMimeType: application/json`, so the service itself constrains the
//! reply shape. The key travels in the `x-goog-api-key` header rather than
//! the URL, which keeps it out of proxy and access logs.

use super::{ReplyEnvelope, StructuringRequest, StructuringService};
use crate::config::ResumeConfig;
use crate::credentials::ApiKey;
use crate::error::StructureError;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Default REST base for the Generative Language API.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model when none is configured.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Longest error body kept on a [`StructureError::TransportFailure`].
const MAX_ERROR_BODY: usize = 4096;

pub struct GeminiService {
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f32,
    max_output_tokens: usize,
    timeout_secs: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<RequestContent>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct RequestContent {
    role: &'static str,
    parts: Vec<RequestPart>,
}

#[derive(Serialize)]
struct RequestPart {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
    temperature: f32,
    max_output_tokens: usize,
}

impl GeminiService {
    pub fn new(config: &ResumeConfig) -> Result<Self, StructureError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .build()
            .map_err(|e| StructureError::transport(format!("could not build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            timeout_secs: config.api_timeout_secs,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn request_body(&self, request: &StructuringRequest<'_>) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart {
                    text: request.prompt(),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: request.schema.to_json(),
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
            },
        }
    }
}

#[async_trait]
impl StructuringService for GeminiService {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(
        &self,
        request: &StructuringRequest<'_>,
        api_key: Option<&ApiKey>,
    ) -> Result<ReplyEnvelope, StructureError> {
        let api_key = api_key.ok_or_else(|| StructureError::CredentialUnavailable {
            reason: "the Gemini backend needs an API key".into(),
        })?;

        let start = Instant::now();
        let body = self.request_body(request);
        debug!(
            model = %self.model,
            key = %api_key,
            text_chars = request.text.len(),
            "Sending generateContent request"
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    StructureError::transport(format!("timed out after {}s", self.timeout_secs))
                } else {
                    StructureError::transport(e.to_string())
                }
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| StructureError::TransportFailure {
            status: Some(status.as_u16()),
            body: None,
            detail: format!("could not read reply body: {e}"),
        })?;

        if !status.is_success() {
            warn!("Gemini answered HTTP {}", status.as_u16());
            return Err(StructureError::TransportFailure {
                status: Some(status.as_u16()),
                body: Some(truncate(&text, MAX_ERROR_BODY)),
                detail: status
                    .canonical_reason()
                    .unwrap_or("non-success status")
                    .to_string(),
            });
        }

        let envelope: ReplyEnvelope =
            serde_json::from_str(&text).map_err(|e| StructureError::TransportFailure {
                status: Some(status.as_u16()),
                body: Some(truncate(&text, MAX_ERROR_BODY)),
                detail: format!("malformed reply envelope: {e}"),
            })?;

        debug!("Gemini replied in {}ms", start.elapsed().as_millis());
        Ok(envelope)
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}\u{2026}", &s[..end])
}
