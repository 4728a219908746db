//! Structuring service backends.
//!
//! A [`StructuringService`] accepts a prompt plus the resume schema and
//! answers with a [`ReplyEnvelope`]: zero or more candidates, each holding
//! content parts. The envelope mirrors the Gemini `generateContent` reply,
//! which is the native backend; other providers wrap their single text
//! answer into the same shape so the structurer handles every backend the
//! same way.
//!
//! - [`gemini::GeminiService`] — direct REST call with a native response
//!   schema constraint.
//! - [`provider::LlmProviderService`] — any `edgequake-llm` provider, with
//!   the schema carried in the system prompt.

pub mod gemini;
pub mod provider;

use crate::credentials::ApiKey;
use crate::error::StructureError;
use crate::prompts::structuring_prompt;
use crate::schema::SchemaNode;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use gemini::GeminiService;
pub use provider::LlmProviderService;

/// One structuring request: instruction, raw text, and the shape constraint.
#[derive(Debug, Clone)]
pub struct StructuringRequest<'a> {
    pub instruction: &'a str,
    pub text: &'a str,
    pub schema: &'static SchemaNode,
}

impl<'a> StructuringRequest<'a> {
    pub fn new(instruction: &'a str, text: &'a str, schema: &'static SchemaNode) -> Self {
        Self {
            instruction,
            text,
            schema,
        }
    }

    /// The user-turn text: instruction followed by the extracted resume text.
    pub fn prompt(&self) -> String {
        structuring_prompt(self.instruction, self.text)
    }
}

/// Remote text-to-JSON capability.
#[async_trait]
pub trait StructuringService: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    /// Whether [`Self::generate`] needs an [`ApiKey`]. When `true` the
    /// structurer obtains one before calling and fails early without it.
    fn requires_credential(&self) -> bool {
        true
    }

    /// Send one request. No retries: a failure is terminal for the call.
    async fn generate(
        &self,
        request: &StructuringRequest<'_>,
        api_key: Option<&ApiKey>,
    ) -> Result<ReplyEnvelope, StructureError>;
}

/// Reply envelope: `candidates[i].content.parts[j].text`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplyEnvelope {
    #[serde(default)]
    pub candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
    #[serde(default, rename = "finishReason", skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Option<Vec<ContentPart>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentPart {
    #[serde(default)]
    pub text: Option<String>,
}

impl ReplyEnvelope {
    /// An envelope holding a single candidate with one text part.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            candidates: Some(vec![Candidate {
                content: Some(CandidateContent {
                    parts: Some(vec![ContentPart {
                        text: Some(text.into()),
                    }]),
                }),
                finish_reason: None,
            }]),
        }
    }

    /// `candidates[0].content.parts[0].text`, or a description of what is
    /// missing along that path.
    pub fn first_text(&self) -> Result<&str, StructureError> {
        let shape = |detail: &str| StructureError::UnexpectedReplyShape {
            detail: detail.to_string(),
        };
        let candidate = self
            .candidates
            .as_deref()
            .and_then(|candidates| candidates.first())
            .ok_or_else(|| shape("reply has no candidates"))?;
        let content = candidate.content.as_ref().ok_or_else(|| match &candidate.finish_reason {
            Some(reason) => shape(&format!("first candidate has no content (finishReason: {reason})")),
            None => shape("first candidate has no content"),
        })?;
        let part = content
            .parts
            .as_deref()
            .and_then(|parts| parts.first())
            .ok_or_else(|| shape("first candidate has no content parts"))?;
        part.text
            .as_deref()
            .ok_or_else(|| shape("first content part has no text"))
    }
}
