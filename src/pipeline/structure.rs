//! Structuring: raw resume text → validated [`ResumeRecord`].
//!
//! One attempt per call. The credential is fetched first (when the backend
//! needs one) so a missing key never produces a network request; the reply
//! is then unwrapped, parsed, and checked against [`RESUME_SCHEMA`].
//!
//! Validation is shape-only: a field may be absent or `null`, but a present
//! field must have the schema's JSON kind. Content (email format, date
//! order, ...) passes through unchanged.

use crate::credentials::CredentialProvider;
use crate::error::StructureError;
use crate::prompts::DEFAULT_INSTRUCTION;
use crate::record::ResumeRecord;
use crate::schema::{drop_null_items, RESUME_SCHEMA};
use crate::service::{StructuringRequest, StructuringService};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

#[derive(Clone)]
pub struct ResumeStructurer {
    service: Arc<dyn StructuringService>,
    credentials: Option<Arc<dyn CredentialProvider>>,
    instruction: String,
}

impl ResumeStructurer {
    pub fn new(
        service: Arc<dyn StructuringService>,
        credentials: Option<Arc<dyn CredentialProvider>>,
    ) -> Self {
        Self {
            service,
            credentials,
            instruction: DEFAULT_INSTRUCTION.to_string(),
        }
    }

    /// Replace the instruction placed before the resume text.
    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    pub fn service_name(&self) -> &str {
        self.service.name()
    }

    /// Send `text` to the structuring service and validate the reply.
    pub async fn structure(&self, text: &str) -> Result<ResumeRecord, StructureError> {
        let api_key = if self.service.requires_credential() {
            let provider = self
                .credentials
                .as_ref()
                .ok_or_else(|| StructureError::CredentialUnavailable {
                    reason: "no credential provider configured".into(),
                })?;
            Some(provider.api_key().await?)
        } else {
            None
        };

        let start = Instant::now();
        let request = StructuringRequest::new(&self.instruction, text, &RESUME_SCHEMA);
        let envelope = self.service.generate(&request, api_key.as_ref()).await?;
        let raw = envelope.first_text()?;
        let record = parse_record(raw)?;

        info!(
            "Structured {} chars via {} in {}ms",
            text.len(),
            self.service.name(),
            start.elapsed().as_millis()
        );
        Ok(record)
    }
}

/// Parse a reply text into a [`ResumeRecord`], checking its shape first.
pub fn parse_record(raw: &str) -> Result<ResumeRecord, StructureError> {
    let mut value: Value = serde_json::from_str(raw).map_err(|e| StructureError::InvalidJson {
        raw: raw.to_string(),
        detail: e.to_string(),
    })?;

    RESUME_SCHEMA.validate(&value)?;
    drop_null_items(&mut value);

    let record: ResumeRecord =
        serde_json::from_value(value).map_err(|e| StructureError::SchemaMismatch {
            path: "$".into(),
            expected: "resume object".into(),
            found: e.to_string(),
        })?;

    debug!("Reply parsed; name present: {}", record.name().is_some());
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{ApiKey, StaticCredentials};
    use crate::service::ReplyEnvelope;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct CannedService {
        reply: Result<ReplyEnvelope, StructureError>,
        calls: AtomicUsize,
        last_prompt: Mutex<Option<String>>,
    }

    impl CannedService {
        fn new(reply: Result<ReplyEnvelope, StructureError>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: AtomicUsize::new(0),
                last_prompt: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl StructuringService for CannedService {
        fn name(&self) -> &str {
            "canned"
        }

        async fn generate(
            &self,
            request: &StructuringRequest<'_>,
            api_key: Option<&ApiKey>,
        ) -> Result<ReplyEnvelope, StructureError> {
            assert!(api_key.is_some());
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_prompt.lock().unwrap() = Some(request.prompt());
            self.reply.clone()
        }
    }

    fn structurer(service: Arc<CannedService>) -> ResumeStructurer {
        ResumeStructurer::new(service, Some(Arc::new(StaticCredentials::new("k"))))
    }

    #[tokio::test]
    async fn alice_reply_becomes_a_record() {
        let service = CannedService::new(Ok(ReplyEnvelope::from_text(
            r#"{"personal":{"name":"Alice"},"skills":[{"category":"languages","skills":"Go, Rust"}]}"#,
        )));
        let record = structurer(service.clone())
            .structure("Alice\nEngineer\n\nSkills: Go, Rust\n\n")
            .await
            .unwrap();

        assert_eq!(record.name(), Some("Alice"));
        let skills = record.skills.unwrap();
        assert_eq!(skills[0].category.as_deref(), Some("languages"));
        assert!(record.education.is_none());
        let prompt = service.last_prompt.lock().unwrap().clone().unwrap();
        assert!(prompt.ends_with("Skills: Go, Rust\n\n"));
    }

    #[tokio::test]
    async fn empty_object_is_accepted() {
        let service = CannedService::new(Ok(ReplyEnvelope::from_text("{}")));
        let record = structurer(service).structure("").await.unwrap();
        assert!(record.is_empty());
    }

    #[tokio::test]
    async fn transport_failure_passes_through() {
        let service = CannedService::new(Err(StructureError::TransportFailure {
            status: Some(500),
            body: Some("oops".into()),
            detail: "Internal Server Error".into(),
        }));
        let err = structurer(service).structure("x").await.unwrap_err();
        assert!(matches!(
            err,
            StructureError::TransportFailure {
                status: Some(500),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn missing_candidates_is_unexpected_shape() {
        let service = CannedService::new(Ok(ReplyEnvelope::default()));
        let err = structurer(service).structure("x").await.unwrap_err();
        assert!(matches!(err, StructureError::UnexpectedReplyShape { .. }));
    }

    #[tokio::test]
    async fn missing_credentials_skip_the_service() {
        let service = CannedService::new(Ok(ReplyEnvelope::from_text("{}")));
        let structurer = ResumeStructurer::new(service.clone(), None);
        let err = structurer.structure("x").await.unwrap_err();
        assert!(matches!(err, StructureError::CredentialUnavailable { .. }));
        assert_eq!(service.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn parse_record_rejects_non_json() {
        match parse_record("not json") {
            Err(StructureError::InvalidJson { raw, .. }) => assert_eq!(raw, "not json"),
            other => panic!("expected InvalidJson, got {other:?}"),
        }
    }

    #[test]
    fn parse_record_reports_wrong_kinds() {
        let err = parse_record(r#"{"personal":{"phone":5551234}}"#).unwrap_err();
        match err {
            StructureError::SchemaMismatch { path, .. } => assert_eq!(path, "$.personal.phone"),
            other => panic!("expected SchemaMismatch, got {other:?}"),
        }
    }

    #[test]
    fn parse_record_keeps_absent_fields_absent() {
        let record = parse_record(r#"{"personal":{"name":"Bo","email":null}}"#).unwrap();
        let personal = record.personal.unwrap();
        assert_eq!(personal.name.as_deref(), Some("Bo"));
        assert_eq!(personal.email, None);
        assert_eq!(personal.phone, None);
    }

    #[test]
    fn parse_record_skips_null_list_entries() {
        let record =
            parse_record(r#"{"skills":[null,{"category":"Languages","skills":"Go"}],"projects":[null]}"#)
                .unwrap();
        let skills = record.skills.unwrap();
        assert_eq!(skills.len(), 1);
        assert_eq!(skills[0].category.as_deref(), Some("Languages"));
        assert_eq!(record.projects, Some(Vec::new()));
    }
}
