//! Artifact export: a ready record as downloadable pretty-printed JSON.

use crate::error::Resume2JsonError;
use crate::record::ResumeRecord;
use once_cell::sync::Lazy;
use regex::Regex;

/// Content type of every exported artifact.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Stem used when the input name has none.
const FALLBACK_STEM: &str = "resume";

static RE_PDF_EXTENSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\.pdf$").unwrap());

/// Bytes ready to hand to a download, a file write, or an HTTP body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Serialize `record` with two-space indentation in declaration order.
///
/// Absent fields are omitted, so parsing the bytes back yields an equal
/// record.
pub fn export(record: &ResumeRecord, source_name: &str) -> Result<Artifact, Resume2JsonError> {
    let bytes = serde_json::to_vec_pretty(record)
        .map_err(|e| Resume2JsonError::Internal(format!("JSON serialization failed: {e}")))?;
    Ok(Artifact {
        file_name: artifact_file_name(source_name),
        content_type: JSON_CONTENT_TYPE,
        bytes,
    })
}

/// `cv.pdf` → `cv.json`. Directory components are dropped.
pub fn artifact_file_name(source_name: &str) -> String {
    let base = source_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(source_name);
    let stem = RE_PDF_EXTENSION.replace(base, "");
    let stem = stem.trim();
    if stem.is_empty() {
        format!("{FALLBACK_STEM}.json")
    } else {
        format!("{stem}.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Personal, Project, SkillGroup};

    fn sample() -> ResumeRecord {
        ResumeRecord {
            personal: Some(Personal {
                name: Some("Alice".into()),
                email: Some("alice@example.com".into()),
                ..Default::default()
            }),
            skills: Some(vec![SkillGroup {
                category: Some("languages".into()),
                skills: Some("Go, Rust".into()),
            }]),
            projects: Some(vec![Project {
                name: Some("pdf tools".into()),
                tech_stack: Some("Rust".into()),
                ..Default::default()
            }]),
            ..Default::default()
        }
    }

    #[test]
    fn file_name_swaps_extension() {
        assert_eq!(artifact_file_name("alice_cv.pdf"), "alice_cv.json");
        assert_eq!(artifact_file_name("ALICE.PDF"), "ALICE.json");
        assert_eq!(artifact_file_name("/tmp/in/cv.pdf"), "cv.json");
        assert_eq!(artifact_file_name("cv.final.pdf"), "cv.final.json");
        assert_eq!(artifact_file_name(".pdf"), "resume.json");
        assert_eq!(artifact_file_name(""), "resume.json");
    }

    #[test]
    fn export_is_pretty_and_round_trips() {
        let record = sample();
        let artifact = export(&record, "alice.pdf").unwrap();
        assert_eq!(artifact.file_name, "alice.json");
        assert_eq!(artifact.content_type, "application/json");

        let text = String::from_utf8(artifact.bytes.clone()).unwrap();
        assert!(text.starts_with("{\n  \"personal\": {\n    \"name\": \"Alice\""));
        assert!(text.contains("\"techStack\": \"Rust\""));
        assert!(!text.contains("null"));

        let back: ResumeRecord = serde_json::from_slice(&artifact.bytes).unwrap();
        assert_eq!(back, record);
    }
}
