//! The canonical resume record produced by a successful structuring call.
//!
//! Every leaf is an `Option<String>` and every section is optional: a field
//! the service omitted stays `None` and is omitted again on serialisation,
//! so absent data is never mistaken for an extracted empty string. Sequence
//! sections are `Option<Vec<_>>` so "absent" and "present but empty" remain
//! distinguishable.
//!
//! Field declaration order is the serialisation order, which makes the
//! exported JSON stable regardless of the key order the service used.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personal: Option<Personal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills: Option<Vec<SkillGroup>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub education: Option<Education>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience: Option<Vec<Experience>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projects: Option<Vec<Project>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub achievements: Option<Vec<Credential>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certifications: Option<Vec<Credential>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub misc: Option<Misc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Personal {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pincode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillGroup {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills: Option<String>,
}

/// Education has three fixed slots rather than a list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Education {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degree: Option<EducationEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inter: Option<EducationEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school: Option<EducationEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EducationEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpa: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Experience {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tech_stack: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// An achievement or certification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Misc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profiles: Option<Profiles>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub languages: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hobbies: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profiles {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portfolio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other: Option<String>,
}

impl ResumeRecord {
    /// Candidate name, if the service found one.
    pub fn name(&self) -> Option<&str> {
        self.personal.as_ref()?.name.as_deref()
    }

    /// `true` when the service returned no data at all (`{}`).
    pub fn is_empty(&self) -> bool {
        *self == ResumeRecord::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn absent_fields_stay_absent() {
        let record: ResumeRecord = serde_json::from_value(json!({
            "personal": { "name": "Alice" }
        }))
        .unwrap();
        let personal = record.personal.as_ref().unwrap();
        assert_eq!(personal.name.as_deref(), Some("Alice"));
        assert_eq!(personal.email, None);
        assert_eq!(record.skills, None);

        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back, json!({ "personal": { "name": "Alice" } }));
    }

    #[test]
    fn empty_sequence_is_not_absent() {
        let record: ResumeRecord = serde_json::from_value(json!({ "skills": [] })).unwrap();
        assert_eq!(record.skills, Some(vec![]));
        assert_eq!(serde_json::to_value(&record).unwrap(), json!({ "skills": [] }));
    }

    #[test]
    fn tech_stack_uses_camel_case() {
        let record: ResumeRecord = serde_json::from_value(json!({
            "projects": [{ "name": "ray", "techStack": "Rust" }]
        }))
        .unwrap();
        let project = &record.projects.as_ref().unwrap()[0];
        assert_eq!(project.tech_stack.as_deref(), Some("Rust"));
        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back["projects"][0]["techStack"], "Rust");
    }

    #[test]
    fn null_is_read_as_absent() {
        let record: ResumeRecord =
            serde_json::from_value(json!({ "misc": { "languages": null } })).unwrap();
        assert_eq!(record.misc.unwrap().languages, None);
    }

    #[test]
    fn empty_record_reports_empty() {
        let record: ResumeRecord = serde_json::from_value(json!({})).unwrap();
        assert!(record.is_empty());
        assert_eq!(record.name(), None);
    }
}
