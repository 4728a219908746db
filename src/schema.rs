//! The resume schema: a static description of the target document shape.
//!
//! The schema is data, not code. The same [`SchemaNode`] tree is
//!
//! 1. serialised into the structuring request as a response-shape
//!    constraint ([`SchemaNode::to_json`]), and
//! 2. walked over the service's reply to check that every present field has
//!    the right JSON type ([`SchemaNode::validate`]).
//!
//! The schema defines *shape*, not *required-ness*: a missing field or an
//! explicit `null` is always accepted as "absent". A `null` list entry is an
//! absent entry and is removed by [`drop_null_items`] before the record is
//! built.

use crate::error::StructureError;
use serde_json::{json, Map, Value};

/// One node of the schema tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaNode {
    String,
    Object(&'static [(&'static str, SchemaNode)]),
    Array(&'static SchemaNode),
}

const EDUCATION_ENTRY: SchemaNode = SchemaNode::Object(&[
    ("name", SchemaNode::String),
    ("branch", SchemaNode::String),
    ("board", SchemaNode::String),
    ("gpa", SchemaNode::String),
    ("location", SchemaNode::String),
    ("start", SchemaNode::String),
    ("end", SchemaNode::String),
]);

const SKILL_ENTRY: SchemaNode = SchemaNode::Object(&[
    ("category", SchemaNode::String),
    ("skills", SchemaNode::String),
]);

const EXPERIENCE_ENTRY: SchemaNode = SchemaNode::Object(&[
    ("role", SchemaNode::String),
    ("name", SchemaNode::String),
    ("location", SchemaNode::String),
    ("start", SchemaNode::String),
    ("end", SchemaNode::String),
    ("description", SchemaNode::String),
]);

const PROJECT_ENTRY: SchemaNode = SchemaNode::Object(&[
    ("name", SchemaNode::String),
    ("start", SchemaNode::String),
    ("end", SchemaNode::String),
    ("techStack", SchemaNode::String),
    ("description", SchemaNode::String),
]);

/// Shared by achievements and certifications.
const CREDENTIAL_ENTRY: SchemaNode = SchemaNode::Object(&[
    ("description", SchemaNode::String),
    ("name", SchemaNode::String),
    ("url", SchemaNode::String),
]);

/// The full resume document shape.
pub static RESUME_SCHEMA: SchemaNode = SchemaNode::Object(&[
    (
        "personal",
        SchemaNode::Object(&[
            ("name", SchemaNode::String),
            ("phone", SchemaNode::String),
            ("email", SchemaNode::String),
            ("pincode", SchemaNode::String),
            ("city", SchemaNode::String),
            ("country", SchemaNode::String),
            ("summary", SchemaNode::String),
        ]),
    ),
    ("skills", SchemaNode::Array(&SKILL_ENTRY)),
    (
        "education",
        SchemaNode::Object(&[
            ("degree", EDUCATION_ENTRY),
            ("inter", EDUCATION_ENTRY),
            ("school", EDUCATION_ENTRY),
        ]),
    ),
    ("experience", SchemaNode::Array(&EXPERIENCE_ENTRY)),
    ("projects", SchemaNode::Array(&PROJECT_ENTRY)),
    ("achievements", SchemaNode::Array(&CREDENTIAL_ENTRY)),
    ("certifications", SchemaNode::Array(&CREDENTIAL_ENTRY)),
    (
        "misc",
        SchemaNode::Object(&[
            (
                "profiles",
                SchemaNode::Object(&[
                    ("linkedin", SchemaNode::String),
                    ("github", SchemaNode::String),
                    ("portfolio", SchemaNode::String),
                    ("other", SchemaNode::String),
                ]),
            ),
            ("languages", SchemaNode::String),
            ("hobbies", SchemaNode::String),
        ]),
    ),
]);

impl SchemaNode {
    /// Render as a response schema in the OpenAPI subset the Gemini API
    /// accepts (`{"type": "OBJECT", "properties": {...}}`).
    pub fn to_json(&self) -> Value {
        match self {
            SchemaNode::String => json!({ "type": "STRING" }),
            SchemaNode::Object(fields) => {
                let properties: Map<String, Value> = fields
                    .iter()
                    .map(|(name, node)| ((*name).to_string(), node.to_json()))
                    .collect();
                json!({ "type": "OBJECT", "properties": properties })
            }
            SchemaNode::Array(items) => json!({ "type": "ARRAY", "items": items.to_json() }),
        }
    }

    /// Check that `value` has this node's shape.
    ///
    /// Missing fields and `null` are accepted anywhere; keys the schema does
    /// not name are ignored (they are dropped when the record is built).
    pub fn validate(&self, value: &Value) -> Result<(), StructureError> {
        self.validate_at(value, "$")
    }

    fn validate_at(&self, value: &Value, path: &str) -> Result<(), StructureError> {
        match (self, value) {
            (_, Value::Null) if path != "$" => Ok(()),
            (SchemaNode::String, Value::String(_)) => Ok(()),
            (SchemaNode::Object(fields), Value::Object(map)) => {
                for (name, node) in fields.iter() {
                    if let Some(child) = map.get(*name) {
                        node.validate_at(child, &format!("{path}.{name}"))?;
                    }
                }
                Ok(())
            }
            (SchemaNode::Array(items), Value::Array(values)) => {
                for (i, child) in values.iter().enumerate() {
                    items.validate_at(child, &format!("{path}[{i}]"))?;
                }
                Ok(())
            }
            _ => Err(StructureError::SchemaMismatch {
                path: path.to_string(),
                expected: self.kind().to_string(),
                found: json_kind(value).to_string(),
            }),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            SchemaNode::String => "string",
            SchemaNode::Object(_) => "object",
            SchemaNode::Array(_) => "array",
        }
    }
}

/// Remove `null` entries from every array in `value`, recursively.
pub fn drop_null_items(value: &mut Value) {
    match value {
        Value::Array(items) => {
            items.retain(|item| !item.is_null());
            items.iter_mut().for_each(drop_null_items);
        }
        Value::Object(map) => map.values_mut().for_each(drop_null_items),
        _ => {}
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_json_uses_gemini_type_names() {
        let schema = RESUME_SCHEMA.to_json();
        assert_eq!(schema["type"], "OBJECT");
        assert_eq!(schema["properties"]["personal"]["properties"]["email"]["type"], "STRING");
        assert_eq!(schema["properties"]["skills"]["type"], "ARRAY");
        assert_eq!(
            schema["properties"]["skills"]["items"]["properties"]["category"]["type"],
            "STRING"
        );
        assert_eq!(
            schema["properties"]["projects"]["items"]["properties"]["techStack"]["type"],
            "STRING"
        );
        assert_eq!(
            schema["properties"]["misc"]["properties"]["profiles"]["properties"]["github"]["type"],
            "STRING"
        );
    }

    #[test]
    fn education_has_three_fixed_keys() {
        let schema = RESUME_SCHEMA.to_json();
        let education = schema["properties"]["education"]["properties"]
            .as_object()
            .unwrap();
        let mut keys: Vec<&str> = education.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["degree", "inter", "school"]);
        assert_eq!(education["inter"]["properties"]["gpa"]["type"], "STRING");
    }

    #[test]
    fn empty_object_is_valid() {
        assert!(RESUME_SCHEMA.validate(&json!({})).is_ok());
    }

    #[test]
    fn partial_resume_is_valid() {
        let reply = json!({
            "personal": { "name": "Alice" },
            "skills": [{ "category": "languages", "skills": "Go, Rust" }],
            "education": { "degree": { "gpa": "3.9" } }
        });
        assert!(RESUME_SCHEMA.validate(&reply).is_ok());
    }

    #[test]
    fn nulls_and_unknown_keys_are_accepted() {
        let reply = json!({
            "personal": { "name": null, "nickname": "Al" },
            "projects": null,
            "hobbies_top_level": 3
        });
        assert!(RESUME_SCHEMA.validate(&reply).is_ok());
    }

    #[test]
    fn numeric_leaf_is_rejected_with_path() {
        let reply = json!({ "education": { "degree": { "gpa": 3.9 } } });
        let err = RESUME_SCHEMA.validate(&reply).unwrap_err();
        assert_eq!(
            err,
            StructureError::SchemaMismatch {
                path: "$.education.degree.gpa".into(),
                expected: "string".into(),
                found: "number".into(),
            }
        );
    }

    #[test]
    fn array_items_are_checked() {
        let reply = json!({ "experience": [{ "role": "Dev" }, "not an object"] });
        match RESUME_SCHEMA.validate(&reply) {
            Err(StructureError::SchemaMismatch { path, found, .. }) => {
                assert_eq!(path, "$.experience[1]");
                assert_eq!(found, "string");
            }
            other => panic!("expected mismatch, got {other:?}"),
        }
    }

    #[test]
    fn null_list_entries_are_dropped() {
        let mut reply = json!({
            "skills": [null, { "category": "Languages", "skills": null }],
            "misc": { "profiles": { "other": null } },
            "achievements": [null]
        });
        assert!(RESUME_SCHEMA.validate(&reply).is_ok());
        drop_null_items(&mut reply);
        assert_eq!(
            reply,
            json!({
                "skills": [{ "category": "Languages", "skills": null }],
                "misc": { "profiles": { "other": null } },
                "achievements": []
            })
        );
    }

    #[test]
    fn root_must_be_an_object() {
        assert!(RESUME_SCHEMA.validate(&json!([])).is_err());
        assert!(RESUME_SCHEMA.validate(&Value::Null).is_err());
    }
}
