//! Instructions sent to the structuring service.
//!
//! Every prompt lives here so the wording can change in one place and tests
//! can inspect it without a live service. Callers override the default via
//! [`crate::config::ResumeConfig::instruction`].

/// Default instruction placed before the extracted resume text.
pub const DEFAULT_INSTRUCTION: &str = "Parse the following resume text and structure it into a JSON object based on the provided schema. Only return the valid JSON object. Here is the resume text:";

/// System prompt for providers that cannot take a response schema natively.
///
/// The placeholder `{schema}` is replaced with the pretty-printed schema.
const SCHEMA_SYSTEM_PROMPT: &str = r#"You convert resume text into JSON.

Follow these rules precisely:

1. SHAPE
   - Output a single JSON object matching this schema:
{schema}
   - Every leaf value is a string. Never emit numbers or booleans.
   - Omit any field you cannot find in the text. Do NOT invent values
     and do NOT emit empty-string placeholders.

2. CONTENT
   - Copy values from the resume text; keep original spelling and dates.
   - Group skills by category exactly as the resume does.

3. OUTPUT FORMAT
   - Output ONLY the JSON object
   - Do NOT wrap it in ```json fences
   - Do NOT add commentary or explanations"#;

/// Build the user turn: instruction, blank line, raw text.
pub fn structuring_prompt(instruction: &str, text: &str) -> String {
    format!("{instruction}\n\n{text}")
}

/// Build the schema-carrying system prompt for prompt-only providers.
pub fn schema_system_prompt(schema_json: &str) -> String {
    SCHEMA_SYSTEM_PROMPT.replace("{schema}", schema_json)
}
