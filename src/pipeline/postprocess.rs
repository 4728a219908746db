//! Post-processing: deterministic cleanup of free-text structuring replies.
//!
//! Services that honour a response schema return bare JSON. Prompt-only
//! providers frequently do not: the object arrives wrapped in ` ```json `
//! fences, with CRLF line endings, a leading BOM, or a sentence of preamble.
//! These rules remove that packaging without touching the JSON itself, so
//! the parse step in [`crate::pipeline::structure`] sees what the model meant.
//!
//! ## Rule Order
//!
//! Invisible characters go first so a BOM cannot hide an opening fence;
//! line endings are normalised before fence matching; the object slice runs
//! last, on already-unwrapped text.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to a raw reply.
///
/// Rules (applied in order):
/// 1. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens) outside
///    string values
/// 2. Normalise line endings (CRLF → LF)
/// 3. Strip outer code fences (` ```json `, ` ``` `)
/// 4. Slice out the outermost `{ ... }` when prose surrounds it
///
/// A reply that contains no object at all is returned trimmed, so the JSON
/// parser reports the real content back as `InvalidJson`.
pub fn clean_reply_text(input: &str) -> String {
    let s = remove_invisible_chars(input);
    let s = normalise_line_endings(&s);
    let s = strip_code_fences(&s);
    slice_outer_object(&s).trim().to_string()
}

// ── Rule 1: Remove invisible Unicode ─────────────────────────────────────────

const INVISIBLE: [char; 6] = [
    '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
];

/// Drops [`INVISIBLE`] characters except inside JSON string literals, where
/// joiners are part of names written in Indic scripts or emoji sequences.
fn remove_invisible_chars(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_string = false;
    let mut escaped = false;
    for c in input.chars() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
        } else if INVISIBLE.contains(&c) {
            continue;
        } else if c == '"' {
            in_string = true;
        }
        out.push(c);
    }
    out
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Strip outer code fences ──────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?si)^```(?:json)?[ \t]*\n(.*?)\n?```\s*$").unwrap());

fn strip_code_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

// ── Rule 4: Slice the outermost object ───────────────────────────────────────

fn slice_outer_object(input: &str) -> &str {
    match (input.find('{'), input.rfind('}')) {
        (Some(start), Some(end)) if start < end => &input[start..=end],
        _ => input,
    }
}
