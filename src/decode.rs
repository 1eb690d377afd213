//! Response decoding for both flows.
//!
//! The tagging flow decodes in two stages: find a fenced code block (falling
//! back to the whole text), then strictly parse that content as a JSON array.
//! Element types and vocabulary membership are not checked.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

/// Tagging-flow decode failures.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Extracted content is not JSON at all.
    #[error("response is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    /// Extracted content is JSON, but not an array.
    #[error("response is not a JSON array (found {found})")]
    NotArray {
        /// JSON type that was found instead.
        found: &'static str,
    },
}

/// Content selected for JSON parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JsonPayload<'a> {
    /// Text to parse.
    pub content: &'a str,
    /// Whether it came from a fenced code block.
    pub fenced: bool,
}

fn fence_regex() -> Option<&'static Regex> {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    FENCE
        .get_or_init(|| match Regex::new(r"(?is)```(?:json)?\s*(.*?)\s*```") {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "code fence pattern failed to compile; parsing full replies"
                );
                None
            }
        })
        .as_ref()
}

/// Stage one: pick the first fenced block's body, or the whole trimmed text.
pub fn extract_json_payload(raw: &str) -> JsonPayload<'_> {
    let trimmed = raw.trim();
    let fenced = fence_regex()
        .and_then(|re| re.captures(trimmed))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|body| !body.is_empty());

    match fenced {
        Some(content) => JsonPayload {
            content,
            fenced: true,
        },
        None => JsonPayload {
            content: trimmed,
            fenced: false,
        },
    }
}

/// Stage two: strict JSON-array parse.
///
/// # Errors
///
/// Returns `DecodeError::InvalidJson` or `DecodeError::NotArray`.
pub fn parse_json_array(content: &str) -> Result<Vec<Value>, DecodeError> {
    match serde_json::from_str::<Value>(content)? {
        Value::Array(items) => Ok(items),
        other => Err(DecodeError::NotArray {
            found: json_type_name(&other),
        }),
    }
}

/// Decode a classification response into its raw array elements.
///
/// # Errors
///
/// Returns [`DecodeError`] when the selected content is not a JSON array.
pub fn decode_tags(raw: &str) -> Result<Vec<Value>, DecodeError> {
    let payload = extract_json_payload(raw);
    if !payload.fenced {
        tracing::debug!("no markdown code block found; using full content");
    }
    parse_json_array(payload.content)
}

/// Turn one decoded element into tag text.
///
/// Strings are taken verbatim; other scalars and containers use their compact
/// JSON form. `null` and blank strings yield nothing.
pub fn tag_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Decode an abstract response: surrounding whitespace removed, nothing else.
pub fn decode_abstract(raw: &str) -> String {
    raw.trim().to_owned()
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
