//! Structured extraction from free-text completions.
//!
//! Models wrap answers in prose, so list and object extraction is two-stage:
//! locate the first candidate substring, then strict-parse it as JSON and
//! check its shape. Every failure is a typed [`ExtractError`]; callers turn
//! it into a fallback.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use lessonpath_shared::normalize_label;

/// Upper bound on labels kept in a prerequisite list or pathway bucket.
pub const MAX_LIST_ITEMS: usize = 6;

/// Why a completion could not be turned into a value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    /// No bracketed candidate in the text.
    #[error("no {0} found in response")]
    NotFound(&'static str),

    /// A candidate was found but is not valid JSON.
    #[error("candidate is not valid JSON: {0}")]
    Malformed(String),

    /// Valid JSON of the wrong shape.
    #[error("unexpected shape: {0}")]
    WrongShape(String),

    /// Nothing usable remained after normalization.
    #[error("response is empty after normalization")]
    Empty,
}

/// Normalize a whole response into a single label.
pub fn extract_label(response: &str) -> Result<String, ExtractError> {
    let label = normalize_label(response);
    if label.is_empty() {
        Err(ExtractError::Empty)
    } else {
        Ok(label)
    }
}

/// Extract the first JSON array of strings, normalized and capped.
///
/// An empty array is a valid answer.
pub fn extract_list(response: &str) -> Result<Vec<String>, ExtractError> {
    static ARRAY_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?s)\[.*?\]").expect("valid regex"));

    let candidate = locate(&ARRAY_RE, response, "JSON array")?;
    let parsed: Value =
        serde_json::from_str(candidate).map_err(|e| ExtractError::Malformed(e.to_string()))?;

    match parsed {
        Value::Array(items) => normalize_items(items),
        other => Err(ExtractError::WrongShape(format!(
            "expected array, got {}",
            kind(&other)
        ))),
    }
}

/// Extract the first JSON object whose values are all arrays of strings.
///
/// Entries are returned as written: nothing is normalized, dropped or
/// capped, so the caller can check every entry before trusting a list.
pub fn extract_keyed_lists(response: &str) -> Result<BTreeMap<String, Vec<String>>, ExtractError> {
    static OBJECT_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?s)\{.*?\}").expect("valid regex"));

    let candidate = locate(&OBJECT_RE, response, "JSON object")?;
    let parsed: Value =
        serde_json::from_str(candidate).map_err(|e| ExtractError::Malformed(e.to_string()))?;

    let Value::Object(map) = parsed else {
        return Err(ExtractError::WrongShape(format!(
            "expected object, got {}",
            kind(&parsed)
        )));
    };

    let mut out = BTreeMap::new();
    for (key, value) in map {
        match value {
            Value::Array(items) => {
                out.insert(key, string_items(items)?);
            }
            other => {
                return Err(ExtractError::WrongShape(format!(
                    "key '{key}' holds {}, expected array",
                    kind(&other)
                )));
            }
        }
    }

    Ok(out)
}

fn locate<'a>(re: &Regex, response: &'a str, what: &'static str) -> Result<&'a str, ExtractError> {
    re.find(response)
        .map(|m| m.as_str())
        .ok_or(ExtractError::NotFound(what))
}

fn string_items(items: Vec<Value>) -> Result<Vec<String>, ExtractError> {
    items
        .into_iter()
        .map(|item| match item {
            Value::String(raw) => Ok(raw),
            other => Err(ExtractError::WrongShape(format!(
                "list element is {}, expected string",
                kind(&other)
            ))),
        })
        .collect()
}

fn normalize_items(items: Vec<Value>) -> Result<Vec<String>, ExtractError> {
    let mut labels: Vec<String> = string_items(items)?
        .iter()
        .map(|raw| normalize_label(raw))
        .filter(|label| !label.is_empty())
        .collect();
    labels.truncate(MAX_LIST_ITEMS);
    Ok(labels)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
