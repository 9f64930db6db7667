//! Defensive JSON extraction from free-form model output.
//!
//! Models are asked for a bare JSON object but regularly wrap it in code
//! fences or surround it with prose. Three strategies are tried in order:
//! the whole text, a fenced block, then the first brace-delimited span.

use std::sync::OnceLock;

use archiva_core::{Locale, LocalizedText};
use regex::Regex;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionError {
    #[error("model output is empty")]
    Empty,

    #[error("no JSON object found in model output: {0}")]
    NoJsonObject(String),
}

fn fenced_block() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"```(?:json)?\s*(\{[\s\S]*?\})\s*```").ok())
        .as_ref()
}

fn brace_span() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{[\s\S]*?\}").ok()).as_ref()
}

fn parse_object(candidate: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(candidate.trim()) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Pull the first JSON object out of `content`.
pub fn extract_json_object(content: &str) -> Result<Map<String, Value>, ExtractionError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(ExtractionError::Empty);
    }

    if let Some(map) = parse_object(content) {
        return Ok(map);
    }

    if let Some(map) = fenced_block()
        .and_then(|re| re.captures(content))
        .and_then(|caps| caps.get(1))
        .and_then(|m| parse_object(m.as_str()))
    {
        return Ok(map);
    }

    if let Some(map) = brace_span()
        .and_then(|re| re.find_iter(content).find_map(|m| parse_object(m.as_str())))
    {
        return Ok(map);
    }

    // Lazy spans stop at the first closing brace; retry with the outermost one.
    if let (Some(start), Some(end)) = (content.find('{'), content.rfind('}')) {
        if start < end {
            if let Some(map) = parse_object(&content[start..=end]) {
                return Ok(map);
            }
        }
    }

    let preview: String = content.chars().take(120).collect();
    Err(ExtractionError::NoJsonObject(preview))
}

/// Read one string per locale from an extracted object.
///
/// Non-string and missing values become empty strings; `source` keeps
/// `source_text` when the model returned nothing for it.
pub(crate) fn localized_from_object(
    object: &Map<String, Value>,
    source: Locale,
    source_text: &str,
) -> LocalizedText {
    let mut localized = LocalizedText::default();
    for locale in Locale::ALL {
        let value = object
            .get(locale.code())
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or_default();
        localized.set(locale, value.to_string());
    }
    if localized.get(source).is_empty() {
        localized.set(source, source_text.to_string());
    }
    localized
}
