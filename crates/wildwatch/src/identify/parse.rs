//! Tolerant parsing of the model's free-text answer.
//!
//! The model is asked for pure JSON but routinely wraps it in prose or code
//! fences. [`extract_json_object`] finds the object, [`parse_identification`]
//! turns it into an [`IdentificationResult`], filling any missing field with
//! a default instead of rejecting the whole answer.

use serde_json::{Map, Value};

use super::{Category, IdentificationResult, Safety};

/// Name used when the model omits one.
pub const DEFAULT_NAME: &str = "Inconnu";
/// Scientific name used when the model omits one.
pub const DEFAULT_SCIENTIFIC_NAME: &str = "Non identifié";
/// Family used when the model omits one.
pub const DEFAULT_FAMILY: &str = "Famille inconnue";
/// Description used when the model omits one.
pub const DEFAULT_DESCRIPTION: &str = "Description non disponible";
/// Habitat used when the model omits one.
pub const DEFAULT_HABITAT: &str = "Habitat non spécifié";
/// Confidence used when the model omits one or sends garbage.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Outcome of parsing a model answer.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedResponse {
    /// A JSON object was found and mapped, defaults filled in.
    Parsed(IdentificationResult),
    /// No usable JSON object in the answer.
    Unparseable {
        /// Why the answer was rejected.
        reason: String,
    },
}

/// Locate the JSON object embedded in `text`.
///
/// Starts at the first `{` and returns the span up to its matching `}`,
/// ignoring braces inside JSON strings. When the braces never balance, falls
/// back to the span ending at the last `}` so the JSON parser can have the
/// final word.
#[must_use]
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }

    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Parse a model answer into an identification.
#[must_use]
pub fn parse_identification(text: &str) -> ParsedResponse {
    let Some(span) = extract_json_object(text) else {
        return ParsedResponse::Unparseable {
            reason: "no JSON object in response".to_string(),
        };
    };

    match serde_json::from_str::<Value>(span) {
        Ok(Value::Object(map)) => ParsedResponse::Parsed(from_json_object(&map)),
        Ok(_) => ParsedResponse::Unparseable {
            reason: "response JSON is not an object".to_string(),
        },
        Err(e) => ParsedResponse::Unparseable {
            reason: format!("invalid JSON in response: {e}"),
        },
    }
}

fn from_json_object(map: &Map<String, Value>) -> IdentificationResult {
    IdentificationResult {
        name: text_field(map, "name", DEFAULT_NAME),
        scientific_name: text_field(map, "scientificName", DEFAULT_SCIENTIFIC_NAME),
        family: text_field(map, "family", DEFAULT_FAMILY),
        description: text_field(map, "description", DEFAULT_DESCRIPTION),
        habitat: text_field(map, "habitat", DEFAULT_HABITAT),
        safety: map
            .get("safety")
            .and_then(Value::as_str)
            .and_then(Safety::parse)
            .unwrap_or_default(),
        confidence: confidence_field(map.get("confidence")),
        category: map
            .get("category")
            .and_then(Value::as_str)
            .and_then(Category::parse)
            .unwrap_or_default(),
    }
}

fn text_field(map: &Map<String, Value>, key: &str, default: &str) -> String {
    map.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(default)
        .to_string()
}

fn confidence_field(value: Option<&Value>) -> f64 {
    let raw = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match raw {
        Some(c) if c.is_finite() => c.clamp(0.0, 1.0),
        _ => DEFAULT_CONFIDENCE,
    }
}
