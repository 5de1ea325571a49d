//! Turns the model's text answer into an [`ExtractionResult`].

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

use super::{ExtractionError, ExtractionResult};
use crate::sanitize::truncate_for_log;
use crate::taxonomy::OrderType;
use crate::validation::parse_order_date;

static RE_FENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"```(?:json|JSON)?").unwrap());

/// Parses a model answer. Code fences are removed, and when prose surrounds
/// the JSON the first balanced object is used.
///
/// Fails only when no JSON object can be recovered at all; missing, null or
/// oddly typed fields just come back as `None`.
pub fn parse_response(text: &str) -> Result<ExtractionResult, ExtractionError> {
    let cleaned = strip_code_fences(text);
    if cleaned.is_empty() {
        return Err(ExtractionError::EmptyResponse);
    }

    let value = match serde_json::from_str::<Value>(&cleaned) {
        Ok(value) => value,
        Err(first_err) => {
            let embedded = first_json_object(&cleaned).ok_or_else(|| {
                ExtractionError::InvalidJson {
                    reason: first_err.to_string(),
                }
            })?;
            serde_json::from_str::<Value>(embedded).map_err(|e| ExtractionError::InvalidJson {
                reason: e.to_string(),
            })?
        }
    };

    let object = into_object(value)?;
    Ok(read_fields(&object))
}

fn into_object(value: Value) -> Result<Map<String, Value>, ExtractionError> {
    match value {
        Value::Object(map) => Ok(map),
        // Some answers wrap the object in a one-element array.
        Value::Array(items) if items.len() == 1 => match items.into_iter().next() {
            Some(Value::Object(map)) => Ok(map),
            Some(other) => Err(ExtractionError::InvalidJson {
                reason: format!("expected an object, got an array of {}", type_name(&other)),
            }),
            None => Err(ExtractionError::InvalidJson {
                reason: "expected an object, got an empty array".to_string(),
            }),
        },
        other => Err(ExtractionError::InvalidJson {
            reason: format!("expected an object, got {}", type_name(&other)),
        }),
    }
}

/// Removes every ```json / ``` marker and trims the rest.
pub fn strip_code_fences(text: &str) -> String {
    RE_FENCE.replace_all(text, "").trim().to_string()
}

fn read_fields(object: &Map<String, Value>) -> ExtractionResult {
    let order_date = lenient_string(object.get("orderDate")).and_then(|raw| {
        match parse_order_date(&raw) {
            Some(date) => Some(date.format("%Y-%m-%d").to_string()),
            None => {
                debug!(raw = %truncate_for_log(&raw, 40), "dropping unparseable orderDate");
                None
            }
        }
    });

    // Known labels are canonicalised; unknown ones are passed on for the
    // user to correct.
    let order_type = lenient_string(object.get("type")).map(|raw| match OrderType::parse(&raw) {
        Some(t) => t.label().to_string(),
        None => raw,
    });

    ExtractionResult {
        order_number: lenient_string(object.get("orderNumber")),
        order_date,
        order_type,
        sub_type: lenient_string(object.get("subType")),
        employee_name: lenient_string(object.get("employeeName")),
        description: lenient_string(object.get("description")),
        basis: lenient_string(object.get("basis")),
    }
}

/// Strings are trimmed (blank means absent), numbers are stringified,
/// everything else is absent.
fn lenient_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty() && trimmed != "null").then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Finds the first balanced `{ ... }` in `text`, honouring string literals.
fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
