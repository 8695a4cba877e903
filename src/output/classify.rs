// src/output/classify.rs

//! Per-line tag assignment.
//!
//! [`classify`] is a pure function of the line and the process's
//! [`StructuredOutputConfig`]; it never does IO and keeps no state.

use std::borrow::Cow;

use serde_json::{Map, Value};

use crate::config::StructuredOutputConfig;
use crate::types::{Color, Format};

/// Result of classifying one raw output line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Tag of the first matching rule, if any.
    pub tag: Option<String>,
    /// Text to display: the message field of a JSON line, otherwise the
    /// raw line.
    pub message: String,
    /// Color configured for `tag`. `None` both when no tag was assigned and
    /// when the tag has no color entry.
    pub color: Option<Color>,
}

pub fn classify(line: &str, config: &StructuredOutputConfig) -> Classification {
    let object = match config.format {
        Format::Plain => None,
        Format::Auto | Format::Json => decode_object(line),
    };

    let (tag, message) = match object {
        Some(fields) => classify_fields(line, &fields, config),
        None => (classify_text(line, config), line.to_string()),
    };

    let color = tag.as_deref().and_then(|t| config.color_for(t));

    Classification {
        tag,
        message,
        color,
    }
}

/// Decode the line as a single JSON object. Anything else (arrays, scalars,
/// invalid JSON, trailing data) yields `None`.
fn decode_object(line: &str) -> Option<Map<String, Value>> {
    let trimmed = line.trim();
    if !trimmed.starts_with('{') {
        return None;
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

fn classify_fields(
    line: &str,
    fields: &Map<String, Value>,
    config: &StructuredOutputConfig,
) -> (Option<String>, String) {
    let message = fields
        .get(&config.message_field)
        .map(|v| field_text(v).into_owned())
        .unwrap_or_else(|| line.to_string());

    let tag = config
        .tagging_rules
        .iter()
        .find(|rule| {
            fields
                .get(&rule.field)
                .is_some_and(|value| rule.value.is_match(&field_text(value)))
        })
        .map(|rule| rule.tag.clone());

    (tag, message)
}

/// Plain lines have no fields; every rule is matched against the whole line.
fn classify_text(line: &str, config: &StructuredOutputConfig) -> Option<String> {
    config
        .tagging_rules
        .iter()
        .find(|rule| rule.value.is_match(line))
        .map(|rule| rule.tag.clone())
}

fn field_text(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s.as_str()),
        Value::Null => Cow::Borrowed(""),
        other => Cow::Owned(other.to_string()),
    }
}
