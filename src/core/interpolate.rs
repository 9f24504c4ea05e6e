//! Variable interpolation - `${path}` template compilation
//!
//! Walks arbitrarily nested JSON-like values and substitutes every
//! `${path}` occurrence with a dotted-path lookup into the context
//! variables. A string that is exactly one placeholder compiles to the
//! raw looked-up value, preserving its type; placeholders embedded in a
//! longer string splice in the value's string form. Unresolved paths
//! compile to `Null` (whole-string reference) or the empty string
//! (embedded). Callers shape-check the compiled value afterwards.

use crate::core::context::PipelineContext;
use crate::core::error::StepError;
use serde_json::Value;
use std::collections::HashMap;

/// Compile a template value against the context's current variables
pub fn compile_value(context: &PipelineContext, template: &Value) -> Value {
    match template {
        Value::String(text) => compile_string(context, text),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| compile_value(context, item))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| (key.clone(), compile_value(context, value)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn compile_string(context: &PipelineContext, text: &str) -> Value {
    let placeholder = context.placeholder();

    // A template that is exactly one reference keeps the value's type.
    if let Some(captures) = placeholder.captures(text) {
        if captures.get(0).map(|m| m.as_str()) == Some(text) {
            let path = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
            return context.get_variable(path).unwrap_or(Value::Null);
        }
    }

    let replaced = placeholder.replace_all(text, |captures: &regex::Captures<'_>| {
        let path = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
        context
            .get_variable(path)
            .map(|value| value_to_string(&value))
            .unwrap_or_default()
    });
    Value::String(replaced.into_owned())
}

/// Render a value as a plain string for splicing and diagnostics
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn type_name(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(_) => "boolean".to_string(),
        Value::Number(_) => "number".to_string(),
        Value::String(_) => "string".to_string(),
        Value::Array(_) => "array".to_string(),
        Value::Object(_) => "object".to_string(),
    }
}

/// Demand a string after compilation
pub fn require_string(value: Value, what: &str) -> Result<String, StepError> {
    match value {
        Value::String(text) => Ok(text),
        other => Err(StepError::Shape {
            what: what.to_string(),
            expected: "string",
            got: type_name(&other),
        }),
    }
}

/// Demand an array of strings after compilation
pub fn require_string_vec(value: Value, what: &str) -> Result<Vec<String>, StepError> {
    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(StepError::Shape {
                what: what.to_string(),
                expected: "array of strings",
                got: type_name(&other),
            })
        }
    };
    items
        .into_iter()
        .map(|item| match item {
            Value::String(text) => Ok(text),
            other => Err(StepError::Shape {
                what: what.to_string(),
                expected: "array of strings",
                got: format!("array containing {}", type_name(&other)),
            }),
        })
        .collect()
}

/// Demand a string-to-string map after compilation
pub fn require_string_map(value: Value, what: &str) -> Result<HashMap<String, String>, StepError> {
    let map = match value {
        Value::Object(map) => map,
        other => {
            return Err(StepError::Shape {
                what: what.to_string(),
                expected: "map of strings",
                got: type_name(&other),
            })
        }
    };
    map.into_iter()
        .map(|(key, value)| match value {
            Value::String(text) => Ok((key, text)),
            other => Err(StepError::Shape {
                what: what.to_string(),
                expected: "map of strings",
                got: format!("map containing {}", type_name(&other)),
            }),
        })
        .collect()
}
