//! Argument checks against a tool's declared schema.
//!
//! Only the parts of JSON Schema that tool providers actually emit are
//! checked: the top-level `required` list, primitive property `type`s, and
//! `additionalProperties: false`.

use serde_json::{Map, Value};

use super::ToolError;

/// Reject arguments that cannot satisfy `schema`.
pub fn check_arguments(schema: &Value, arguments: &Value) -> Result<(), ToolError> {
    let args = arguments
        .as_object()
        .ok_or_else(|| ToolError::Validation("arguments must be a JSON object".into()))?;

    let empty = Map::new();
    let properties = schema
        .get("properties")
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for name in required.iter().filter_map(Value::as_str) {
            if !args.contains_key(name) {
                return Err(ToolError::Validation(format!(
                    "missing required argument '{name}'"
                )));
            }
        }
    }

    let closed = schema.get("additionalProperties") == Some(&Value::Bool(false));

    for (name, value) in args {
        let Some(property) = properties.get(name) else {
            if closed {
                return Err(ToolError::Validation(format!("unexpected argument '{name}'")));
            }
            continue;
        };
        if let Some(expected) = property.get("type") {
            if !matches_type(expected, value) {
                return Err(ToolError::Validation(format!(
                    "argument '{name}' should be {}",
                    describe_type(expected)
                )));
            }
        }
    }

    Ok(())
}

/// `type` may be a single name or a list of names.
fn matches_type(expected: &Value, value: &Value) -> bool {
    match expected {
        Value::String(name) => matches_named(name, value),
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .any(|name| matches_named(name, value)),
        _ => true,
    }
}

fn matches_named(name: &str, value: &Value) -> bool {
    match name {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => is_integral(value),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        "null" => value.is_null(),
        // Unknown type keywords are not ours to enforce.
        _ => true,
    }
}

/// `3.0` counts as an integer; models often send integral floats.
fn is_integral(value: &Value) -> bool {
    value.is_i64()
        || value.is_u64()
        || value.as_f64().is_some_and(|f| f.is_finite() && f.fract() == 0.0)
}

fn describe_type(expected: &Value) -> String {
    match expected {
        Value::String(name) => name.clone(),
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(" or "),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "user_id": {"type": "string"},
                "limit": {"type": "integer"},
                "tags": {"type": ["array", "null"]}
            },
            "required": ["user_id"]
        })
    }

    #[test]
    fn test_accepts_valid_arguments() {
        let args = json!({"user_id": "42", "limit": 3, "tags": null});
        assert!(check_arguments(&user_schema(), &args).is_ok());
    }

    #[test]
    fn test_rejects_non_object() {
        let err = check_arguments(&user_schema(), &json!("42")).unwrap_err();
        assert!(matches!(err, ToolError::Validation(_)));
    }

    #[test]
    fn test_rejects_missing_required() {
        let err = check_arguments(&user_schema(), &json!({"limit": 1})).unwrap_err();
        assert!(err.to_string().contains("user_id"));
    }

    #[test]
    fn test_rejects_wrong_type() {
        let err = check_arguments(&user_schema(), &json!({"user_id": 42})).unwrap_err();
        assert!(err.to_string().contains("should be string"));

        let err = check_arguments(&user_schema(), &json!({"user_id": "1", "limit": 1.5}))
            .unwrap_err();
        assert!(err.to_string().contains("integer"));
    }

    #[test]
    fn test_integral_float_is_an_integer() {
        let args = json!({"user_id": "1", "limit": 3.0});
        assert!(check_arguments(&user_schema(), &args).is_ok());

        let negative = json!({"user_id": "1", "limit": -2.0});
        assert!(check_arguments(&user_schema(), &negative).is_ok());
    }

    #[test]
    fn test_extra_arguments_allowed_unless_closed() {
        let args = json!({"user_id": "1", "note": "hi"});
        assert!(check_arguments(&user_schema(), &args).is_ok());

        let mut closed = user_schema();
        closed["additionalProperties"] = json!(false);
        let err = check_arguments(&closed, &args).unwrap_err();
        assert!(err.to_string().contains("note"));
    }

    #[test]
    fn test_empty_schema_accepts_any_object() {
        assert!(check_arguments(&json!({}), &json!({})).is_ok());
        assert!(check_arguments(&json!({"type": "object"}), &json!({"x": 1})).is_ok());
    }
}
