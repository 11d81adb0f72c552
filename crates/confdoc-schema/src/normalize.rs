//! Coercion and default filling
//!
//! Both passes are total: input that cannot be improved is returned
//! unchanged and left for validation to reject.

use confdoc_path::Segment;
use serde_json::{Map, Number, Value};

use crate::walk::{child_schema, is_object_schema, item, matches_type, property, types};

/// Best-effort scalar coercion, recursing through objects and arrays
pub(crate) fn coerce(node: &Value, value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, entry)| {
                    let entry = match child_schema(node, &Segment::Key(key.clone())) {
                        Some(schema) => coerce(schema, entry),
                        None => entry,
                    };
                    (key, entry)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .enumerate()
                .map(|(index, entry)| match item(node, index) {
                    Some(schema) => coerce(schema, entry),
                    None => entry,
                })
                .collect(),
        ),
        scalar => {
            let declared = types(node);
            if declared.is_empty() || declared.iter().any(|ty| matches_type(&scalar, ty)) {
                scalar
            } else {
                coerce_scalar(&declared, &scalar).unwrap_or(scalar)
            }
        }
    }
}

/// Convert a scalar into the first declared type that accepts it
///
/// Numeric strings become numbers, `"true"`/`"false"` become booleans and
/// integral floats become integers. Nothing is ever turned into a string.
pub(crate) fn coerce_scalar(declared: &[&str], value: &Value) -> Option<Value> {
    declared.iter().find_map(|ty| match (*ty, value) {
        ("integer", Value::String(text)) => text.trim().parse::<i64>().ok().map(Value::from),
        ("integer", Value::Number(number)) => integral(number),
        ("number", Value::String(text)) => parse_number(text.trim()),
        ("boolean", Value::String(text)) => match text.trim() {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        _ => None,
    })
}

#[allow(clippy::cast_possible_truncation)]
fn integral(number: &Number) -> Option<Value> {
    let float = number.as_f64()?;
    // beyond 2^53 the float no longer identifies one integer
    if float.fract() == 0.0 && float.abs() < 9_007_199_254_740_992.0 {
        Some(Value::from(float as i64))
    } else {
        None
    }
}

fn parse_number(text: &str) -> Option<Value> {
    if let Ok(int) = text.parse::<i64>() {
        return Some(Value::from(int));
    }
    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}

/// Recursively fill declared defaults for absent properties
pub(crate) fn fill_defaults(node: &Value, value: Value) -> Value {
    match value {
        Value::Object(mut map) => {
            let declared = node.get("properties").and_then(Value::as_object);
            if let Some(properties) = declared {
                for (key, schema) in properties {
                    let filled = match map.remove(key) {
                        Some(existing) => Some(fill_defaults(schema, existing)),
                        None => seed(schema),
                    };
                    if let Some(filled) = filled {
                        map.insert(key.clone(), filled);
                    }
                }
            }
            if let Some(extra) = node.get("additionalProperties").filter(|s| s.is_object()) {
                for (key, entry) in &mut map {
                    if !declared.is_some_and(|d| d.contains_key(key)) {
                        *entry = fill_defaults(extra, std::mem::take(entry));
                    }
                }
            }
            Value::Object(map)
        }
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .enumerate()
                .map(|(index, entry)| match item(node, index) {
                    Some(schema) => fill_defaults(schema, entry),
                    None => entry,
                })
                .collect(),
        ),
        other => other,
    }
}

/// Initial value for an absent property, if the schema implies one
///
/// An explicit `default` wins. Otherwise an object-shaped property is
/// materialised when its own defaults make it non-empty.
pub(crate) fn seed(schema: &Value) -> Option<Value> {
    if let Some(default) = schema.get("default") {
        return Some(fill_defaults(schema, default.clone()));
    }
    if is_object_schema(schema) {
        let seeded = fill_defaults(schema, Value::Object(Map::new()));
        if seeded.as_object().is_some_and(|map| !map.is_empty()) {
            return Some(seeded);
        }
    }
    None
}

/// Whether `key` would be back-filled after removal
pub(crate) fn has_default(node: &Value, key: &str) -> bool {
    property(node, key).and_then(seed).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn coerces_numeric_strings() {
        let node = json!({
            "type": "object",
            "properties": {
                "port": {"type": "integer"},
                "ratio": {"type": "number"},
                "on": {"type": "boolean"},
                "name": {"type": "string"}
            }
        });
        let value = json!({"port": "8080", "ratio": "0.5", "on": "true", "name": "x"});
        assert_eq!(
            coerce(&node, value),
            json!({"port": 8080, "ratio": 0.5, "on": true, "name": "x"})
        );
    }

    #[test]
    fn never_coerces_to_string() {
        let node = json!({"type": "string"});
        assert_eq!(coerce(&node, json!(5)), json!(5));
        assert_eq!(coerce_scalar(&["string"], &json!(5)), None);
    }

    #[test]
    fn uncoercible_values_pass_through() {
        let node = json!({"type": "integer"});
        assert_eq!(coerce(&node, json!("abc")), json!("abc"));
        assert_eq!(coerce(&node, json!(2.5)), json!(2.5));
    }

    #[test]
    fn coerces_array_items() {
        let node = json!({"type": "array", "items": {"type": "integer"}});
        assert_eq!(coerce(&node, json!(["1", 2, "x"])), json!([1, 2, "x"]));
    }

    #[test]
    fn fills_flat_defaults() {
        let node = json!({"type": "object", "properties": {"a": {"type": "string", "default": "b"}}});
        assert_eq!(fill_defaults(&node, json!({})), json!({"a": "b"}));
        assert_eq!(fill_defaults(&node, json!({"a": "test"})), json!({"a": "test"}));
    }

    #[test]
    fn materialises_nested_objects_with_defaults() {
        let node = json!({
            "type": "object",
            "properties": {
                "s": {
                    "type": "object",
                    "properties": {
                        "a": {"type": "string"},
                        "b": {
                            "type": "object",
                            "properties": {
                                "c": {"type": "string", "default": "d"},
                                "e": {"type": "string", "default": "f"}
                            }
                        }
                    }
                }
            }
        });
        assert_eq!(
            fill_defaults(&node, json!({})),
            json!({"s": {"b": {"c": "d", "e": "f"}}})
        );
    }

    #[test]
    fn leaves_empty_objects_out() {
        let node = json!({
            "type": "object",
            "properties": {"opt": {"type": "object", "properties": {"x": {"type": "string"}}}}
        });
        assert_eq!(fill_defaults(&node, json!({})), json!({}));
    }

    #[test]
    fn fills_record_entries_and_items() {
        let node = json!({
            "type": "object",
            "additionalProperties": {
                "type": "object",
                "properties": {"enabled": {"type": "boolean", "default": true}}
            }
        });
        assert_eq!(
            fill_defaults(&node, json!({"a": {}, "b": {"enabled": false}})),
            json!({"a": {"enabled": true}, "b": {"enabled": false}})
        );

        let list = json!({"type": "array", "items": {"type": "object", "properties": {"w": {"default": 1}}}});
        assert_eq!(fill_defaults(&list, json!([{}, {"w": 2}])), json!([{"w": 1}, {"w": 2}]));
    }

    #[test]
    fn record_defaults_skip_declared_properties() {
        let node = json!({
            "type": "object",
            "properties": {"meta": {"type": "object"}},
            "additionalProperties": {
                "type": "object",
                "properties": {"enabled": {"type": "boolean", "default": true}}
            }
        });
        assert_eq!(
            fill_defaults(&node, json!({"meta": {}, "x": {}})),
            json!({"meta": {}, "x": {"enabled": true}})
        );
    }

    #[test]
    fn default_values_are_filled_too() {
        let node = json!({
            "type": "object",
            "properties": {
                "server": {
                    "type": "object",
                    "default": {"host": "localhost"},
                    "properties": {
                        "host": {"type": "string"},
                        "port": {"type": "integer", "default": 80}
                    }
                }
            }
        });
        assert_eq!(
            fill_defaults(&node, json!({})),
            json!({"server": {"host": "localhost", "port": 80}})
        );
    }

    #[test]
    fn has_default_detection() {
        let node = json!({
            "properties": {
                "a": {"default": 1},
                "b": {"type": "string"}
            }
        });
        assert!(has_default(&node, "a"));
        assert!(!has_default(&node, "b"));
        assert!(!has_default(&node, "zzz"));
    }
}
