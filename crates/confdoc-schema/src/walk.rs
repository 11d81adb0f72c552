//! Structural walking over JSON Schema nodes
//!
//! Only the keywords that describe document shape are followed:
//! `properties`, `additionalProperties`, `items` and `prefixItems`.

use confdoc_path::Segment;
use serde_json::Value;

/// Keywords whose value is a subschema (or a list of subschemas)
pub(crate) const SUBSCHEMA_KEYWORDS: &[&str] = &[
    "items",
    "prefixItems",
    "additionalItems",
    "additionalProperties",
    "unevaluatedProperties",
    "unevaluatedItems",
    "propertyNames",
    "contains",
    "not",
    "if",
    "then",
    "else",
    "anyOf",
    "oneOf",
    "allOf",
];

/// Keywords whose value maps names to subschemas
pub(crate) const SUBSCHEMA_MAP_KEYWORDS: &[&str] =
    &["properties", "patternProperties", "$defs", "definitions", "dependentSchemas"];

/// What `additionalProperties` allows on an object node
#[derive(Debug, Clone, Copy)]
pub(crate) enum Additional<'s> {
    /// Keyword absent or `true`
    Allowed,
    /// `false`
    Forbidden,
    /// Subschema for every undeclared key
    Schema(&'s Value),
}

/// Declared `type` names of a node
pub(crate) fn types(node: &Value) -> Vec<&str> {
    match node.get("type") {
        Some(Value::String(name)) => vec![name.as_str()],
        Some(Value::Array(names)) => names.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

pub(crate) fn property<'s>(node: &'s Value, key: &str) -> Option<&'s Value> {
    node.get("properties")?.as_object()?.get(key)
}

pub(crate) fn declares(node: &Value, key: &str) -> bool {
    property(node, key).is_some()
}

pub(crate) fn additional(node: &Value) -> Additional<'_> {
    match node.get("additionalProperties") {
        Some(Value::Bool(false)) => Additional::Forbidden,
        Some(schema @ Value::Object(_)) => Additional::Schema(schema),
        _ => Additional::Allowed,
    }
}

/// Subschema of the array element at `index`
pub(crate) fn item(node: &Value, index: usize) -> Option<&Value> {
    if let Some(Value::Array(tuple)) = node.get("prefixItems") {
        if let Some(schema) = tuple.get(index) {
            return Some(schema);
        }
        return node.get("items").filter(|items| items.is_object());
    }
    match node.get("items") {
        Some(Value::Array(tuple)) => tuple.get(index),
        Some(schema @ Value::Object(_)) => Some(schema),
        _ => None,
    }
}

pub(crate) fn is_object_schema(node: &Value) -> bool {
    let declared = types(node);
    if declared.is_empty() {
        node.get("properties").is_some() || node.get("additionalProperties").is_some()
    } else {
        declared.contains(&"object")
    }
}

fn is_array_schema(node: &Value) -> bool {
    let declared = types(node);
    if declared.is_empty() {
        node.get("items").is_some() || node.get("prefixItems").is_some()
    } else {
        declared.contains(&"array")
    }
}

pub(crate) fn is_closed(node: &Value) -> bool {
    matches!(additional(node), Additional::Forbidden)
}

/// Subschema reached by one address segment
pub(crate) fn child_schema<'s>(node: &'s Value, segment: &Segment) -> Option<&'s Value> {
    if let Some(key) = segment.as_key() {
        if let Some(schema) = property(node, key) {
            return Some(schema);
        }
    }
    if is_array_schema(node) {
        if let Some(index) = segment.as_index() {
            return item(node, index);
        }
    }
    match additional(node) {
        Additional::Schema(schema) => Some(schema),
        Additional::Allowed | Additional::Forbidden => None,
    }
}

/// Value reached by one address segment
pub(crate) fn child_value<'v>(value: &'v Value, segment: &Segment) -> Option<&'v Value> {
    match value {
        Value::Object(map) => map.get(&*segment.to_key()),
        Value::Array(items) => items.get(segment.as_index()?),
        _ => None,
    }
}

pub(crate) fn is_secret(node: &Value) -> bool {
    node.get("secret").and_then(Value::as_bool) == Some(true)
}

/// JSON Schema name for the kind of a value
pub(crate) fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

pub(crate) fn matches_type(value: &Value, type_name: &str) -> bool {
    match type_name {
        "null" => value.is_null(),
        "boolean" => value.is_boolean(),
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => {
            value.is_i64()
                || value.is_u64()
                || value.as_f64().is_some_and(|f| f.is_finite() && f.fract() == 0.0)
        }
        "array" => value.is_array(),
        "object" => value.is_object(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn types_from_string_and_list() {
        assert_eq!(types(&json!({"type": "string"})), vec!["string"]);
        assert_eq!(types(&json!({"type": ["string", "null"]})), vec!["string", "null"]);
        assert!(types(&json!({})).is_empty());
    }

    #[test]
    fn child_schema_prefers_declared_properties() {
        let node = json!({
            "type": "object",
            "properties": {"a": {"type": "string"}},
            "additionalProperties": {"type": "integer"}
        });
        assert_eq!(
            child_schema(&node, &Segment::key("a")),
            Some(&json!({"type": "string"}))
        );
        assert_eq!(
            child_schema(&node, &Segment::key("other")),
            Some(&json!({"type": "integer"}))
        );
    }

    #[test]
    fn child_schema_for_items_and_tuples() {
        let list = json!({"type": "array", "items": {"type": "string"}});
        assert_eq!(
            child_schema(&list, &Segment::Index(3)),
            Some(&json!({"type": "string"}))
        );
        assert_eq!(
            child_schema(&list, &Segment::key("3")),
            Some(&json!({"type": "string"}))
        );

        let tuple = json!({"type": "array", "prefixItems": [{"type": "string"}, {"type": "integer"}]});
        assert_eq!(
            child_schema(&tuple, &Segment::Index(1)),
            Some(&json!({"type": "integer"}))
        );
        assert_eq!(child_schema(&tuple, &Segment::Index(2)), None);
    }

    #[test]
    fn closed_detection() {
        assert!(is_closed(&json!({"additionalProperties": false})));
        assert!(!is_closed(&json!({"additionalProperties": true})));
        assert!(!is_closed(&json!({})));
    }

    #[test]
    fn integer_matching_accepts_integral_floats() {
        assert!(matches_type(&json!(3), "integer"));
        assert!(matches_type(&json!(3.0), "integer"));
        assert!(!matches_type(&json!(3.5), "integer"));
        assert!(matches_type(&json!(3.5), "number"));
    }
}
