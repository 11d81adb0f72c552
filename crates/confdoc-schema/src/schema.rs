//! Compiled schema and the adapter seam used by the update pipeline

use std::fmt;
use std::sync::Arc;

use confdoc_path::{PathAddress, Segment};
use jsonschema::JSONSchema;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::normalize;
use crate::walk::{self, Additional};

/// Schema operations consumed by the update pipeline
///
/// Implementations are pure: no call may depend on or change shared state.
pub trait SchemaAdapter: Send + Sync {
    /// Best-effort coercion of loosely typed scalars
    fn coerce(&self, value: Value) -> Value;

    /// Fill declared defaults for absent properties, recursively
    fn fill_defaults(&self, value: Value) -> Value;

    /// Validate a complete document
    fn validate(&self, value: &Value) -> Validation;

    /// Coerce, then fill defaults
    fn normalize(&self, value: Value) -> Value {
        self.fill_defaults(self.coerce(value))
    }
}

/// One violated constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// Address of the offending value
    pub path: PathAddress,
    /// Same location as a JSON pointer
    pub pointer: String,
    /// Human readable description
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_root() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Outcome of [`SchemaAdapter::validate`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Validation {
    /// Whether the document satisfies the schema
    pub valid: bool,
    /// Violations, empty when valid
    pub errors: Vec<ValidationIssue>,
}

impl Validation {
    /// Successful validation
    #[must_use]
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    /// Outcome for the collected issues
    #[must_use]
    pub fn from_issues(errors: Vec<ValidationIssue>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

/// Scalar leaf assigned a value of an incompatible kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafMismatch {
    /// Types the schema declares for the leaf
    pub expected: Vec<String>,
    /// Kind of the offending value
    pub found: &'static str,
}

/// Errors building a [`Schema`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// Document is not a valid JSON Schema
    #[error("schema does not compile: {0}")]
    Compile(String),
}

struct Inner {
    document: Value,
    compiled: JSONSchema,
}

/// Compiled JSON Schema describing one configuration document
///
/// Cheap to clone; clones share the compiled form.
#[derive(Clone)]
pub struct Schema {
    inner: Arc<Inner>,
}

impl Schema {
    /// Compile a JSON Schema document
    ///
    /// # Errors
    /// Returns [`SchemaError::Compile`] if the document is not a valid schema
    pub fn new(document: Value) -> Result<Self, SchemaError> {
        let compiled =
            JSONSchema::compile(&document).map_err(|e| SchemaError::Compile(e.to_string()))?;
        Ok(Self {
            inner: Arc::new(Inner { document, compiled }),
        })
    }

    /// Raw schema document
    #[must_use]
    pub fn document(&self) -> &Value {
        &self.inner.document
    }

    /// Fresh document made only of schema defaults
    #[must_use]
    pub fn defaults(&self) -> Value {
        let root = self.document();
        let seed = match root.get("default") {
            Some(default) => default.clone(),
            None if walk::is_object_schema(root) => Value::Object(Map::new()),
            None => Value::Null,
        };
        normalize::fill_defaults(root, seed)
    }

    /// Sub-schema describing the value at `address`
    #[must_use]
    pub fn node_at(&self, address: &PathAddress) -> Option<&Value> {
        address
            .iter()
            .try_fold(self.document(), |node, segment| walk::child_schema(node, segment))
    }

    /// Whether the value at `address` is a record: a mapping keyed by
    /// user-defined identifiers whose entries share one schema
    #[must_use]
    pub fn is_record_at(&self, address: &PathAddress) -> bool {
        self.entry_schema_at(address).is_some()
    }

    /// Schema shared by every entry of the record at `address`
    #[must_use]
    pub fn entry_schema_at(&self, address: &PathAddress) -> Option<&Value> {
        let node = self.node_at(address)?;
        match walk::additional(node) {
            Additional::Schema(entry) if walk::is_object_schema(node) => Some(entry),
            _ => None,
        }
    }

    /// First prefix of `address` that the schema forbids and `live` lacks
    ///
    /// A prefix is forbidden when its parent schema is closed and does not
    /// declare the key. Walking stops once the schema no longer describes
    /// the location.
    #[must_use]
    pub fn unresolved_prefix(&self, address: &PathAddress, live: &Value) -> Option<PathAddress> {
        let mut node = Some(self.document());
        let mut value = Some(live);
        for (depth, segment) in address.iter().enumerate() {
            let schema = node?;
            let existing = value.and_then(|v| walk::child_value(v, segment));
            if existing.is_none() && forbids(schema, segment) {
                return Some(PathAddress::from(&address.segments()[..=depth]));
            }
            node = walk::child_schema(schema, segment);
            value = existing;
        }
        None
    }

    /// Type conflict between a scalar leaf at `address` and `value`
    ///
    /// Only leaves whose declared types are all scalar are checked, and a
    /// value that coercion would repair is not a mismatch.
    #[must_use]
    pub fn leaf_mismatch(&self, address: &PathAddress, value: &Value) -> Option<LeafMismatch> {
        let node = self.node_at(address)?;
        let declared = walk::types(node);
        if declared.is_empty() || declared.iter().any(|ty| matches!(*ty, "object" | "array")) {
            return None;
        }
        if declared.iter().any(|ty| walk::matches_type(value, ty))
            || normalize::coerce_scalar(&declared, value).is_some()
        {
            return None;
        }
        Some(LeafMismatch {
            expected: declared.into_iter().map(str::to_owned).collect(),
            found: walk::kind_name(value),
        })
    }
}

fn forbids(node: &Value, segment: &Segment) -> bool {
    match segment {
        Segment::Key(key) => walk::is_closed(node) && !walk::declares(node, key),
        Segment::Index(_) => false,
    }
}

impl SchemaAdapter for Schema {
    fn coerce(&self, value: Value) -> Value {
        normalize::coerce(self.document(), value)
    }

    fn fill_defaults(&self, value: Value) -> Value {
        normalize::fill_defaults(self.document(), value)
    }

    fn validate(&self, value: &Value) -> Validation {
        let Err(errors) = self.inner.compiled.validate(value) else {
            return Validation::ok();
        };
        let errors: Vec<ValidationIssue> = errors
            .map(|error| {
                let pointer = error.instance_path.to_string();
                ValidationIssue {
                    path: PathAddress::from_pointer(&pointer).unwrap_or_default(),
                    pointer,
                    message: error.to_string(),
                }
            })
            .collect();
        debug!(issues = errors.len(), "document failed validation");
        Validation::from_issues(errors)
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("document", self.document())
            .finish_non_exhaustive()
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner) || self.document() == other.document()
    }
}

impl TryFrom<Value> for Schema {
    type Error = SchemaError;

    fn try_from(document: Value) -> Result<Self, Self::Error> {
        Self::new(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn addr(expr: &str) -> PathAddress {
        expr.parse().unwrap()
    }

    fn nested() -> Schema {
        Schema::new(json!({
            "type": "object",
            "additionalProperties": false,
            "properties": {
                "s": {
                    "type": "object",
                    "additionalProperties": false,
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
                },
                "port": {"type": "integer", "default": 80},
                "extra": {"type": "object"}
            }
        }))
        .unwrap()
    }

    #[test]
    fn invalid_schema_fails_to_compile() {
        let err = Schema::new(json!({"type": "string", "pattern": "(unclosed"})).unwrap_err();
        assert!(matches!(err, SchemaError::Compile(_)));
    }

    #[test]
    fn defaults_are_independent_of_state() {
        let schema = nested();
        assert_eq!(
            schema.defaults(),
            json!({"s": {"b": {"c": "d", "e": "f"}}, "port": 80})
        );
    }

    #[test]
    fn node_lookup() {
        let schema = nested();
        assert_eq!(schema.node_at(&addr("s.b.c")), Some(&json!({"type": "string", "default": "d"})));
        assert_eq!(schema.node_at(&addr("s.zzz")), None);
        assert_eq!(schema.node_at(&PathAddress::root()), Some(schema.document()));
    }

    #[test]
    fn unresolved_prefix_on_closed_objects() {
        let schema = nested();
        let live = schema.defaults();
        assert_eq!(schema.unresolved_prefix(&addr("s.a"), &live), None);
        assert_eq!(schema.unresolved_prefix(&addr("s.s.s"), &live), Some(addr("s.s")));
        assert_eq!(schema.unresolved_prefix(&addr("nope"), &live), Some(addr("nope")));
        // `extra` is open
        assert_eq!(schema.unresolved_prefix(&addr("extra.x.y"), &live), None);
    }

    #[test]
    fn existing_keys_are_resolved() {
        let schema = nested();
        let live = json!({"s": {"legacy": 1}});
        assert_eq!(schema.unresolved_prefix(&addr("s.legacy"), &live), None);
    }

    #[test]
    fn leaf_mismatch_detection() {
        let schema = nested();
        assert_eq!(schema.leaf_mismatch(&addr("port"), &json!(8080)), None);
        assert_eq!(schema.leaf_mismatch(&addr("port"), &json!("8080")), None);
        assert_eq!(
            schema.leaf_mismatch(&addr("port"), &json!("eighty")),
            Some(LeafMismatch {
                expected: vec!["integer".to_owned()],
                found: "string"
            })
        );
        assert_eq!(
            schema.leaf_mismatch(&addr("s.a"), &json!(5)),
            Some(LeafMismatch {
                expected: vec!["string".to_owned()],
                found: "integer"
            })
        );
        // object nodes are left to full validation
        assert_eq!(schema.leaf_mismatch(&addr("s"), &json!(5)), None);
        assert_eq!(schema.leaf_mismatch(&addr("unknown"), &json!(5)), None);
    }

    #[test]
    fn validation_reports_issues_with_paths() {
        let schema = nested();
        let result = schema.validate(&json!({"s": {"a": 1}}));
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].path, addr("s.a"));
        assert_eq!(result.errors[0].pointer, "/s/a");

        assert!(schema.validate(&schema.defaults()).valid);
    }

    #[test]
    fn normalize_coerces_then_fills() {
        let schema = nested();
        assert_eq!(
            schema.normalize(json!({"port": "81"})),
            json!({"s": {"b": {"c": "d", "e": "f"}}, "port": 81})
        );
    }

    #[test]
    fn record_detection() {
        let schema = Schema::new(json!({
            "type": "object",
            "properties": {
                "entities": {"type": "object", "additionalProperties": {"type": "object"}},
                "server": {"type": "object", "properties": {"port": {"type": "integer"}}}
            }
        }))
        .unwrap();
        assert!(schema.is_record_at(&addr("entities")));
        assert!(!schema.is_record_at(&addr("server")));
        assert_eq!(
            schema.entry_schema_at(&addr("entities")),
            Some(&json!({"type": "object"}))
        );
    }
}
