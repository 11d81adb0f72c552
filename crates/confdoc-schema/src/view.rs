//! Derived schema views: clean schema and secret metadata

use confdoc_path::{PathPattern, PatternSegment, Segment};
use serde_json::Value;

use crate::schema::{Schema, SchemaError};
use crate::walk::{self, Additional, SUBSCHEMA_KEYWORDS, SUBSCHEMA_MAP_KEYWORDS};

impl Schema {
    /// Copy of this schema relaxed for partial updates
    ///
    /// Every `required` and `default` keyword and every `x-` vendor keyword
    /// is removed at each schema position. Property names are untouched and
    /// the original schema is not modified.
    ///
    /// # Errors
    /// Returns [`SchemaError`] if the stripped document fails to compile
    pub fn clean(&self) -> Result<Self, SchemaError> {
        let mut document = self.document().clone();
        strip(&mut document);
        Self::new(document)
    }

    /// Patterns addressing every value marked `"secret": true`
    ///
    /// Record entries become `*` and array items `[*]`.
    #[must_use]
    pub fn secret_patterns(&self) -> Vec<PathPattern> {
        let mut found = Vec::new();
        collect_secrets(self.document(), &mut Vec::new(), &mut found);
        found
    }

    /// Copy of `value` without secret values
    ///
    /// Secret properties are dropped; secret array items become `null` so
    /// positions of the remaining items hold.
    #[must_use]
    pub fn redact(&self, value: &Value) -> Value {
        let mut copy = value.clone();
        redact_in(self.document(), &mut copy);
        copy
    }
}

fn strip(node: &mut Value) {
    let Value::Object(map) = node else {
        return;
    };
    map.remove("required");
    map.remove("default");
    map.retain(|keyword, _| !keyword.starts_with("x-"));

    for keyword in SUBSCHEMA_KEYWORDS {
        match map.get_mut(*keyword) {
            Some(Value::Array(list)) => list.iter_mut().for_each(strip),
            Some(sub) => strip(sub),
            None => {}
        }
    }
    for keyword in SUBSCHEMA_MAP_KEYWORDS {
        if let Some(Value::Object(subs)) = map.get_mut(*keyword) {
            subs.values_mut().for_each(strip);
        }
    }
}

fn collect_secrets(node: &Value, prefix: &mut Vec<PatternSegment>, found: &mut Vec<PathPattern>) {
    if walk::is_secret(node) {
        found.push(PathPattern::new(prefix.clone()));
        return;
    }
    if let Some(Value::Object(properties)) = node.get("properties") {
        for (key, schema) in properties {
            prefix.push(PatternSegment::Exact(Segment::key(key)));
            collect_secrets(schema, prefix, found);
            prefix.pop();
        }
    }
    if let Additional::Schema(entry) = walk::additional(node) {
        prefix.push(PatternSegment::AnySegment);
        collect_secrets(entry, prefix, found);
        prefix.pop();
    }
    let tuple = node
        .get("prefixItems")
        .or_else(|| node.get("items").filter(|items| items.is_array()));
    if let Some(Value::Array(positions)) = tuple {
        for (index, schema) in positions.iter().enumerate() {
            prefix.push(PatternSegment::Exact(Segment::Index(index)));
            collect_secrets(schema, prefix, found);
            prefix.pop();
        }
    }
    if let Some(items @ Value::Object(_)) = node.get("items") {
        prefix.push(PatternSegment::AnyIndex);
        collect_secrets(items, prefix, found);
        prefix.pop();
    }
}

fn redact_in(node: &Value, value: &mut Value) {
    match value {
        Value::Object(map) => map.retain(|key, entry| {
            match walk::child_schema(node, &Segment::key(key.as_str())) {
                Some(schema) if walk::is_secret(schema) => false,
                Some(schema) => {
                    redact_in(schema, entry);
                    true
                }
                None => true,
            }
        }),
        Value::Array(items) => {
            for (index, entry) in items.iter_mut().enumerate() {
                match walk::item(node, index) {
                    Some(schema) if walk::is_secret(schema) => *entry = Value::Null,
                    Some(schema) => redact_in(schema, entry),
                    None => {}
                }
            }
        }
        _ => {}
    }
}
