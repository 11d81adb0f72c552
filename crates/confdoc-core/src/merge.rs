//! Structural merge of incoming values into a document

use confdoc_path::{PathAddress, Segment};
use serde_json::{Map, Value};

use crate::overwrite::OverwriteMatcher;

/// Produces candidate documents from the current one
///
/// Every operation works on a copy; the input document is never modified.
///
/// # Merge rules
/// Applied top-down from the target address:
/// - a position matched by an overwrite rule takes the incoming value as is
/// - mapping meets mapping: keys are merged one by one, keys only present
///   in the current document are kept
/// - anything else, arrays included, is replaced by the incoming value
#[derive(Debug, Clone, Copy)]
pub struct DeepMerger<'r> {
    overwrite: OverwriteMatcher<'r>,
}

impl<'r> DeepMerger<'r> {
    /// Merger applying the given overwrite rules
    #[inline]
    #[must_use]
    pub fn new(overwrite: OverwriteMatcher<'r>) -> Self {
        Self { overwrite }
    }

    /// Merge `incoming` into `current` at `address`
    ///
    /// Missing intermediate containers are created: an array for an index
    /// segment, an object otherwise.
    #[must_use]
    pub fn merge(&self, current: &Value, address: &PathAddress, incoming: Value) -> Value {
        let mut next = current.clone();
        let mut at = address.clone();
        self.merge_into(slot_mut(&mut next, address), incoming, &mut at);
        next
    }

    /// Replace the value at `address` with `incoming`
    #[must_use]
    pub fn replace(&self, current: &Value, address: &PathAddress, incoming: Value) -> Value {
        let mut next = current.clone();
        *slot_mut(&mut next, address) = incoming;
        next
    }

    /// Delete the property or array element at `address`
    ///
    /// A missing target leaves the copy unchanged, and so does the root:
    /// resetting the whole document is up to the caller.
    #[must_use]
    pub fn remove(&self, current: &Value, address: &PathAddress) -> Value {
        let Some((last, parent)) = address.split_last() else {
            return current.clone();
        };
        let mut next = current.clone();
        match parent.resolve_mut(&mut next) {
            Some(Value::Object(map)) => {
                map.remove(&*last.to_key());
            }
            Some(Value::Array(items)) => {
                if let Some(index) = last.as_index().filter(|i| *i < items.len()) {
                    items.remove(index);
                }
            }
            _ => {}
        }
        next
    }

    fn merge_into(&self, existing: &mut Value, incoming: Value, at: &mut PathAddress) {
        if self.overwrite.matches(at) {
            *existing = incoming;
            return;
        }
        match (existing, incoming) {
            (Value::Object(target), Value::Object(source)) => {
                for (key, value) in source {
                    at.push(Segment::key(key.as_str()));
                    match target.get_mut(&key) {
                        Some(slot) => self.merge_into(slot, value, at),
                        None => {
                            target.insert(key, value);
                        }
                    }
                    at.pop();
                }
            }
            (existing, incoming) => *existing = incoming,
        }
    }
}

/// Walk to `address`, creating containers on the way
fn slot_mut<'v>(root: &'v mut Value, address: &PathAddress) -> &'v mut Value {
    address.iter().fold(root, child_mut)
}

fn child_mut<'v>(node: &'v mut Value, segment: &Segment) -> &'v mut Value {
    match (node, segment.as_index()) {
        (Value::Array(items), Some(index)) => {
            if items.len() <= index {
                items.resize(index + 1, Value::Null);
            }
            &mut items[index]
        }
        (Value::Object(map), _) => map.entry(segment.to_key()).or_insert(Value::Null),
        (other, _) => {
            *other = match segment {
                Segment::Index(_) => Value::Array(Vec::new()),
                Segment::Key(_) => Value::Object(Map::new()),
            };
            child_mut(other, segment)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use confdoc_path::PathPattern;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn addr(expr: &str) -> PathAddress {
        expr.parse().unwrap()
    }

    fn plain() -> DeepMerger<'static> {
        DeepMerger::new(OverwriteMatcher::none())
    }

    #[test]
    fn merges_objects_key_by_key() {
        let current = json!({"s": {"a": "x", "b": {"c": "d"}}});
        let next = plain().merge(&current, &addr("s"), json!({"a": "y", "b": {"e": "f"}}));
        assert_eq!(next, json!({"s": {"a": "y", "b": {"c": "d", "e": "f"}}}));
        // input untouched
        assert_eq!(current, json!({"s": {"a": "x", "b": {"c": "d"}}}));
    }

    #[test]
    fn creates_missing_containers() {
        let next = plain().merge(&json!({}), &addr("a.b[1].c"), json!(1));
        assert_eq!(next, json!({"a": {"b": [null, {"c": 1}]}}));
    }

    #[test]
    fn index_write_replaces_single_element() {
        let current = json!({"methods": ["GET", "PATCH"]});
        let next = plain().merge(&current, &addr("methods[0]"), json!("POST"));
        assert_eq!(next, json!({"methods": ["POST", "PATCH"]}));
    }

    #[test]
    fn arrays_are_replaced_not_merged() {
        let current = json!({"methods": ["GET", "PATCH", "PUT"]});
        let next = plain().merge(&current, &addr("methods"), json!(["DELETE"]));
        assert_eq!(next, json!({"methods": ["DELETE"]}));

        let nested = plain().merge(&current, &PathAddress::root(), json!({"methods": ["GET"]}));
        assert_eq!(nested, json!({"methods": ["GET"]}));
    }

    #[test]
    fn scalar_replaced_by_container() {
        let current = json!({"a": 1});
        let next = plain().merge(&current, &addr("a.b"), json!(2));
        assert_eq!(next, json!({"a": {"b": 2}}));
    }

    #[test]
    fn numeric_key_addresses_array_element() {
        let current = json!({"list": [1, 2, 3]});
        let next = plain().merge(&current, &addr("list.1"), json!(20));
        assert_eq!(next, json!({"list": [1, 20, 3]}));
    }

    #[test]
    fn overwrite_rules_apply_below_target() {
        let rules: Vec<PathPattern> = vec!["entities.*.fields.*.config".parse().unwrap()];
        let merger = DeepMerger::new(OverwriteMatcher::new(&rules));
        let current = json!({
            "entities": {"some": {"fields": {"a": {"type": "string", "config": {"some": "thing"}}}}}
        });

        let next = merger.merge(
            &current,
            &addr("entities.some.fields.a"),
            json!({"type": "string", "config": {"another": "one"}}),
        );

        assert_eq!(
            next["entities"]["some"]["fields"]["a"],
            json!({"type": "string", "config": {"another": "one"}})
        );
    }

    #[test]
    fn replace_ignores_existing_siblings() {
        let current = json!({"s": {"a": 1, "b": 2}});
        let next = plain().replace(&current, &addr("s"), json!({"c": 3}));
        assert_eq!(next, json!({"s": {"c": 3}}));
    }

    #[test]
    fn remove_keys_and_elements() {
        let current = json!({"a": {"x": 1, "y": 2}, "list": [1, 2, 3]});
        assert_eq!(
            plain().remove(&current, &addr("a.x")),
            json!({"a": {"y": 2}, "list": [1, 2, 3]})
        );
        assert_eq!(
            plain().remove(&current, &addr("list[1]")),
            json!({"a": {"x": 1, "y": 2}, "list": [1, 3]})
        );
    }

    #[test]
    fn remove_missing_is_noop() {
        let current = json!({"a": 1});
        assert_eq!(plain().remove(&current, &addr("b.c")), current);
        assert_eq!(plain().remove(&current, &addr("a[3]")), current);
    }

    #[test]
    fn remove_at_root_keeps_the_document() {
        let current = json!({"a": {"x": 1}});
        assert_eq!(plain().remove(&current, &PathAddress::root()), current);
    }
}
