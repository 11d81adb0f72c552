//! Restricted subtrees
//!
//! A [`RestrictionGuard`] is built per call from the document rules, so a
//! bypass view and a normal view of the same document never share a cached
//! decision.

use confdoc_path::{PathAddress, PathPattern, Segment};
use serde_json::Value;

/// Decides whether a write touches a restricted subtree
#[derive(Debug, Clone, Copy)]
pub struct RestrictionGuard<'r> {
    restricted: &'r [PathPattern],
    bypass: bool,
}

impl<'r> RestrictionGuard<'r> {
    /// Guard enforcing the given restricted prefixes
    #[inline]
    #[must_use]
    pub fn new(restricted: &'r [PathPattern]) -> Self {
        Self {
            restricted,
            bypass: false,
        }
    }

    /// Guard that never reports a restriction
    #[inline]
    #[must_use]
    pub fn bypass() -> Self {
        Self {
            restricted: &[],
            bypass: true,
        }
    }

    /// Whether this guard ignores its configuration
    #[inline]
    #[must_use]
    pub fn is_bypass(&self) -> bool {
        self.bypass
    }

    /// Whether `address` equals or lies below a restricted prefix
    #[must_use]
    pub fn is_restricted(&self, address: &PathAddress) -> bool {
        !self.bypass
            && self
                .restricted
                .iter()
                .any(|pattern| pattern.matches_prefix_of(address))
    }

    /// Whether writing `value` at `address` reaches a restricted address
    #[must_use]
    pub fn is_value_restricted(&self, address: &PathAddress, value: &Value) -> bool {
        self.find_in_value(address, value).is_some()
    }

    /// First restricted address formed by `address` and the keys and
    /// indices of `value`
    #[must_use]
    pub fn find_in_value(&self, address: &PathAddress, value: &Value) -> Option<PathAddress> {
        if self.bypass {
            return None;
        }
        let mut at = address.clone();
        self.walk(&mut at, value)
    }

    /// Whether some restricted subtree lies strictly below `address`
    ///
    /// Replacing or removing the value at such an address would discard
    /// restricted content.
    #[must_use]
    pub fn guards_below(&self, address: &PathAddress) -> bool {
        !self.bypass
            && self
                .restricted
                .iter()
                .any(|pattern| pattern.may_match_below(address))
    }

    fn walk(&self, at: &mut PathAddress, value: &Value) -> Option<PathAddress> {
        if self.is_restricted(at) {
            return Some(at.clone());
        }
        match value {
            Value::Object(map) => map.iter().find_map(|(key, child)| {
                at.push(Segment::key(key.as_str()));
                let hit = self.walk(at, child);
                at.pop();
                hit
            }),
            Value::Array(items) => items.iter().enumerate().find_map(|(index, child)| {
                at.push(index);
                let hit = self.walk(at, child);
                at.pop();
                hit
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn addr(expr: &str) -> PathAddress {
        expr.parse().unwrap()
    }

    fn patterns(exprs: &[&str]) -> Vec<PathPattern> {
        exprs.iter().map(|e| e.parse().unwrap()).collect()
    }

    #[test]
    fn prefix_restriction() {
        let rules = patterns(&["s.b"]);
        let guard = RestrictionGuard::new(&rules);
        assert!(guard.is_restricted(&addr("s.b")));
        assert!(guard.is_restricted(&addr("s.b.c")));
        assert!(!guard.is_restricted(&addr("s")));
        assert!(!guard.is_restricted(&addr("s.a")));
    }

    #[test]
    fn value_reaching_into_restricted_subtree() {
        let rules = patterns(&["s.b"]);
        let guard = RestrictionGuard::new(&rules);
        let root = PathAddress::root();

        assert!(guard.is_value_restricted(&root, &json!({"s": {"b": {"c": "e"}}})));
        assert_eq!(
            guard.find_in_value(&addr("s"), &json!({"a": 1, "b": {"c": "e"}})),
            Some(addr("s.b"))
        );
        assert!(!guard.is_value_restricted(&addr("s"), &json!({"a": "c"})));
        assert!(!guard.is_value_restricted(&root, &json!("scalar")));
    }

    #[test]
    fn wildcard_restrictions_reach_record_entries() {
        let rules = patterns(&["auth.strategies.*.secret", "keys[*]"]);
        let guard = RestrictionGuard::new(&rules);
        assert!(guard.is_restricted(&addr("auth.strategies.github.secret")));
        assert!(!guard.is_restricted(&addr("auth.strategies.github.id")));
        assert!(guard.is_value_restricted(&addr("keys"), &json!(["a"])));
        assert!(!guard.is_value_restricted(&addr("keys"), &json!([])));
    }

    #[test]
    fn guards_below_detects_ancestors() {
        let rules = patterns(&["s.b"]);
        let guard = RestrictionGuard::new(&rules);
        assert!(guard.guards_below(&PathAddress::root()));
        assert!(guard.guards_below(&addr("s")));
        assert!(!guard.guards_below(&addr("s.b")));
        assert!(!guard.guards_below(&addr("t")));
    }

    #[test]
    fn bypass_never_restricts() {
        let guard = RestrictionGuard::bypass();
        assert!(guard.is_bypass());
        assert!(!guard.is_restricted(&addr("s.b.c")));
        assert!(!guard.is_value_restricted(&PathAddress::root(), &json!({"s": {"b": 1}})));
        assert!(!guard.guards_below(&PathAddress::root()));
    }
}
