//! Immutable views of committed documents

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use confdoc_path::PathAddress;
use serde::{Serialize, Serializer};
use serde_json::Value;

/// Read-only view of one committed document
///
/// Shares storage with the document that produced it. Later commits never
/// change an existing snapshot, and no method hands out mutable access.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot(Arc<Value>);

impl Snapshot {
    pub(crate) fn new(value: Arc<Value>) -> Self {
        Self(value)
    }

    /// Value at `address`, if present
    #[must_use]
    pub fn at(&self, address: &PathAddress) -> Option<&Value> {
        address.resolve(&self.0)
    }

    /// Owned deep copy
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::clone(&self.0)
    }

    /// Owned value, copying only if other snapshots share it
    #[must_use]
    pub fn into_value(self) -> Value {
        Arc::try_unwrap(self.0).unwrap_or_else(|shared| Value::clone(&shared))
    }

    /// Whether both snapshots are the same commit
    #[must_use]
    pub fn same_commit(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Deref for Snapshot {
    type Target = Value;

    fn deref(&self) -> &Value {
        &self.0
    }
}

impl AsRef<Value> for Snapshot {
    fn as_ref(&self) -> &Value {
        &self.0
    }
}

impl PartialEq<Value> for Snapshot {
    fn eq(&self, other: &Value) -> bool {
        *self.0 == *other
    }
}

impl From<Snapshot> for Value {
    fn from(snapshot: Snapshot) -> Self {
        snapshot.into_value()
    }
}

impl Serialize for Snapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

/// Result of a patch: the documents before and after the commit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Patched {
    /// Document the mutation started from
    pub previous: Snapshot,
    /// Committed document
    pub next: Snapshot,
}
