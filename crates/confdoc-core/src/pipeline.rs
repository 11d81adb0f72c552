//! Update pipeline
//!
//! One mutation moves through
//! `Guard → Merge → BeforeHook → Normalize → Validate → Commit → AfterHook`.
//! [`preflight`] runs the synchronous part of `Guard` when the mutation is
//! issued; [`run`] executes the rest inside the document's write slot.

use std::fmt;

use confdoc_path::{PathAddress, Segment};
use confdoc_schema::{Schema, SchemaAdapter};
use serde_json::Value;

use crate::document::Shared;
use crate::error::{ConfigError, ConfigResult};
use crate::guard::RestrictionGuard;
use crate::merge::DeepMerger;
use crate::overwrite::OverwriteMatcher;
use crate::rules::DocumentRules;
use crate::snapshot::{Patched, Snapshot};

static ROOT: PathAddress = PathAddress::ROOT;

/// Pipeline stage, used in errors and trace events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Restriction, path and leaf type checks
    Guard,
    /// Candidate document construction
    Merge,
    /// `before_update` hook
    BeforeHook,
    /// Coercion and default filling
    Normalize,
    /// Schema validation
    Validate,
    /// Replacement of the stored document
    Commit,
    /// `after_update` hook
    AfterHook,
}

impl Stage {
    /// Stable lowercase name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Guard => "guard",
            Self::Merge => "merge",
            Self::BeforeHook => "before-update hook",
            Self::Normalize => "normalize",
            Self::Validate => "validate",
            Self::Commit => "commit",
            Self::AfterHook => "after-update hook",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One mutation of a document
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Deep-merge `value` at `address`
    Patch { address: PathAddress, value: Value },
    /// Deep-merge `value` at the root
    Set { value: Value },
    /// Replace the value at `address` with `value`
    Overwrite { address: PathAddress, value: Value },
    /// Delete the value at `address`
    Remove { address: PathAddress },
}

impl Operation {
    /// Operation name
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Patch { .. } => "patch",
            Self::Set { .. } => "set",
            Self::Overwrite { .. } => "overwrite",
            Self::Remove { .. } => "remove",
        }
    }

    /// Target address
    #[must_use]
    pub fn address(&self) -> &PathAddress {
        match self {
            Self::Patch { address, .. }
            | Self::Overwrite { address, .. }
            | Self::Remove { address } => address,
            Self::Set { .. } => &ROOT,
        }
    }

    /// Value written, if any
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Patch { value, .. } | Self::Set { value } | Self::Overwrite { value, .. } => {
                Some(value)
            }
            Self::Remove { .. } => None,
        }
    }
}

/// Checks resolved from rules and schema alone, before anything is queued
///
/// The live document is never read here.
///
/// # Errors
/// [`ConfigError::Restricted`] or [`ConfigError::LeafType`]
pub(crate) fn preflight(
    operation: &Operation,
    rules: &DocumentRules,
    schema: &Schema,
    bypass: bool,
) -> ConfigResult<()> {
    let guard = rules.guard(bypass);
    let address = operation.address();

    let restricted = match operation {
        Operation::Patch { value, .. } | Operation::Set { value } => {
            write_conflict(&guard, &rules.overwrite_matcher(), &mut address.clone(), value)
        }
        Operation::Overwrite { .. } | Operation::Remove { .. } => {
            (guard.is_restricted(address) || guard.guards_below(address)).then(|| address.clone())
        }
    };
    if let Some(path) = restricted {
        tracing::warn!(operation = operation.name(), %path, "write to restricted path rejected");
        return Err(ConfigError::Restricted { path });
    }

    if let Some(value) = operation.value().filter(|_| !address.is_root()) {
        if let Some(mismatch) = schema.leaf_mismatch(address, value) {
            return Err(ConfigError::LeafType {
                path: address.clone(),
                expected: mismatch.expected,
                found: mismatch.found,
            });
        }
    }
    Ok(())
}

/// Restricted address a merge of `value` at `at` would touch
///
/// Besides the addresses spelled out by `value`, a position that the merge
/// replaces wholesale conflicts when a restricted subtree lies below it.
fn write_conflict(
    guard: &RestrictionGuard<'_>,
    overwrite: &OverwriteMatcher<'_>,
    at: &mut PathAddress,
    value: &Value,
) -> Option<PathAddress> {
    if guard.is_restricted(at) {
        return Some(at.clone());
    }
    let Value::Object(map) = value else {
        return guard.guards_below(at).then(|| at.clone());
    };
    if overwrite.matches(at) && guard.guards_below(at) {
        return Some(at.clone());
    }
    map.iter().find_map(|(key, child)| {
        at.push(Segment::key(key.as_str()));
        let hit = write_conflict(guard, overwrite, at, child);
        at.pop();
        hit
    })
}

/// Execute a mutation; the caller holds the write slot
pub(crate) async fn run(shared: &Shared, operation: Operation) -> ConfigResult<Patched> {
    let previous = shared.current();
    let address = operation.address().clone();

    tracing::debug!(stage = %Stage::Merge, "building candidate");
    if !matches!(operation, Operation::Remove { .. }) {
        if let Some(path) = shared.schema.unresolved_prefix(&address, &previous) {
            tracing::warn!(%path, "path not allowed by schema");
            return Err(ConfigError::UnresolvedPath { path });
        }
    }
    let merger = DeepMerger::new(shared.rules.overwrite_matcher());
    let candidate = match operation {
        Operation::Patch { value, .. } => merger.merge(&previous, &address, value),
        Operation::Set { value } => merger.merge(&previous, &ROOT, value),
        Operation::Overwrite { value, .. } => merger.replace(&previous, &address, value),
        Operation::Remove { .. } if address.is_root() => shared.schema.defaults(),
        Operation::Remove { .. } => merger.remove(&previous, &address),
    };

    let before = shared.hooks.read().before.clone();
    let candidate = match before {
        Some(hook) => {
            tracing::debug!(stage = %Stage::BeforeHook, "running hook");
            hook.before_update(&previous, candidate)
                .await
                .map_err(|source| ConfigError::hook(Stage::BeforeHook, source))?
        }
        None => candidate,
    };

    tracing::debug!(stage = %Stage::Normalize, "normalizing candidate");
    let next = shared.schema.normalize(candidate);

    tracing::debug!(stage = %Stage::Validate, "validating candidate");
    let validation = shared.schema.validate(&next);
    if !validation.valid {
        tracing::warn!(issues = validation.errors.len(), "candidate failed validation");
        return Err(ConfigError::Validation {
            issues: validation.errors,
        });
    }

    let next = shared.commit(next);
    tracing::info!(stage = %Stage::Commit, "committed");

    let after = shared.hooks.read().after.clone();
    if let Some(hook) = after {
        tracing::debug!(stage = %Stage::AfterHook, "running hook");
        hook.after_update(&next)
            .await
            .map_err(|source| ConfigError::hook(Stage::AfterHook, source))?;
    }

    Ok(Patched {
        previous: Snapshot::new(previous),
        next: Snapshot::new(next),
    })
}
