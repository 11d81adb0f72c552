//! Update hooks
//!
//! A document holds at most one hook of each kind. Both run inside the
//! document's write slot, so a slow hook delays later mutations on the
//! same document.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::HookError;

/// Runs before normalization and may rewrite the candidate document
#[async_trait::async_trait]
pub trait BeforeUpdateHook: Send + Sync {
    /// Return the document to normalize, validate and commit
    ///
    /// `from` is the committed document, `to` the merged candidate.
    async fn before_update(&self, from: &Value, to: Value) -> Result<Value, HookError>;
}

/// Runs once after a commit
#[async_trait::async_trait]
pub trait AfterUpdateHook: Send + Sync {
    /// Observe the committed document
    ///
    /// An error is reported to the caller but does not undo the commit.
    async fn after_update(&self, committed: &Value) -> Result<(), HookError>;
}

/// [`BeforeUpdateHook`] backed by a synchronous closure
pub struct BeforeUpdateFn<F>(F);

impl<F> BeforeUpdateFn<F>
where
    F: Fn(&Value, Value) -> Result<Value, HookError> + Send + Sync,
{
    /// Wrap a closure
    pub fn new(hook: F) -> Self {
        Self(hook)
    }
}

#[async_trait::async_trait]
impl<F> BeforeUpdateHook for BeforeUpdateFn<F>
where
    F: Fn(&Value, Value) -> Result<Value, HookError> + Send + Sync,
{
    async fn before_update(&self, from: &Value, to: Value) -> Result<Value, HookError> {
        (self.0)(from, to)
    }
}

/// [`AfterUpdateHook`] backed by a synchronous closure
pub struct AfterUpdateFn<F>(F);

impl<F> AfterUpdateFn<F>
where
    F: Fn(&Value) -> Result<(), HookError> + Send + Sync,
{
    /// Wrap a closure
    pub fn new(hook: F) -> Self {
        Self(hook)
    }
}

#[async_trait::async_trait]
impl<F> AfterUpdateHook for AfterUpdateFn<F>
where
    F: Fn(&Value) -> Result<(), HookError> + Send + Sync,
{
    async fn after_update(&self, committed: &Value) -> Result<(), HookError> {
        (self.0)(committed)
    }
}

/// Hook registrations of one document
#[derive(Clone, Default)]
pub(crate) struct Hooks {
    pub(crate) before: Option<Arc<dyn BeforeUpdateHook>>,
    pub(crate) after: Option<Arc<dyn AfterUpdateHook>>,
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("before", &self.before.is_some())
            .field("after", &self.after.is_some())
            .finish()
    }
}
