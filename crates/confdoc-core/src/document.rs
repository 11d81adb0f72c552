//! Configuration document facade

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use confdoc_path::{IntoAddress, PathAddress, PathPattern};
use confdoc_schema::{Schema, SchemaAdapter};
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::Instrument;

use crate::error::{ConfigError, ConfigResult};
use crate::hooks::{AfterUpdateHook, BeforeUpdateHook, Hooks};
use crate::pipeline::{self, Operation};
use crate::queue::WriteQueue;
use crate::rules::DocumentRules;
use crate::snapshot::{Patched, Snapshot};

const DEFAULT_NAME: &str = "document";

/// State shared by a document and all of its views
pub(crate) struct Shared {
    pub(crate) name: String,
    pub(crate) schema: Schema,
    pub(crate) rules: DocumentRules,
    pub(crate) hooks: RwLock<Hooks>,
    current: RwLock<Arc<Value>>,
    queue: Arc<WriteQueue<ConfigResult<Patched>>>,
}

impl Shared {
    /// Committed document
    pub(crate) fn current(&self) -> Arc<Value> {
        Arc::clone(&self.current.read())
    }

    /// Replace the committed document
    pub(crate) fn commit(&self, next: Value) -> Arc<Value> {
        let next = Arc::new(next);
        *self.current.write() = Arc::clone(&next);
        next
    }
}

/// Mutation in flight
///
/// Synchronous checks already passed when this value was returned. Awaiting
/// it runs any earlier mutations on the same document that nobody else is
/// running, then the rest of this one's pipeline. Dropping it without
/// awaiting cancels the mutation.
#[must_use = "mutations do nothing unless awaited"]
pub struct Deferred<T> {
    inner: BoxFuture<'static, ConfigResult<T>>,
}

impl<T> Deferred<T> {
    fn new(future: impl Future<Output = ConfigResult<T>> + Send + 'static) -> Self {
        Self {
            inner: future.boxed(),
        }
    }

    fn map<U>(self, f: impl FnOnce(T) -> U + Send + 'static) -> Deferred<U>
    where
        T: 'static,
        U: 'static,
    {
        Deferred {
            inner: self.inner.map(|result| result.map(f)).boxed(),
        }
    }
}

impl<T> Future for Deferred<T> {
    type Output = ConfigResult<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.poll_unpin(cx)
    }
}

impl<T> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred").finish_non_exhaustive()
    }
}

/// Schema-governed configuration document
///
/// The stored document always validates against the schema, with defaults
/// filled in. Clones and [`bypass`](Self::bypass) views share storage,
/// rules, hooks and the write slot.
///
/// # Example
///
/// ```
/// use confdoc_core::ConfigDocument;
/// use confdoc_schema::Schema;
/// use serde_json::json;
///
/// # async fn example() -> Result<(), confdoc_core::ConfigError> {
/// let schema = Schema::new(json!({
///     "type": "object",
///     "properties": {"methods": {"type": "array", "default": ["GET", "PATCH"]}}
/// }))?;
/// let doc = ConfigDocument::builder(schema).name("server").build()?;
///
/// let patched = doc.patch("methods[0]", json!("POST"))?.await?;
/// assert_eq!(patched.next["methods"], json!(["POST", "PATCH"]));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ConfigDocument {
    shared: Arc<Shared>,
    bypass: bool,
}

impl ConfigDocument {
    /// Start building a document for `schema`
    #[must_use]
    pub fn builder(schema: Schema) -> ConfigDocumentBuilder {
        ConfigDocumentBuilder::new(schema)
    }

    /// Document seeded with `initial`, or with schema defaults
    ///
    /// # Errors
    /// Returns [`ConfigError::Validation`] if the seed does not validate
    pub fn new(schema: Schema, initial: Option<Value>) -> ConfigResult<Self> {
        let builder = Self::builder(schema);
        match initial {
            Some(initial) => builder.initial(initial).build(),
            None => builder.build(),
        }
    }

    /// Label used in trace events
    #[must_use]
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Schema governing the document
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.shared.schema
    }

    /// Restriction and overwrite rules
    #[must_use]
    pub fn rules(&self) -> &DocumentRules {
        &self.shared.rules
    }

    /// Whether this view skips restriction checks
    #[must_use]
    pub fn is_bypass(&self) -> bool {
        self.bypass
    }

    /// Mutations issued and not yet finished
    #[must_use]
    pub fn pending_mutations(&self) -> u64 {
        self.shared.queue.pending()
    }

    /// Current document
    ///
    /// Never waits for pending mutations.
    #[must_use]
    pub fn get(&self) -> Snapshot {
        Snapshot::new(self.shared.current())
    }

    /// Copy of the value at `path`, if present
    ///
    /// # Errors
    /// Returns [`ConfigError::MalformedPath`] if `path` does not parse
    pub fn get_at(&self, path: impl IntoAddress) -> ConfigResult<Option<Value>> {
        let address = path.into_address()?;
        Ok(address.resolve(&self.shared.current()).cloned())
    }

    /// Fresh document made only of schema defaults
    #[must_use]
    pub fn defaults(&self) -> Value {
        self.shared.schema.normalize(self.shared.schema.defaults())
    }

    /// Whether `path` resolves to a value in the current document
    ///
    /// # Errors
    /// Returns [`ConfigError::MalformedPath`] if `path` does not parse
    pub fn has(&self, path: impl IntoAddress) -> ConfigResult<bool> {
        let address = path.into_address()?;
        Ok(address.resolve(&self.shared.current()).is_some())
    }

    /// Deep-merge `value` at `path`
    ///
    /// Resolves to the documents before and after the commit.
    ///
    /// # Errors
    /// Synchronously: [`ConfigError::MalformedPath`],
    /// [`ConfigError::Restricted`], [`ConfigError::LeafType`].
    /// Deferred: [`ConfigError::UnresolvedPath`], [`ConfigError::Validation`],
    /// [`ConfigError::Hook`].
    pub fn patch(&self, path: impl IntoAddress, value: Value) -> ConfigResult<Deferred<Patched>> {
        self.apply(Operation::Patch {
            address: path.into_address()?,
            value,
        })
    }

    /// Deep-merge `value` at the root
    ///
    /// Fields missing from `value` are kept. Use
    /// [`overwrite`](Self::overwrite) at the root to replace the document.
    ///
    /// # Errors
    /// See [`patch`](Self::patch)
    pub fn set(&self, value: Value) -> ConfigResult<Deferred<Snapshot>> {
        Ok(self.apply(Operation::Set { value })?.map(|patched| patched.next))
    }

    /// Replace the value at `path`, ignoring overwrite rules
    ///
    /// # Errors
    /// See [`patch`](Self::patch)
    pub fn overwrite(
        &self,
        path: impl IntoAddress,
        value: Value,
    ) -> ConfigResult<Deferred<Snapshot>> {
        let operation = Operation::Overwrite {
            address: path.into_address()?,
            value,
        };
        Ok(self.apply(operation)?.map(|patched| patched.next))
    }

    /// Delete the value at `path`
    ///
    /// Properties with schema defaults come back with their default value;
    /// removing the root resets the document to its defaults.
    ///
    /// # Errors
    /// See [`patch`](Self::patch)
    pub fn remove(&self, path: impl IntoAddress) -> ConfigResult<Deferred<Snapshot>> {
        let operation = Operation::Remove {
            address: path.into_address()?,
        };
        Ok(self.apply(operation)?.map(|patched| patched.next))
    }

    /// Issue any mutation
    ///
    /// Synchronous checks run now; the returned [`Deferred`] holds this
    /// mutation's place in the document's write queue.
    ///
    /// # Errors
    /// See [`patch`](Self::patch)
    pub fn apply(&self, operation: Operation) -> ConfigResult<Deferred<Patched>> {
        let span = tracing::debug_span!(
            "mutation",
            document = %self.shared.name,
            operation = operation.name(),
            path = %operation.address(),
            bypass = self.bypass,
        );
        let _entered = span.enter();
        pipeline::preflight(&operation, &self.shared.rules, &self.shared.schema, self.bypass)?;

        let shared = Arc::downgrade(&self.shared);
        let work = async move {
            match shared.upgrade() {
                Some(shared) => pipeline::run(&shared, operation).await,
                None => Err(ConfigError::Interrupted),
            }
        };
        let ticket = self.shared.queue.submit(work.instrument(span.clone()));
        Ok(Deferred::new(async move {
            ticket
                .outcome()
                .await
                .unwrap_or(Err(ConfigError::Interrupted))
        }))
    }

    /// View of the same document that skips restriction checks
    #[must_use]
    pub fn bypass(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            bypass: true,
        }
    }

    /// Fail if writing at `path` would touch a restricted subtree
    ///
    /// # Errors
    /// [`ConfigError::MalformedPath`] or [`ConfigError::Restricted`]
    pub fn ensure_unrestricted(&self, path: impl IntoAddress) -> ConfigResult<()> {
        let address = path.into_address()?;
        if self.shared.rules.guard(self.bypass).is_restricted(&address) {
            return Err(ConfigError::Restricted { path: address });
        }
        Ok(())
    }

    /// Fail if writing `value` at the root would touch a restricted subtree
    ///
    /// # Errors
    /// [`ConfigError::Restricted`] naming the first restricted address
    pub fn ensure_value_unrestricted(&self, value: &Value) -> ConfigResult<()> {
        match self
            .shared
            .rules
            .guard(self.bypass)
            .find_in_value(&PathAddress::ROOT, value)
        {
            Some(path) => Err(ConfigError::Restricted { path }),
            None => Ok(()),
        }
    }

    /// Register the `before_update` hook, replacing any previous one
    pub fn on_before_update(&self, hook: impl BeforeUpdateHook + 'static) {
        self.shared.hooks.write().before = Some(Arc::new(hook));
    }

    /// Register the `after_update` hook, replacing any previous one
    pub fn on_after_update(&self, hook: impl AfterUpdateHook + 'static) {
        self.shared.hooks.write().after = Some(Arc::new(hook));
    }
}

impl fmt::Debug for ConfigDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigDocument")
            .field("name", &self.shared.name)
            .field("bypass", &self.bypass)
            .field("rules", &self.shared.rules)
            .field("hooks", &*self.shared.hooks.read())
            .field("current", &self.shared.current())
            .finish()
    }
}

/// Builder for [`ConfigDocument`]
#[derive(Debug)]
pub struct ConfigDocumentBuilder {
    schema: Schema,
    name: String,
    initial: Option<Value>,
    rules: DocumentRules,
    hooks: Hooks,
}

impl ConfigDocumentBuilder {
    /// Builder for `schema` with no rules and no hooks
    #[must_use]
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            name: DEFAULT_NAME.to_owned(),
            initial: None,
            rules: DocumentRules::default(),
            hooks: Hooks::default(),
        }
    }

    /// Label used in trace events
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Seed value; schema defaults when omitted
    #[must_use]
    pub fn initial(mut self, initial: Value) -> Self {
        self.initial = Some(initial);
        self
    }

    /// Replace all rules
    #[must_use]
    pub fn rules(mut self, rules: DocumentRules) -> Self {
        self.rules = rules;
        self
    }

    /// Add a restricted prefix
    #[must_use]
    pub fn restrict(mut self, pattern: PathPattern) -> Self {
        self.rules.restricted.push(pattern);
        self
    }

    /// Add an overwrite position
    #[must_use]
    pub fn overwrite_rule(mut self, pattern: PathPattern) -> Self {
        self.rules.overwrite.push(pattern);
        self
    }

    /// Register the `before_update` hook
    #[must_use]
    pub fn before_update(mut self, hook: impl BeforeUpdateHook + 'static) -> Self {
        self.hooks.before = Some(Arc::new(hook));
        self
    }

    /// Register the `after_update` hook
    #[must_use]
    pub fn after_update(mut self, hook: impl AfterUpdateHook + 'static) -> Self {
        self.hooks.after = Some(Arc::new(hook));
        self
    }

    /// Normalize and validate the seed, then build the document
    ///
    /// Hooks do not run for the seed.
    ///
    /// # Errors
    /// Returns [`ConfigError::Validation`] if the normalized seed is invalid
    pub fn build(self) -> ConfigResult<ConfigDocument> {
        let seed = self.initial.unwrap_or_else(|| self.schema.defaults());
        let current = self.schema.normalize(seed);
        let validation = self.schema.validate(&current);
        if !validation.valid {
            tracing::warn!(document = %self.name, issues = validation.errors.len(), "initial value rejected");
            return Err(ConfigError::Validation {
                issues: validation.errors,
            });
        }
        tracing::debug!(
            document = %self.name,
            restricted = self.rules.restricted.len(),
            overwrite = self.rules.overwrite.len(),
            "document ready"
        );

        Ok(ConfigDocument {
            shared: Arc::new(Shared {
                name: self.name,
                schema: self.schema,
                rules: self.rules,
                hooks: RwLock::new(self.hooks),
                current: RwLock::new(Arc::new(current)),
                queue: Arc::new(WriteQueue::default()),
            }),
            bypass: false,
        })
    }
}
