//! confdoc core - schema-governed configuration documents
//!
//! A [`ConfigDocument`] owns one configuration document that always
//! satisfies its [`Schema`](confdoc_schema::Schema). It is read through
//! immutable [`Snapshot`]s and changed through `patch`, `set`, `overwrite`
//! and `remove`, each of which runs the update pipeline:
//!
//! ```text
//! Guard → Merge → BeforeHook → Normalize → Validate → Commit → AfterHook
//! ```
//!
//! - Restricted subtrees reject writes unless issued through a
//!   [`bypass`](ConfigDocument::bypass) view
//! - Overwrite rules mark positions that merges replace wholesale
//! - Mutations on one document run one at a time, in issue order
//!
//! # Example
//!
//! ```
//! use confdoc_core::{ConfigDocument, ConfigError};
//! use confdoc_path::PathPattern;
//! use confdoc_schema::Schema;
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), ConfigError> {
//! let schema = Schema::new(json!({
//!     "type": "object",
//!     "properties": {
//!         "auth": {
//!             "type": "object",
//!             "properties": {"secret": {"type": "string", "default": "changeme"}}
//!         }
//!     }
//! }))?;
//! let doc = ConfigDocument::builder(schema)
//!     .restrict("auth.secret".parse::<PathPattern>()?)
//!     .build()?;
//!
//! assert!(matches!(
//!     doc.patch("auth.secret", json!("x")),
//!     Err(ConfigError::Restricted { .. })
//! ));
//! doc.bypass().patch("auth.secret", json!("x"))?.await?;
//! assert_eq!(doc.get()["auth"]["secret"], json!("x"));
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod document;
pub mod error;
pub mod format;
pub mod guard;
pub mod hooks;
pub mod merge;
pub mod overwrite;
pub mod pipeline;
mod queue;
pub mod rules;
pub mod snapshot;

pub use document::{ConfigDocument, ConfigDocumentBuilder, Deferred};
pub use error::{BoxError, ConfigError, ConfigResult, ErrorClass, HookError};
pub use format::{Format, FormatError};
pub use guard::RestrictionGuard;
pub use hooks::{AfterUpdateFn, AfterUpdateHook, BeforeUpdateFn, BeforeUpdateHook};
pub use merge::DeepMerger;
pub use overwrite::OverwriteMatcher;
pub use pipeline::{Operation, Stage};
pub use rules::DocumentRules;
pub use snapshot::{Patched, Snapshot};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with configuration documents
    pub use crate::{
        AfterUpdateHook, BeforeUpdateHook, ConfigDocument, ConfigError, DocumentRules, HookError,
        Patched, Snapshot,
    };
    pub use confdoc_path::{IntoAddress, PathAddress, PathPattern};
    pub use confdoc_schema::{Schema, SchemaAdapter};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
