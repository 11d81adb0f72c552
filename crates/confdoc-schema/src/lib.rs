//! confdoc schema collaborator
//!
//! JSON Schema backed implementation of the operations the mutation engine
//! needs from its schema: coercion, default filling and validation, plus the
//! structural queries and derived views used around the engine.
//!
//! # Core Concepts
//!
//! - [`Schema`]: Compiled JSON Schema, cheap to clone
//! - [`SchemaAdapter`]: `coerce` / `fill_defaults` / `validate` seam
//! - [`Validation`]: Validation outcome with [`ValidationIssue`] details
//!
//! # Example
//!
//! ```
//! use confdoc_schema::{Schema, SchemaAdapter};
//! use serde_json::json;
//!
//! let schema = Schema::new(json!({
//!     "type": "object",
//!     "properties": {"port": {"type": "integer", "default": 80}}
//! }))
//! .unwrap();
//!
//! assert_eq!(schema.defaults(), json!({"port": 80}));
//! assert_eq!(schema.normalize(json!({"port": "8080"})), json!({"port": 8080}));
//! assert!(schema.validate(&json!({"port": 1})).valid);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod normalize;
mod schema;
mod view;
mod walk;

pub use schema::{LeafMismatch, Schema, SchemaAdapter, SchemaError, Validation, ValidationIssue};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
