//! confdoc path addressing
//!
//! Addresses and patterns for locations inside configuration documents.
//!
//! # Core Concepts
//!
//! - [`PathAddress`]: Ordered key/index segments, written `a.b[2].c`
//! - [`Segment`]: One key or index step
//! - [`PathPattern`]: Address matcher with `*`, `[*]` and `**` wildcards
//! - [`IntoAddress`]: Accepts either expressions or parsed addresses
//!
//! # Example
//!
//! ```
//! use confdoc_path::{PathAddress, PathPattern};
//!
//! let address: PathAddress = "entities.user.fields.name.config".parse().unwrap();
//! let rule: PathPattern = "entities.*.fields.*.config".parse().unwrap();
//! assert!(rule.matches(&address));
//! assert!(address.starts_with(&"entities.user".parse().unwrap()));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod path;
mod pattern;

pub use path::{IntoAddress, PathAddress, PathError, Segment};
pub use pattern::{PathPattern, PatternSegment};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
