//! confdoc tools - tool-calling operations derived from configuration documents
//!
//! A record-shaped configuration (entries keyed by user-defined names)
//! yields `get`, `add`, `update` and `remove`; any other configuration yields
//! `get` and `update` at its root. Input schemas come from the document's
//! clean schema view, so partial values are accepted.
//!
//! ```
//! use confdoc_core::ConfigDocument;
//! use confdoc_schema::Schema;
//! use confdoc_tools::ConfigTools;
//! use serde_json::json;
//!
//! let schema = Schema::new(json!({
//!     "type": "object",
//!     "properties": {
//!         "strategies": {"type": "object", "additionalProperties": {"type": "object"}}
//!     }
//! }))
//! .unwrap();
//! let doc = ConfigDocument::new(schema, None).unwrap();
//! let tools = ConfigTools::derive("strategies", doc, "strategies").unwrap();
//!
//! let names: Vec<_> = tools.definitions().unwrap().into_iter().map(|d| d.name).collect();
//! assert_eq!(
//!     names,
//!     ["strategies_get", "strategies_add", "strategies_update", "strategies_remove"]
//! );
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod definition;
mod error;
mod record;
mod singleton;

use confdoc_core::ConfigDocument;
use confdoc_path::IntoAddress;
use serde_json::{json, Value};

pub use definition::ToolDefinition;
pub use error::{ToolError, ToolResult};
pub use record::RecordTools;
pub use singleton::SingletonTools;

/// Tools derived from one configuration
#[derive(Debug, Clone)]
pub enum ConfigTools {
    /// Entries keyed by user-defined names
    Record(RecordTools),
    /// A single settings object
    Singleton(SingletonTools),
}

impl ConfigTools {
    /// Derive tools for the configuration at `root` of `document`
    ///
    /// Tool names are prefixed with `name`.
    ///
    /// # Errors
    /// [`ToolError::Config`] if `root` does not parse
    pub fn derive(
        name: impl Into<String>,
        document: ConfigDocument,
        root: impl IntoAddress,
    ) -> ToolResult<Self> {
        let name = name.into();
        let root = root.into_address().map_err(confdoc_core::ConfigError::from)?;
        let tools = if document.schema().is_record_at(&root) {
            Self::Record(RecordTools::new(name, document, root))
        } else {
            Self::Singleton(SingletonTools::new(name, document, root))
        };
        tracing::debug!(
            tools = tools.name(),
            root = %tools.root(),
            record = matches!(tools, Self::Record(_)),
            "derived configuration tools"
        );
        Ok(tools)
    }

    /// Tool name prefix
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Record(tools) => tools.name(),
            Self::Singleton(tools) => tools.name(),
        }
    }

    /// Address of the configuration inside its document
    #[must_use]
    pub fn root(&self) -> &confdoc_path::PathAddress {
        match self {
            Self::Record(tools) => tools.root(),
            Self::Singleton(tools) => tools.root(),
        }
    }

    fn document(&self) -> &ConfigDocument {
        match self {
            Self::Record(tools) => tools.document(),
            Self::Singleton(tools) => tools.document(),
        }
    }

    /// Definitions of every derived tool
    ///
    /// # Errors
    /// [`ToolError::Schema`] if the clean schema view cannot be built
    pub fn definitions(&self) -> ToolResult<Vec<ToolDefinition>> {
        let clean = self.document().schema().clean()?;
        Ok(match self {
            Self::Record(tools) => {
                let entry = clean.entry_schema_at(self.root()).cloned().unwrap_or_else(|| json!({}));
                tools.definitions(entry)
            }
            Self::Singleton(tools) => {
                let node = clean.node_at(self.root()).cloned().unwrap_or_else(|| json!({}));
                tools.definitions(node)
            }
        })
    }

    /// Invoke the tool called `tool` with a JSON arguments object
    ///
    /// # Errors
    /// [`ToolError::UnknownTool`] for names this configuration did not derive,
    /// [`ToolError::InvalidArguments`] for malformed arguments, or the
    /// failure of the operation itself
    pub async fn call(&self, tool: &str, arguments: Value) -> ToolResult<Value> {
        let unknown = || ToolError::UnknownTool(tool.to_owned());
        let operation = tool
            .strip_prefix(self.name())
            .and_then(|rest| rest.strip_prefix('_'))
            .ok_or_else(unknown)?;
        tracing::debug!(tool, "calling configuration tool");

        let result = match self {
            Self::Record(tools) => tools.call(operation, arguments).await,
            Self::Singleton(tools) => tools.call(operation, arguments).await,
        };
        match result {
            Ok(Some(value)) => Ok(value),
            Ok(None) => Err(unknown()),
            Err(err) => {
                tracing::warn!(tool, error = %err, "configuration tool failed");
                Err(err)
            }
        }
    }
}
