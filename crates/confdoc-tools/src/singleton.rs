//! Operations over an object-shaped configuration

use confdoc_core::ConfigDocument;
use confdoc_path::PathAddress;
use serde_json::{json, Value};

use crate::definition::{self, object_input, ToolDefinition, ValueArgs};
use crate::error::ToolResult;

/// `get` and `update` at the configuration root
#[derive(Debug, Clone)]
pub struct SingletonTools {
    name: String,
    document: ConfigDocument,
    root: PathAddress,
}

impl SingletonTools {
    pub(crate) fn new(name: String, document: ConfigDocument, root: PathAddress) -> Self {
        Self {
            name,
            document,
            root,
        }
    }

    /// Tool name prefix
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn document(&self) -> &ConfigDocument {
        &self.document
    }

    /// Address of the configuration
    #[must_use]
    pub fn root(&self) -> &PathAddress {
        &self.root
    }

    /// Current configuration
    ///
    /// # Errors
    /// Never fails for a root built by [`ConfigTools::derive`](crate::ConfigTools::derive)
    pub fn get(&self) -> ToolResult<Value> {
        Ok(self.document.get_at(&self.root)?.unwrap_or(Value::Null))
    }

    /// Merge `value` into the configuration, returning it as committed
    ///
    /// # Errors
    /// The failure of the underlying patch
    pub async fn update(&self, value: Value) -> ToolResult<Value> {
        let patched = self.document.patch(&self.root, value)?.await?;
        Ok(patched.next.at(&self.root).cloned().unwrap_or(Value::Null))
    }

    pub(crate) fn definitions(&self, schema: Value) -> Vec<ToolDefinition> {
        let name = &self.name;
        vec![
            ToolDefinition::new(
                name,
                "get",
                format!("Read the {name} configuration"),
                object_input(json!({}), &[]),
            ),
            ToolDefinition::new(
                name,
                "update",
                format!("Merge changes into the {name} configuration"),
                object_input(json!({"value": schema}), &["value"]),
            ),
        ]
    }

    pub(crate) async fn call(&self, operation: &str, arguments: Value) -> ToolResult<Option<Value>> {
        match operation {
            "get" => {
                definition::decode::<serde_json::Map<String, Value>>(arguments)?;
                self.get().map(Some)
            }
            "update" => {
                let args: ValueArgs = definition::decode(arguments)?;
                self.update(args.value).await.map(Some)
            }
            _ => Ok(None),
        }
    }
}
