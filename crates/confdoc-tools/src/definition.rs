//! Tool definitions and argument payloads

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{ToolError, ToolResult};

/// Tool advertised to a tool-calling client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name, `<document>_<operation>`
    pub name: String,
    /// Description for clients
    pub description: String,
    /// JSON Schema of the arguments object
    pub input_schema: Value,
}

impl ToolDefinition {
    pub(crate) fn new(prefix: &str, operation: &str, description: String, input_schema: Value) -> Self {
        Self {
            name: format!("{prefix}_{operation}"),
            description,
            input_schema,
        }
    }
}

/// Input schema for an arguments object with the given properties
pub(crate) fn object_input(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false
    })
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct KeyArgs {
    pub(crate) key: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct EntryArgs {
    pub(crate) key: String,
    pub(crate) value: Value,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ValueArgs {
    pub(crate) value: Value,
}

/// Decode a tool's arguments; `null` counts as an empty object
pub(crate) fn decode<T: DeserializeOwned>(arguments: Value) -> ToolResult<T> {
    let arguments = if arguments.is_null() { json!({}) } else { arguments };
    serde_json::from_value(arguments).map_err(|err| ToolError::InvalidArguments(err.to_string()))
}
