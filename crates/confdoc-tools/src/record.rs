//! Operations over a record-shaped configuration

use confdoc_core::ConfigDocument;
use confdoc_path::{PathAddress, Segment};
use serde_json::{json, Value};

use crate::definition::{self, object_input, EntryArgs, KeyArgs, ToolDefinition};
use crate::error::{ToolError, ToolResult};

/// `get`, `add`, `update` and `remove` over the entries of a record
#[derive(Debug, Clone)]
pub struct RecordTools {
    name: String,
    document: ConfigDocument,
    root: PathAddress,
}

impl RecordTools {
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

    /// Address of the record
    #[must_use]
    pub fn root(&self) -> &PathAddress {
        &self.root
    }

    fn entry(&self, key: &str) -> PathAddress {
        self.root.child(Segment::key(key))
    }

    fn require(&self, key: &str, present: bool) -> ToolResult<PathAddress> {
        let path = self.entry(key);
        match (self.document.has(&path)?, present) {
            (true, false) => Err(ToolError::AlreadyExists(key.to_owned())),
            (false, true) => Err(ToolError::NotFound(key.to_owned())),
            _ => Ok(path),
        }
    }

    /// Whole record, or one entry
    ///
    /// # Errors
    /// [`ToolError::NotFound`] if `key` names no entry
    pub fn get(&self, key: Option<&str>) -> ToolResult<Value> {
        match key {
            None => Ok(self.document.get_at(&self.root)?.unwrap_or_else(|| json!({}))),
            Some(key) => self
                .document
                .get_at(self.entry(key))?
                .ok_or_else(|| ToolError::NotFound(key.to_owned())),
        }
    }

    /// Create a new entry, returning it as committed
    ///
    /// # Errors
    /// [`ToolError::AlreadyExists`] if the key is taken, or the failure of the
    /// underlying patch
    pub async fn add(&self, key: &str, value: Value) -> ToolResult<Value> {
        let path = self.require(key, false)?;
        self.write(path, value).await
    }

    /// Merge `value` into an existing entry, returning it as committed
    ///
    /// # Errors
    /// [`ToolError::NotFound`] if the key is missing, or the failure of the
    /// underlying patch
    pub async fn update(&self, key: &str, value: Value) -> ToolResult<Value> {
        let path = self.require(key, true)?;
        self.write(path, value).await
    }

    /// Delete an entry, returning its last value
    ///
    /// # Errors
    /// [`ToolError::NotFound`] if the key is missing, or the failure of the
    /// underlying remove
    pub async fn remove(&self, key: &str) -> ToolResult<Value> {
        let path = self.require(key, true)?;
        let previous = self.document.get_at(&path)?.unwrap_or(Value::Null);
        self.document.remove(&path)?.await?;
        Ok(previous)
    }

    async fn write(&self, path: PathAddress, value: Value) -> ToolResult<Value> {
        let patched = self.document.patch(&path, value)?.await?;
        Ok(patched.next.at(&path).cloned().unwrap_or(Value::Null))
    }

    /// Definitions of the four record tools
    pub(crate) fn definitions(&self, entry_schema: Value) -> Vec<ToolDefinition> {
        let name = &self.name;
        let key = json!({"type": "string", "description": format!("{name} entry key")});
        vec![
            ToolDefinition::new(
                name,
                "get",
                format!("Read all {name} entries, or one entry by key"),
                object_input(json!({"key": key}), &[]),
            ),
            ToolDefinition::new(
                name,
                "add",
                format!("Create a new {name} entry"),
                object_input(json!({"key": key, "value": entry_schema}), &["key", "value"]),
            ),
            ToolDefinition::new(
                name,
                "update",
                format!("Merge changes into an existing {name} entry"),
                object_input(json!({"key": key, "value": entry_schema}), &["key", "value"]),
            ),
            ToolDefinition::new(
                name,
                "remove",
                format!("Delete a {name} entry"),
                object_input(json!({"key": key}), &["key"]),
            ),
        ]
    }

    /// Dispatch `operation` with JSON arguments
    pub(crate) async fn call(&self, operation: &str, arguments: Value) -> ToolResult<Option<Value>> {
        let result = match operation {
            "get" => {
                let args: KeyArgs = definition::decode(arguments)?;
                self.get(args.key.as_deref())?
            }
            "add" => {
                let args: EntryArgs = definition::decode(arguments)?;
                self.add(&args.key, args.value).await?
            }
            "update" => {
                let args: EntryArgs = definition::decode(arguments)?;
                self.update(&args.key, args.value).await?
            }
            "remove" => {
                let args: KeyArgs = definition::decode(arguments)?;
                let key = args
                    .key
                    .ok_or_else(|| ToolError::InvalidArguments("missing field `key`".to_owned()))?;
                self.remove(&key).await?
            }
            _ => return Ok(None),
        };
        Ok(Some(result))
    }
}
