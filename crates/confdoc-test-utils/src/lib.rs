//! Testing utilities for confdoc workspace
//!
//! Shared schemas, documents and hooks.

#![allow(missing_docs)]

use std::sync::Arc;

use confdoc_core::{AfterUpdateHook, BeforeUpdateHook, ConfigDocument, HookError};
use confdoc_path::{PathAddress, PathPattern};
use confdoc_schema::Schema;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::Notify;

pub fn address(expr: &str) -> PathAddress {
    expr.parse().unwrap()
}

pub fn pattern(expr: &str) -> PathPattern {
    expr.parse().unwrap()
}

pub fn schema(document: Value) -> Schema {
    Schema::new(document).unwrap()
}

/// `{ a: string = "b" }`
pub fn defaulted_string_schema() -> Schema {
    schema(json!({
        "type": "object",
        "properties": {"a": {"type": "string", "default": "b"}}
    }))
}

/// Closed `s` object holding `a` and the defaulted `s.b.c` / `s.b.e`
pub fn nested_defaults_schema() -> Schema {
    schema(json!({
        "type": "object",
        "properties": {
            "s": {
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "a": {"type": "string"},
                    "b": {
                        "type": "object",
                        "properties": {
                            "c": {"type": "string", "default": "d"},
                            "e": {"type": "string", "default": "f"}
                        }
                    }
                }
            }
        }
    }))
}

/// `methods: string[] = ["GET", "PATCH"]`
pub fn methods_schema() -> Schema {
    schema(json!({
        "type": "object",
        "properties": {
            "methods": {
                "type": "array",
                "items": {"type": "string"},
                "default": ["GET", "PATCH"]
            }
        }
    }))
}

/// Record of entities, each holding a record of typed fields with free-form
/// config
pub fn entities_schema() -> Schema {
    schema(json!({
        "type": "object",
        "properties": {
            "entities": {
                "type": "object",
                "default": {},
                "additionalProperties": {
                    "type": "object",
                    "properties": {
                        "fields": {
                            "type": "object",
                            "default": {},
                            "additionalProperties": {
                                "type": "object",
                                "properties": {
                                    "type": {"type": "string"},
                                    "config": {"type": "object"}
                                },
                                "required": ["type"]
                            }
                        }
                    }
                }
            }
        }
    }))
}

/// Server settings with a secret and an open `extra` map
pub fn server_schema() -> Schema {
    schema(json!({
        "type": "object",
        "properties": {
            "host": {"type": "string", "default": "localhost"},
            "port": {"type": "integer", "minimum": 1, "maximum": 65535, "default": 8080},
            "debug": {"type": "boolean", "default": false},
            "auth": {
                "type": "object",
                "properties": {
                    "user": {"type": "string", "default": "admin"},
                    "secret": {"type": "string", "default": "changeme", "secret": true}
                }
            },
            "extra": {"type": "object", "additionalProperties": {"type": "string"}}
        }
    }))
}

pub fn document(schema: Schema) -> ConfigDocument {
    ConfigDocument::new(schema, None).unwrap()
}

/// Document over [`nested_defaults_schema`] with `s.b` restricted
pub fn restricted_document() -> ConfigDocument {
    ConfigDocument::builder(nested_defaults_schema())
        .restrict(pattern("s.b"))
        .build()
        .unwrap()
}

/// Appends a method to every incoming `methods` array that lacks it
pub struct AppendMethod(pub &'static str);

#[async_trait::async_trait]
impl BeforeUpdateHook for AppendMethod {
    async fn before_update(&self, _from: &Value, mut to: Value) -> Result<Value, HookError> {
        if let Some(methods) = to.get_mut("methods").and_then(Value::as_array_mut) {
            let method = Value::from(self.0);
            if !methods.contains(&method) {
                methods.push(method);
            }
        }
        Ok(to)
    }
}

/// Always fails with the given message
pub struct FailingHook(pub &'static str);

#[async_trait::async_trait]
impl BeforeUpdateHook for FailingHook {
    async fn before_update(&self, _from: &Value, _to: Value) -> Result<Value, HookError> {
        Err(HookError::msg(self.0))
    }
}

#[async_trait::async_trait]
impl AfterUpdateHook for FailingHook {
    async fn after_update(&self, _committed: &Value) -> Result<(), HookError> {
        Err(HookError::msg(self.0))
    }
}

/// Records every committed document
#[derive(Clone, Default)]
pub struct Recorder {
    commits: Arc<Mutex<Vec<Value>>>,
}

impl Recorder {
    pub fn commits(&self) -> Vec<Value> {
        self.commits.lock().clone()
    }
}

#[async_trait::async_trait]
impl AfterUpdateHook for Recorder {
    async fn after_update(&self, committed: &Value) -> Result<(), HookError> {
        self.commits.lock().push(committed.clone());
        Ok(())
    }
}

/// Before-hook that parks every mutation until [`Gate::open`] is called
#[derive(Clone, Default)]
pub struct Gate {
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

impl Gate {
    /// Wait until a mutation is parked in the hook
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    /// Let one parked mutation continue
    pub fn open(&self) {
        self.release.notify_one();
    }
}

#[async_trait::async_trait]
impl BeforeUpdateHook for Gate {
    async fn before_update(&self, _from: &Value, to: Value) -> Result<Value, HookError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(to)
    }
}
