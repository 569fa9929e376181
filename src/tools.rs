//! Tool definitions, schema normalization, and the consumed `ToolExecutor` contract.
//!
//! The flexible schema notation (simple type map, extended per-property map,
//! or already-valid JSON Schema) and the `Tool`/`ToolBuilder`/`tool()`
//! ergonomics give callers an easy way to declare a tool inline.
//! [`ToolSpec`] is the schema-only declaration that travels inside a
//! [`crate::chat::ChatRequest`]; [`ToolExecutor`] is the runner's consumed
//! dispatch contract; [`ToolRegistry`] implements it by name lookup over a
//! set of [`Tool`]s, so the embedded-handler ergonomics still work under an
//! external-executor model.

use crate::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A tool's schema-only declaration, as it travels inside a [`crate::chat::ChatRequest`].
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// The runner's consumed tool-dispatch contract.
///
/// The runner holds no assumption about thread safety of a particular
/// executor beyond that concurrent `execute` calls are permitted when
/// `parallel_tools` is true.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, ctx: CancellationToken, name: &str, args: &str) -> Result<Value>;
}

/// Async handler signature for a locally-defined tool.
pub type ToolHandler = Arc<dyn Fn(Value) -> Pin<Box<dyn Future<Output = Result<Value>> + Send>> + Send + Sync>;

/// A named, schema-described tool backed by a local async handler.
#[derive(Clone)]
pub struct Tool {
    name: String,
    description: String,
    input_schema: Value,
    handler: ToolHandler,
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("input_schema", &self.input_schema)
            .finish_non_exhaustive()
    }
}

impl Tool {
    /// Creates a tool from a name, description, schema (in any of the
    /// notations [`normalize_schema`] accepts), and an async handler.
    pub fn new<F, Fut>(name: impl Into<String>, description: impl Into<String>, schema: Value, handler: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: normalize_schema(schema),
            handler: Arc::new(move |v| Box::pin(handler(v))),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn execute(&self, args: Value) -> Result<Value> {
        (self.handler)(args).await
    }

    pub fn to_spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.input_schema.clone(),
        }
    }
}

/// Fluent builder for [`Tool`], keeping the same ergonomic
/// parameter notation (`.param("location", "string")`).
pub struct ToolBuilder {
    name: String,
    description: String,
    schema: serde_json::Map<String, Value>,
}

impl ToolBuilder {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            schema: serde_json::Map::new(),
        }
    }

    /// Adds a parameter in simple-type notation (e.g. `"string"`, `"number"`).
    pub fn param(mut self, name: impl Into<String>, type_str: impl Into<String>) -> Self {
        self.schema.insert(name.into(), Value::String(type_str.into()));
        self
    }

    pub fn build<F, Fut>(self, handler: F) -> Tool
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        Tool::new(self.name, self.description, Value::Object(self.schema), handler)
    }
}

pub fn tool(name: impl Into<String>, description: impl Into<String>) -> ToolBuilder {
    ToolBuilder::new(name, description)
}

/// Normalizes any of the three accepted schema notations into full JSON
/// Schema: already-valid schemas (`{"type": ..., "properties": ...}`) pass
/// through unchanged; a simple type map (`{"city": "string"}`) and an
/// extended per-property map (`{"city": {"type": "string", "required": true}}`)
/// both expand into `{"type": "object", "properties": {...}, "required": [...]}`.
pub fn normalize_schema(schema: Value) -> Value {
    if let Value::Object(obj) = &schema {
        if obj.contains_key("type") && obj.contains_key("properties") {
            return schema;
        }
    }

    let Value::Object(obj) = schema else {
        return serde_json::json!({"type": "object", "properties": {}});
    };

    let mut properties = serde_json::Map::new();
    let mut required = Vec::new();

    for (key, value) in obj {
        match value {
            Value::String(type_str) => {
                properties.insert(key.clone(), type_to_json_schema(&type_str));
                required.push(Value::String(key));
            }
            Value::Object(prop) => {
                let type_str = prop.get("type").and_then(|t| t.as_str()).unwrap_or("string");
                let mut prop_schema = type_to_json_schema(type_str);
                if let Some(desc) = prop.get("description") {
                    if let Value::Object(ref mut m) = prop_schema {
                        m.insert("description".to_string(), desc.clone());
                    }
                }
                if let Some(default) = prop.get("default") {
                    if let Value::Object(ref mut m) = prop_schema {
                        m.insert("default".to_string(), default.clone());
                    }
                }
                let is_required = prop.get("required").and_then(|r| r.as_bool()).unwrap_or(true);
                if is_required {
                    required.push(Value::String(key.clone()));
                }
                properties.insert(key, prop_schema);
            }
            other => {
                properties.insert(key.clone(), other);
                required.push(Value::String(key));
            }
        }
    }

    serde_json::json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// Maps a simple type alias to its JSON Schema representation.
pub fn type_to_json_schema(type_str: &str) -> Value {
    match type_str {
        "string" | "str" => serde_json::json!({"type": "string"}),
        "integer" | "int" => serde_json::json!({"type": "integer"}),
        "number" | "float" => serde_json::json!({"type": "number"}),
        "boolean" | "bool" => serde_json::json!({"type": "boolean"}),
        "array" | "list" => serde_json::json!({"type": "array", "items": {"type": "string"}}),
        "object" | "dict" => serde_json::json!({"type": "object"}),
        _ => serde_json::json!({"type": "string"}),
    }
}

/// A [`ToolExecutor`] that dispatches to a fixed set of locally-defined [`Tool`]s by name.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Tool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: HashMap::new() }
    }

    pub fn register(mut self, tool: Tool) -> Self {
        self.tools.insert(tool.name().to_string(), tool);
        self
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.values().map(Tool::to_spec).collect()
    }

    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }
}

#[async_trait]
impl ToolExecutor for ToolRegistry {
    async fn execute(&self, _ctx: CancellationToken, name: &str, args: &str) -> Result<Value> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| Error::tool(format!("tool {name} not registered")))?;
        let parsed: Value = serde_json::from_str(args).map_err(|e| Error::invalid_tool_args(e.to_string()))?;
        tool.execute(parsed).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_schema_passthrough() {
        let schema = serde_json::json!({"type": "object", "properties": {"x": {"type": "string"}}});
        let normalized = normalize_schema(schema.clone());
        assert_eq!(normalized, schema);
    }

    #[test]
    fn test_normalize_schema_simple_notation() {
        let schema = serde_json::json!({"city": "string", "days": "integer"});
        let normalized = normalize_schema(schema);
        assert_eq!(normalized["type"], "object");
        assert_eq!(normalized["properties"]["city"]["type"], "string");
        assert_eq!(normalized["properties"]["days"]["type"], "integer");
        let required = normalized["required"].as_array().unwrap();
        assert!(required.iter().any(|v| v == "city"));
    }

    #[test]
    fn test_normalize_schema_extended_notation_optional() {
        let schema = serde_json::json!({
            "city": {"type": "string", "description": "City name"},
            "units": {"type": "string", "required": false, "default": "metric"},
        });
        let normalized = normalize_schema(schema);
        let required = normalized["required"].as_array().unwrap();
        assert!(required.iter().any(|v| v == "city"));
        assert!(!required.iter().any(|v| v == "units"));
        assert_eq!(normalized["properties"]["units"]["default"], "metric");
    }

    #[tokio::test]
    async fn test_tool_registry_dispatch() {
        let registry = ToolRegistry::new().register(Tool::new(
            "double",
            "doubles a number",
            serde_json::json!({"n": "integer"}),
            |args: Value| async move {
                let n = args["n"].as_i64().unwrap_or(0);
                Ok(serde_json::json!({"result": n * 2}))
            },
        ));

        let result = registry
            .execute(CancellationToken::new(), "double", r#"{"n":21}"#)
            .await
            .unwrap();
        assert_eq!(result["result"], 42);
    }

    #[tokio::test]
    async fn test_tool_registry_unknown_tool() {
        let registry = ToolRegistry::new();
        let result = registry.execute(CancellationToken::new(), "missing", "{}").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_tool_registry_invalid_args() {
        let registry = ToolRegistry::new().register(Tool::new(
            "noop",
            "does nothing",
            serde_json::json!({}),
            |_args: Value| async move { Ok(Value::Null) },
        ));
        let result = registry.execute(CancellationToken::new(), "noop", "not json").await;
        assert!(matches!(result, Err(Error::Provider(_))));
    }
}
