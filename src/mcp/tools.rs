//! Tool descriptors and the registry the dispatcher resolves them from.
//!
//! A [`Tool`] couples a name, a human-readable description and a JSON Schema
//! input contract with an async handler. External tool logic plugs in here;
//! the rest of the crate only sees the uniform invocation contract.

use std::sync::Arc;

use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::{json, Value};

/// Result every tool handler produces: a sequence of content items.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ToolResult {
    pub content: Vec<Content>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Content {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

impl ToolResult {
    /// Single text content item, the common case.
    pub fn text(text: impl Into<String>) -> Self {
        ToolResult {
            content: vec![Content {
                kind: "text".to_string(),
                text: text.into(),
            }],
        }
    }
}

type Handler = Arc<dyn Fn(Value) -> BoxFuture<'static, anyhow::Result<ToolResult>> + Send + Sync>;

/// An invocable tool. The handler may suspend for arbitrary external work.
#[derive(Clone)]
pub struct Tool {
    name: String,
    description: String,
    input_schema: Value,
    handler: Handler,
}

impl Tool {
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
        handler: F,
    ) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = anyhow::Result<ToolResult>> + Send + 'static,
    {
        Tool {
            name: name.into(),
            description: description.into(),
            input_schema,
            handler: Arc::new(move |args| Box::pin(handler(args))),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wire-facing descriptor: name, description and schema only. The
    /// handler is never serialized.
    pub fn descriptor(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.input_schema,
        })
    }

    pub async fn invoke(&self, arguments: Value) -> anyhow::Result<ToolResult> {
        (self.handler)(arguments).await
    }
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Ordered collection of tools; order matters only for enumeration output.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Tool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Tool) {
        self.tools.push(tool);
    }

    /// Exact-name lookup.
    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.iter().find(|tool| tool.name == name)
    }

    /// Descriptors in registration order.
    pub fn descriptors(&self) -> Vec<Value> {
        self.tools.iter().map(Tool::descriptor).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// The starter tools the server ships with.
pub fn builtin_tools() -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    registry.register(Tool::new(
        "hello",
        "Says hello to a person",
        json!({
            "type": "object",
            "properties": {
                "name": { "type": "string", "description": "Name to greet" },
            },
            "required": ["name"],
        }),
        |args: Value| async move {
            let name = require_str(&args, "name")?;
            Ok(ToolResult::text(format!(
                "Hello, {name}! Your MCP server is working!"
            )))
        },
    ));

    registry.register(Tool::new(
        "add",
        "Adds two numbers together",
        json!({
            "type": "object",
            "properties": {
                "a": { "type": "number", "description": "First number" },
                "b": { "type": "number", "description": "Second number" },
            },
            "required": ["a", "b"],
        }),
        |args: Value| async move {
            let a = require_number(&args, "a")?;
            let b = require_number(&args, "b")?;
            Ok(ToolResult::text(format!("{} + {} = {}", a, b, a + b)))
        },
    ));

    registry
}

fn require_str<'a>(args: &'a Value, key: &str) -> anyhow::Result<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow::anyhow!("missing string argument: {key}"))
}

fn require_number(args: &Value, key: &str) -> anyhow::Result<f64> {
    args.get(key)
        .and_then(Value::as_f64)
        .ok_or_else(|| anyhow::anyhow!("missing numeric argument: {key}"))
}
