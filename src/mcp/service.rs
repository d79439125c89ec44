//! MCP protocol dispatcher.
//!
//! [`McpService`] resolves a classified message to a handler and builds the
//! response or error envelope. It is a pure function of (message, registry):
//! it never touches the session store, which keeps it testable without
//! standing up any transport.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::mcp::protocol::{
    error_envelope, response_envelope, Inbound, INTERNAL_ERROR, METHOD_NOT_FOUND,
};
use crate::mcp::tools::ToolRegistry;

/// Static identity reported by `initialize`.
#[derive(Debug, Clone)]
pub struct ServerIdentity {
    pub name: String,
    pub version: String,
    pub protocol_version: String,
}

/// Outcome of dispatching one message: exactly one envelope, or none.
///
/// `NoContent` is distinct from an empty successful envelope; the transport
/// maps it to an explicit 204 and writes nothing to any stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    Reply(Value),
    NoContent,
}

#[derive(Clone)]
pub struct McpService {
    registry: Arc<ToolRegistry>,
    identity: Arc<ServerIdentity>,
}

impl McpService {
    pub fn new(registry: Arc<ToolRegistry>, identity: ServerIdentity) -> Self {
        Self {
            registry,
            identity: Arc::new(identity),
        }
    }

    /// Dispatch one classified message.
    ///
    /// Requests always yield a `Reply`. Notifications yield `NoContent`,
    /// except an unrecognized method, which is answered with a
    /// method-not-found envelope whose `id` is explicit `null`.
    pub async fn dispatch(&self, inbound: Inbound) -> Dispatch {
        match inbound {
            Inbound::Request { id, method, params } => {
                Dispatch::Reply(self.handle_request(&id, &method, params).await)
            }
            Inbound::Notification { method, params } => match method.as_str() {
                "notifications/initialized" => {
                    tracing::debug!("received initialized notification");
                    Dispatch::NoContent
                }
                // A notification is never answered, but a tools/call without
                // an id still runs the handler for its side effects.
                "tools/call" => {
                    let _ = self.call_tool(params).await;
                    Dispatch::NoContent
                }
                "initialize" | "tools/list" => Dispatch::NoContent,
                other => Dispatch::Reply(error_envelope(
                    &Value::Null,
                    METHOD_NOT_FOUND,
                    &format!("Method not found: {other}"),
                )),
            },
        }
    }

    async fn handle_request(&self, id: &Value, method: &str, params: Value) -> Value {
        match method {
            "initialize" => response_envelope(
                id,
                json!({
                    "protocolVersion": self.identity.protocol_version,
                    "capabilities": { "tools": {} },
                    "serverInfo": {
                        "name": self.identity.name,
                        "version": self.identity.version,
                    },
                }),
            ),

            "tools/list" => response_envelope(id, json!({ "tools": self.registry.descriptors() })),

            "tools/call" => match self.call_tool(params).await {
                Ok(result) => response_envelope(id, result),
                Err(call_error) => error_envelope(id, call_error.code, &call_error.message),
            },

            other => error_envelope(id, METHOD_NOT_FOUND, &format!("Method not found: {other}")),
        }
    }

    /// Resolve and invoke a tool; errors carry the protocol code to report.
    async fn call_tool(&self, params: Value) -> Result<Value, CallError> {
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default();

        let Some(tool) = self.registry.get(name) else {
            return Err(CallError {
                code: METHOD_NOT_FOUND,
                message: format!("Unknown tool: {name}"),
            });
        };

        let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);

        match tool.invoke(arguments).await {
            Ok(result) => serde_json::to_value(&result).map_err(|e| CallError {
                code: INTERNAL_ERROR,
                message: format!("Failed to serialize result: {e}"),
            }),
            Err(tool_error) => {
                tracing::warn!(tool = name, error = %tool_error, "tool execution failed");
                let message = tool_error.to_string();
                Err(CallError {
                    code: INTERNAL_ERROR,
                    message: if message.is_empty() {
                        "Tool execution failed".to_string()
                    } else {
                        message
                    },
                })
            }
        }
    }
}

struct CallError {
    code: i64,
    message: String,
}
