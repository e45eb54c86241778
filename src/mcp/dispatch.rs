// Tool Dispatch
//
// Maps a named request to its handler and turns every outcome into an
// `OperationResult`. Nothing a handler does, including panicking, escapes
// `Dispatcher::dispatch`.

use super::handlers::ToolHandler;
use crate::errors::WorkflowError;
use crate::workflow::Orchestrator;
use futures_util::FutureExt;
use serde::Serialize;
use serde_json::{json, Value};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A single named-operation call
#[derive(Debug, Clone)]
pub struct OperationRequest {
    /// Registered tool name
    pub name: String,
    /// Raw arguments; `Null` or an object
    pub arguments: Value,
}

impl OperationRequest {
    /// Build a request
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// Outcome of one operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationResult {
    /// Whether the operation succeeded
    pub succeeded: bool,
    /// Report on success, error description on failure
    pub text: String,
}

impl OperationResult {
    /// Successful result
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            succeeded: true,
            text: text.into(),
        }
    }

    /// Failed result
    pub fn failure(text: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            text: text.into(),
        }
    }

    /// MCP `tools/call` result body
    pub fn to_tool_content(&self) -> Value {
        json!({
            "content": [
                {
                    "type": "text",
                    "text": self.text,
                }
            ],
            "isError": !self.succeeded,
        })
    }
}

/// Routes requests to tool handlers
pub struct Dispatcher {
    handlers: Vec<ToolHandler>,
    orchestrator: Arc<Orchestrator>,
}

impl Dispatcher {
    /// Dispatcher over every registered tool
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            handlers: ToolHandler::all(),
            orchestrator,
        }
    }

    /// `tools/list` result body
    pub fn list_operations(&self) -> Value {
        let tools: Vec<_> = self
            .handlers
            .iter()
            .map(|handler| {
                let schema = handler.schema();
                json!({
                    "name": schema.name,
                    "description": schema.description,
                    "inputSchema": schema.to_json_schema(),
                })
            })
            .collect();

        json!({ "tools": tools })
    }

    /// Run one operation and report its outcome
    pub async fn dispatch(&self, request: OperationRequest) -> OperationResult {
        debug!("Tool call: name={}", request.name);

        let handler = match self.handlers.iter().find(|h| h.name() == request.name) {
            Some(handler) => handler,
            None => {
                let err = WorkflowError::UnknownOperation { name: request.name };
                warn!("{}", err);
                return OperationResult::failure(err.to_string());
            }
        };

        let outcome = match handler.schema().validate(&request.arguments) {
            Ok(args) => match AssertUnwindSafe(handler.execute(&self.orchestrator, args))
                .catch_unwind()
                .await
            {
                Ok(result) => result.map_err(|err| err.to_string()),
                Err(panic) => Err(panic_message(panic)),
            },
            Err(err) => Err(err.to_string()),
        };

        match outcome {
            Ok(text) => {
                info!("Tool {} succeeded", request.name);
                OperationResult::success(text)
            }
            Err(detail) => {
                warn!("Tool {} failed: {}", request.name, detail);
                OperationResult::failure(format!(
                    "Error executing tool {}: {}",
                    request.name, detail
                ))
            }
        }
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());

    format!("handler panicked: {}", detail)
}
