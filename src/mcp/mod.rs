// MCP (Model Context Protocol) JSON-RPC Server
//
// Exposes the workflow operations as MCP tools over stdio or HTTP.
//
// # Example
//
// ```ignore
// use gitpulse::mcp::{run_stdio, Dispatcher};
//
// let dispatcher = Dispatcher::new(Arc::new(orchestrator));
// run_stdio(&dispatcher).await?;
// ```

/// Tool lookup, validation and execution
pub mod dispatch;
/// One handler per MCP tool
pub mod handlers;
/// JSON-RPC 2.0 message types
pub mod protocol;
/// Tool parameter schemas
pub mod registry;
/// JSON-RPC method routing and the HTTP transport
pub mod server;
/// stdio transport
pub mod stdio;

pub use dispatch::{Dispatcher, OperationRequest, OperationResult};
pub use protocol::{error_codes, JsonRpcError, JsonRpcRequest, JsonRpcResponse};
pub use server::handle_request;
#[cfg(feature = "http-server")]
pub use server::{router, McpServer, McpServerConfig};
pub use stdio::run_stdio;

/// MCP server version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
