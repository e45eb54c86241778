// MCP Server
//
// JSON-RPC method routing shared by both transports, plus the axum HTTP
// transport. The stdio transport lives in `stdio.rs`.

use super::dispatch::{Dispatcher, OperationRequest};
use super::protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, MCP_PROTOCOL_VERSION};
use serde_json::{json, Value};
use tracing::{debug, warn};

/// Name announced in `serverInfo`
pub const SERVER_NAME: &str = "gitpulse";

/// Handle one JSON-RPC request
///
/// Returns `None` for notifications, which never get a response.
pub async fn handle_request(dispatcher: &Dispatcher, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
    debug!("Received JSON-RPC request: method={}", request.method);

    if request.is_notification() {
        debug!("Notification {} acknowledged", request.method);
        return None;
    }

    let id = request.id.clone();

    if let Err(e) = request.validate() {
        warn!("Invalid JSON-RPC request: {}", e);
        return Some(JsonRpcResponse::error(id, e));
    }

    let result = match request.method.as_str() {
        "initialize" => Ok(json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": {
                "tools": {}
            },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": super::VERSION
            }
        })),
        "ping" => Ok(json!({})),
        "tools/list" => Ok(dispatcher.list_operations()),
        "tools/call" => match request.extract_tool_call() {
            Ok(call) => {
                let outcome = dispatcher
                    .dispatch(OperationRequest::new(call.name, call.arguments))
                    .await;
                Ok(outcome.to_tool_content())
            }
            Err(e) => Err(e),
        },
        _ => Err(JsonRpcError::method_not_found(request.method.clone())),
    };

    if let Err(e) = &result {
        warn!("Request failed: {}", e);
    }

    Some(JsonRpcResponse::from_result(id, result))
}

/// Parse raw bytes into a request, or the error response to send back
pub fn parse_request(payload: &[u8]) -> Result<JsonRpcRequest, JsonRpcResponse> {
    let value: Value = serde_json::from_slice(payload).map_err(|e| {
        warn!("Failed to parse JSON-RPC payload: {}", e);
        JsonRpcResponse::error(Value::Null, JsonRpcError::parse_error(e.to_string()))
    })?;

    let id = value.get("id").cloned().unwrap_or(Value::Null);
    serde_json::from_value(value).map_err(|e| {
        warn!("Malformed JSON-RPC request: {}", e);
        JsonRpcResponse::error(id, JsonRpcError::invalid_request(e.to_string()))
    })
}

#[cfg(feature = "http-server")]
pub use http::{router, McpServer, McpServerConfig};

#[cfg(feature = "http-server")]
mod http {
    use super::*;
    use anyhow::Context;
    use axum::{
        body::Bytes,
        extract::State,
        http::StatusCode,
        response::{IntoResponse, Json, Response},
        routing::{get, post},
        Router,
    };
    use std::net::SocketAddr;
    use std::sync::Arc;
    use tower_http::{cors::CorsLayer, trace::TraceLayer};
    use tracing::info;

    /// MCP Server configuration
    #[derive(Clone, Debug)]
    pub struct McpServerConfig {
        /// Address to bind the server to
        pub bind_address: SocketAddr,

        /// Whether to enable CORS for all origins
        pub enable_cors: bool,
    }

    impl Default for McpServerConfig {
        fn default() -> Self {
            Self {
                bind_address: SocketAddr::from(([127, 0, 0, 1], 47300)),
                enable_cors: true,
            }
        }
    }

    /// HTTP MCP server
    pub struct McpServer {
        /// Configuration for the server
        pub config: McpServerConfig,
        dispatcher: Arc<Dispatcher>,
    }

    impl McpServer {
        /// Create a new MCP server instance
        pub fn new(config: McpServerConfig, dispatcher: Arc<Dispatcher>) -> Self {
            Self { config, dispatcher }
        }

        /// Run the MCP server
        ///
        /// Blocks until the listener fails or the process is stopped.
        pub async fn run(self) -> anyhow::Result<()> {
            let bind_address = self.config.bind_address;
            let mut app = router(self.dispatcher);
            if self.config.enable_cors {
                app = app.layer(CorsLayer::very_permissive());
            }

            let listener = tokio::net::TcpListener::bind(bind_address)
                .await
                .with_context(|| format!("Failed to bind {}", bind_address))?;

            info!("Starting MCP server on {}", bind_address);

            axum::serve(listener, app).await.context("Server error")?;

            Ok(())
        }
    }

    /// Routes of the HTTP transport
    pub fn router(dispatcher: Arc<Dispatcher>) -> Router {
        Router::new()
            .route("/mcp", post(json_rpc_handler))
            .route("/mcp/tools/list", get(list_tools_handler))
            .route("/health", get(health_check_handler))
            .layer(TraceLayer::new_for_http())
            .with_state(dispatcher)
    }

    /// JSON-RPC request handler
    async fn json_rpc_handler(State(dispatcher): State<Arc<Dispatcher>>, body: Bytes) -> Response {
        let request = match parse_request(&body) {
            Ok(request) => request,
            Err(response) => return Json(response).into_response(),
        };

        match handle_request(&dispatcher, request).await {
            Some(response) => Json(response).into_response(),
            None => StatusCode::ACCEPTED.into_response(),
        }
    }

    /// List tools handler
    async fn list_tools_handler(State(dispatcher): State<Arc<Dispatcher>>) -> Json<Value> {
        Json(dispatcher.list_operations())
    }

    /// Health check handler
    async fn health_check_handler() -> Json<Value> {
        Json(json!({
            "status": "ok",
            "service": SERVER_NAME,
            "version": super::super::VERSION
        }))
    }
}
