//! MCP method handling and the stdio serve loop.

use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::{debug, error, info, warn};

use super::framing::{read_message, write_message, WireFormat};
use super::jsonrpc::{RpcRequest, RpcResponse, INTERNAL_ERROR};
use crate::error::AthenaError;
use crate::tools::{get_tool_definitions, ToolDispatcher};

/// MCP protocol version we support.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

pub const SERVER_NAME: &str = "athena-mcp";
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// MCP server over a [`ToolDispatcher`].
pub struct McpServer {
    dispatcher: ToolDispatcher,
}

impl McpServer {
    pub fn new(dispatcher: ToolDispatcher) -> Self {
        Self { dispatcher }
    }

    /// Serves requests from `reader` until EOF, one at a time.
    ///
    /// Each request is handled to completion before the next is read.
    pub async fn serve<R, W>(&self, reader: &mut R, writer: &mut W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut wire_format = WireFormat::Ndjson;

        loop {
            let msg = match read_message(reader).await {
                Ok(Some((msg, format))) => {
                    wire_format = format;
                    msg
                }
                Ok(None) => {
                    info!("EOF on stdin, shutting down");
                    return Ok(());
                }
                Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                    error!("Failed to read message: {}", e);
                    continue;
                }
                Err(e) => return Err(e),
            };

            let req = match parse_request(&msg) {
                Ok(r) => r,
                Err(resp) => {
                    write_message(writer, &resp, wire_format).await?;
                    continue;
                }
            };

            if let Some(resp) = self.dispatch(&req).await {
                write_message(writer, &resp, wire_format).await?;
            }
        }
    }

    /// Handles one request. Notifications yield no response.
    pub async fn dispatch(&self, req: &RpcRequest) -> Option<RpcResponse> {
        debug!("Dispatching method: {}", req.method);

        if req.jsonrpc != "2.0" {
            return (!req.is_notification()).then(|| {
                RpcResponse::invalid_request(req.id.clone(), "jsonrpc must be \"2.0\"")
            });
        }

        let resp = match req.method.as_str() {
            "initialize" => self.handle_initialize(req),
            "notifications/initialized" | "initialized" => {
                info!("MCP initialized notification received");
                RpcResponse::success(req.id.clone(), json!({}))
            }
            "ping" => RpcResponse::success(req.id.clone(), json!({})),
            "shutdown" => {
                info!("MCP shutdown requested");
                RpcResponse::success(req.id.clone(), json!({}))
            }
            "tools/list" => {
                RpcResponse::success(req.id.clone(), json!({ "tools": get_tool_definitions() }))
            }
            "tools/call" => self.handle_tools_call(req).await,
            _ => {
                warn!("Unknown method: {}", req.method);
                RpcResponse::method_not_found(req.id.clone(), &req.method)
            }
        };

        if req.is_notification() {
            None
        } else {
            Some(resp)
        }
    }

    fn handle_initialize(&self, req: &RpcRequest) -> RpcResponse {
        if let Some(client) = req.params.get("clientInfo") {
            info!("MCP initialize from client: {}", client);
        }
        let ctx = self.dispatcher.context();
        info!(
            region = %ctx.region,
            catalog = %ctx.catalog,
            database = %ctx.database,
            workgroup = %ctx.workgroup,
            "Serving Athena tools"
        );

        RpcResponse::success(
            req.id.clone(),
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {
                    "tools": { "listChanged": false }
                },
                "serverInfo": {
                    "name": SERVER_NAME,
                    "version": SERVER_VERSION
                }
            }),
        )
    }

    async fn handle_tools_call(&self, req: &RpcRequest) -> RpcResponse {
        let Some(name) = req.params.get("name").and_then(Value::as_str) else {
            return RpcResponse::invalid_params(req.id.clone(), "Missing 'name' parameter");
        };
        let arguments = req.params.get("arguments").cloned().unwrap_or(Value::Null);

        match self.dispatcher.call(name, arguments).await {
            Ok(response) => match serde_json::to_value(&response) {
                Ok(result) => RpcResponse::success(req.id.clone(), result),
                Err(e) => tool_error(req.id.clone(), name, AthenaError::from(e)),
            },
            Err(e) => tool_error(req.id.clone(), name, e),
        }
    }
}

/// Every tool failure leaves the server with the same shape: an internal
/// error whose message is the error text and whose data names the category.
fn tool_error(id: Value, tool: &str, error: AthenaError) -> RpcResponse {
    warn!(tool, category = error.category(), "Tool call failed: {}", error);
    RpcResponse::error(
        id,
        INTERNAL_ERROR,
        error.to_string(),
        Some(json!({ "category": error.category() })),
    )
}

/// Decodes one message into a request.
///
/// Bytes that are not JSON get a parse error. JSON that is not a single
/// request object (a batch array, a missing method) gets an invalid request
/// error carrying the id when one can be read.
fn parse_request(msg: &[u8]) -> Result<RpcRequest, RpcResponse> {
    let value: Value = serde_json::from_slice(msg).map_err(|e| {
        error!("Invalid JSON: {}", e);
        RpcResponse::parse_error()
    })?;

    if value.is_array() {
        warn!("Rejecting JSON-RPC batch");
        return Err(RpcResponse::invalid_request(
            Value::Null,
            "Batch requests are not supported",
        ));
    }

    let id = match value.get("id") {
        Some(id @ (Value::String(_) | Value::Number(_))) => id.clone(),
        _ => Value::Null,
    };

    serde_json::from_value(value).map_err(|e| {
        error!("Invalid JSON-RPC request: {}", e);
        RpcResponse::invalid_request(id, format!("Not a JSON-RPC request: {e}"))
    })
}
