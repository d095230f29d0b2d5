//! Model Context Protocol server over stdio.
//!
//! ```text
//! MCP client (Claude, Cursor, etc.)
//!      │ JSON-RPC over stdio
//!      ▼
//! McpServer ── tools/call ──▶ ToolDispatcher ──▶ QueryExecutor / metadata
//!                                                      │
//!                                                      ▼
//!                                                  AwsClient
//! ```

mod framing;
mod jsonrpc;
mod server;

pub use framing::{read_message, write_message, WireFormat};
pub use jsonrpc::{RpcError, RpcRequest, RpcResponse};
pub use server::{McpServer, PROTOCOL_VERSION, SERVER_NAME, SERVER_VERSION};
