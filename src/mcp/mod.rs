//! Model Context Protocol (MCP) server implementation.
//!
//! This module implements the MCP protocol core and its two transports. The
//! server speaks JSON-RPC 2.0, framed as newline-delimited messages on stdio
//! or as an HTTP POST endpoint paired with a Server-Sent-Events stream.
//!
//! # Protocol Version
//!
//! This implementation targets MCP protocol version 2024-11-05.

pub mod protocol;
pub mod server;
pub mod sse;
pub mod transport;

pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, MCP_PROTOCOL_VERSION};
pub use server::{McpServer, Tool, ToolHandler};
pub use sse::{AppState, SseMessageReader};
pub use transport::StdioTransport;
