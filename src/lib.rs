//! toolbox-mcp: a minimal Model Context Protocol server with demo tools
//!
//! This library implements the MCP handshake and tool invocation flow over
//! JSON-RPC 2.0, with two interchangeable transports:
//!
//! - **stdio**: newline-delimited JSON-RPC on stdin/stdout
//! - **SSE**: an HTTP server pairing a Server-Sent Events stream with a
//!   message submit endpoint
//!
//! The bundled tools are deliberately simple (calculator, in-memory
//! key-value storage, echo, system info); the value is in the protocol
//! plumbing, which a real tool suite can be dropped onto.
//!
//! # Modules
//!
//! - [`config`] — Configuration loading and validation
//! - [`error`] — Error types
//! - [`mcp`] — JSON-RPC protocol core, dispatch, and transports
//! - [`tools`] — Built-in tool implementations

pub mod config;
pub mod error;
pub mod mcp;
pub mod tools;
