//! stdio transport for the MCP server.
//!
//! This module implements the stdio transport as specified by MCP:
//!
//! - Messages are UTF-8 encoded JSON-RPC
//! - Messages are delimited by newlines
//! - Messages must not contain embedded newlines
//! - stdin: receives messages from the client
//! - stdout: sends messages to the client
//! - stderr: may be used for logging (never stdout, which would corrupt the
//!   protocol stream)
//!
//! The transport is a single cooperative loop: one request is processed fully
//! before the next line is read. End-of-stream terminates the loop cleanly;
//! request-level failures (parse errors, tool errors) are reported as JSON-RPC
//! error responses and never exit the loop.

use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};

use crate::mcp::server::McpServer;

/// A stdio-based MCP transport.
///
/// Generic over the underlying streams so tests can drive the loop with
/// in-memory buffers; production code uses the stdin/stdout defaults.
pub struct StdioTransport<R = BufReader<Stdin>, W = Stdout> {
    reader: R,
    writer: W,
}

impl StdioTransport {
    /// Creates a transport reading from stdin and writing to stdout.
    #[must_use]
    pub fn new() -> Self {
        Self {
            reader: BufReader::new(tokio::io::stdin()),
            writer: tokio::io::stdout(),
        }
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl<R, W> StdioTransport<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates a transport over arbitrary streams.
    pub const fn with_streams(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Runs the transport loop until end-of-stream or a shutdown signal.
    ///
    /// # Errors
    ///
    /// Returns an error if reading from or writing to the streams fails.
    /// End-of-stream is a clean termination, not an error.
    #[cfg(unix)]
    pub async fn run(&mut self, server: &McpServer) -> io::Result<()> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt()).map_err(io::Error::other)?;
        let mut sigterm = signal(SignalKind::terminate()).map_err(io::Error::other)?;

        tracing::info!("stdio transport started");

        loop {
            tokio::select! {
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT, shutting down stdio transport");
                    return Ok(());
                }

                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM, shutting down stdio transport");
                    return Ok(());
                }

                line_result = self.read_line() => {
                    if self.dispatch(server, line_result?).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Runs the transport loop until end-of-stream or Ctrl+C.
    ///
    /// # Errors
    ///
    /// Returns an error if reading from or writing to the streams fails.
    #[cfg(windows)]
    pub async fn run(&mut self, server: &McpServer) -> io::Result<()> {
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        tracing::info!("stdio transport started");

        loop {
            tokio::select! {
                _ = &mut ctrl_c => {
                    tracing::info!("Received Ctrl+C, shutting down stdio transport");
                    return Ok(());
                }

                line_result = self.read_line() => {
                    if self.dispatch(server, line_result?).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Handles one line of input. Returns `true` when the stream is exhausted.
    async fn dispatch(&mut self, server: &McpServer, line: Option<String>) -> io::Result<bool> {
        let Some(line) = line else {
            tracing::info!("EOF received, shutting down stdio transport");
            return Ok(true);
        };

        if line.trim().is_empty() {
            return Ok(false);
        }

        if let Some(response) = server.handle_request(&line) {
            self.write_line(&response).await?;
        }

        Ok(false)
    }

    /// Reads the next message line from the input stream.
    ///
    /// Returns `None` on end-of-stream. A final line without a trailing
    /// newline is still delivered before EOF is reported.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails.
    pub async fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        let bytes_read = self.reader.read_line(&mut line).await?;

        if bytes_read == 0 {
            return Ok(None);
        }

        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }

        Ok(Some(line))
    }

    /// Writes a serialised message followed by a newline, then flushes.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub async fn write_line(&mut self, json: &str) -> io::Result<()> {
        // MCP spec: messages must not contain embedded newlines
        debug_assert!(
            !json.contains('\n'),
            "JSON message must not contain embedded newlines"
        );

        self.writer.write_all(json.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;

        Ok(())
    }
}
