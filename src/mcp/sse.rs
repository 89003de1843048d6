//! HTTP + Server-Sent-Events transport for the MCP server.
//!
//! Two cooperating endpoints share one [`McpServer`] instance:
//!
//! - **Stream endpoint** (`GET`): a long-lived SSE channel. On connect the
//!   server immediately pushes one `endpoint` event carrying the path clients
//!   must POST requests to, then holds the channel open until the client
//!   disconnects. No tool call results travel down this channel; responses go
//!   back on the POST path. That asymmetry mirrors the original protocol
//!   behaviour and callers must respect it.
//! - **Submit endpoint** (`POST`): accepts one JSON-RPC request body and
//!   returns the JSON-RPC response as the HTTP body, or `204 No Content` for
//!   notifications.
//!
//! Writes on a single SSE connection are serialised through an mpsc channel,
//! so concurrent producers cannot interleave partial frames.

use std::convert::Infallible;
use std::io;
use std::sync::{Arc, Mutex};

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;

use crate::mcp::server::McpServer;

/// Default path of the SSE stream endpoint.
pub const DEFAULT_SSE_PATH: &str = "/sse";

/// Default path of the message submit endpoint.
pub const DEFAULT_MESSAGE_PATH: &str = "/message";

/// Formats a single SSE event frame.
///
/// The `event:` line is emitted only when the event name is non-empty; the
/// `data:` line and the terminating blank line are always present.
#[must_use]
pub fn format_event(event: &str, data: &str) -> String {
    if event.is_empty() {
        format!("data: {data}\n\n")
    } else {
        format!("event: {event}\ndata: {data}\n\n")
    }
}

/// A handle to one live SSE connection.
///
/// Events pushed through the handle are queued on an mpsc channel and drained
/// by the HTTP response body, which serialises concurrent writers. The
/// connection ends when the client disconnects (the receiving side of the
/// channel is dropped with the response body).
#[derive(Clone)]
pub struct SseConnection {
    tx: mpsc::Sender<Bytes>,
}

impl SseConnection {
    const QUEUE_DEPTH: usize = 16;

    fn new() -> (Self, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(Self::QUEUE_DEPTH);
        (Self { tx }, rx)
    }

    /// Sends one SSE event down this connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the client has disconnected.
    pub async fn send_event(&self, event: &str, data: &str) -> io::Result<()> {
        self.tx
            .send(Bytes::from(format_event(event, data)))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "SSE client disconnected"))
    }

    /// Returns `true` once the client side of this connection has gone away.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Shared state for the SSE transport endpoints.
#[derive(Clone)]
pub struct AppState {
    server: Arc<McpServer>,
    message_path: String,
    /// Live connections, kept so their channels outlive the GET handler.
    /// Closed entries are pruned whenever a new client connects.
    connections: Arc<Mutex<Vec<SseConnection>>>,
}

impl AppState {
    /// Creates transport state around a shared server instance.
    #[must_use]
    pub fn new(server: Arc<McpServer>, message_path: impl Into<String>) -> Self {
        Self {
            server,
            message_path: message_path.into(),
            connections: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Returns the number of currently registered (possibly closed) connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections
            .lock()
            .map(|conns| conns.len())
            .unwrap_or(0)
    }

    fn register(&self, conn: SseConnection) {
        if let Ok(mut conns) = self.connections.lock() {
            conns.retain(|c| !c.is_closed());
            conns.push(conn);
        }
    }
}

/// Builds the axum router for the SSE transport.
///
/// Routes the stream endpoint at `sse_path` and the submit endpoint at the
/// state's message path.
#[must_use]
pub fn build_router(state: AppState, sse_path: &str) -> Router {
    let message_path = state.message_path.clone();

    Router::new()
        .route(sse_path, get(sse_stream))
        .route(&message_path, post(post_message))
        .with_state(state)
}

/// `GET` handler: opens the SSE stream and emits the initial endpoint event.
async fn sse_stream(State(state): State<AppState>) -> Response {
    let (conn, rx) = SseConnection::new();

    // The endpoint event is queued before the body starts draining, so it is
    // always the first frame on the wire.
    if conn
        .send_event("endpoint", &state.message_path)
        .await
        .is_err()
    {
        tracing::error!("Failed to queue endpoint event");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    state.register(conn);
    tracing::info!("SSE connection established");

    let stream = futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|chunk| (Ok::<_, Infallible>(chunk), rx))
    });

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .header("X-Accel-Buffering", "no")
        .body(Body::from_stream(stream))
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to build SSE response");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        })
}

/// `POST` handler: submits one JSON-RPC request to the protocol core.
async fn post_message(State(state): State<AppState>, body: Bytes) -> Response {
    let raw = String::from_utf8_lossy(&body);

    match state.server.handle_request(&raw) {
        Some(response) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            response,
        )
            .into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

/// Client-side reader that splits an SSE byte stream into message payloads.
///
/// Accumulates `data:` lines (joined with `\n` when an event spans several);
/// a blank line completes the current message. I/O errors surface through the
/// `io::Result`, separate from the payload sequence.
pub struct SseMessageReader<R> {
    reader: R,
}

impl<R> SseMessageReader<R>
where
    R: AsyncBufRead + Unpin,
{
    /// Wraps a buffered reader over an SSE stream.
    pub const fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Reads the next complete message payload.
    ///
    /// Returns `None` when the stream ends.
    ///
    /// # Errors
    ///
    /// Returns an error if reading from the underlying stream fails.
    pub async fn next_message(&mut self) -> io::Result<Option<String>> {
        let mut data = String::new();

        loop {
            let mut line = String::new();
            let bytes_read = self.reader.read_line(&mut line).await?;

            if bytes_read == 0 {
                // Stream ended; a partial event without its blank line is dropped.
                return Ok(None);
            }

            let line = line.trim_end_matches('\n').trim_end_matches('\r');

            if line.is_empty() {
                if !data.is_empty() {
                    return Ok(Some(data));
                }
                continue;
            }

            // Skip the 5-byte "data:" prefix plus the character after it.
            if line.len() > 5 && line.starts_with("data:") {
                if !data.is_empty() {
                    data.push('\n');
                }
                data.push_str(&line[6..]);
            }
        }
    }
}
