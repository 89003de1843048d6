//! Built-in tools registered against the protocol core.
//!
//! Each tool module exposes a `definition()` (name, description, input
//! schema) and a `register()` that installs its handler on the server. The
//! core only forwards the schema in `tools/list`; validating arguments is the
//! handler's own job, done here by parsing the argument bag into a typed
//! serde struct at the boundary.

pub mod calculator;
pub mod echo;
pub mod storage;
pub mod system;

use std::sync::Arc;

pub use storage::Storage;

use crate::mcp::server::McpServer;

/// Registers the full default tool set.
///
/// Must be called before any transport starts; the registry is read-only
/// afterwards.
pub fn register_defaults(server: &mut McpServer, storage: &Arc<Storage>) {
    calculator::register(server);
    storage::register(server, storage);
    echo::register(server);
    system::register(server);

    tracing::info!(count = server.tool_count(), "Registered default tools");
}
