//! System information tool.
//!
//! Reports process runtime details: platform, architecture, CPU count, and
//! uptime measured from when the tool was registered.

use std::num::NonZeroUsize;
use std::time::Instant;

use chrono::Utc;
use serde_json::{json, Map, Value};

use crate::error::ToolError;
use crate::mcp::server::{McpServer, Tool};

/// Returns the system info tool descriptor.
#[must_use]
pub fn definition() -> Tool {
    Tool {
        name: "system_info".to_string(),
        description: "Get system information about the server process".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {}
        }),
    }
}

/// Registers the system info tool on the server.
pub fn register(server: &mut McpServer) {
    let started = Instant::now();
    server.register_tool(definition(), Box::new(move |args| handle(started, args)));
}

fn handle(started: Instant, _args: &Map<String, Value>) -> Result<Value, ToolError> {
    let cpus = std::thread::available_parallelism().map_or(1, NonZeroUsize::get);

    Ok(json!({
        "platform": std::env::consts::OS,
        "architecture": std::env::consts::ARCH,
        "family": std::env::consts::FAMILY,
        "numCpus": cpus,
        "uptime": format!("{:.3}s", started.elapsed().as_secs_f64()),
        "serverName": crate::mcp::protocol::SERVER_NAME,
        "serverVersion": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_platform_and_version() {
        let result = handle(Instant::now(), &Map::new()).unwrap();

        assert_eq!(result["platform"], std::env::consts::OS);
        assert_eq!(result["architecture"], std::env::consts::ARCH);
        assert_eq!(result["serverVersion"], env!("CARGO_PKG_VERSION"));
        assert!(result["numCpus"].as_u64().unwrap() >= 1);
        assert!(result["uptime"].as_str().unwrap().ends_with('s'));
    }

    #[test]
    fn ignores_arguments() {
        let mut args = Map::new();
        args.insert("unexpected".to_string(), json!(true));
        assert!(handle(Instant::now(), &args).is_ok());
    }
}
