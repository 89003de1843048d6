//! Echo tool, mainly useful for testing clients end to end.

use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::error::ToolError;
use crate::mcp::server::{McpServer, Tool};

#[derive(Debug, Deserialize)]
struct EchoInput {
    #[serde(default)]
    message: String,
}

/// Returns the echo tool descriptor.
#[must_use]
pub fn definition() -> Tool {
    Tool {
        name: "echo".to_string(),
        description: "Echo back a message (for testing)".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "message": {
                    "type": "string",
                    "description": "The message to echo back"
                }
            },
            "required": ["message"]
        }),
    }
}

/// Registers the echo tool on the server.
pub fn register(server: &mut McpServer) {
    server.register_tool(definition(), Box::new(handle));
}

fn handle(args: &Map<String, Value>) -> Result<Value, ToolError> {
    let input: EchoInput = serde_json::from_value(Value::Object(args.clone()))
        .map_err(|e| ToolError::bad_arguments(&e))?;

    if input.message.is_empty() {
        return Err(ToolError::Execution("message is required".to_string()));
    }

    Ok(json!({
        "echo": input.message,
        "length": input.message.len(),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(json: Value) -> Map<String, Value> {
        json.as_object().unwrap().clone()
    }

    #[test]
    fn echoes_message_with_length() {
        let result = handle(&args(json!({"message": "hello"}))).unwrap();
        assert_eq!(result["echo"], "hello");
        assert_eq!(result["length"], 5);
        assert!(result["timestamp"].as_str().is_some());
    }

    #[test]
    fn empty_message_is_execution_error() {
        let err = handle(&args(json!({"message": ""}))).unwrap_err();
        assert!(matches!(err, ToolError::Execution(_)));
    }

    #[test]
    fn missing_message_is_execution_error() {
        let err = handle(&Map::new()).unwrap_err();
        assert!(err.to_string().contains("message is required"));
    }

    #[test]
    fn non_string_message_is_invalid_arguments() {
        let err = handle(&args(json!({"message": 42}))).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
