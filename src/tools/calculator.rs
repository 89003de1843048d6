//! Basic arithmetic tool.

use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::error::ToolError;
use crate::mcp::server::{McpServer, Tool};

/// The arithmetic operations the calculator supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Add => "add",
            Self::Subtract => "subtract",
            Self::Multiply => "multiply",
            Self::Divide => "divide",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Deserialize)]
struct CalculatorInput {
    operation: Operation,
    a: f64,
    b: f64,
}

/// Returns the calculator tool descriptor.
#[must_use]
pub fn definition() -> Tool {
    Tool {
        name: "calculator".to_string(),
        description: "Perform basic arithmetic operations (add, subtract, multiply, divide)"
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "operation": {
                    "type": "string",
                    "enum": ["add", "subtract", "multiply", "divide"],
                    "description": "The arithmetic operation to perform"
                },
                "a": {
                    "type": "number",
                    "description": "First operand"
                },
                "b": {
                    "type": "number",
                    "description": "Second operand"
                }
            },
            "required": ["operation", "a", "b"]
        }),
    }
}

/// Registers the calculator on the server.
pub fn register(server: &mut McpServer) {
    server.register_tool(definition(), Box::new(handle));
}

fn handle(args: &Map<String, Value>) -> Result<Value, ToolError> {
    let input: CalculatorInput = serde_json::from_value(Value::Object(args.clone()))
        .map_err(|e| ToolError::bad_arguments(&e))?;

    let result = match input.operation {
        Operation::Add => input.a + input.b,
        Operation::Subtract => input.a - input.b,
        Operation::Multiply => input.a * input.b,
        Operation::Divide => {
            if input.b == 0.0 {
                return Err(ToolError::Execution("division by zero".to_string()));
            }
            input.a / input.b
        }
    };

    Ok(json!({
        "result": result,
        "operation": format!("{} {} {} = {}", input.a, input.operation, input.b, result),
    }))
}
