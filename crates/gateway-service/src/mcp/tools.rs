//! Tools served by the echo MCP server.

use super::protocol::{CallToolResult, ToolDefinition};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

/// Name of the only tool.
pub const ADD_TWO: &str = "add_two";

/// Arguments of `add_two`.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct AddTwoInput {
    /// The integer to add two to.
    pub n: i64,
}

/// Every tool the server advertises.
pub fn definitions() -> Vec<ToolDefinition> {
    vec![ToolDefinition {
        name: ADD_TWO.to_string(),
        description: Some("A simple add tool".to_string()),
        input_schema: input_schema::<AddTwoInput>(),
    }]
}

/// Run tool `name`, or `None` when no such tool exists.
pub fn call(name: &str, arguments: Value) -> Option<CallToolResult> {
    match name {
        ADD_TWO => Some(add_two(arguments)),
        _ => None,
    }
}

fn add_two(arguments: Value) -> CallToolResult {
    let input: AddTwoInput = match serde_json::from_value(arguments) {
        Ok(input) => input,
        Err(e) => return CallToolResult::error(format!("Invalid input: {}", e)),
    };

    match input.n.checked_add(2) {
        Some(result) => CallToolResult::structured(result.to_string(), json!({ "result": result })),
        None => CallToolResult::error("Invalid input: n is out of range"),
    }
}

fn input_schema<I: JsonSchema>() -> Value {
    let schema = schemars::schema_for!(I);
    serde_json::to_value(schema).unwrap_or_else(|_| json!({ "type": "object" }))
}
