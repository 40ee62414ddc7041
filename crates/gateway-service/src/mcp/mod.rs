//! Stateless MCP server mounted behind the gate at `/echo/mcp`.
//!
//! Speaks JSON-RPC 2.0 over streamable HTTP with plain JSON responses and
//! no sessions. Supports `initialize`, `ping`, `tools/list` and
//! `tools/call` for the single `add_two` tool.

pub mod protocol;
pub mod tools;

use protocol::{
    CallToolParams, Implementation, InitializeParams, InitializeResult, JsonRpcError,
    JsonRpcRequest, JsonRpcResponse, ListToolsResult, ServerCapabilities, ToolsCapability,
    LATEST_PROTOCOL_VERSION, SUPPORTED_PROTOCOL_VERSIONS,
};
use serde::Serialize;
use serde_json::Value;

/// Name announced in `initialize`.
pub const SERVER_NAME: &str = "MathServer";

/// Handle one JSON-RPC message body.
///
/// Returns `None` for notifications, which get no response.
pub fn handle_message(body: &str) -> Option<JsonRpcResponse> {
    let parsed: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(e) => {
            return Some(JsonRpcResponse::error(
                None,
                JsonRpcError::parse_error(format!("Invalid JSON: {}", e)),
            ));
        }
    };

    // Messages without an id are notifications
    if parsed.is_object() && parsed.get("id").is_none() {
        tracing::debug!(
            target: "gateway.mcp",
            method = parsed.get("method").and_then(serde_json::Value::as_str).unwrap_or_default(),
            "Notification received"
        );
        return None;
    }

    let request: JsonRpcRequest = match serde_json::from_value(parsed) {
        Ok(request) => request,
        Err(e) => {
            return Some(JsonRpcResponse::error(
                None,
                JsonRpcError::invalid_request(format!("Invalid request: {}", e)),
            ));
        }
    };

    Some(dispatch(request))
}

fn dispatch(request: JsonRpcRequest) -> JsonRpcResponse {
    if let Err(error) = request.validate() {
        return JsonRpcResponse::error(Some(request.id), error);
    }

    tracing::debug!(target: "gateway.mcp", method = %request.method, "Handling request");

    let params = request.params.unwrap_or(Value::Null);
    let outcome = match request.method.as_str() {
        "initialize" => initialize(params).and_then(to_result),
        "ping" => Ok(Value::Object(serde_json::Map::new())),
        "tools/list" => to_result(ListToolsResult {
            tools: tools::definitions(),
            next_cursor: None,
        }),
        "tools/call" => call_tool(params),
        other => Err(JsonRpcError::method_not_found(other)),
    };

    match outcome {
        Ok(result) => JsonRpcResponse::result(request.id, result),
        Err(error) => JsonRpcResponse::error(Some(request.id), error),
    }
}

fn initialize(params: Value) -> Result<InitializeResult, JsonRpcError> {
    let params: InitializeParams = if params.is_null() {
        InitializeParams::default()
    } else {
        serde_json::from_value(params)
            .map_err(|e| JsonRpcError::invalid_params(format!("Invalid initialize params: {}", e)))?
    };

    // Echo the client's version when supported, otherwise offer the latest
    let protocol_version = params
        .protocol_version
        .filter(|v| SUPPORTED_PROTOCOL_VERSIONS.contains(&v.as_str()))
        .unwrap_or_else(|| LATEST_PROTOCOL_VERSION.to_string());

    Ok(InitializeResult {
        protocol_version,
        capabilities: ServerCapabilities {
            tools: ToolsCapability {
                list_changed: false,
            },
        },
        server_info: Implementation {
            name: SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        instructions: None,
    })
}

fn call_tool(params: Value) -> Result<Value, JsonRpcError> {
    let params: CallToolParams = serde_json::from_value(params)
        .map_err(|e| JsonRpcError::invalid_params(format!("Invalid tools/call params: {}", e)))?;

    match tools::call(&params.name, params.arguments) {
        Some(result) => to_result(result),
        None => Err(JsonRpcError::invalid_params(format!(
            "Unknown tool: {}",
            params.name
        ))),
    }
}

fn to_result<T: Serialize>(value: T) -> Result<Value, JsonRpcError> {
    serde_json::to_value(value).map_err(|e| JsonRpcError::internal_error(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call(message: Value) -> Value {
        let response = handle_message(&message.to_string()).unwrap();
        serde_json::to_value(response).unwrap()
    }

    #[test]
    fn test_initialize_announces_tools() {
        let response = call(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {
                "protocolVersion": "2025-03-26",
                "capabilities": {},
                "clientInfo": {"name": "test-client", "version": "1.0.0"}
            }
        }));

        assert_eq!(response["id"], 1);
        assert_eq!(response["result"]["protocolVersion"], "2025-03-26");
        assert_eq!(response["result"]["serverInfo"]["name"], "MathServer");
        assert_eq!(response["result"]["capabilities"]["tools"]["listChanged"], false);
    }

    #[test]
    fn test_initialize_with_unknown_version_offers_latest() {
        let response = call(json!({
            "jsonrpc": "2.0",
            "id": "init",
            "method": "initialize",
            "params": {"protocolVersion": "1999-01-01"}
        }));

        assert_eq!(response["id"], "init");
        assert_eq!(response["result"]["protocolVersion"], LATEST_PROTOCOL_VERSION);
    }

    #[test]
    fn test_ping() {
        let response = call(json!({"jsonrpc": "2.0", "id": 2, "method": "ping"}));
        assert_eq!(response["result"], json!({}));
    }

    #[test]
    fn test_tools_list() {
        let response = call(json!({"jsonrpc": "2.0", "id": 3, "method": "tools/list"}));

        let tools = response["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0]["name"], "add_two");
        assert_eq!(tools[0]["description"], "A simple add tool");
        assert_eq!(tools[0]["inputSchema"]["required"], json!(["n"]));
        assert!(response["result"].get("nextCursor").is_none());
    }

    #[test]
    fn test_tools_call_add_two() {
        let response = call(json!({
            "jsonrpc": "2.0",
            "id": 4,
            "method": "tools/call",
            "params": {"name": "add_two", "arguments": {"n": 1}}
        }));

        assert_eq!(response["result"]["content"][0]["text"], "3");
        assert_eq!(response["result"]["structuredContent"]["result"], 3);
        assert!(response["result"].get("isError").is_none());
    }

    #[test]
    fn test_tools_call_bad_arguments_is_tool_error() {
        let response = call(json!({
            "jsonrpc": "2.0",
            "id": 5,
            "method": "tools/call",
            "params": {"name": "add_two", "arguments": {"n": "one"}}
        }));

        assert_eq!(response["result"]["isError"], true);
        assert!(response.get("error").is_none());
    }

    #[test]
    fn test_tools_call_unknown_tool_is_invalid_params() {
        let response = call(json!({
            "jsonrpc": "2.0",
            "id": 6,
            "method": "tools/call",
            "params": {"name": "add_three", "arguments": {"n": 1}}
        }));

        assert_eq!(response["id"], 6);
        assert_eq!(response["error"]["code"], JsonRpcError::INVALID_PARAMS);
        assert!(response["error"]["message"].as_str().unwrap().contains("add_three"));
    }

    #[test]
    fn test_tools_call_without_params_is_invalid_params() {
        let response = call(json!({"jsonrpc": "2.0", "id": 7, "method": "tools/call"}));
        assert_eq!(response["error"]["code"], JsonRpcError::INVALID_PARAMS);
    }

    #[test]
    fn test_unknown_method() {
        let response = call(json!({"jsonrpc": "2.0", "id": 8, "method": "resources/list"}));

        assert_eq!(response["error"]["code"], JsonRpcError::METHOD_NOT_FOUND);
        assert_eq!(response["error"]["message"], "Method not found: resources/list");
    }

    #[test]
    fn test_wrong_jsonrpc_version() {
        let response = call(json!({"jsonrpc": "1.0", "id": 9, "method": "ping"}));

        assert_eq!(response["id"], 9);
        assert_eq!(response["error"]["code"], JsonRpcError::INVALID_REQUEST);
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let response = serde_json::to_value(handle_message("{not json").unwrap()).unwrap();

        assert_eq!(response["error"]["code"], JsonRpcError::PARSE_ERROR);
        assert!(response.get("id").is_none());
    }

    #[test]
    fn test_non_request_is_invalid_request() {
        let response = call(json!([{"jsonrpc": "2.0", "id": 1, "method": "ping"}]));
        assert_eq!(response["error"]["code"], JsonRpcError::INVALID_REQUEST);

        let response = call(json!({"jsonrpc": "2.0", "id": 1}));
        assert_eq!(response["error"]["code"], JsonRpcError::INVALID_REQUEST);
    }

    #[test]
    fn test_notification_gets_no_response() {
        let message = json!({"jsonrpc": "2.0", "method": "notifications/initialized"});
        assert!(handle_message(&message.to_string()).is_none());
    }
}
