//! MCP (Model Context Protocol) interface over stdio.
//!
//! Hosts talk JSON-RPC 2.0, one message per line. Requests are handled strictly
//! one at a time: a message is fully processed, its response written and flushed,
//! before the next line is read.
//!
//! # Tool results
//!
//! Domain failures (validation, not found, storage...) are not protocol errors.
//! They come back as a normal `tools/call` result with `isError: true` and a JSON
//! body `{"error": {"kind", "message"}}` so the host model can read and react to them.

use crate::core::error::SheetError;
use crate::core::store::RecordStore;
use crate::plugins::projects::{self, ToolCall};
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};
use std::io::{BufRead, Write};
use tracing::{debug, info, warn};

pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "project-sheet";

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;

/// JSON-RPC request envelope. A missing `id` marks a notification.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RpcRequest {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    #[serde(default)]
    pub id: Option<JsonValue>,
    pub method: String,
    #[serde(default)]
    pub params: JsonValue,
}

/// JSON-RPC response envelope
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub id: JsonValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,
}

#[derive(Debug, Clone, Deserialize)]
struct CallParams {
    name: String,
    #[serde(default)]
    arguments: JsonValue,
}

pub fn success_response(id: JsonValue, result: JsonValue) -> RpcResponse {
    RpcResponse {
        jsonrpc: "2.0".to_string(),
        id,
        result: Some(result),
        error: None,
    }
}

pub fn error_response(id: JsonValue, code: i64, message: impl Into<String>) -> RpcResponse {
    RpcResponse {
        jsonrpc: "2.0".to_string(),
        id,
        result: None,
        error: Some(RpcError {
            code,
            message: message.into(),
            data: None,
        }),
    }
}

/// Shapes a tool outcome as MCP `CallToolResult`: the payload as pretty text for
/// the model and as `structuredContent` for clients that read JSON directly.
pub fn tool_result(outcome: Result<JsonValue, SheetError>) -> JsonValue {
    let (body, is_error) = match outcome {
        Ok(value) => (value, false),
        Err(err) => (
            json!({ "error": { "kind": err.kind().code(), "message": err.to_string() } }),
            true,
        ),
    };
    let text = serde_json::to_string_pretty(&body).unwrap_or_else(|_| body.to_string());
    json!({
        "content": [{ "type": "text", "text": text }],
        "structuredContent": body,
        "isError": is_error
    })
}

fn initialize_result() -> JsonValue {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": { "tools": { "listChanged": false } },
        "serverInfo": { "name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION") },
        "instructions": "Manage project records kept in a spreadsheet. Ids are assigned by the server; use search_projects to filter by status or owner."
    })
}

/// Handles one raw message. Returns `None` for notifications and blank lines.
pub fn handle_line(store: &mut RecordStore, line: &str) -> Option<RpcResponse> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    let raw: JsonValue = match serde_json::from_str(trimmed) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "unparseable message");
            return Some(error_response(JsonValue::Null, PARSE_ERROR, format!("parse error: {e}")));
        }
    };
    let request: RpcRequest = match serde_json::from_value(raw.clone()) {
        Ok(request) => request,
        Err(e) => {
            let id = raw.get("id").cloned().unwrap_or(JsonValue::Null);
            return Some(error_response(id, INVALID_REQUEST, format!("invalid request: {e}")));
        }
    };
    handle_request(store, request)
}

pub fn handle_request(store: &mut RecordStore, request: RpcRequest) -> Option<RpcResponse> {
    let Some(id) = request.id else {
        debug!(method = %request.method, "notification");
        return None;
    };
    if request.jsonrpc.as_deref() != Some("2.0") {
        return Some(error_response(id, INVALID_REQUEST, "jsonrpc must be \"2.0\""));
    }

    let response = match request.method.as_str() {
        "initialize" => {
            info!("client initialized session");
            success_response(id, initialize_result())
        }
        "ping" => success_response(id, json!({})),
        "tools/list" => success_response(id, json!({ "tools": projects::tool_definitions() })),
        "tools/call" => call_tool(store, id, request.params),
        other => error_response(id, METHOD_NOT_FOUND, format!("method not found: {other}")),
    };
    Some(response)
}

fn call_tool(store: &mut RecordStore, id: JsonValue, params: JsonValue) -> RpcResponse {
    let params: CallParams = match serde_json::from_value(params) {
        Ok(params) => params,
        Err(e) => return error_response(id, INVALID_PARAMS, format!("invalid tools/call params: {e}")),
    };
    if !projects::TOOL_NAMES.contains(&params.name.as_str()) {
        return error_response(id, INVALID_PARAMS, format!("unknown tool: {}", params.name));
    }

    let outcome = ToolCall::parse(&params.name, params.arguments)
        .and_then(|call| projects::execute(store, call));
    match &outcome {
        Ok(_) => info!(tool = %params.name, "tool call succeeded"),
        Err(err) => warn!(tool = %params.name, kind = err.kind().code(), error = %err, "tool call failed"),
    }
    success_response(id, tool_result(outcome))
}

/// Serves until `reader` reaches EOF.
pub fn serve<R: BufRead, W: Write>(
    store: &mut RecordStore,
    reader: R,
    mut writer: W,
) -> Result<(), SheetError> {
    info!(path = %store.path().display(), "serving MCP over stdio");
    for line in reader.lines() {
        let line = line?;
        if let Some(response) = handle_line(store, &line) {
            let encoded = serde_json::to_string(&response)
                .map_err(|e| SheetError::StorageError(format!("failed to encode response: {e}")))?;
            writeln!(writer, "{encoded}")?;
            writer.flush()?;
        }
    }
    info!("input closed, shutting down");
    Ok(())
}
