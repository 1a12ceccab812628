// Workbench Gate - MCP Server (JSON-RPC 2.0 over stdio)
//
// ALL tool calls route through the dispatch gateway. stdout carries
// JSON-RPC exclusively; logging goes to stderr. A malformed line or an
// unknown method never terminates the loop.

use crate::gateway::{CallRequest, Gateway};
use crate::registry::JsonMap;
use serde_json::{json, Value};
use std::io::{self, BufRead, Write};

const PROTOCOL_VERSION: &str = "2024-11-05";
const SERVER_NAME: &str = "workbench-gate";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Send JSON-RPC response
fn send_response(id: &Value, result: Value) {
    let response = json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result,
    });
    write_line(&response);
}

/// Send JSON-RPC error response
fn send_error(id: &Value, code: i64, message: &str) {
    let response = json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": code, "message": message },
    });
    write_line(&response);
}

fn write_line(response: &Value) {
    let msg = match serde_json::to_string(response) {
        Ok(s) => s,
        Err(e) => {
            log::error!("response serialization failed: {}", e);
            return;
        }
    };
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let _ = out.write_all(msg.as_bytes());
    let _ = out.write_all(b"\n");
    let _ = out.flush();
}

/// Tool definitions for tools/list, derived from the registry.
fn tool_definitions(gateway: &Gateway) -> Vec<Value> {
    gateway
        .registry()
        .list()
        .iter()
        .map(|tool| {
            json!({
                "name": tool.qualified_name,
                "description": tool.description,
                "inputSchema": tool.input_schema(),
            })
        })
        .collect()
}

/// Handle one tools/call. The outcome is framed as MCP text content;
/// the serialized payload carries "error" if and only if the call failed.
fn handle_tool_call(gateway: &Gateway, params: &Value) -> Value {
    let name = params["name"].as_str().unwrap_or("");
    let args: JsonMap = params
        .get("arguments")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    log::info!("CALL {}", name);
    let result = gateway.dispatch(&CallRequest::new(name, args));
    if let Some(e) = result.error() {
        log::warn!("FAIL {} | {}", name, e);
    }

    let payload = result.to_value();
    let text = serde_json::to_string(&payload).unwrap_or_else(|_| payload.to_string());
    json!({ "type": "text", "text": text })
}

/// Serve JSON-RPC over stdio until stdin closes.
pub fn run(gateway: &Gateway) {
    log::info!("Starting {} v{}", SERVER_NAME, SERVER_VERSION);
    log::info!(
        "Workspace: {} | {} tools registered",
        gateway.ctx().workspace.display(),
        gateway.registry().len()
    );

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                log::error!("stdin read error: {}", e);
                continue;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let msg: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                log::error!("JSON parse error: {}", e);
                continue;
            }
        };

        let method = msg["method"].as_str().unwrap_or("");
        let id = &msg["id"];
        let params = &msg["params"];

        log::debug!("Received: {}", method);

        match method {
            "initialize" => {
                send_response(id, json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": { "tools": {} },
                    "serverInfo": {
                        "name": SERVER_NAME,
                        "version": SERVER_VERSION,
                    }
                }));
            }

            "notifications/initialized" => {
                // No response needed
            }

            "tools/list" => {
                send_response(id, json!({ "tools": tool_definitions(gateway) }));
            }

            "tools/call" => {
                let content = handle_tool_call(gateway, params);
                send_response(id, json!({ "content": [content] }));
            }

            "ping" => {
                send_response(id, json!({}));
            }

            _ => {
                if !id.is_null() {
                    send_error(id, -32601, &format!("Unknown method: {}", method));
                }
            }
        }
    }

    log::info!("stdin closed, shutting down");
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkbenchConfig;
    use tempfile::tempdir;

    fn gateway_in(dir: &std::path::Path) -> Gateway {
        let config = WorkbenchConfig {
            workspace_root: dir.to_path_buf(),
            ..WorkbenchConfig::default()
        };
        Gateway::new(config).unwrap()
    }

    #[test]
    fn tool_definitions_advertise_schemas() {
        let dir = tempdir().unwrap();
        let gw = gateway_in(dir.path());
        let defs = tool_definitions(&gw);
        assert_eq!(defs.len(), gw.registry().len());

        let read_file = defs
            .iter()
            .find(|d| d["name"] == "FS: read_file")
            .expect("FS: read_file advertised");
        assert_eq!(read_file["inputSchema"]["type"], "object");
        assert_eq!(read_file["inputSchema"]["required"], json!(["path"]));
        assert!(read_file["description"].as_str().unwrap().len() > 0);
    }

    #[test]
    fn tool_call_frames_payload_as_text_content() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "hello").unwrap();
        let gw = gateway_in(dir.path());

        let content = handle_tool_call(
            &gw,
            &json!({"name": "FS: read_file", "arguments": {"path": "a.txt"}}),
        );
        assert_eq!(content["type"], "text");
        let payload: Value = serde_json::from_str(content["text"].as_str().unwrap()).unwrap();
        assert_eq!(payload["content"], "hello");
    }

    #[test]
    fn failed_tool_call_serializes_the_error_field() {
        let dir = tempdir().unwrap();
        let gw = gateway_in(dir.path());
        let content = handle_tool_call(&gw, &json!({"name": "no-such-tool"}));
        let payload: Value = serde_json::from_str(content["text"].as_str().unwrap()).unwrap();
        assert!(payload["error"].as_str().unwrap().contains("no-such-tool"));
    }

    #[test]
    fn missing_arguments_object_defaults_to_empty() {
        let dir = tempdir().unwrap();
        let gw = gateway_in(dir.path());
        let content = handle_tool_call(&gw, &json!({"name": "FS: list_files"}));
        let payload: Value = serde_json::from_str(content["text"].as_str().unwrap()).unwrap();
        assert_eq!(payload["files"], json!([]));
    }
}
