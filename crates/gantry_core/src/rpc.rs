//! Stdio transport: newline-delimited JSON-RPC 2.0 frames.
//!
//! One bidirectional channel per process, bound after the startup probe
//! succeeds and held for the process lifetime; exactly one peer is expected.
//! Logging goes to stderr — stdout is reserved for protocol frames.

use crate::error::DispatchError;
use crate::lifecycle::Lifecycle;
use crate::registry::ToolRegistry;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

/// Protocol revision answered to `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Name and version announced in the `initialize` handshake.
#[derive(Debug, Clone, Copy)]
pub struct ServerInfo {
    pub name: &'static str,
    pub version: &'static str,
}

/// The transport channel and method router for one server process.
pub struct RpcServer {
    info: ServerInfo,
    registry: ToolRegistry,
}

impl RpcServer {
    pub fn new(info: ServerInfo, registry: ToolRegistry) -> Self {
        Self { info, registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Bind stdin/stdout and serve frames until the peer closes the stream
    /// or the lifecycle shuts down.
    pub async fn serve(&self, lifecycle: &Lifecycle) -> std::io::Result<()> {
        tracing::info!(
            "{} v{} listening on stdio ({} tools)",
            self.info.name,
            self.info.version,
            self.registry.len()
        );
        self.serve_io(tokio::io::stdin(), tokio::io::stdout(), lifecycle)
            .await
    }

    /// Frame loop over arbitrary streams; split out so tests can drive it
    /// without a real stdio pair.
    pub async fn serve_io<R, W>(
        &self,
        reader: R,
        mut writer: W,
        lifecycle: &Lifecycle,
    ) -> std::io::Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = BufReader::new(reader).lines();
        loop {
            let line = tokio::select! {
                line = lines.next_line() => line?,
                _ = lifecycle.terminated() => {
                    tracing::info!("transport closing: shutdown requested");
                    return Ok(());
                }
            };
            let Some(line) = line else {
                tracing::info!("transport closing: peer closed the stream");
                return Ok(());
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(response) = self.handle_line(line).await {
                writer.write_all(response.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
        }
    }

    /// Handle one inbound frame. Returns `None` for notifications.
    pub async fn handle_line(&self, line: &str) -> Option<String> {
        let request: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                return Some(error_response(
                    Value::Null,
                    -32700,
                    &format!("Parse error: {}", e),
                ));
            }
        };

        let id = request.get("id").cloned().unwrap_or(Value::Null);
        let method = request.get("method").and_then(Value::as_str).unwrap_or("");
        let params = request.get("params").cloned().unwrap_or_else(|| json!({}));

        match method {
            "initialize" => Some(self.handle_initialize(id)),
            "tools/list" => Some(self.handle_tools_list(id)),
            "tools/call" => Some(self.handle_tools_call(id, &params).await),
            "ping" => Some(success_response(id, json!({}))),
            method if method.starts_with("notifications/") => None,
            _ => Some(error_response(
                id,
                -32601,
                &format!("Method not found: {}", method),
            )),
        }
    }

    fn handle_initialize(&self, id: Value) -> String {
        success_response(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": {} },
                "serverInfo": {
                    "name": self.info.name,
                    "version": self.info.version,
                },
            }),
        )
    }

    fn handle_tools_list(&self, id: Value) -> String {
        success_response(id, json!({ "tools": self.registry.definitions() }))
    }

    async fn handle_tools_call(&self, id: Value, params: &Value) -> String {
        let tool_name = params.get("name").and_then(Value::as_str).unwrap_or("");
        let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));

        match self.registry.dispatch(tool_name, &arguments).await {
            Ok(envelope) => match serde_json::to_value(&envelope) {
                Ok(result) => success_response(id, result),
                Err(e) => error_response(id, -32603, &format!("Internal error: {}", e)),
            },
            // An unknown tool indicates a malformed caller; it is the one
            // dispatch failure surfaced at the protocol level.
            Err(DispatchError::UnknownTool(name)) => {
                error_response(id, -32602, &format!("Unknown tool: {}", name))
            }
        }
    }
}

fn success_response(id: Value, result: Value) -> String {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result,
    })
    .to_string()
}

fn error_response(id: Value, code: i32, message: &str) -> String {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": code,
            "message": message,
        },
    })
    .to_string()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ToolError;
    use crate::schema::{Field, Schema, ValidatedParams};
    use crate::tools::{ToolDescriptor, ToolHandler};

    struct PingTool;

    #[async_trait::async_trait]
    impl ToolHandler for PingTool {
        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor {
                name: "pingBackend",
                title: "Ping backend",
                description: "answers pong",
            }
        }

        fn schema(&self) -> Schema {
            Schema::object().field(Field::string("target", "host to ping").required())
        }

        async fn execute(&self, params: &ValidatedParams) -> Result<Value, ToolError> {
            Ok(json!({ "pong": params["target"] }))
        }
    }

    fn server() -> RpcServer {
        let mut registry = ToolRegistry::new();
        registry.register(PingTool).expect("register");
        RpcServer::new(
            ServerInfo {
                name: "gantry-test",
                version: "0.0.0",
            },
            registry,
        )
    }

    fn parse(response: &str) -> Value {
        serde_json::from_str(response).expect("valid json response")
    }

    #[tokio::test]
    async fn test_initialize_handshake() {
        let response = server()
            .handle_line(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#)
            .await
            .expect("response");
        let response = parse(&response);
        assert_eq!(response["id"], 1);
        assert_eq!(response["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(response["result"]["serverInfo"]["name"], "gantry-test");
    }

    #[tokio::test]
    async fn test_tools_list_advertises_schema() {
        let response = server()
            .handle_line(r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#)
            .await
            .expect("response");
        let response = parse(&response);
        let tool = &response["result"]["tools"][0];
        assert_eq!(tool["name"], "pingBackend");
        assert_eq!(tool["inputSchema"]["required"][0], "target");
    }

    #[tokio::test]
    async fn test_tools_call_wraps_result_in_envelope() {
        let response = server()
            .handle_line(
                r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"pingBackend","arguments":{"target":"db1"}}}"#,
            )
            .await
            .expect("response");
        let response = parse(&response);
        let text = response["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("\"pong\": \"db1\""));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_jsonrpc_error() {
        let response = server()
            .handle_line(
                r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"nope","arguments":{}}}"#,
            )
            .await
            .expect("response");
        let response = parse(&response);
        assert_eq!(response["error"]["code"], -32602);
        assert!(response["error"]["message"].as_str().unwrap().contains("nope"));
    }

    #[tokio::test]
    async fn test_invalid_params_still_success_shaped() {
        // Validation failures are ordinary tool output, not protocol faults.
        let response = server()
            .handle_line(
                r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"name":"pingBackend","arguments":{}}}"#,
            )
            .await
            .expect("response");
        let response = parse(&response);
        assert!(response.get("error").is_none());
        let text = response["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("required field is missing"));
    }

    #[tokio::test]
    async fn test_parse_error_and_unknown_method() {
        let srv = server();
        let parse_err = parse(&srv.handle_line("{not json").await.expect("response"));
        assert_eq!(parse_err["error"]["code"], -32700);

        let unknown = parse(
            &srv.handle_line(r#"{"jsonrpc":"2.0","id":6,"method":"resources/list"}"#)
                .await
                .expect("response"),
        );
        assert_eq!(unknown["error"]["code"], -32601);
    }

    #[tokio::test]
    async fn test_notification_gets_no_reply() {
        let response = server()
            .handle_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await;
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn test_serve_io_roundtrip() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"pingBackend","arguments":{"target":"x"}}}"#,
            "\n",
        );
        let mut output: Vec<u8> = Vec::new();
        let lifecycle = Lifecycle::new();
        server()
            .serve_io(input.as_bytes(), std::io::Cursor::new(&mut output), &lifecycle)
            .await
            .expect("serve");

        let written = String::from_utf8(output).expect("utf8");
        let responses: Vec<Value> = written.lines().map(|l| parse(l)).collect();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["id"], 1);
        assert_eq!(responses[1]["id"], 2);
    }
}
