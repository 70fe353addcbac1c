//! Line-delimited JSON-RPC 2.0 over a reader/writer pair (stdio in production).

use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use devilbox_health::Prober;

use crate::handlers::ToolContext;
use crate::runner::CommandRunner;
use crate::tools::{is_known_tool, tool_definitions};

pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "devilbox";

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;

fn error_response(id: Value, code: i64, message: impl Into<String>) -> Value {
    json!({
        "jsonrpc": "2.0",
        "error": { "code": code, "message": message.into() },
        "id": id
    })
}

fn result_response(id: Value, result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "result": result, "id": id })
}

/// Serves one request at a time against a [`ToolContext`].
pub struct ToolServer<R, P> {
    context: ToolContext<R, P>,
}

impl<R: CommandRunner, P: Prober> ToolServer<R, P> {
    pub fn new(context: ToolContext<R, P>) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &ToolContext<R, P> {
        &self.context
    }

    /// Handle one raw input line. `None` means nothing is written back.
    pub async fn handle_line(&self, line: &str) -> Option<Value> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(request) => self.handle_request(request).await,
            Err(e) => {
                warn!(error = %e, "unparsable request line");
                Some(error_response(Value::Null, PARSE_ERROR, format!("Parse error: {e}")))
            }
        }
    }

    /// Handle one decoded request. Notifications (no `id`) get no response.
    pub async fn handle_request(&self, request: Value) -> Option<Value> {
        let id = request.get("id").cloned();
        let Some(method) = request.get("method").and_then(Value::as_str) else {
            return Some(error_response(
                id.unwrap_or(Value::Null),
                INVALID_REQUEST,
                "Invalid request: missing method",
            ));
        };

        let Some(id) = id else {
            debug!(method, "notification");
            return None;
        };

        let params = request.get("params").cloned().unwrap_or(Value::Null);

        let response = match method {
            "initialize" => result_response(
                id,
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": { "tools": {} },
                    "serverInfo": {
                        "name": SERVER_NAME,
                        "version": env!("CARGO_PKG_VERSION")
                    }
                }),
            ),
            "tools/list" => result_response(id, json!({ "tools": tool_definitions() })),
            "tools/call" => self.call_tool(id, &params).await,
            other => error_response(id, METHOD_NOT_FOUND, format!("Method not found: {other}")),
        };
        Some(response)
    }

    async fn call_tool(&self, id: Value, params: &Value) -> Value {
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if !is_known_tool(name) {
            return error_response(id, METHOD_NOT_FOUND, format!("Unknown tool: {name}"));
        }

        let empty = Value::Object(serde_json::Map::new());
        let args = match params.get("arguments") {
            None | Some(Value::Null) => &empty,
            Some(args) => args,
        };

        match self.context.call(name, args).await {
            Ok(text) => result_response(
                id,
                json!({ "content": [{ "type": "text", "text": text }] }),
            ),
            Err(e) => {
                warn!(tool = name, error = %e, "tool call failed");
                result_response(
                    id,
                    json!({
                        "content": [{ "type": "text", "text": format!("Error: {e}") }],
                        "isError": true
                    }),
                )
            }
        }
    }

    /// Read requests line by line until EOF, writing one response line each.
    pub async fn serve<Rd, W>(&self, reader: Rd, mut writer: W) -> std::io::Result<()>
    where
        Rd: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            if let Some(response) = self.handle_line(&line).await {
                let mut out = serde_json::to_string(&response)?;
                out.push('\n');
                writer.write_all(out.as_bytes()).await?;
                writer.flush().await?;
            }
        }
        debug!("input closed, tool server exiting");
        Ok(())
    }

    /// Serve on this process's stdin and stdout.
    pub async fn serve_stdio(&self) -> std::io::Result<()> {
        info!("devilbox tool server running on stdio");
        self.serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }
}
