//! Tool provider running as a child process.
//!
//! Speaks newline-delimited JSON-RPC 2.0 over the child's stdin/stdout using
//! the MCP method names (`initialize`, `tools/list`, `tools/call`). Requests
//! may be in flight concurrently and answered in any order: whichever caller
//! holds the reader parks responses meant for others in an inbox keyed by id.
//! The child is killed when the provider is shut down or dropped.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::debug;

use super::{ToolDescriptor, ToolError, ToolExecutor};
use crate::constants::{MCP_PROTOCOL_VERSION, STDIO_PASSTHROUGH_ENV};

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    id: Option<u64>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// Tool definition as returned by `tools/list`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListedTool {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default = "default_schema")]
    input_schema: Value,
}

fn default_schema() -> Value {
    json!({"type": "object", "properties": {}})
}

/// Result body of `tools/call`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CallResult {
    #[serde(default)]
    content: Vec<ContentItem>,
    #[serde(default)]
    is_error: bool,
}

#[derive(Debug, Deserialize)]
struct ContentItem {
    #[serde(default)]
    text: Option<String>,
}

/// A tool provider process speaking JSON-RPC over stdio.
pub struct StdioProvider {
    name: String,
    next_id: AtomicU64,
    timeout: Duration,
    stdin: Mutex<ChildStdin>,
    stdout: Mutex<BufReader<ChildStdout>>,
    /// Responses read on behalf of another in-flight request.
    inbox: Mutex<HashMap<u64, JsonRpcResponse>>,
    child: Mutex<Option<Child>>,
}

impl StdioProvider {
    /// Spawn `program args..` and perform the initialize handshake.
    pub async fn spawn(
        name: &str,
        program: &str,
        args: &[String],
        env: &HashMap<String, String>,
        timeout: Duration,
    ) -> Result<Self, ToolError> {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        // Only pass through what the provider needs; API keys stay with the host.
        cmd.env_clear();
        for key in STDIO_PASSTHROUGH_ENV {
            if let Ok(val) = std::env::var(key) {
                cmd.env(key, val);
            }
        }
        cmd.envs(env);

        let mut child = cmd
            .spawn()
            .map_err(|e| ToolError::Transport(format!("failed to spawn '{program}': {e}")))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ToolError::Transport("failed to capture stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ToolError::Transport("failed to capture stdout".into()))?;

        let provider = Self {
            name: name.to_string(),
            next_id: AtomicU64::new(1),
            timeout,
            stdin: Mutex::new(stdin),
            stdout: Mutex::new(BufReader::new(stdout)),
            inbox: Mutex::new(HashMap::new()),
            child: Mutex::new(Some(child)),
        };
        provider.initialize().await?;
        Ok(provider)
    }

    async fn initialize(&self) -> Result<(), ToolError> {
        let params = json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": crate::constants::APP_NAME,
                "version": env!("CARGO_PKG_VERSION"),
            },
        });
        let response = self.request("initialize", Some(params)).await?;
        debug!(server = %self.name, response = %response, "tool provider initialized");
        self.notify("notifications/initialized").await
    }

    /// Fetch the provider's tool descriptors.
    pub async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolError> {
        let result = self.request("tools/list", None).await?;
        let listed = result.get("tools").cloned().unwrap_or_else(|| json!([]));
        let tools: Vec<ListedTool> = serde_json::from_value(listed)
            .map_err(|e| ToolError::Transport(format!("malformed tools/list result: {e}")))?;
        Ok(tools
            .into_iter()
            .map(|t| ToolDescriptor::new(t.name, t.description, t.input_schema))
            .collect())
    }

    /// Kill the child process. Safe to call more than once.
    pub async fn shutdown(&self) {
        if let Some(mut child) = self.child.lock().await.take() {
            let _ = child.kill().await;
            let _ = child.wait().await;
            debug!(server = %self.name, "tool provider stopped");
        }
    }

    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, ToolError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.write_line(&JsonRpcRequest {
            jsonrpc: "2.0",
            id: Some(id),
            method,
            params,
        })
        .await?;

        let response = match tokio::time::timeout(self.timeout, self.read_response(id)).await {
            Ok(response) => response?,
            Err(_) => {
                self.inbox.lock().await.remove(&id);
                return Err(ToolError::Transport(format!(
                    "'{}' did not answer {method} within {}s",
                    self.name,
                    self.timeout.as_secs()
                )));
            }
        };

        match response.error {
            Some(err) => Err(ToolError::Remote(format!(
                "JSON-RPC error {}: {}",
                err.code, err.message
            ))),
            None => Ok(response.result.unwrap_or(Value::Null)),
        }
    }

    async fn notify(&self, method: &str) -> Result<(), ToolError> {
        self.write_line(&JsonRpcRequest {
            jsonrpc: "2.0",
            id: None,
            method,
            params: None,
        })
        .await
    }

    async fn write_line(&self, request: &JsonRpcRequest<'_>) -> Result<(), ToolError> {
        let mut line = serde_json::to_string(request)
            .map_err(|e| ToolError::Transport(e.to_string()))?;
        line.push('\n');
        let mut stdin = self.stdin.lock().await;
        stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| ToolError::Transport(format!("write to '{}' failed: {e}", self.name)))?;
        stdin
            .flush()
            .await
            .map_err(|e| ToolError::Transport(format!("flush to '{}' failed: {e}", self.name)))
    }

    /// Wait for the response to `expected_id`.
    ///
    /// The reader is taken one line at a time, so a caller whose answer was
    /// parked by someone else picks it up on its next turn.
    async fn read_response(&self, expected_id: u64) -> Result<JsonRpcResponse, ToolError> {
        let mut buf = String::new();
        loop {
            let mut stdout = self.stdout.lock().await;
            if let Some(resp) = self.inbox.lock().await.remove(&expected_id) {
                return Ok(resp);
            }

            buf.clear();
            let n = stdout
                .read_line(&mut buf)
                .await
                .map_err(|e| ToolError::Transport(format!("read from '{}' failed: {e}", self.name)))?;
            if n == 0 {
                return Err(ToolError::Transport(format!("'{}' closed its stdout", self.name)));
            }
            let trimmed = buf.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<JsonRpcResponse>(trimmed) {
                Ok(resp) if resp.id == Some(expected_id) => return Ok(resp),
                Ok(resp) => match resp.id {
                    Some(id) if id < self.next_id.load(Ordering::Relaxed) => {
                        self.inbox.lock().await.insert(id, resp);
                    }
                    Some(id) => {
                        debug!(server = %self.name, id, "dropping response to an id never sent");
                    }
                    None => {
                        debug!(server = %self.name, "ignoring JSON-RPC notification");
                    }
                },
                Err(_) => {
                    debug!(server = %self.name, line = trimmed, "ignoring non-JSON-RPC line");
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl ToolExecutor for StdioProvider {
    async fn call(&self, name: &str, arguments: Value) -> Result<Value, ToolError> {
        let result = self
            .request(
                "tools/call",
                Some(json!({ "name": name, "arguments": arguments })),
            )
            .await?;
        decode_call_result(result)
    }
}

/// Turn a `tools/call` result body into a JSON value.
///
/// A single text item holding JSON becomes that JSON; anything else becomes
/// the joined text.
fn decode_call_result(result: Value) -> Result<Value, ToolError> {
    let parsed: CallResult = serde_json::from_value(result)
        .map_err(|e| ToolError::Transport(format!("malformed tools/call result: {e}")))?;
    let texts: Vec<&str> = parsed
        .content
        .iter()
        .filter_map(|c| c.text.as_deref())
        .collect();

    if parsed.is_error {
        return Err(ToolError::Remote(texts.join("\n")));
    }

    match texts.as_slice() {
        [] => Ok(Value::Null),
        [single] => Ok(serde_json::from_str(single)
            .unwrap_or_else(|_| Value::String(single.to_string()))),
        many => Ok(Value::String(many.join("\n"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let req = JsonRpcRequest {
            jsonrpc: "2.0",
            id: Some(3),
            method: "tools/list",
            params: None,
        };
        let line = serde_json::to_string(&req).unwrap();
        assert_eq!(line, r#"{"jsonrpc":"2.0","id":3,"method":"tools/list"}"#);
    }

    #[test]
    fn test_notification_has_no_id() {
        let req = JsonRpcRequest {
            jsonrpc: "2.0",
            id: None,
            method: "notifications/initialized",
            params: None,
        };
        let line = serde_json::to_string(&req).unwrap();
        assert!(!line.contains("\"id\""));
    }

    #[test]
    fn test_listed_tool_parsing() {
        let raw = r#"{"name":"get_users","description":"List users","inputSchema":{"type":"object","properties":{}}}"#;
        let tool: ListedTool = serde_json::from_str(raw).unwrap();
        assert_eq!(tool.name, "get_users");
        assert_eq!(tool.input_schema["type"], "object");

        let bare: ListedTool = serde_json::from_str(r#"{"name":"ping"}"#).unwrap();
        assert_eq!(bare.description, "");
        assert_eq!(bare.input_schema["type"], "object");
    }

    #[test]
    fn test_decode_json_text() {
        let result = json!({"content": [{"type": "text", "text": "[{\"id\":\"1\"}]"}], "isError": false});
        assert_eq!(decode_call_result(result).unwrap(), json!([{"id": "1"}]));
    }

    #[test]
    fn test_decode_plain_and_multiple_text() {
        let single = json!({"content": [{"type": "text", "text": "done"}]});
        assert_eq!(decode_call_result(single).unwrap(), json!("done"));

        let many = json!({"content": [{"type": "text", "text": "a"}, {"type": "text", "text": "b"}]});
        assert_eq!(decode_call_result(many).unwrap(), json!("a\nb"));

        let empty = json!({"content": []});
        assert_eq!(decode_call_result(empty).unwrap(), Value::Null);
    }

    #[test]
    fn test_decode_error_result() {
        let result = json!({"content": [{"type": "text", "text": "user not found"}], "isError": true});
        let err = decode_call_result(result).unwrap_err();
        assert!(matches!(err, ToolError::Remote(ref m) if m == "user not found"));
    }

    #[test]
    fn test_error_response_parsing() {
        let raw = r#"{"jsonrpc":"2.0","id":2,"error":{"code":-32601,"message":"Method not found"}}"#;
        let resp: JsonRpcResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.id, Some(2));
        assert_eq!(resp.error.unwrap().code, -32601);
    }

    async fn run_script(script: &str) -> Result<StdioProvider, ToolError> {
        StdioProvider::spawn(
            "script",
            "sh",
            &["-c".to_string(), script.to_string()],
            &HashMap::new(),
            Duration::from_secs(5),
        )
        .await
    }

    const LIFECYCLE: &str = r#"
read -r line
case "$line" in *'"method":"initialize"'*) ;; *) exit 1 ;; esac
printf '%s\n' '{"jsonrpc":"2.0","id":1,"result":{"protocolVersion":"2024-11-05","capabilities":{}}}'
read -r line
case "$line" in *notifications/initialized*) ;; *) exit 1 ;; esac
read -r line
printf '%s\n' '{"jsonrpc":"2.0","id":2,"result":{"tools":[{"name":"list_clients","description":"List clients","inputSchema":{"type":"object","properties":{}}}]}}'
read -r line
printf '%s\n' 'starting up...'
printf '%s\n' '{"jsonrpc":"2.0","method":"notifications/message","params":{}}'
printf '%s\n' '{"jsonrpc":"2.0","id":3,"result":{"content":[{"type":"text","text":"[{\"id\":\"1\",\"client_name\":\"Acme\"}]"}],"isError":false}}'
read -r line
printf '%s\n' '{"jsonrpc":"2.0","id":4,"result":{"content":[{"type":"text","text":"client not found"}],"isError":true}}'
read -r line
printf '%s\n' '{"jsonrpc":"2.0","id":5,"error":{"code":-32602,"message":"bad params"}}'
read -r line
exit 0
"#;

    #[tokio::test]
    async fn test_child_lifecycle() {
        let provider = run_script(LIFECYCLE).await.unwrap();

        let tools = provider.list_tools().await.unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "list_clients");
        assert_eq!(tools[0].description, "List clients");

        let clients = provider.call("list_clients", json!({})).await.unwrap();
        assert_eq!(clients, json!([{"id": "1", "client_name": "Acme"}]));

        let err = provider.call("get_client", json!({"client_id": "9"})).await.unwrap_err();
        assert!(matches!(err, ToolError::Remote(ref m) if m == "client not found"));

        let err = provider.call("get_client", json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::Remote(ref m) if m.contains("bad params")));

        let err = provider.call("list_clients", json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::Transport(ref m) if m.contains("closed its stdout")));

        provider.shutdown().await;
        provider.shutdown().await;
    }

    /// Answers both calls, the later one first, echoing each call's tool name.
    const REVERSED: &str = r#"
reply() {
  id=$(printf '%s' "$1" | sed 's/.*"id":\([0-9]*\).*/\1/')
  name=$(printf '%s' "$1" | sed 's/.*"name":"\([a-z]*\)".*/\1/')
  printf '{"jsonrpc":"2.0","id":%s,"result":{"content":[{"type":"text","text":"%s"}]}}\n' "$id" "$name"
}
read -r line
printf '%s\n' '{"jsonrpc":"2.0","id":1,"result":{}}'
read -r line
read -r first
read -r second
reply "$second"
reply "$first"
read -r line
"#;

    #[tokio::test]
    async fn test_concurrent_calls_answered_out_of_order() {
        let provider = run_script(REVERSED).await.unwrap();

        let (first, second) = tokio::join!(
            provider.call("first", json!({})),
            provider.call("second", json!({})),
        );
        assert_eq!(first.unwrap(), json!("first"));
        assert_eq!(second.unwrap(), json!("second"));
        assert!(provider.inbox.lock().await.is_empty());

        provider.shutdown().await;
    }

    #[tokio::test]
    async fn test_child_exiting_before_handshake_is_transport_error() {
        let result = run_script("exit 0").await;
        assert!(matches!(result, Err(ToolError::Transport(_))));
    }

    #[tokio::test]
    async fn test_spawn_missing_program_is_transport_error() {
        let result = StdioProvider::spawn(
            "ghost",
            "switchboard-test-no-such-binary",
            &[],
            &HashMap::new(),
            Duration::from_secs(1),
        )
        .await;
        assert!(matches!(result, Err(ToolError::Transport(_))));
    }
}
