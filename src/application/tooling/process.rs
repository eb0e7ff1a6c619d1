use super::{ToolDescriptor, ToolInvokeError, ToolSession};
use crate::config::ServerConfig;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{Mutex as AsyncMutex, oneshot};
use tokio::time::timeout;
use tracing::{debug, info, warn};

const PROTOCOL_VERSION: &str = "2025-06-18";
const TOOL_CALL_TIMEOUT: Duration = Duration::from_secs(60);

/// One persistent MCP session over a spawned subprocess, established once
/// at startup. The child is spawned with kill-on-drop so the process is
/// released on every exit path, including panics and early errors.
pub struct McpProcess {
    inner: Arc<Inner>,
}

struct Inner {
    command: String,
    child: AsyncMutex<Option<Child>>,
    writer: AsyncMutex<Option<BufWriter<ChildStdin>>>,
    pending: AsyncMutex<HashMap<String, oneshot::Sender<Result<Value, ToolInvokeError>>>>,
    id_counter: AtomicU64,
    instructions: AsyncMutex<Option<String>>,
    tool_cache: AsyncMutex<Vec<ToolDescriptor>>,
}

impl McpProcess {
    /// Spawns the configured server, runs the MCP handshake, and primes
    /// the tool catalogue.
    pub async fn connect(config: &ServerConfig) -> Result<Self, ToolInvokeError> {
        let mut command = Command::new(&config.command);
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if let Some(dir) = &config.workdir {
            command.current_dir(dir);
        }
        if !config.args.is_empty() {
            command.args(&config.args);
        }
        for (key, value) in &config.env {
            command.env(key, value);
        }

        let mut child = command.spawn().map_err(|source| ToolInvokeError::Spawn {
            command: config.command.clone(),
            source,
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| transport("failed to capture server stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| transport("failed to capture server stdout"))?;

        let inner = Arc::new(Inner {
            command: config.command.clone(),
            child: AsyncMutex::new(Some(child)),
            writer: AsyncMutex::new(Some(BufWriter::new(stdin))),
            pending: AsyncMutex::new(HashMap::new()),
            id_counter: AtomicU64::new(1),
            instructions: AsyncMutex::new(None),
            tool_cache: AsyncMutex::new(Vec::new()),
        });

        let reader = Arc::clone(&inner);
        tokio::spawn(async move {
            reader.reader_loop(stdout).await;
        });

        match inner.initialize().await {
            Ok(()) => {
                info!(command = %inner.command, "Tool session established");
                Ok(Self { inner })
            }
            Err(err) => {
                inner.reset().await;
                Err(err)
            }
        }
    }

    /// Operator guidance announced by the server during the handshake.
    pub async fn instructions(&self) -> Option<String> {
        self.inner.instructions.lock().await.clone()
    }

    /// Kills the server process and fails all in-flight requests.
    pub async fn shutdown(&self) {
        self.inner.reset().await;
    }
}

#[async_trait]
impl ToolSession for McpProcess {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolInvokeError> {
        Ok(self.inner.tool_cache.lock().await.clone())
    }

    async fn call_tool(&self, tool: &str, arguments: Value) -> Result<Value, ToolInvokeError> {
        self.inner.call_tool(tool, arguments).await
    }
}

impl Inner {
    async fn initialize(self: &Arc<Self>) -> Result<(), ToolInvokeError> {
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "clientInfo": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
            },
            "capabilities": {}
        });
        let init_result = self.send_request("initialize", params, None).await?;
        if let Some(text) = init_result.get("instructions").and_then(Value::as_str) {
            let mut instructions = self.instructions.lock().await;
            *instructions = Some(text.to_string());
        }
        self.send_notification("notifications/initialized", json!({}))
            .await?;

        self.refresh_tools().await?;
        Ok(())
    }

    async fn call_tool(&self, tool: &str, arguments: Value) -> Result<Value, ToolInvokeError> {
        let params = json!({
            "name": tool,
            "arguments": match arguments {
                Value::Null => Value::Object(Default::default()),
                other => other,
            }
        });
        self.send_request("tools/call", params, Some((tool, TOOL_CALL_TIMEOUT)))
            .await
    }

    async fn refresh_tools(&self) -> Result<(), ToolInvokeError> {
        let result = self.send_request("tools/list", json!({}), None).await?;
        self.populate_tool_cache(result).await;
        Ok(())
    }

    async fn reader_loop(self: Arc<Self>, stdout: ChildStdout) {
        let mut lines = BufReader::new(stdout).lines();
        while let Ok(item) = lines.next_line().await {
            match item {
                Some(raw) => {
                    if raw.trim().is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<Value>(&raw) {
                        Ok(value) => {
                            if let Err(err) = self.process_inbound_message(value).await {
                                warn!(%err, "failed to process message from tool server");
                            }
                        }
                        Err(source) => {
                            warn!(line = raw, %source, "received invalid JSON from tool server");
                        }
                    }
                }
                None => break,
            }
        }

        self.reset().await;
    }

    async fn process_inbound_message(
        self: &Arc<Self>,
        value: Value,
    ) -> Result<(), ToolInvokeError> {
        if let Some(id) = value.get("id").cloned() {
            if value.get("method").is_some() {
                self.handle_server_request(id, value).await
            } else {
                self.handle_response(id, value).await
            }
        } else if value.get("method").is_some() {
            self.handle_notification(value).await;
            Ok(())
        } else {
            Ok(())
        }
    }

    async fn handle_response(&self, id: Value, value: Value) -> Result<(), ToolInvokeError> {
        let key = match response_key(&id) {
            Some(key) => key,
            None => return Ok(()),
        };

        let responder = {
            let mut pending = self.pending.lock().await;
            pending.remove(&key)
        };

        if let Some(sender) = responder {
            if value.get("error").is_some() {
                let error = value
                    .get("error")
                    .and_then(Value::as_object)
                    .map(|err| {
                        (
                            err.get("code").and_then(Value::as_i64).unwrap_or(-32000),
                            err.get("message")
                                .and_then(Value::as_str)
                                .unwrap_or("unknown error")
                                .to_string(),
                        )
                    });
                let rpc_error = match error {
                    Some((code, message)) => ToolInvokeError::Rpc { code, message },
                    None => transport("missing error payload in response"),
                };
                let _ = sender.send(Err(rpc_error));
            } else {
                let _ = sender.send(Ok(value));
            }
        } else {
            debug!(response_id = key, "received response for unknown request");
        }
        Ok(())
    }

    async fn handle_server_request(&self, id: Value, value: Value) -> Result<(), ToolInvokeError> {
        let method = value
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or_default();
        match method {
            "ping" => {
                self.send_response(id, json!({ "ok": true })).await?;
            }
            other => {
                warn!(method = other, "tool server sent unsupported request");
                let error = json!({
                    "code": -32601,
                    "message": format!("client does not implement method '{other}'"),
                });
                self.send_error(id, error).await?;
            }
        }
        Ok(())
    }

    async fn handle_notification(self: &Arc<Self>, value: Value) {
        if let Some(method) = value.get("method").and_then(Value::as_str) {
            debug!(method, "received notification from tool server");
            if method == "notifications/tools/list_changed" {
                // Refresh from a separate task: the reader loop must stay
                // free to deliver the tools/list response.
                let refresher = Arc::clone(self);
                tokio::spawn(async move {
                    if let Err(err) = refresher.refresh_tools().await {
                        warn!(%err, "failed to refresh tool catalogue");
                    }
                });
            }
        }
    }

    async fn send_request(
        &self,
        method: &str,
        params: Value,
        limit: Option<(&str, Duration)>,
    ) -> Result<Value, ToolInvokeError> {
        let id = self.next_id();
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().await;
            pending.insert(id.clone(), tx);
        }

        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params
        });
        self.write_message(&payload).await?;

        let received = match limit {
            Some((tool, window)) => match timeout(window, rx).await {
                Ok(received) => received,
                Err(_) => {
                    self.pending.lock().await.remove(&id);
                    return Err(ToolInvokeError::Timeout {
                        tool: tool.to_string(),
                        seconds: window.as_secs(),
                    });
                }
            },
            None => rx.await,
        };

        match received {
            Ok(Ok(value)) => Ok(value.get("result").cloned().unwrap_or(Value::Null)),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(ToolInvokeError::Terminated),
        }
    }

    async fn send_notification(&self, method: &str, params: Value) -> Result<(), ToolInvokeError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params
        });
        self.write_message(&payload).await
    }

    async fn send_response(&self, id: Value, result: Value) -> Result<(), ToolInvokeError> {
        let mut payload = json!({
            "jsonrpc": "2.0",
            "result": result
        });
        if let Value::Object(ref mut map) = payload {
            map.insert("id".to_string(), id);
        }
        self.write_message(&payload).await
    }

    async fn send_error(&self, id: Value, error: Value) -> Result<(), ToolInvokeError> {
        let mut payload = json!({
            "jsonrpc": "2.0",
            "error": error
        });
        if let Value::Object(ref mut map) = payload {
            map.insert("id".to_string(), id);
        }
        self.write_message(&payload).await
    }

    async fn write_message(&self, message: &Value) -> Result<(), ToolInvokeError> {
        let encoded = serde_json::to_string(message)
            .map_err(|source| ToolInvokeError::InvalidJson { source })?;

        let mut writer = self.writer.lock().await;
        let stream = writer
            .as_mut()
            .ok_or_else(|| transport("writer not initialised"))?;
        stream
            .write_all(encoded.as_bytes())
            .await
            .map_err(io_transport)?;
        stream.write_all(b"\n").await.map_err(io_transport)?;
        stream.flush().await.map_err(io_transport)?;
        Ok(())
    }

    async fn reset(&self) {
        {
            let mut writer = self.writer.lock().await;
            *writer = None;
        }

        let mut child = self.child.lock().await;
        if let Some(mut running) = child.take() {
            if let Err(err) = running.kill().await {
                debug!(%err, "failed to kill tool server process (may have already exited)");
            }
            let _ = running.wait().await;
        }
        drop(child);

        self.fail_all_pending().await;
        self.tool_cache.lock().await.clear();
        self.instructions.lock().await.take();
    }

    async fn fail_all_pending(&self) {
        let mut pending = self.pending.lock().await;
        for (_, sender) in pending.drain() {
            let _ = sender.send(Err(ToolInvokeError::Terminated));
        }
    }

    async fn populate_tool_cache(&self, result: Value) {
        if let Some(array) = result.get("tools").and_then(Value::as_array) {
            let mut cache = self.tool_cache.lock().await;
            cache.clear();
            for tool in array {
                if let Some(name) = tool.get("name").and_then(Value::as_str) {
                    cache.push(ToolDescriptor {
                        name: name.to_string(),
                        description: tool
                            .get("description")
                            .and_then(Value::as_str)
                            .map(|text| text.to_string()),
                        input_schema: tool.get("inputSchema").cloned(),
                    });
                }
            }
            debug!(tool_count = cache.len(), "Tool catalogue refreshed");
        }
    }

    fn next_id(&self) -> String {
        let id = self.id_counter.fetch_add(1, Ordering::SeqCst);
        format!("req-{id}")
    }
}

fn response_key(id: &Value) -> Option<String> {
    match id {
        Value::String(value) => Some(value.clone()),
        Value::Number(num) => Some(num.to_string()),
        _ => None,
    }
}

fn transport(message: impl Into<String>) -> ToolInvokeError {
    ToolInvokeError::Transport {
        message: message.into(),
    }
}

fn io_transport(source: std::io::Error) -> ToolInvokeError {
    transport(source.to_string())
}
