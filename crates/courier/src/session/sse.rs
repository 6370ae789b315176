use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use reqwest_eventsource::{Event, EventSource, RequestBuilderExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use super::{ToolHost, ToolSession};
use crate::errors::{RelayError, RelayResult};
use crate::models::content::Content;
use crate::models::tool::Tool;

const PROTOCOL_VERSION: &str = "2024-11-05";

/// How a JSON-RPC exchange failed. Callers decide which error kind a remote
/// rejection maps to: a failed `tools/call` is a tool execution error, while
/// everything else is an upstream failure.
enum RpcFailure {
    Transport(String),
    Remote(String),
}

impl RpcFailure {
    fn upstream(self) -> RelayError {
        match self {
            RpcFailure::Transport(msg) | RpcFailure::Remote(msg) => RelayError::Upstream(msg),
        }
    }
}

/// A tool host reachable over the SSE transport
pub struct SseToolHost {
    url: String,
    client: Client,
}

impl SseToolHost {
    pub fn new<S: Into<String>>(url: S) -> Self {
        Self {
            url: url.into(),
            client: Client::new(),
        }
    }
}

#[async_trait]
impl ToolHost for SseToolHost {
    async fn connect(&self) -> RelayResult<Box<dyn ToolSession>> {
        let session = SseSession::connect(&self.client, &self.url).await?;
        Ok(Box::new(session))
    }
}

/// One session against the tool host: a long-lived SSE stream for responses
/// and a per-session endpoint for JSON-RPC requests.
pub struct SseSession {
    client: Client,
    events: EventSource,
    endpoint: Url,
    next_id: u64,
}

impl SseSession {
    async fn connect(client: &Client, url: &str) -> RelayResult<Self> {
        let base = Url::parse(url)
            .map_err(|e| RelayError::Upstream(format!("Invalid tool host url {url}: {e}")))?;

        let mut events = client
            .get(base.clone())
            .eventsource()
            .map_err(|e| RelayError::Upstream(format!("Tool host request failed: {e}")))?;

        // The server's first event names the endpoint JSON-RPC requests must
        // be posted to, relative to the SSE url.
        let endpoint = loop {
            match events.next().await {
                Some(Ok(Event::Open)) => continue,
                Some(Ok(Event::Message(message))) if message.event == "endpoint" => {
                    break base.join(message.data.trim()).map_err(|e| {
                        RelayError::Upstream(format!("Tool host sent a bad endpoint: {e}"))
                    })?;
                }
                Some(Ok(Event::Message(_))) => continue,
                Some(Err(e)) => {
                    return Err(RelayError::Upstream(format!(
                        "Tool host handshake failed: {e}"
                    )))
                }
                None => {
                    return Err(RelayError::Upstream(
                        "Tool host closed the stream during handshake".to_string(),
                    ))
                }
            }
        };
        debug!(%endpoint, "tool session endpoint received");

        let mut session = Self {
            client: client.clone(),
            events,
            endpoint,
            next_id: 0,
        };

        session
            .request(
                "initialize",
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {
                        "name": "courier",
                        "version": env!("CARGO_PKG_VERSION"),
                    },
                }),
            )
            .await
            .map_err(RpcFailure::upstream)?;
        session.notify("notifications/initialized", json!({})).await?;

        Ok(session)
    }

    async fn notify(&mut self, method: &str, params: Value) -> RelayResult<()> {
        let body = json!({"jsonrpc": "2.0", "method": method, "params": params});
        self.client
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| RelayError::Upstream(format!("{method} notification failed: {e}")))?;
        Ok(())
    }

    /// Send one JSON-RPC request and wait for the response event carrying
    /// the same id. Unrelated events on the stream are skipped.
    async fn request(&mut self, method: &str, params: Value) -> Result<Value, RpcFailure> {
        self.next_id += 1;
        let id = self.next_id;
        let body = json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params});

        self.client
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| RpcFailure::Transport(format!("{method} request failed: {e}")))?;

        loop {
            match self.events.next().await {
                Some(Ok(Event::Message(message))) if message.event == "message" => {
                    let value: Value = serde_json::from_str(&message.data).map_err(|e| {
                        RpcFailure::Transport(format!(
                            "Tool host sent malformed JSON for {method}: {e}"
                        ))
                    })?;
                    if value.get("id").and_then(Value::as_u64) != Some(id) {
                        continue;
                    }
                    if let Some(error) = value.get("error") {
                        let detail = error
                            .get("message")
                            .and_then(|m| m.as_str())
                            .map(String::from)
                            .unwrap_or_else(|| error.to_string());
                        return Err(RpcFailure::Remote(format!("{method} failed: {detail}")));
                    }
                    return Ok(value.get("result").cloned().unwrap_or(Value::Null));
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    self.events.close();
                    return Err(RpcFailure::Transport(format!(
                        "Tool host stream failed during {method}: {e}"
                    )));
                }
                None => {
                    return Err(RpcFailure::Transport(format!(
                        "Tool host stream ended during {method}"
                    )))
                }
            }
        }
    }
}

// Wire shape of a tool descriptor in a tools/list result
#[derive(Deserialize)]
struct WireTool {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "inputSchema", default)]
    input_schema: Value,
}

#[async_trait]
impl ToolSession for SseSession {
    async fn list_tools(&mut self) -> RelayResult<Vec<Tool>> {
        let result = self
            .request("tools/list", json!({}))
            .await
            .map_err(RpcFailure::upstream)?;

        let wire: Vec<WireTool> =
            serde_json::from_value(result.get("tools").cloned().unwrap_or(json!([]))).map_err(
                |e| RelayError::Upstream(format!("Tool host sent a malformed catalog: {e}")),
            )?;

        let tools = wire
            .into_iter()
            .map(|tool| Tool::new(tool.name, tool.description, tool.input_schema))
            .collect::<Vec<_>>();
        debug!(count = tools.len(), "fetched tool catalog");
        Ok(tools)
    }

    async fn call_tool(&mut self, name: &str, arguments: Value) -> RelayResult<Vec<Content>> {
        debug!(tool = name, "invoking tool");
        let result = self
            .request("tools/call", json!({"name": name, "arguments": arguments}))
            .await
            .map_err(|failure| match failure {
                RpcFailure::Transport(msg) => RelayError::Upstream(msg),
                RpcFailure::Remote(msg) => RelayError::ToolExecution(msg),
            })?;

        let content = parse_call_content(&result);

        if result.get("isError").and_then(Value::as_bool) == Some(true) {
            let detail: Vec<&str> = content.iter().filter_map(Content::as_text).collect();
            return Err(RelayError::ToolExecution(format!(
                "{name} reported an error: {}",
                detail.join("\n")
            )));
        }

        Ok(content)
    }
}

fn parse_call_content(result: &Value) -> Vec<Content> {
    let items = match result.get("content").and_then(Value::as_array) {
        Some(items) => items,
        None => return Vec::new(),
    };

    items
        .iter()
        .filter_map(|item| match item.get("type").and_then(Value::as_str) {
            Some("text") => item
                .get("text")
                .and_then(Value::as_str)
                .map(Content::text),
            Some("image") => {
                let data = item.get("data").and_then(Value::as_str)?;
                let mime_type = item.get("mimeType").and_then(Value::as_str)?;
                Some(Content::image(data, mime_type))
            }
            _ => None,
        })
        .collect()
}
