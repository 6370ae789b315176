use tracing::debug;

use crate::errors::{RelayError, RelayResult};
use crate::models::message::{Message, MessageContent};
use crate::providers::base::Provider;
use crate::session::ToolHost;

/// Drives one query through the model and the tool host.
///
/// The orchestrator owns the conversation for the lifetime of a single
/// query: it opens a fresh tool session, sends the conversation and catalog
/// to the model, relays any tool invocations the model asks for, and joins
/// the collected text into the final answer. Nothing survives the query.
pub struct Orchestrator {
    provider: Box<dyn Provider>,
    tool_host: Box<dyn ToolHost>,
    system_prompt: String,
}

impl Orchestrator {
    pub fn new(provider: Box<dyn Provider>, tool_host: Box<dyn ToolHost>) -> Self {
        Self {
            provider,
            tool_host,
            system_prompt: String::new(),
        }
    }

    /// Set a system prompt sent with every model call
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Process a query using the model and the tools the host offers.
    ///
    /// The loop is deliberately single pass: it walks the first response's
    /// blocks in order, and each tool use triggers exactly one follow-up
    /// model call whose first block is checked for trailing text. Follow-up
    /// responses are never drained recursively.
    pub async fn process_query(&self, query: &str) -> RelayResult<String> {
        // Fresh session per query; dropped on every exit path below.
        let mut session = self.tool_host.connect().await?;
        let tools = session.list_tools().await?;

        let mut messages = vec![Message::user().with_text(query)];

        let (response, _) = self
            .provider
            .complete(&self.system_prompt, &messages, &tools)
            .await
            .map_err(|e| RelayError::Upstream(e.to_string()))?;

        let mut final_text = Vec::new();

        for content in &response.content {
            match content {
                MessageContent::Text(text) => final_text.push(text.text.clone()),
                MessageContent::ToolRequest(request) => {
                    debug!(tool = %request.tool_call.name, id = %request.id, "model requested tool");
                    let output = session
                        .call_tool(&request.tool_call.name, request.tool_call.arguments.clone())
                        .await?;

                    messages.push(
                        Message::assistant()
                            .with_content(MessageContent::ToolRequest(request.clone())),
                    );
                    messages.push(Message::user().with_tool_response(&request.id, output));

                    let (follow_up, _) = self
                        .provider
                        .complete(&self.system_prompt, &messages, &tools)
                        .await
                        .map_err(|e| RelayError::Upstream(e.to_string()))?;

                    if let Some(MessageContent::Text(text)) = follow_up.content.first() {
                        final_text.push(text.text.clone());
                    }
                }
                // The model does not send images or tool results of its own.
                MessageContent::Image(_) | MessageContent::ToolResponse(_) => continue,
            }
        }

        Ok(final_text.join("\n"))
    }
}
