use anyhow::{anyhow, Result};
use serde_json::{json, Value};

use crate::models::content::{Content, ImageContent};
use crate::models::message::{Message, MessageContent};
use crate::models::role::Role;
use crate::models::tool::{Tool, ToolCall};

/// Convert the internal Message format to Anthropic's messages specification
pub fn messages_to_anthropic_spec(messages: &[Message]) -> Vec<Value> {
    let mut messages_spec = Vec::new();

    for message in messages {
        let mut blocks = Vec::new();
        for content in &message.content {
            match content {
                MessageContent::Text(text) => {
                    blocks.push(json!({"type": "text", "text": text.text}));
                }
                MessageContent::Image(image) => {
                    blocks.push(convert_image_anthropic(image));
                }
                MessageContent::ToolRequest(request) => {
                    blocks.push(json!({
                        "type": "tool_use",
                        "id": request.id,
                        "name": request.tool_call.name,
                        "input": request.tool_call.arguments,
                    }));
                }
                MessageContent::ToolResponse(response) => {
                    let content: Vec<Value> = response
                        .content
                        .iter()
                        .map(|item| match item {
                            Content::Text(text) => json!({"type": "text", "text": text.text}),
                            Content::Image(image) => convert_image_anthropic(image),
                        })
                        .collect();
                    blocks.push(json!({
                        "type": "tool_result",
                        "tool_use_id": response.id,
                        "content": content,
                    }));
                }
            }
        }
        messages_spec.push(json!({"role": message.role, "content": blocks}));
    }

    messages_spec
}

fn convert_image_anthropic(image: &ImageContent) -> Value {
    json!({
        "type": "image",
        "source": {
            "type": "base64",
            "media_type": image.mime_type,
            "data": image.data,
        }
    })
}

/// Convert the internal Tool format to Anthropic's tool specification
pub fn tools_to_anthropic_spec(tools: &[Tool]) -> Result<Vec<Value>> {
    let mut tool_names = std::collections::HashSet::new();
    let mut result = Vec::new();

    for tool in tools {
        if !tool_names.insert(&tool.name) {
            return Err(anyhow!("Duplicate tool name: {}", tool.name));
        }
        result.push(json!({
            "name": tool.name,
            "description": tool.description,
            "input_schema": tool.input_schema,
        }));
    }

    Ok(result)
}

/// Convert an Anthropic messages response to the internal Message format
pub fn anthropic_response_to_message(response: Value) -> Result<Message> {
    let blocks = response
        .get("content")
        .and_then(|c| c.as_array())
        .ok_or_else(|| anyhow!("Invalid response format from Anthropic API"))?;

    let mut content = Vec::new();
    for block in blocks {
        match block.get("type").and_then(|t| t.as_str()) {
            Some("text") => {
                let text = block
                    .get("text")
                    .and_then(|t| t.as_str())
                    .ok_or_else(|| anyhow!("Text block missing text field"))?;
                content.push(MessageContent::text(text));
            }
            Some("tool_use") => {
                let id = block
                    .get("id")
                    .and_then(|i| i.as_str())
                    .ok_or_else(|| anyhow!("Tool use block missing id"))?;
                let name = block
                    .get("name")
                    .and_then(|n| n.as_str())
                    .ok_or_else(|| anyhow!("Tool use block missing name"))?;
                let input = block.get("input").cloned().unwrap_or(json!({}));
                content.push(MessageContent::tool_request(id, ToolCall::new(name, input)));
            }
            _ => continue,
        }
    }

    Ok(Message {
        role: Role::Assistant,
        created: chrono::Utc::now().timestamp(),
        content,
    })
}

/// Convert the internal Message format to OpenAI's chat specification
pub fn messages_to_openai_spec(messages: &[Message]) -> Vec<Value> {
    let mut messages_spec = Vec::new();

    for message in messages {
        let mut converted = json!({"role": message.role});
        let mut output = Vec::new();

        for content in &message.content {
            match content {
                MessageContent::Text(text) => {
                    if !text.text.is_empty() {
                        converted["content"] = json!(text.text);
                    }
                }
                MessageContent::Image(image) => {
                    converted["content"] = json!([{
                        "type": "image_url",
                        "image_url": {
                            "url": format!("data:{};base64,{}", image.mime_type, image.data)
                        }
                    }]);
                }
                MessageContent::ToolRequest(request) => {
                    let tool_calls = converted
                        .as_object_mut()
                        .unwrap()
                        .entry("tool_calls")
                        .or_insert(json!([]));
                    tool_calls.as_array_mut().unwrap().push(json!({
                        "id": request.id,
                        "type": "function",
                        "function": {
                            "name": request.tool_call.name,
                            "arguments": request.tool_call.arguments.to_string(),
                        }
                    }));
                }
                MessageContent::ToolResponse(response) => {
                    // Images cannot ride along in a tool role message, so they
                    // are flattened to a placeholder.
                    let text: Vec<String> = response
                        .content
                        .iter()
                        .map(|item| match item {
                            Content::Text(text) => text.text.clone(),
                            Content::Image(_) => "[image]".to_string(),
                        })
                        .collect();
                    output.push(json!({
                        "role": "tool",
                        "content": text.join("\n"),
                        "tool_call_id": response.id,
                    }));
                }
            }
        }

        if converted.get("content").is_some() || converted.get("tool_calls").is_some() {
            output.insert(0, converted);
        }
        messages_spec.extend(output);
    }

    messages_spec
}

/// Convert the internal Tool format to OpenAI's tool specification
pub fn tools_to_openai_spec(tools: &[Tool]) -> Result<Vec<Value>> {
    let mut tool_names = std::collections::HashSet::new();
    let mut result = Vec::new();

    for tool in tools {
        if !tool_names.insert(&tool.name) {
            return Err(anyhow!("Duplicate tool name: {}", tool.name));
        }
        result.push(json!({
            "type": "function",
            "function": {
                "name": tool.name,
                "description": tool.description,
                "parameters": tool.input_schema,
            }
        }));
    }

    Ok(result)
}

/// Convert an OpenAI chat completion response to the internal Message format
pub fn openai_response_to_message(response: Value) -> Result<Message> {
    let original = response
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .cloned()
        .ok_or_else(|| anyhow!("Invalid response format from OpenAI API"))?;
    let mut content = Vec::new();

    if let Some(text) = original.get("content") {
        if let Some(text_str) = text.as_str() {
            content.push(MessageContent::text(text_str));
        }
    }

    if let Some(tool_calls) = original.get("tool_calls").and_then(|t| t.as_array()) {
        for tool_call in tool_calls {
            let id = tool_call["id"].as_str().unwrap_or_default().to_string();
            let function_name = tool_call["function"]["name"]
                .as_str()
                .unwrap_or_default()
                .to_string();
            let arguments = tool_call["function"]["arguments"]
                .as_str()
                .unwrap_or_default();

            // OpenAI sends arguments as a JSON string; if it does not parse,
            // the whole completion is malformed upstream data.
            let arguments: Value = serde_json::from_str(arguments).map_err(|e| {
                anyhow!("Could not interpret tool call arguments for id {}: {}", id, e)
            })?;

            content.push(MessageContent::tool_request(
                id,
                ToolCall::new(&function_name, arguments),
            ));
        }
    }

    Ok(Message {
        role: Role::Assistant,
        created: chrono::Utc::now().timestamp(),
        content,
    })
}
