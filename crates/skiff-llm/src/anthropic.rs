use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use skiff_core::{Message, MessageContent, Result, Role, SkiffError};
use tracing::{debug, info};

use crate::provider::*;

const API_VERSION: &str = "2023-06-01";

/// Anthropic Messages API provider.
pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl AnthropicProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: "https://api.anthropic.com/v1".into(),
        }
    }

    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Translate a request into the Messages API JSON body.
    pub fn build_request_body(request: &LlmRequest) -> Value {
        let messages: Vec<Value> = request
            .messages
            .iter()
            .map(|msg| {
                let role = match msg.role {
                    Role::User => "user",
                    Role::Assistant => "assistant",
                };
                let blocks: Vec<Value> = msg.content.iter().map(content_block_to_api).collect();
                json!({ "role": role, "content": blocks })
            })
            .collect();

        let mut body = json!({
            "model": &request.model,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "messages": messages,
        });

        if let Some(ref system) = request.system {
            body["system"] = json!(system);
        }

        if !request.tools.is_empty() {
            let tools: Vec<Value> = request
                .tools
                .iter()
                .map(|t| {
                    json!({
                        "name": t.name,
                        "description": t.description,
                        "input_schema": t.parameters,
                    })
                })
                .collect();
            body["tools"] = json!(tools);
        }

        body
    }

    /// Parse a Messages API response body into an [`LlmResponse`].
    ///
    /// Unknown block types (e.g. thinking) are skipped; block order is preserved.
    pub fn parse_response(data: &Value) -> Result<LlmResponse> {
        let blocks = data["content"].as_array().ok_or_else(|| {
            SkiffError::LlmProvider("response has no content array".into())
        })?;

        let content: Vec<MessageContent> = blocks
            .iter()
            .filter_map(|b| match b["type"].as_str() {
                Some("text") => b["text"].as_str().map(|text| MessageContent::Text {
                    text: text.to_string(),
                }),
                Some("tool_use") => Some(MessageContent::ToolUse {
                    id: b["id"].as_str().unwrap_or_default().to_string(),
                    name: b["name"].as_str().unwrap_or_default().to_string(),
                    input: b["input"].clone(),
                }),
                _ => None,
            })
            .collect();

        let usage_data = &data["usage"];
        let usage = Usage {
            input_tokens: usage_data["input_tokens"].as_u64().unwrap_or(0) as u32,
            output_tokens: usage_data["output_tokens"].as_u64().unwrap_or(0) as u32,
        };

        Ok(LlmResponse {
            message: Message::new(Role::Assistant, content),
            usage,
            stop_reason: StopReason::from_api(data["stop_reason"].as_str()),
        })
    }
}

fn content_block_to_api(block: &MessageContent) -> Value {
    match block {
        MessageContent::Text { text } => json!({ "type": "text", "text": text }),
        MessageContent::ToolUse { id, name, input } => json!({
            "type": "tool_use",
            "id": id,
            "name": name,
            "input": input,
        }),
        MessageContent::ToolResult {
            tool_call_id,
            content,
            is_error,
        } => json!({
            "type": "tool_result",
            "tool_use_id": tool_call_id,
            "content": content,
            "is_error": is_error,
        }),
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
        let body = Self::build_request_body(request);
        debug!(
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "sending Anthropic API request"
        );

        let resp = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| SkiffError::LlmProvider(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            if status.as_u16() == 429 {
                let retry_after_secs = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(30);
                return Err(SkiffError::RateLimited { retry_after_secs });
            }
            let text = resp.text().await.unwrap_or_default();
            return Err(SkiffError::LlmProvider(format!("HTTP {status}: {text}")));
        }

        let data: Value = resp
            .json()
            .await
            .map_err(|e| SkiffError::LlmProvider(e.to_string()))?;

        Self::parse_response(&data)
    }

    async fn health_check(&self) -> Result<()> {
        info!("checking Anthropic API credentials");
        if self.api_key.trim().is_empty() {
            return Err(SkiffError::LlmProvider("ANTHROPIC_API_KEY not set".into()));
        }
        Ok(())
    }
}
