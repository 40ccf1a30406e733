use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use skiff_core::{Message, Result, Tool};

/// A request to an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    /// The model to use, e.g. "claude-sonnet-4-20250514".
    pub model: String,
    /// System prompt (sent separately from the messages).
    pub system: Option<String>,
    /// Conversation history.
    pub messages: Vec<Message>,
    /// Tools advertised for this call. Empty = tool use disabled.
    pub tools: Vec<Tool>,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    pub temperature: f32,
}

/// A complete response from an LLM.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// Assistant-role message with ordered text / tool-use blocks.
    pub message: Message,
    pub usage: Usage,
    pub stop_reason: StopReason,
}

impl LlmResponse {
    /// Whether the model asked for at least one tool call.
    pub fn has_tool_calls(&self) -> bool {
        self.message.has_tool_calls()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
    StopSequence,
}

impl StopReason {
    pub fn from_api(raw: Option<&str>) -> Self {
        match raw {
            Some("tool_use") => StopReason::ToolUse,
            Some("max_tokens") => StopReason::MaxTokens,
            Some("stop_sequence") => StopReason::StopSequence,
            _ => StopReason::EndTurn,
        }
    }

    /// The wire name, as the API reports it.
    pub fn as_str(&self) -> &'static str {
        match self {
            StopReason::EndTurn => "end_turn",
            StopReason::ToolUse => "tool_use",
            StopReason::MaxTokens => "max_tokens",
            StopReason::StopSequence => "stop_sequence",
        }
    }
}

/// Token usage statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl Usage {
    pub fn total_tokens(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }

    pub fn merge(&mut self, other: &Usage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}

/// Trait implemented by each LLM backend.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Human-readable name, e.g. "anthropic".
    fn name(&self) -> &str;

    /// Send a request and wait for the complete response.
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse>;

    /// Check if this provider is usable (credentials present, etc.).
    async fn health_check(&self) -> Result<()>;
}
