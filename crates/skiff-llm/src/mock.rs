//! Mock LLM provider for deterministic testing.
//!
//! Returns pre-configured responses without making any HTTP calls.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

use crate::provider::*;
use skiff_core::{Message, MessageContent, Result, Role, SkiffError, ToolCall};

/// A mock LLM provider that returns pre-configured responses in order.
///
/// # Example
/// ```
/// use skiff_llm::mock::MockProvider;
/// let provider = MockProvider::new("test")
///     .with_response("Hello, world!");
/// ```
pub struct MockProvider {
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    /// Track all requests received (for assertions in tests).
    pub requests: Arc<Mutex<Vec<LlmRequest>>>,
    name: String,
}

/// A pre-configured response from the mock provider.
#[derive(Clone, Debug)]
pub struct MockResponse {
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
    pub stop_reason: StopReason,
    pub usage: Usage,
    /// If set, the provider will return this error instead.
    pub error: Option<String>,
}

impl Default for MockResponse {
    fn default() -> Self {
        Self {
            text: String::new(),
            tool_calls: vec![],
            stop_reason: StopReason::EndTurn,
            usage: Usage {
                input_tokens: 100,
                output_tokens: 50,
            },
            error: None,
        }
    }
}

impl MockResponse {
    /// Create a text response.
    pub fn text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Default::default()
        }
    }

    /// Create a response requesting the given tool calls, with optional leading text.
    pub fn tool_calls(text: &str, calls: Vec<ToolCall>) -> Self {
        Self {
            text: text.to_string(),
            tool_calls: calls,
            stop_reason: StopReason::ToolUse,
            ..Default::default()
        }
    }

    /// Create an error response.
    pub fn error(msg: &str) -> Self {
        Self {
            error: Some(msg.to_string()),
            ..Default::default()
        }
    }
}

impl MockProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(vec![])),
            name: name.into(),
        }
    }

    /// Queue a simple text response.
    pub fn with_response(self, text: &str) -> Self {
        self.with_mock_response(MockResponse::text(text))
    }

    /// Queue a single tool call response with a generated call id.
    pub fn with_tool_call(self, name: &str, args: serde_json::Value) -> Self {
        let call = ToolCall {
            id: format!("call_{}", uuid::Uuid::new_v4()),
            tool_name: name.to_string(),
            arguments: args,
        };
        self.with_mock_response(MockResponse::tool_calls("", vec![call]))
    }

    /// Queue an error response.
    pub fn with_error(self, error: &str) -> Self {
        self.with_mock_response(MockResponse::error(error))
    }

    /// Queue a fully custom response.
    pub fn with_mock_response(self, resp: MockResponse) -> Self {
        self.responses.lock().push_back(resp);
        self
    }

    /// Get all requests that were made to this provider.
    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().clone()
    }

    /// Number of `complete` calls received so far.
    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Pop the next queued response, or return a default "no response queued" message.
    fn next_response(&self) -> MockResponse {
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| MockResponse::text("(mock: no more queued responses)"))
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
        self.requests.lock().push(request.clone());
        let mock = self.next_response();

        if let Some(error) = mock.error {
            return Err(SkiffError::LlmProvider(error));
        }

        let mut content = vec![];
        if !mock.text.is_empty() {
            content.push(MessageContent::Text { text: mock.text });
        }
        content.extend(mock.tool_calls.into_iter().map(|tc| MessageContent::ToolUse {
            id: tc.id,
            name: tc.tool_name,
            input: tc.arguments,
        }));

        Ok(LlmResponse {
            message: Message::new(Role::Assistant, content),
            usage: mock.usage,
            stop_reason: mock.stop_reason,
        })
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}
