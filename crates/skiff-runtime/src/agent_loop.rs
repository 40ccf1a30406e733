//! The bounded tool-use loop.
//!
//! Steps are numbered `0..=max_steps`, so the model is called at most
//! `max_steps + 1` times. Each step sends the whole conversation, appends the
//! reply, and either finishes or runs the requested tools in order and
//! appends their results as one user message.

use serde::Serialize;
use tracing::{debug, info, warn};

use skiff_core::{Conversation, Message, Result, ToolExecutor, ToolResult};
use skiff_llm::{LlmProvider, LlmRequest, StopReason, Usage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    Completed,
    StepLimitReached,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentRunResult {
    pub text: String,
    pub termination_reason: TerminationReason,
    /// Backend calls made.
    pub steps: u32,
    pub tool_calls: usize,
    pub usage: Usage,
}

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub max_steps: u32,
    pub tools_enabled: bool,
}

/// The user-visible note appended when the budget runs out.
pub fn step_limit_notice(max_steps: u32) -> String {
    format!(
        "[Step limit reached (max_steps = {max_steps}). The task may be incomplete; increase max_steps to let the agent continue.]"
    )
}

/// Stands in for a final answer that carried no text.
pub fn empty_answer_notice(stop_reason: StopReason) -> String {
    format!(
        "[The model returned no text (stop_reason: {}).]",
        stop_reason.as_str()
    )
}

enum StepOutcome {
    Continue,
    Done(String, TerminationReason),
}

pub struct AgentLoop<'a> {
    provider: &'a dyn LlmProvider,
    tools: &'a dyn ToolExecutor,
    config: LoopConfig,
    usage: Usage,
    tool_calls: usize,
}

impl<'a> AgentLoop<'a> {
    pub fn new(provider: &'a dyn LlmProvider, tools: &'a dyn ToolExecutor, config: LoopConfig) -> Self {
        Self {
            provider,
            tools,
            config,
            usage: Usage::default(),
            tool_calls: 0,
        }
    }

    /// Drive the conversation to completion or to the step limit.
    ///
    /// Tool failures become error results; backend failures are returned.
    pub async fn run(mut self, system: &str, conversation: &mut Conversation) -> Result<AgentRunResult> {
        let mut step = 0;
        loop {
            match self.step(step, system, conversation).await? {
                StepOutcome::Continue => step += 1,
                StepOutcome::Done(text, termination_reason) => {
                    info!(
                        steps = step + 1,
                        tool_calls = self.tool_calls,
                        tokens = self.usage.total_tokens(),
                        reason = ?termination_reason,
                        "agent run finished"
                    );
                    return Ok(AgentRunResult {
                        text,
                        termination_reason,
                        steps: step + 1,
                        tool_calls: self.tool_calls,
                        usage: self.usage,
                    });
                }
            }
        }
    }

    async fn step(&mut self, step: u32, system: &str, conversation: &mut Conversation) -> Result<StepOutcome> {
        let tools = if self.config.tools_enabled {
            self.tools.tools()
        } else {
            vec![]
        };
        let request = LlmRequest {
            model: self.config.model.clone(),
            system: Some(system.to_string()),
            messages: conversation.messages().to_vec(),
            tools,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        debug!(step, messages = request.messages.len(), "requesting completion");
        let response = self.provider.complete(&request).await?;
        self.usage.merge(&response.usage);

        let calls = response.message.tool_calls();
        let text = response.message.text_content();
        conversation.push(response.message)?;

        if calls.is_empty() || !self.config.tools_enabled {
            let text = if text.trim().is_empty() {
                warn!(step, stop_reason = response.stop_reason.as_str(), "final response has no text");
                empty_answer_notice(response.stop_reason)
            } else {
                text
            };
            return Ok(StepOutcome::Done(text, TerminationReason::Completed));
        }

        if step >= self.config.max_steps {
            warn!(step, max_steps = self.config.max_steps, pending = calls.len(), "step limit reached");
            let notice = step_limit_notice(self.config.max_steps);
            let text = if text.trim().is_empty() {
                notice
            } else {
                format!("{text}\n\n{notice}")
            };
            return Ok(StepOutcome::Done(text, TerminationReason::StepLimitReached));
        }

        let mut results = Vec::with_capacity(calls.len());
        for call in &calls {
            let result = match self.tools.execute(call).await {
                Ok(result) => result,
                Err(e) => {
                    warn!(tool = %call.tool_name, error = %e, "tool call failed");
                    ToolResult::error(&call.id, e.to_string())
                }
            };
            debug!(tool = %call.tool_name, is_error = result.is_error, "tool finished");
            results.push(result);
        }
        self.tool_calls += results.len();
        conversation.push(Message::tool_results(results))?;

        Ok(StepOutcome::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;
    use skiff_core::{MessageContent, Role, SkiffError, Tool, ToolCall};
    use skiff_llm::{MockProvider, MockResponse};

    /// Records calls; `fail` makes every call an error.
    #[derive(Default)]
    struct RecordingTools {
        executed: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl ToolExecutor for RecordingTools {
        fn tools(&self) -> Vec<Tool> {
            vec![Tool {
                name: "echo".into(),
                description: "Echo the input".into(),
                parameters: json!({"type": "object"}),
            }]
        }

        async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
            self.executed.lock().push(call.id.clone());
            if self.fail {
                return Err(SkiffError::tool("echo", "boom"));
            }
            Ok(ToolResult::ok(&call.id, call.arguments.to_string()))
        }
    }

    fn config(max_steps: u32) -> LoopConfig {
        LoopConfig {
            model: "test-model".into(),
            max_tokens: 256,
            temperature: 0.0,
            max_steps,
            tools_enabled: true,
        }
    }

    fn tool_call(id: &str) -> ToolCall {
        ToolCall {
            id: id.into(),
            tool_name: "echo".into(),
            arguments: json!({"v": id}),
        }
    }

    #[tokio::test]
    async fn completes_without_tools() {
        let provider = MockProvider::new("mock").with_response("All done.");
        let tools = RecordingTools::default();
        let mut conv = Conversation::from_prompt("hi");

        let result = AgentLoop::new(&provider, &tools, config(4))
            .run("SYSTEM", &mut conv)
            .await
            .unwrap();
        assert_eq!(result.text, "All done.");
        assert_eq!(result.termination_reason, TerminationReason::Completed);
        assert_eq!(result.steps, 1);
        assert_eq!(conv.len(), 2);

        let req = &provider.recorded_requests()[0];
        assert_eq!(req.system.as_deref(), Some("SYSTEM"));
        assert_eq!(req.tools.len(), 1);
    }

    #[tokio::test]
    async fn executes_tools_in_order_then_answers() {
        let provider = MockProvider::new("mock")
            .with_mock_response(MockResponse::tool_calls(
                "Working.",
                vec![tool_call("a"), tool_call("b")],
            ))
            .with_response("Finished.");
        let tools = RecordingTools::default();
        let mut conv = Conversation::from_prompt("go");

        let result = AgentLoop::new(&provider, &tools, config(4))
            .run("S", &mut conv)
            .await
            .unwrap();
        assert_eq!(result.text, "Finished.");
        assert_eq!(result.steps, 2);
        assert_eq!(result.tool_calls, 2);
        assert_eq!(*tools.executed.lock(), vec!["a", "b"]);

        // user, assistant(tool_use), user(tool_results), assistant
        assert_eq!(conv.len(), 4);
        let results = &conv.messages()[2];
        assert_eq!(results.role, Role::User);
        let ids: Vec<_> = results
            .content
            .iter()
            .filter_map(|c| match c {
                MessageContent::ToolResult { tool_call_id, .. } => Some(tool_call_id.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(ids, vec!["a", "b"]);

        // the second request carries the tool results
        assert_eq!(provider.recorded_requests()[1].messages.len(), 3);
    }

    #[tokio::test]
    async fn zero_steps_means_one_call_and_no_tools() {
        let provider = MockProvider::new("mock")
            .with_mock_response(MockResponse::tool_calls("", vec![tool_call("a")]));
        let tools = RecordingTools::default();
        let mut conv = Conversation::from_prompt("go");

        let result = AgentLoop::new(&provider, &tools, config(0))
            .run("S", &mut conv)
            .await
            .unwrap();
        assert_eq!(provider.call_count(), 1);
        assert!(tools.executed.lock().is_empty());
        assert_eq!(result.termination_reason, TerminationReason::StepLimitReached);
        assert_eq!(result.text, step_limit_notice(0));
    }

    #[tokio::test]
    async fn step_limit_keeps_partial_text() {
        let mut provider = MockProvider::new("mock");
        for i in 0..3 {
            provider = provider.with_mock_response(MockResponse::tool_calls(
                &format!("step {i}"),
                vec![tool_call(&format!("c{i}"))],
            ));
        }
        let tools = RecordingTools::default();
        let mut conv = Conversation::from_prompt("go");

        let result = AgentLoop::new(&provider, &tools, config(2))
            .run("S", &mut conv)
            .await
            .unwrap();
        assert_eq!(provider.call_count(), 3);
        assert_eq!(tools.executed.lock().len(), 2);
        assert_eq!(result.termination_reason, TerminationReason::StepLimitReached);
        assert!(result.text.starts_with("step 2\n\n"));
        assert!(result.text.contains("max_steps = 2"));
    }

    #[tokio::test]
    async fn tool_errors_become_results() {
        let provider = MockProvider::new("mock")
            .with_mock_response(MockResponse::tool_calls("", vec![tool_call("a")]))
            .with_response("Recovered.");
        let tools = RecordingTools {
            fail: true,
            ..Default::default()
        };
        let mut conv = Conversation::from_prompt("go");

        let result = AgentLoop::new(&provider, &tools, config(3))
            .run("S", &mut conv)
            .await
            .unwrap();
        assert_eq!(result.text, "Recovered.");
        match &conv.messages()[2].content[0] {
            MessageContent::ToolResult { content, is_error, .. } => {
                assert!(*is_error);
                assert!(content.contains("boom"));
            }
            other => panic!("expected tool result, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn blank_final_answer_is_replaced_by_notice() {
        let provider = MockProvider::new("mock").with_mock_response(MockResponse {
            stop_reason: StopReason::MaxTokens,
            ..MockResponse::text("")
        });
        let tools = RecordingTools::default();
        let mut conv = Conversation::from_prompt("go");

        let result = AgentLoop::new(&provider, &tools, config(3))
            .run("S", &mut conv)
            .await
            .unwrap();
        assert_eq!(result.termination_reason, TerminationReason::Completed);
        assert_eq!(result.text, "[The model returned no text (stop_reason: max_tokens).]");
        assert_eq!(result.text, empty_answer_notice(StopReason::MaxTokens));
    }

    #[tokio::test]
    async fn backend_errors_propagate() {
        let provider = MockProvider::new("mock").with_error("HTTP 401: bad key");
        let tools = RecordingTools::default();
        let mut conv = Conversation::from_prompt("go");

        let err = AgentLoop::new(&provider, &tools, config(3))
            .run("S", &mut conv)
            .await
            .unwrap_err();
        assert!(matches!(err, SkiffError::LlmProvider(_)));
    }

    #[tokio::test]
    async fn tools_disabled_is_single_exchange() {
        let provider = MockProvider::new("mock").with_response("Plain answer.");
        let tools = RecordingTools::default();
        let mut conv = Conversation::from_prompt("go");
        let mut cfg = config(5);
        cfg.tools_enabled = false;

        let result = AgentLoop::new(&provider, &tools, cfg)
            .run("S", &mut conv)
            .await
            .unwrap();
        assert_eq!(result.text, "Plain answer.");
        assert_eq!(provider.call_count(), 1);
        assert!(provider.recorded_requests()[0].tools.is_empty());
    }
}
