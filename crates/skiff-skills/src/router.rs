//! Remote skill routing: let the model pick from the shortlist.
//!
//! Only skill summaries are sent, never bodies. Every failure (transport,
//! missing JSON, wrong shape) returns `None` so the caller can fall back.

use serde_json::{Value, json};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

use skiff_core::{Message, Role};
use skiff_llm::{LlmProvider, LlmRequest};

use crate::definition::Skill;

const ROUTER_INSTRUCTIONS: &str = "\
You route user requests to skills. A skill is a set of instructions that helps with one kind of task.
Choose the skills, from the candidates provided, that the request clearly needs.
Prefer selecting zero or one skill. Select more only when the request plainly needs several.
Never select a name that is not in the candidate list.
Reply with only a JSON object and nothing else:
{\"selected\": [\"skill-name\"], \"reason\": \"one short sentence\"}";

/// The router's choice, already restricted to candidate names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDecision {
    pub selected: BTreeSet<String>,
    pub reason: String,
}

pub struct SkillRouter {
    provider: Arc<dyn LlmProvider>,
    model: String,
    max_tokens: u32,
}

impl SkillRouter {
    pub fn new(provider: Arc<dyn LlmProvider>, model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            provider,
            model: model.into(),
            max_tokens,
        }
    }

    /// Ask the model which candidates apply to `prompt`.
    pub async fn route(&self, prompt: &str, candidates: &[Arc<Skill>]) -> Option<RouteDecision> {
        let request = LlmRequest {
            model: self.model.clone(),
            system: Some(ROUTER_INSTRUCTIONS.to_string()),
            messages: vec![Message::text(Role::User, build_router_prompt(prompt, candidates))],
            tools: vec![],
            max_tokens: self.max_tokens,
            temperature: 0.0,
        };

        let response = match self.provider.complete(&request).await {
            Ok(r) => r,
            Err(e) => {
                warn!(provider = self.provider.name(), error = %e, "skill routing request failed");
                return None;
            }
        };

        let text = response.message.text_content();
        let decision = parse_route_reply(&text, candidates);
        if decision.is_none() {
            debug!(reply = %text, "unusable router reply");
        }
        decision
    }
}

/// The user message: the request plus a JSON summary of each candidate.
fn build_router_prompt(prompt: &str, candidates: &[Arc<Skill>]) -> String {
    let summaries: Vec<Value> = candidates
        .iter()
        .map(|s| json!({ "name": s.name, "title": s.title, "description": s.description }))
        .collect();
    let listing = serde_json::to_string_pretty(&summaries).unwrap_or_else(|_| "[]".into());
    format!("User request:\n{prompt}\n\nCandidate skills:\n{listing}")
}

/// Parse a router reply. `selected` must be an array; names outside the
/// candidate list are dropped.
pub fn parse_route_reply(text: &str, candidates: &[Arc<Skill>]) -> Option<RouteDecision> {
    let object = extract_json_object(text)?;
    let value: Value = serde_json::from_str(object).ok()?;
    let selected = value.get("selected")?.as_array()?;

    let known: BTreeSet<&str> = candidates.iter().map(|s| s.name.as_str()).collect();
    let selected = selected
        .iter()
        .filter_map(Value::as_str)
        .filter(|name| known.contains(name))
        .map(str::to_string)
        .collect();
    let reason = value
        .get("reason")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Some(RouteDecision { selected, reason })
}

/// Find the first balanced `{...}` in free-form text by counting brace depth.
/// Braces inside string literals are ignored. Returns `None` when unclosed.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let start = bytes.iter().position(|&b| b == b'{')?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut i = start;

    while i < bytes.len() {
        let b = bytes[i];
        if in_string {
            if b == b'\\' {
                i += 2;
                continue;
            }
            if b == b'"' {
                in_string = false;
            }
        } else {
            match b {
                b'"' => in_string = true,
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(&text[start..=i]);
                    }
                }
                _ => {}
            }
        }
        i += 1;
    }

    None
}
