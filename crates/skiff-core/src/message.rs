use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tool::{ToolCall, ToolResult};

/// A message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub role: Role,
    pub content: Vec<MessageContent>,
    pub timestamp: DateTime<Utc>,
}

/// Who produced a message. Tool results travel as user-role messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single content block within a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        tool_call_id: String,
        content: String,
        is_error: bool,
    },
}

impl Message {
    /// Create a message from an ordered list of content blocks.
    pub fn new(role: Role, content: Vec<MessageContent>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content,
            timestamp: Utc::now(),
        }
    }

    /// Create a simple text message.
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self::new(role, vec![MessageContent::Text { text: text.into() }])
    }

    /// Bundle the results of one step's tool calls into a single user-role message.
    pub fn tool_results(results: Vec<ToolResult>) -> Self {
        let content = results
            .into_iter()
            .map(|r| MessageContent::ToolResult {
                tool_call_id: r.tool_call_id,
                content: r.content,
                is_error: r.is_error,
            })
            .collect();
        Self::new(Role::User, content)
    }

    /// Extract all text content joined together.
    pub fn text_content(&self) -> String {
        self.content
            .iter()
            .filter_map(|c| match c {
                MessageContent::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Tool calls requested in this message, in block order.
    pub fn tool_calls(&self) -> Vec<ToolCall> {
        self.content
            .iter()
            .filter_map(|c| match c {
                MessageContent::ToolUse { id, name, input } => Some(ToolCall {
                    id: id.clone(),
                    tool_name: name.clone(),
                    arguments: input.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    pub fn has_tool_calls(&self) -> bool {
        self.content
            .iter()
            .any(|c| matches!(c, MessageContent::ToolUse { .. }))
    }
}

/// Append-only conversation log.
///
/// Roles must alternate: every message must have a different role from the one
/// before it, and the first message must come from the user. Tool results are
/// user-role messages, so they always follow the assistant turn that asked for them.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a conversation with a single user prompt.
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::text(Role::User, prompt)],
        }
    }

    /// Append a message, rejecting anything that would break role alternation.
    pub fn push(&mut self, message: Message) -> crate::Result<()> {
        let expected = match self.messages.last() {
            None | Some(Message { role: Role::Assistant, .. }) => Role::User,
            Some(Message { role: Role::User, .. }) => Role::Assistant,
        };
        if message.role != expected {
            return Err(crate::SkiffError::Conversation(format!(
                "expected a {expected:?} message at position {}, got {:?}",
                self.messages.len(),
                message.role
            )));
        }
        self.messages.push(message);
        Ok(())
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_calls_keep_block_order() {
        let msg = Message::new(
            Role::Assistant,
            vec![
                MessageContent::Text { text: "looking".into() },
                MessageContent::ToolUse {
                    id: "a".into(),
                    name: "read_file".into(),
                    input: serde_json::json!({"path": "x"}),
                },
                MessageContent::ToolUse {
                    id: "b".into(),
                    name: "list_dir".into(),
                    input: serde_json::json!({"path": "."}),
                },
            ],
        );
        let calls = msg.tool_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].id, "a");
        assert_eq!(calls[1].tool_name, "list_dir");
        assert!(msg.has_tool_calls());
        assert_eq!(msg.text_content(), "looking");
    }

    #[test]
    fn conversation_rejects_two_user_turns() {
        let mut convo = Conversation::from_prompt("hi");
        let err = convo.push(Message::text(Role::User, "again")).unwrap_err();
        assert!(matches!(err, crate::SkiffError::Conversation(_)));
        assert_eq!(convo.len(), 1);
    }

    #[test]
    fn conversation_must_start_with_user() {
        let mut convo = Conversation::new();
        assert!(convo.push(Message::text(Role::Assistant, "hello")).is_err());
        assert!(convo.push(Message::text(Role::User, "hello")).is_ok());
    }
}
