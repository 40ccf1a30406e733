#[cfg(test)]
mod tests {
    use skiff_core::*;

    // ── Message tests ──────────────────────────────────────────

    #[test]
    fn test_message_text_constructor() {
        let msg = Message::text(Role::User, "hello");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.text_content(), "hello");
        assert!(msg.tool_calls().is_empty());
        assert!(!msg.has_tool_calls());
    }

    #[test]
    fn test_message_text_joins_blocks() {
        let mut msg = Message::text(Role::Assistant, "Hello ");
        msg.content.push(MessageContent::Text { text: "world".to_string() });
        assert_eq!(msg.text_content(), "Hello \nworld");
    }

    #[test]
    fn test_message_serde_roundtrip() {
        let msg = Message::new(
            Role::Assistant,
            vec![MessageContent::ToolUse {
                id: "call_1".into(),
                name: "glob".into(),
                input: serde_json::json!({"pattern": "**/*.rs"}),
            }],
        );
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"tool_use\""));
        let restored: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.role, Role::Assistant);
        assert_eq!(restored.tool_calls()[0].tool_name, "glob");
    }

    #[test]
    fn test_tool_results_message_is_user_role() {
        let msg = Message::tool_results(vec![
            ToolResult::ok("a", "fine"),
            ToolResult::error("b", "broken"),
        ]);
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content.len(), 2);
        match &msg.content[1] {
            MessageContent::ToolResult {
                tool_call_id,
                is_error,
                ..
            } => {
                assert_eq!(tool_call_id, "b");
                assert!(*is_error);
            }
            other => panic!("unexpected block: {other:?}"),
        }
    }

    // ── Conversation tests ─────────────────────────────────────

    #[test]
    fn test_conversation_alternates() {
        let mut convo = Conversation::from_prompt("list the files");
        convo
            .push(Message::new(
                Role::Assistant,
                vec![MessageContent::ToolUse {
                    id: "t1".into(),
                    name: "list_dir".into(),
                    input: serde_json::json!({"path": "."}),
                }],
            ))
            .unwrap();
        convo
            .push(Message::tool_results(vec![ToolResult::ok("t1", "a.txt")]))
            .unwrap();
        convo.push(Message::text(Role::Assistant, "One file.")).unwrap();
        assert_eq!(convo.len(), 4);
        assert_eq!(convo.last().unwrap().text_content(), "One file.");
    }

    #[test]
    fn test_conversation_rejects_double_assistant() {
        let mut convo = Conversation::from_prompt("hi");
        convo.push(Message::text(Role::Assistant, "a")).unwrap();
        let err = convo.push(Message::text(Role::Assistant, "b")).unwrap_err();
        assert!(err.to_string().contains("conversation order"));
        assert_eq!(convo.len(), 2);
    }

    // ── Error tests ────────────────────────────────────────────

    #[test]
    fn test_error_display() {
        let err = SkiffError::Agent("something broke".into());
        assert!(err.to_string().contains("something broke"));
    }

    #[test]
    fn test_error_rate_limited() {
        let err = SkiffError::RateLimited { retry_after_secs: 30 };
        assert!(err.to_string().contains("30"));
    }

    #[test]
    fn test_error_path_escape() {
        let err = SkiffError::PathEscape {
            path: "../outside".into(),
        };
        assert_eq!(err.to_string(), "path escapes workspace: ../outside");
    }

    #[test]
    fn test_error_shell_timeout() {
        let err = SkiffError::ShellTimeout { timeout_ms: 1000 };
        let s = err.to_string();
        assert!(s.contains("1000ms"));
        assert!(s.contains("killed"));
    }

    #[test]
    fn test_error_tool_helper() {
        let err = SkiffError::tool("read_file", "missing 'path' argument");
        assert_eq!(
            err.to_string(),
            "tool execution failed: read_file: missing 'path' argument"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: SkiffError = io.into();
        assert!(matches!(err, SkiffError::Io(_)));
    }
}
