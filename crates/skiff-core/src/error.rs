use std::path::PathBuf;

use thiserror::Error;

/// Unified error type for the entire Skiff workspace.
#[derive(Error, Debug)]
pub enum SkiffError {
    // ── Agent errors ───────────────────────────────────────────
    #[error("agent error: {0}")]
    Agent(String),

    #[error("conversation order violated: {0}")]
    Conversation(String),

    // ── LLM errors ─────────────────────────────────────────────
    #[error("llm provider error: {0}")]
    LlmProvider(String),

    #[error("llm rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    // ── Tool errors ────────────────────────────────────────────
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    #[error("tool execution failed: {tool}: {reason}")]
    ToolExecution { tool: String, reason: String },

    #[error("path escapes workspace: {}", path.display())]
    PathEscape { path: PathBuf },

    #[error("file exists: {}", path.display())]
    FileExists { path: PathBuf },

    #[error("command timed out after {timeout_ms}ms and was killed")]
    ShellTimeout { timeout_ms: u64 },

    // ── Skill errors ───────────────────────────────────────────
    #[error("skill error: {0}")]
    Skill(String),

    #[error("skill sync failed: {remote}: {reason}")]
    SkillSync { remote: String, reason: String },

    // ── Config errors ──────────────────────────────────────────
    #[error("config error: {0}")]
    Config(String),

    #[error("config validation failed: {field}: {reason}")]
    ConfigValidation { field: String, reason: String },

    // ── Generic wrappers ───────────────────────────────────────
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SkiffError {
    /// Shorthand for a [`SkiffError::ToolExecution`] failure.
    pub fn tool(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ToolExecution {
            tool: tool.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SkiffError>;
