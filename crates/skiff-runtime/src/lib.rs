//! # skiff-runtime
//!
//! Runs one request end to end: select skills, build the system prompt,
//! then loop between the model and the sandboxed tools.
//!
//! ## Architecture
//!
//! ```text
//!        prompt
//!          │
//!          ▼
//!   ┌──────────────┐
//!   │  Selection   │  ← ranker → router → fallback (skiff-skills)
//!   └──────┬───────┘
//!          │ selected skills
//!          ▼
//!   ┌──────────────┐
//!   │ System prompt│  ← base instructions + one block per skill
//!   └──────┬───────┘
//!          ▼
//!   ┌──────────────┐      ┌──────────────┐
//!   │  Agent Loop  │ ───▶ │ Tool Runtime │  ← read/write/list/glob/shell,
//!   │ 0..=max_steps│ ◀─── │  (sandboxed) │    confined to the workspace
//!   └──────┬───────┘      └──────────────┘
//!          ▼
//!     answer text
//! ```

pub mod agent;
pub mod agent_loop;
pub mod prompt;
pub mod sandbox;
pub mod tools;

pub use agent::{Agent, AgentRun, AgentRunSummary, load_catalog};
pub use agent_loop::{
    AgentLoop, AgentRunResult, LoopConfig, TerminationReason, empty_answer_notice, step_limit_notice,
};
pub use sandbox::Workspace;
pub use tools::{ToolRuntime, resolve_tool_name};
