//! # skiff-llm
//!
//! Abstraction layer over the LLM backend. The core treats the backend as a
//! stateless request/response API that returns ordered content blocks
//! (text and tool calls).

pub mod anthropic;
pub mod mock;
pub mod provider;

pub use anthropic::AnthropicProvider;
pub use mock::{MockProvider, MockResponse};
pub use provider::{LlmProvider, LlmRequest, LlmResponse, StopReason, Usage};
