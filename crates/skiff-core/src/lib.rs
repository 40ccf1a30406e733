//! # skiff-core
//!
//! Core types, traits, and primitives for the Skiff agent.
//! This crate defines the shared vocabulary used by every other crate in the workspace:
//! conversation messages, tool descriptions and results, and the unified error type.

pub mod error;
pub mod message;
pub mod tool;

pub use error::{Result, SkiffError};
pub use message::{Conversation, Message, MessageContent, Role};
pub use tool::{Tool, ToolCall, ToolExecutor, ToolResult};
