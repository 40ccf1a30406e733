//! # skiff-config
//!
//! Configuration system for Skiff. Reads from `skiff.toml`, then applies
//! environment variable overrides and CLI overrides, in that precedence order.

pub mod loader;
pub mod schema;

pub use loader::ConfigLoader;
pub use schema::SkiffConfig;
pub use schema::{
    AgentConfig, ConfigWarning, LoggingConfig, RemoteSkillSource, ServicesConfig, SkillsConfig,
    WarningSeverity, WorkspaceConfig, expand_home,
};
