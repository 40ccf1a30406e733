//! # skiff-cli
//!
//! Command-line interface for the Skiff agent.
//!
//! ## Commands
//!
//! - `skiff run <prompt>`: select skills and run the tool loop
//! - `skiff select <prompt>`: show the ranking and the chosen skills without running
//! - `skiff skills list`: list the skill catalog
//! - `skiff skills sync`: clone or update remote skill repositories
//! - `skiff config`: print the effective configuration

pub mod commands;

pub use commands::Cli;
