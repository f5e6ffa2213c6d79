//! # tapectl-cli
//!
//! Command-line interface for tapectl.
//!
//! ## Commands
//!
//! - `tapectl serve`: JSON-lines action host on stdin/stdout
//! - `tapectl run`: execute a scripted plan of actions
//! - `tapectl keys`: list the known key names
//! - `tapectl doctor`: check the engine and workspace setup
//! - `tapectl config`: show the effective configuration

pub mod commands;
pub mod plan;

pub use commands::Cli;
