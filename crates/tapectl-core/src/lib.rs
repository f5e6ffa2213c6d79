//! # tapectl-core
//!
//! Core types shared by every tapectl crate: the error taxonomy and the
//! value types of the caller-facing action protocol.

pub mod error;
pub mod tool;

pub use error::{Result, TapeError};
pub use tool::{Tool, ToolCall, ToolExecutor, ToolResult};
