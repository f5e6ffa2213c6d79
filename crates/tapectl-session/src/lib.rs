//! # tapectl-session
//!
//! Step-wise control of an interactive terminal session through an external
//! tape interpreter, for end-to-end testing of text UIs.
//!
//! - **keys**: logical key names to engine tokens
//! - **script**: the append-only tape and its header
//! - **engine**: runs the interpreter as a cancellable subprocess
//! - **output**: picks the last frame out of the text dump and caps its size
//! - **workspace**: per-session temporary directories
//! - **controller**: the single-session state machine
//! - **tools**: the `start` / `send` / `capture` / `exit` action protocol

pub mod controller;
pub mod engine;
pub mod keys;
pub mod output;
pub mod script;
pub mod tools;
pub mod workspace;

pub use controller::{Capture, ExitSummary, SendInput, Session, SessionState, TapeController};
pub use engine::{EngineRun, RunStatus, TapeEngine, VhsEngine};
pub use tools::{Action, TapeTools};
