//! # tapectl-config
//!
//! Configuration for tapectl. Reads from `tapectl.toml`, then applies
//! environment variable overrides, then validates.

pub mod loader;
pub mod schema;

pub use loader::ConfigLoader;
pub use schema::{
    ConfigWarning, EngineConfig, LimitsConfig, LoggingConfig, SessionConfig, TapeConfig,
    WarningSeverity,
};
