use thiserror::Error;

/// Unified error type for the tapectl controller.
#[derive(Error, Debug)]
pub enum TapeError {
    // ── Session lifecycle errors ───────────────────────────────
    #[error("a session is already active (command: {command}); call exit first")]
    AlreadyActive { command: String },

    #[error("no active session; call start first")]
    NoActiveSession,

    // ── Argument errors ────────────────────────────────────────
    #[error("missing required argument: {0}")]
    MissingArgument(String),

    #[error("invalid argument: {field}: {reason}")]
    InvalidArgument { field: String, reason: String },

    #[error("nothing to send: provide at least one of text, keys or sleepMs")]
    NoOperation,

    #[error("unknown key '{key}'. Known keys: {}", known.join(", "))]
    UnknownKey { key: String, known: Vec<String> },

    #[error("unknown action '{0}'. Known actions: start, send, capture, exit")]
    UnknownAction(String),

    // ── Engine errors ──────────────────────────────────────────
    #[error("engine failed: {0}")]
    EngineFailure(String),

    #[error("expected output missing: {0}")]
    MissingOutput(String),

    #[error("Aborted")]
    Aborted,

    #[error("failed to spawn engine: {0}")]
    SpawnFailure(String),

    // ── Config errors ──────────────────────────────────────────
    #[error("config error: {0}")]
    Config(String),

    // ── Generic wrappers ───────────────────────────────────────
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl TapeError {
    /// Stable, machine-readable name of the failure, reported alongside the message.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AlreadyActive { .. } => "AlreadyActive",
            Self::NoActiveSession => "NoActiveSession",
            Self::MissingArgument(_) => "MissingArgument",
            Self::InvalidArgument { .. } => "InvalidArgument",
            Self::NoOperation => "NoOperation",
            Self::UnknownKey { .. } => "UnknownKey",
            Self::UnknownAction(_) => "UnknownAction",
            Self::EngineFailure(_) => "EngineFailure",
            Self::MissingOutput(_) => "MissingOutput",
            Self::Aborted => "Aborted",
            Self::SpawnFailure(_) => "SpawnFailure",
            Self::Config(_) => "Config",
            Self::Io(_) => "Io",
            Self::Serialization(_) => "Serialization",
            Self::Other(_) => "Other",
        }
    }
}

pub type Result<T> = std::result::Result<T, TapeError>;
